//! Calculator parameters supplied by the host for each document.

use crate::error::LanguageError;
use crate::keywords::is_identifier;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Value type of a calculator parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Floating point number.
    Number,
    /// Whole number.
    Integer,
    /// `true` / `false`.
    Boolean,
    /// Free text.
    Text,
    /// One of a fixed set of options (stored as text).
    Select,
    /// ISO-8601 date (stored as text).
    Date,
}

/// A named input of a dosage calculator.
///
/// Every parameter name is a known identifier inside the script, regardless of any in-text
/// declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatorParameter {
    /// Identifier the script uses to read the value.
    pub name: String,
    /// Value type.
    pub data_type: DataType,
    /// Default value, as entered in the calculator configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl CalculatorParameter {
    /// Create a parameter without a default value.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            default_value: None,
        }
    }

    /// Attach a default value.
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Render the default value as a script literal of the right type.
    ///
    /// Numeric parameters fall back to `0` when the default is missing or not a finite number;
    /// textual parameters are emitted as escaped double-quoted strings.
    pub fn default_literal(&self) -> String {
        let raw = self.default_value.as_deref().map(str::trim).unwrap_or("");
        match self.data_type {
            DataType::Number => match raw.parse::<f64>() {
                Ok(value) if value.is_finite() => raw.to_string(),
                _ => "0".to_string(),
            },
            DataType::Integer => match raw.parse::<i64>() {
                Ok(value) => value.to_string(),
                Err(_) => "0".to_string(),
            },
            DataType::Boolean => {
                let truthy = ["true", "1", "yes"]
                    .iter()
                    .any(|t| raw.eq_ignore_ascii_case(t));
                truthy.to_string()
            }
            DataType::Text | DataType::Select | DataType::Date => {
                serde_json::Value::String(raw.to_string()).to_string()
            }
        }
    }
}

/// The ordered parameter list of one calculator document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    parameters: Vec<CalculatorParameter>,
}

impl ParameterSet {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON array of parameters.
    pub fn from_json_str(json: &str) -> Result<Self, LanguageError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON array of parameters from a file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LanguageError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Append a parameter.
    pub fn push(&mut self, parameter: CalculatorParameter) {
        self.parameters.push(parameter);
    }

    /// Builder-style [`ParameterSet::push`].
    pub fn with(mut self, parameter: CalculatorParameter) -> Self {
        self.push(parameter);
        self
    }

    /// Returns `true` if a parameter with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p.name == name)
    }

    /// Iterate parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &CalculatorParameter> {
        self.parameters.iter()
    }

    /// Iterate parameter names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Check that every name is a usable identifier and that names are unique.
    pub fn validate(&self) -> Result<(), LanguageError> {
        let mut seen = HashSet::new();
        for parameter in &self.parameters {
            if !is_identifier(&parameter.name) {
                return Err(LanguageError::InvalidIdentifier(parameter.name.clone()));
            }
            if !seen.insert(parameter.name.as_str()) {
                return Err(LanguageError::DuplicateParameter(parameter.name.clone()));
            }
        }
        Ok(())
    }
}

impl FromIterator<CalculatorParameter> for ParameterSet {
    fn from_iter<T: IntoIterator<Item = CalculatorParameter>>(iter: T) -> Self {
        Self {
            parameters: iter.into_iter().collect(),
        }
    }
}
