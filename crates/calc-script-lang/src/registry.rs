//! Function signatures and the language registry.

use crate::error::LanguageError;
use crate::keywords::{BUILTIN_GLOBALS, CONTROL_FLOW_KEYWORDS, KEYWORDS, is_identifier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// A single declared parameter of a helper function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionParameter {
    /// Parameter name (used for prelude stubs and messages).
    pub name: String,
    /// Whether callers may omit this argument.
    #[serde(default)]
    pub optional: bool,
}

impl FunctionParameter {
    /// Create a required parameter.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
        }
    }

    /// Create an optional parameter.
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
        }
    }
}

/// The signature of a helper function callable from scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    /// Function name.
    pub name: String,
    /// Declared parameters, in order.
    #[serde(default)]
    pub parameters: Vec<FunctionParameter>,
    /// Optional human-readable description (shown by hosts in tooltips).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FunctionSignature {
    /// Create a signature without parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            description: None,
        }
    }

    /// Append a required parameter.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(FunctionParameter::required(name));
        self
    }

    /// Append an optional parameter.
    pub fn optional_param(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(FunctionParameter::optional(name));
        self
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Number of arguments a call must provide.
    pub fn required_count(&self) -> usize {
        self.parameters.iter().filter(|p| !p.optional).count()
    }

    /// Maximum number of arguments a call may provide.
    pub fn total_count(&self) -> usize {
        self.parameters.len()
    }
}

/// Name-indexed set of [`FunctionSignature`]s.
///
/// Iteration order is by name, so anything generated from the registry (e.g. prelude stubs) is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FunctionSignature>", into = "Vec<FunctionSignature>")]
pub struct FunctionRegistry {
    functions: BTreeMap<String, FunctionSignature>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a signature, replacing any previous signature with the same name.
    pub fn insert(&mut self, signature: FunctionSignature) -> Option<FunctionSignature> {
        self.functions.insert(signature.name.clone(), signature)
    }

    /// Look up a signature by name.
    pub fn get(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.get(name)
    }

    /// Returns `true` if a function with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Iterate signatures in name order.
    pub fn iter(&self) -> impl Iterator<Item = &FunctionSignature> {
        self.functions.values()
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns `true` if no functions are registered.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl TryFrom<Vec<FunctionSignature>> for FunctionRegistry {
    type Error = LanguageError;

    fn try_from(signatures: Vec<FunctionSignature>) -> Result<Self, Self::Error> {
        let mut registry = Self::new();
        for signature in signatures {
            if !is_identifier(&signature.name) {
                return Err(LanguageError::InvalidIdentifier(signature.name));
            }
            if registry.contains(&signature.name) {
                return Err(LanguageError::DuplicateFunction(signature.name));
            }
            registry.insert(signature);
        }
        Ok(registry)
    }
}

impl From<FunctionRegistry> for Vec<FunctionSignature> {
    fn from(registry: FunctionRegistry) -> Self {
        registry.functions.into_values().collect()
    }
}

/// All static tables the analyzer consults for one scripting dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptLanguage {
    /// Reserved words (never reported as unknown identifiers).
    pub keywords: BTreeSet<String>,
    /// Keywords that introduce a parenthesized condition/header.
    pub control_flow_keywords: BTreeSet<String>,
    /// Global objects/functions available without declaration.
    pub builtin_globals: BTreeSet<String>,
    /// Custom helper functions, with signatures used for arity checks.
    pub functions: FunctionRegistry,
}

impl Default for ScriptLanguage {
    fn default() -> Self {
        Self {
            keywords: KEYWORDS.iter().map(|s| s.to_string()).collect(),
            control_flow_keywords: CONTROL_FLOW_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            builtin_globals: BUILTIN_GLOBALS.iter().map(|s| s.to_string()).collect(),
            functions: FunctionRegistry::new(),
        }
    }
}

impl ScriptLanguage {
    /// The default dialect extended with the dosage calculator helper library.
    pub fn dosage_calculator() -> Self {
        let helpers = [
            FunctionSignature::new("addWarning")
                .param("title")
                .param("message")
                .param("severity")
                .param("parameterName")
                .param("value")
                .with_description("Attach a warning to the calculation result."),
            FunctionSignature::new("addResult")
                .param("label")
                .param("value")
                .optional_param("unit")
                .with_description("Publish a labelled result value."),
            FunctionSignature::new("round")
                .param("value")
                .optional_param("decimals"),
            FunctionSignature::new("clamp")
                .param("value")
                .param("min")
                .param("max"),
            FunctionSignature::new("dosePerKg")
                .param("dose")
                .param("weightKg"),
            FunctionSignature::new("bodySurfaceArea")
                .param("heightCm")
                .param("weightKg")
                .with_description("Mosteller body surface area in m²."),
            FunctionSignature::new("idealBodyWeight")
                .param("heightCm")
                .param("isMale"),
            FunctionSignature::new("creatinineClearance")
                .param("age")
                .param("weightKg")
                .param("serumCreatinine")
                .param("isFemale")
                .with_description("Cockcroft-Gault creatinine clearance in mL/min."),
            FunctionSignature::new("formatDose")
                .param("value")
                .param("unit")
                .optional_param("decimals"),
            FunctionSignature::new("getParameter").param("name"),
        ];

        let mut language = Self::default();
        for helper in helpers {
            language.functions.insert(helper);
        }
        language
    }

    /// Parse a language description from JSON. Missing tables fall back to the defaults.
    pub fn from_json_str(json: &str) -> Result<Self, LanguageError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a language description from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LanguageError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Register an additional helper function.
    pub fn with_function(mut self, signature: FunctionSignature) -> Self {
        self.functions.insert(signature);
        self
    }

    /// Returns `true` if `name` is a reserved word.
    pub fn is_keyword(&self, name: &str) -> bool {
        self.keywords.contains(name)
    }

    /// Returns `true` if `name` introduces a parenthesized control-flow header.
    pub fn is_control_flow_keyword(&self, name: &str) -> bool {
        self.control_flow_keywords.contains(name)
    }

    /// Returns `true` if `name` is a built-in global.
    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtin_globals.contains(name)
    }

    /// Look up a custom helper signature.
    pub fn function(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.get(name)
    }

    /// Returns `true` if `name` is callable without a declaration in the script.
    pub fn is_known_function(&self, name: &str) -> bool {
        self.is_builtin(name) || self.functions.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_signature_counts() {
        let sig = FunctionSignature::new("addResult")
            .param("label")
            .param("value")
            .optional_param("unit");
        assert_eq!(sig.required_count(), 2);
        assert_eq!(sig.total_count(), 3);
    }

    #[test]
    fn test_dosage_calculator_helpers() {
        let language = ScriptLanguage::dosage_calculator();
        let warning = language.function("addWarning").expect("addWarning registered");
        assert_eq!(warning.required_count(), 5);
        assert!(language.is_known_function("parseInt"));
        assert!(language.is_known_function("clamp"));
        assert!(!language.is_known_function("doStuff"));
        assert!(language.is_keyword("typeof"));
        assert!(language.is_control_flow_keyword("catch"));
    }

    #[test]
    fn test_language_from_json_keeps_defaults() {
        let json = r#"{
            "functions": [
                { "name": "lookupDose", "parameters": [
                    { "name": "drug" },
                    { "name": "route", "optional": true }
                ] }
            ]
        }"#;
        let language = ScriptLanguage::from_json_str(json).unwrap();
        let sig = language.function("lookupDose").unwrap();
        assert_eq!(sig.required_count(), 1);
        assert_eq!(sig.total_count(), 2);
        assert!(language.is_keyword("var"));
        assert!(language.is_builtin("Math"));
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let json = r#"{ "functions": [ { "name": "f" }, { "name": "f" } ] }"#;
        let err = ScriptLanguage::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("registered more than once"));
    }

    #[test]
    fn test_registry_rejects_invalid_names() {
        let json = r#"{ "functions": [ { "name": "not valid" } ] }"#;
        assert!(ScriptLanguage::from_json_str(json).is_err());
    }

    #[test]
    fn test_registry_round_trips_in_name_order() {
        let mut registry = FunctionRegistry::new();
        registry.insert(FunctionSignature::new("zeta"));
        registry.insert(FunctionSignature::new("alpha").param("x"));
        let names: Vec<_> = registry.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
