//! Prelude synthesis for the compiler check.
//!
//! The compiler sees `prelude + user text`. The prelude declares a stub for every registered
//! helper function and a `var` for every calculator parameter (initialized from its default
//! value) so the compiler does not trip over names the host provides at run time.
//!
//! The prelude's line count is measured from the generated text, never hand-maintained; compiler
//! line numbers are mapped back by subtracting it.

use calc_script_lang::{ParameterSet, ScriptLanguage, is_identifier};
use tracing::warn;

/// Synthetic declarations placed before user code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prelude {
    text: String,
    line_count: u32,
}

impl Prelude {
    /// Build the prelude for a language registry and parameter set.
    pub fn build(language: &ScriptLanguage, parameters: &ParameterSet) -> Self {
        let mut text = String::new();

        for signature in language.functions.iter() {
            if !is_identifier(&signature.name) {
                warn!(name = %signature.name, "skipping helper with invalid name in prelude");
                continue;
            }
            let params: Vec<&str> = signature
                .parameters
                .iter()
                .map(|p| p.name.as_str())
                .filter(|name| is_identifier(name))
                .collect();
            text.push_str(&format!(
                "function {}({}) {{}}\n",
                signature.name,
                params.join(", ")
            ));
        }

        for parameter in parameters.iter() {
            if !is_identifier(&parameter.name) {
                warn!(name = %parameter.name, "skipping parameter with invalid name in prelude");
                continue;
            }
            text.push_str(&format!(
                "var {} = {};\n",
                parameter.name,
                parameter.default_literal()
            ));
        }

        let line_count = text.matches('\n').count() as u32;
        Self { text, line_count }
    }

    /// The prelude text (every line is newline-terminated).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of lines the prelude occupies.
    pub fn line_count(&self) -> u32 {
        self.line_count
    }

    /// The full script handed to the compiler.
    pub fn wrap(&self, user_text: &str) -> String {
        let mut script = String::with_capacity(self.text.len() + user_text.len());
        script.push_str(&self.text);
        script.push_str(user_text);
        script
    }

    /// Map a 1-based line of the wrapped script to a 1-based user line.
    ///
    /// Returns `None` for lines inside the prelude.
    pub fn user_line(&self, script_line: u32) -> Option<u32> {
        script_line
            .checked_sub(self.line_count)
            .filter(|line| *line > 0)
    }
}
