//! `calc-check` - run one validation pass over a calculator script.
//!
//! ```bash
//! calc-check dose.js --params params.json
//! calc-check dose.js --format json --no-style
//! RUST_LOG=calc_script=debug calc-check dose.js
//! ```
//!
//! Exits with status 1 when any error is reported.

use anyhow::{Context, Result};
use calc_script_engine::{EngineConfig, Validation, Validator};
use calc_script_lang::{ParameterSet, ScriptLanguage};
use clap::{Parser, ValueEnum};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(
    name = "calc-check",
    version,
    about = "Validate a calculator script and print its diagnostics."
)]
struct Cli {
    /// Script to validate
    file: PathBuf,

    /// Calculator parameters (JSON array of {name, data_type, default_value})
    #[arg(long, value_name = "FILE")]
    params: Option<PathBuf>,

    /// Language tables (JSON); defaults to the dosage calculator helpers
    #[arg(long, value_name = "FILE")]
    language: Option<PathBuf>,

    /// Engine configuration (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Skip stylistic checks
    #[arg(long)]
    no_style: bool,

    /// Skip the compiler check
    #[arg(long)]
    no_compile: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "warn", value_name = "LEVEL")]
    log_level: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let validation = run(&cli)?;
    match cli.format {
        Format::Text => print!("{}", render_text(&cli.file, &validation)),
        Format::Json => println!("{}", serde_json::to_string_pretty(&validation)?),
    }

    Ok(if validation.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = fmt::fmt()
        .with_env_filter(filter)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run(cli: &Cli) -> Result<Validation> {
    let text = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("failed to read script {}", cli.file.display()))?;

    let parameters = match &cli.params {
        Some(path) => ParameterSet::from_json_file(path)
            .with_context(|| format!("failed to load parameters from {}", path.display()))?,
        None => ParameterSet::new(),
    };
    let language = match &cli.language {
        Some(path) => ScriptLanguage::from_json_file(path)
            .with_context(|| format!("failed to load language from {}", path.display()))?,
        None => ScriptLanguage::dosage_calculator(),
    };
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if cli.no_style {
        config = config.with_stylistic_checks(false);
    }
    if cli.no_compile {
        config = config.with_compile_check(false);
    }
    debug!(?config, parameters = parameters.len(), "validating {}", cli.file.display());

    let validator = validator(language, config);
    validator
        .validate(&text, &parameters)
        .with_context(|| format!("unable to validate {}", cli.file.display()))
}

#[cfg(feature = "boa")]
fn validator(language: ScriptLanguage, config: EngineConfig) -> Validator {
    Validator::new(language, config).with_compiler(calc_script_engine::BoaCompiler)
}

#[cfg(not(feature = "boa"))]
fn validator(language: ScriptLanguage, config: EngineConfig) -> Validator {
    Validator::new(language, config)
}

fn render_text(path: &Path, validation: &Validation) -> String {
    let mut out = String::new();
    for diag in &validation.diagnostics {
        out.push_str(&format!("{}:{diag}\n", path.display()));
    }
    out.push_str(&validation.status);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use calc_script::{Diagnostic, DiagnosticCategory, DiagnosticSeverity};
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from([
            "calc-check",
            "dose.js",
            "--params",
            "p.json",
            "--format",
            "json",
            "--no-style",
        ]);
        assert_eq!(cli.file, PathBuf::from("dose.js"));
        assert_eq!(cli.params, Some(PathBuf::from("p.json")));
        assert_eq!(cli.format, Format::Json);
        assert!(cli.no_style);
        assert!(!cli.no_compile);
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn test_render_text() {
        let validation = Validation {
            diagnostics: vec![Diagnostic::new(
                2,
                5,
                DiagnosticSeverity::Warning,
                DiagnosticCategory::Semantic,
                "Undefined variable 'x'",
            )],
            status: "1 warning".to_string(),
        };
        assert_eq!(
            render_text(Path::new("dose.js"), &validation),
            "dose.js:2:5: warning: Undefined variable 'x'\n1 warning\n"
        );
    }
}
