//! `guess-format` and `guess-fields`.

use anyhow::Result;
use ingestor_formats::{escape_format, unescape_format, FormatRegistry};
use ingestor_protocol::{FormatGuess, IngestConfig, SourceDescriptor};
use tracing::info;

use super::{local_collaborators, parse_json_arg, print_json};

#[derive(Debug)]
pub struct GuessFormatArgs {
    pub source: String,
}

#[derive(Debug)]
pub struct GuessFieldsArgs {
    pub source: String,
    pub format: String,
}

/// Prints the format with whitespace separators escaped, the way the UI
/// expects them.
pub fn run_format(args: GuessFormatArgs, config: &IngestConfig) -> Result<()> {
    let source: SourceDescriptor = parse_json_arg("source", &args.source)?;
    source.validate()?;
    let registry = FormatRegistry::new(local_collaborators(config));
    let guess = registry.guess_format(&source)?;
    info!("Guessed {} format for {} source", guess.format_type, source.kind());
    print_json(&escape_format(&guess))
}

/// Takes the format as printed by `guess-format` (escaped).
pub fn run_fields(args: GuessFieldsArgs, config: &IngestConfig) -> Result<()> {
    let source: SourceDescriptor = parse_json_arg("source", &args.source)?;
    let format: FormatGuess = parse_json_arg("format", &args.format)?;
    source.validate()?;
    let registry = FormatRegistry::new(local_collaborators(config));
    let fields = registry.guess_field_types(&source, &unescape_format(&format))?;
    info!(
        "Guessed {} field(s) from {} sample row(s)",
        fields.columns.len(),
        fields.sample.len()
    );
    print_json(&fields)
}
