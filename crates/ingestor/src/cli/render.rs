//! `render`: print the document a source/sink pair compiles to.

use anyhow::Result;
use ingestor::Pipeline;
use ingestor_protocol::{IngestConfig, SinkDescriptor, SourceDescriptor};

use super::{local_collaborators, parse_json_arg};

#[derive(Debug)]
pub struct RenderArgs {
    pub source: String,
    pub sink: String,
}

pub fn run(args: RenderArgs, config: &IngestConfig) -> Result<()> {
    let source: SourceDescriptor = parse_json_arg("source", &args.source)?;
    let sink: SinkDescriptor = parse_json_arg("sink", &args.sink)?;
    let pipeline = Pipeline::new(local_collaborators(config), config.clone());
    let document = pipeline.render(&source, &sink)?;
    print!("{}", document);
    Ok(())
}
