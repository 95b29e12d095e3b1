//! `dfr`: FR firmware disassembler driven by file, memory and selection maps.

pub mod analyze;
pub mod correlate;
pub mod engine;
pub mod error;
pub mod listing;
pub mod model;
pub mod options;
pub mod parse;

pub use analyze::{CodeStructure, Function, InstructionTable, Summary};
pub use engine::{Disassembler, Listing, Section, Status};
pub use error::DfrError;
pub use model::{Layout, MemoryMap, Range};
pub use options::{Cli, Config, Invocation};
pub use parse::ParsingError;

use anyhow::Context as _;

use fr_rs::{FrDecoder, Image, OutputOptions};

/// Load the input image and run every configured range through the decoder.
///
/// Without any `-i` mapping the whole file is mapped at address 0.
pub fn disassemble(config: &mut Config) -> anyhow::Result<Listing> {
    let input = config.input.clone().ok_or(DfrError::NoInput)?;
    if config.layout.file_map.is_empty() {
        let len = std::fs::metadata(&input).with_context(|| format!("cannot open {}", input.display()))?.len();
        let len = u32::try_from(len).context("input file larger than the address space")?;
        config.layout.file_map.insert(Range::new(0, len));
    }
    let image = Image::load(&input, &config.layout.mappings())
        .with_context(|| format!("cannot load {}", input.display()))?;

    if config.options.contains(OutputOptions::DEBUG) {
        tracing::debug!("layout: {}", serde_json::to_string_pretty(&config.layout)?);
        tracing::debug!("symbols: {}", serde_json::to_string(&config.symbols)?);
        tracing::debug!("segments: {}", serde_json::to_string(&image.segments)?);
    }

    let decoder = FrDecoder::new(config.options);
    let listing = Disassembler::new(&decoder, &image, &config.layout, &config.symbols, config.options).run();

    if let Some(structure) = &listing.structure {
        let functions: Vec<&Function> = structure.functions().values().collect();
        tracing::debug!("functions: {}", serde_json::to_string(&functions)?);
    }
    Ok(listing)
}
