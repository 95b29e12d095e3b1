pub mod decoder;
pub mod disasm;
pub mod instructions;
pub mod memory;
pub mod output;

pub mod isa {
    pub mod fr; // FR family, 16-bit instruction words
}

pub use decoder::{sign_extend, Content, DataTag, DecodedRecord, Decoder, FlowKind, Symbols};
pub use isa::fr::FrDecoder;
pub use memory::{Bus, Image};
pub use output::OutputOptions;
