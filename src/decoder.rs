use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::instructions::{OpcodeDesc, Transfer};
use crate::memory::Bus;

/// User-declared names, keyed by address.
pub type Symbols = BTreeMap<u32, String>;

/// Interpret the low `n` bits of `x` as a two's-complement number and widen it to 32 bits.
///
/// `n` must be in `1..=32`.
pub fn sign_extend(n: u32, x: u32) -> i32 {
    debug_assert!((1..=32).contains(&n));
    let s = 32 - n;
    ((x << s) as i32) >> s
}

/// Force every bit above the low `n` to one. FR's "2" forms (ADD2, CMP2, ADDN2) encode
/// -16..-1 in a 4-bit field this way.
pub fn negative_extend(n: u32, x: u32) -> i32 {
    let mask = if n >= 32 { u32::MAX } else { (1u32 << n) - 1 };
    (!mask | (x & mask)) as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowKind {
    Branch,
    Call,
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlow {
    pub kind: FlowKind,
    /// Direct target, when the operand encodes one.
    pub target: Option<u32>,
    /// Unconditional branch (BRA) or jump: straight-line flow does not continue.
    pub unconditional: bool,
    /// The following instruction executes before the transfer (`:D` forms).
    pub delayed: bool,
}

/// Operand fields pulled out of one instruction by its descriptor.
#[derive(Debug, Clone, Copy)]
pub struct Decoded {
    pub desc: &'static OpcodeDesc,
    pub pc: u32,
    pub i: u8,
    pub j: u8,
    pub imm: i32,
    pub target: Option<u32>,
}

impl Decoded {
    pub fn control_flow(&self) -> Option<ControlFlow> {
        let (kind, unconditional) = match self.desc.transfer {
            Transfer::Fallthrough => return None,
            Transfer::Branch => (FlowKind::Branch, false),
            Transfer::Jump => (FlowKind::Branch, true),
            Transfer::Call => (FlowKind::Call, false),
            Transfer::Return => (FlowKind::Return, true),
        };
        Some(ControlFlow { kind, target: self.target, unconditional, delayed: self.desc.delayed })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedRecord {
    pub address: u32,
    pub raw_words: Vec<u16>,
    pub size_in_bytes: usize,
    pub rendered: String,
    pub is_code: bool,
    pub control_flow: Option<ControlFlow>,
}

impl DecodedRecord {
    pub fn end(&self) -> u32 {
        self.address.wrapping_add(self.size_in_bytes as u32)
    }

    pub fn is_return(&self) -> bool {
        matches!(self.control_flow, Some(ControlFlow { kind: FlowKind::Return, .. }))
    }
}

/// Primitive interpretations for data ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataTag {
    /// 32-bit value.
    Long,
    /// 16-bit value.
    Word,
    /// One 16-bit unit shown as two bytes.
    Byte,
    /// NUL-terminated string, padded to an even length.
    Str,
    /// 32-bit code pointer from an interrupt vector table.
    Vector,
}

impl DataTag {
    pub fn letter(self) -> char {
        match self {
            DataTag::Long => 'L',
            DataTag::Word => 'W',
            DataTag::Byte => 'B',
            DataTag::Str => 'S',
            DataTag::Vector => 'V',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Content {
    Code,
    Data(Vec<DataTag>),
}

impl Content {
    pub fn is_code(&self) -> bool {
        matches!(self, Content::Code)
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Code => f.write_str("CODE"),
            Content::Data(tags) if tags.as_slice() == [DataTag::Vector] => f.write_str("DATA:V"),
            Content::Data(tags) if tags.as_slice() == [DataTag::Long] => f.write_str("DATA"),
            Content::Data(tags) => {
                f.write_str("DATA/")?;
                tags.iter().try_for_each(|t| write!(f, "{}", t.letter()))
            }
        }
    }
}

/// One pass over a data range's tag sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataRecord {
    pub items: Vec<DecodedRecord>,
    pub size_in_bytes: usize,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("no image bytes at {addr:#010x}")]
    OutOfImage { addr: u32 },
    #[error("string at {addr:#010x} runs off the image without a terminator")]
    UnterminatedString { addr: u32 },
}

/// What a decode call may look at besides the cursor.
pub struct DecodeContext<'a, B: Bus + ?Sized> {
    pub bus: &'a B,
    pub symbols: &'a Symbols,
    /// Start of the range being decoded; vector numbers count from here.
    pub origin: u32,
}

pub trait Decoder {
    /// Decode the instruction at `pc`. Unknown encodings are not errors.
    fn decode_code<B: Bus + ?Sized>(&self, cx: &DecodeContext<'_, B>, pc: u32) -> Result<DecodedRecord, DecodeError>;

    /// Decode one record: every tag of `tags` in order, starting at `pc`.
    fn decode_data<B: Bus + ?Sized>(
        &self,
        cx: &DecodeContext<'_, B>,
        pc: u32,
        tags: &[DataTag],
    ) -> Result<DataRecord, DecodeError>;
}
