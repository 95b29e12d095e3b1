use anyhow::Result;
use serde::Serialize;
use std::path::Path;

/// Read-only view of the address space being disassembled.
///
/// FR is big-endian; reads that touch an unmapped byte yield `None`.
pub trait Bus {
    fn read_u8(&self, addr: u32) -> Option<u8>;

    fn read_u16(&self, addr: u32) -> Option<u16> {
        let b0 = self.read_u8(addr)?;
        let b1 = self.read_u8(addr.wrapping_add(1))?;
        Some(u16::from_be_bytes([b0, b1]))
    }

    fn read_u32(&self, addr: u32) -> Option<u32> {
        let hi = self.read_u16(addr)?;
        let lo = self.read_u16(addr.wrapping_add(2))?;
        Some(((hi as u32) << 16) | lo as u32)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub base: u32,
    pub file_offset: u32,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl Segment {
    pub fn end(&self) -> u32 {
        self.base.wrapping_add(self.bytes.len() as u32)
    }

    fn contains(&self, addr: u32) -> bool {
        addr >= self.base && addr < self.end()
    }
}

/// The firmware image as seen from the memory side: one segment per file mapping.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Image {
    pub segments: Vec<Segment>,
}

/// A `(memory start, memory end, file offset)` triple; `end` is exclusive.
pub type Mapping = (u32, u32, u32);

impl Image {
    /// Single segment holding `bytes` at `base`.
    pub fn from_bytes(base: u32, bytes: Vec<u8>) -> Self {
        Self { segments: vec![Segment { base, file_offset: 0, bytes }] }
    }

    /// Copies each mapped window of `file` into its own segment. Windows running past
    /// the end of the file are clipped; an empty mapping list maps the whole file at 0.
    pub fn map(file: &[u8], mappings: &[Mapping]) -> Self {
        if mappings.is_empty() {
            return Self::from_bytes(0, file.to_vec());
        }
        let mut segments = Vec::with_capacity(mappings.len());
        for &(start, end, file_offset) in mappings {
            let from = (file_offset as usize).min(file.len());
            let len = end.saturating_sub(start) as usize;
            let to = from.saturating_add(len).min(file.len());
            if from == to {
                tracing::warn!(start = format_args!("{start:#010x}"), "mapping lies beyond end of input file");
                continue;
            }
            segments.push(Segment { base: start, file_offset, bytes: file[from..to].to_vec() });
        }
        Self { segments }
    }

    pub fn load(path: &Path, mappings: &[Mapping]) -> Result<Self> {
        let file = std::fs::read(path)?;
        anyhow::ensure!(!file.is_empty(), "input file {} is empty", path.display());
        Ok(Self::map(&file, mappings))
    }
}

impl Bus for Image {
    fn read_u8(&self, addr: u32) -> Option<u8> {
        // First segment wins, the same way range lookups resolve overlaps.
        let s = self.segments.iter().find(|s| s.contains(addr))?;
        Some(s.bytes[(addr - s.base) as usize])
    }
}
