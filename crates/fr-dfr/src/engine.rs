//! Range-by-range decode loop.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use fr_rs::decoder::{DecodeContext, DecodeError};
use fr_rs::isa::fr::VECTOR_TABLE_TOP;
use fr_rs::{Bus, Content, DataTag, DecodedRecord, Decoder, FlowKind, OutputOptions, Symbols};

use crate::analyze::{CodeStructure, InstructionTable};
use crate::correlate::{annotate, backing_range, memory_file_offset};
use crate::model::{Layout, Range};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Decoded,
    /// Decoding failed at `at`; the section's range ends there.
    Truncated { at: u32, error: DecodeError },
    /// No file range backs the memory range.
    Unbacked,
}

/// Listing text for one memory range.
#[derive(Debug, Clone)]
pub struct Section {
    pub range: Range,
    /// File offset of the backing file range.
    pub file_offset: Option<u32>,
    pub correction: u32,
    /// Odd start address as configured, when the range was moved down to the even one.
    pub realigned_from: Option<u32>,
    pub status: Status,
    pub text: String,
}

#[derive(Debug)]
pub struct Listing {
    pub sections: Vec<Section>,
    /// Present when the `structure` output option is on.
    pub structure: Option<CodeStructure>,
}

pub struct Disassembler<'a, D, B: ?Sized> {
    decoder: &'a D,
    bus: &'a B,
    layout: &'a Layout,
    symbols: &'a Symbols,
    options: OutputOptions,
}

impl<'a, D: Decoder, B: Bus + ?Sized> Disassembler<'a, D, B> {
    pub fn new(decoder: &'a D, bus: &'a B, layout: &'a Layout, symbols: &'a Symbols, options: OutputOptions) -> Self {
        Self { decoder, bus, layout, symbols, options }
    }

    fn notice(&self, text: &str) {
        if self.options.contains(OutputOptions::VERBOSE) {
            tracing::info!("{text}");
        } else {
            tracing::debug!("{text}");
        }
    }

    pub fn run(&self) -> Listing {
        for map in [&self.layout.file_map, &self.layout.mem_map, &self.layout.range_map] {
            for (a, b) in map.overlaps() {
                tracing::warn!(
                    "-{}: ranges {:#010x}-{:#010x} and {:#010x}-{:#010x} overlap, the first one wins",
                    map.option,
                    a.start,
                    a.end,
                    b.start,
                    b.end
                );
            }
        }

        let mut table = self.options.contains(OutputOptions::STRUCTURE).then(InstructionTable::new);
        let mut entries = BTreeMap::new();
        let mut sections = Vec::new();

        for range in self.layout.targets() {
            let Some(backing) = backing_range(&self.layout.file_map, &range) else {
                let text = format!("Skip 0x{:08X}-0x{:08X} as {}: no file mapping\n", range.start, range.end, range.content);
                self.notice(text.trim_end());
                sections.push(Section {
                    range,
                    file_offset: None,
                    correction: 0,
                    realigned_from: None,
                    status: Status::Unbacked,
                    text,
                });
                continue;
            };
            let correction = memory_file_offset(backing);
            let mut section = Section {
                text: format!(
                    "Disassemble 0x{:08X}-0x{:08X} (file 0x{:08X}) as {}\n\n",
                    range.start, range.end, backing.file_offset, range.content
                ),
                file_offset: Some(backing.file_offset),
                range,
                correction,
                realigned_from: None,
                status: Status::Decoded,
            };
            self.notice(section.text.trim_end());
            self.decode_range(&mut section, table.as_mut(), &mut entries);
            sections.push(section);
        }

        let structure = table.map(|table| {
            let structure = table.reconstruct(self.symbols, &entries);
            for section in &mut sections {
                if section.range.content.is_code() && section.status != Status::Unbacked {
                    let text = structure.render(&section.range, section.correction);
                    section.text.push_str(&text);
                }
            }
            let s = structure.summary();
            tracing::info!(
                instructions = s.instructions,
                labels = s.labels,
                functions = s.functions,
                returns = s.returns,
                "code structure"
            );
            structure
        });

        for section in &mut sections {
            if section.status != Status::Unbacked {
                section.text.push('\n');
            }
        }
        Listing { sections, structure }
    }

    fn decode_range(
        &self,
        section: &mut Section,
        mut table: Option<&mut InstructionTable>,
        entries: &mut BTreeMap<u32, String>,
    ) {
        let mut pc = section.range.start;
        if pc & 1 != 0 {
            tracing::error!("odd start address 0x{pc:08X}");
            section.realigned_from = Some(pc);
            pc -= 1;
            section.range.start = pc;
        }
        let end = section.range.end.saturating_add(section.range.end & 1);
        section.range.end = end;
        let cx = DecodeContext { bus: self.bus, symbols: self.symbols, origin: pc };
        let long = [DataTag::Long];
        let tags: &[DataTag] = match &section.range.content {
            Content::Data(tags) if !tags.is_empty() => tags,
            _ => &long,
        };

        while pc < end {
            let decoded = if section.range.content.is_code() {
                self.decoder.decode_code(&cx, pc).map(|rec| {
                    let size = rec.size_in_bytes;
                    match table.as_deref_mut() {
                        Some(t) => t.insert(rec),
                        None => emit(&mut section.text, &rec, section.correction),
                    }
                    size
                })
            } else {
                self.decoder.decode_data(&cx, pc, tags).map(|record| {
                    for item in &record.items {
                        emit(&mut section.text, item, section.correction);
                        declare_vector_entry(item, cx.origin, entries);
                    }
                    record.size_in_bytes
                })
            };
            match decoded {
                Ok(size) => match pc.checked_add(size as u32) {
                    Some(next) => pc = next,
                    None => break,
                },
                Err(error) => {
                    tracing::error!(
                        "range 0x{:08X}-0x{:08X} truncated at 0x{pc:08X}: {error}",
                        section.range.start,
                        section.range.end
                    );
                    section.range.end = pc.max(section.range.start);
                    section.status = Status::Truncated { at: pc, error };
                    return;
                }
            }
        }
    }
}

fn emit(text: &mut String, rec: &DecodedRecord, correction: u32) {
    let _ = writeln!(text, "{}{}", annotate(rec.address, correction), rec.rendered);
}

/// Non-zero vector targets become function entries named after their interrupt number.
fn declare_vector_entry(item: &DecodedRecord, origin: u32, entries: &mut BTreeMap<u32, String>) {
    let Some(cf) = item.control_flow else { return };
    let (FlowKind::Call, Some(target)) = (cf.kind, cf.target) else { return };
    if target == 0 {
        return;
    }
    let offset = item.address.wrapping_sub(origin);
    if offset <= VECTOR_TABLE_TOP {
        let n = (VECTOR_TABLE_TOP - offset) / 4;
        entries.entry(target).or_insert_with(|| format!("interrupt_0x{n:02X}_"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fr_rs::{FrDecoder, Image};

    fn layout(file: Range, mem: &[Range]) -> Layout {
        let mut layout = Layout::default();
        layout.file_map.insert(file);
        for r in mem {
            layout.mem_map.insert(r.clone());
        }
        layout
    }

    fn words(ws: &[u16]) -> Vec<u8> {
        ws.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    #[test]
    fn code_range_streams_in_address_order() {
        let image = Image::from_bytes(0x1000, words(&[0x9FA0, 0x9720]));
        let layout = layout(Range::new(0x1000, 0x1004).with_file_offset(0x1000), &[Range::new(0x1000, 0x1004)]);
        let dec = FrDecoder::new(OutputOptions::empty());
        let listing = Disassembler::new(&dec, &image, &layout, &Symbols::new(), OutputOptions::empty()).run();
        let s = &listing.sections[0];
        assert_eq!(s.status, Status::Decoded);
        assert_eq!(
            s.text,
            "Disassemble 0x00001000-0x00001004 (file 0x00001000) as CODE\n\n\
             00001000 NOP\n\
             00001002 RET\n\n"
        );
        assert!(listing.structure.is_none());
    }

    #[test]
    fn file_offset_column_when_memory_and_file_differ() {
        let image = Image::from_bytes(0x1000, words(&[0x9FA0]));
        let layout = layout(Range::new(0x1000, 0x2000).with_file_offset(0), &[Range::new(0x1000, 0x1002)]);
        let dec = FrDecoder::new(OutputOptions::empty());
        let listing = Disassembler::new(&dec, &image, &layout, &Symbols::new(), OutputOptions::empty()).run();
        assert!(listing.sections[0].text.contains("\n00001000 (00000000) NOP\n"));
    }

    #[test]
    fn odd_start_is_rounded_down() {
        let image = Image::from_bytes(0, words(&[0x9FA0, 0x9FA0]));
        let layout = layout(Range::new(0, 4), &[Range::new(1, 3)]);
        let dec = FrDecoder::new(OutputOptions::empty());
        let listing = Disassembler::new(&dec, &image, &layout, &Symbols::new(), OutputOptions::empty()).run();
        let s = &listing.sections[0];
        let lines: Vec<&str> = s.text.lines().filter(|l| l.ends_with("NOP")).collect();
        assert_eq!(lines, vec!["00000000 NOP", "00000002 NOP"]);
        assert_eq!(s.realigned_from, Some(1));
        assert_eq!((s.range.start, s.range.end), (0, 4));
    }

    #[test]
    fn odd_start_keeps_first_instruction_in_structure_mode() {
        let image = Image::from_bytes(0, words(&[0x9FA0, 0x9FA0, 0x9720]));
        let layout = layout(Range::new(0, 6), &[Range::new(1, 6)]);
        let options = OutputOptions::STRUCTURE;
        let dec = FrDecoder::new(options);
        let listing = Disassembler::new(&dec, &image, &layout, &Symbols::new(), options).run();
        let s = &listing.sections[0];
        assert_eq!(s.realigned_from, Some(1));
        let lines: Vec<&str> = s.text.lines().filter(|l| l.starts_with("0000")).collect();
        assert_eq!(lines, vec!["00000000 NOP", "00000002 NOP", "00000004 RET"]);
    }

    #[test]
    fn even_start_is_not_realigned() {
        let image = Image::from_bytes(0, words(&[0x9FA0]));
        let layout = layout(Range::new(0, 2), &[Range::new(0, 2)]);
        let dec = FrDecoder::new(OutputOptions::empty());
        let listing = Disassembler::new(&dec, &image, &layout, &Symbols::new(), OutputOptions::empty()).run();
        assert_eq!(listing.sections[0].realigned_from, None);
    }

    #[test]
    fn failure_truncates_only_its_range() {
        // LDI:32 at 4 needs two more words than the image holds
        let image = Image::from_bytes(0, words(&[0x9FA0, 0x9FA0, 0x9F84, 0x0001]));
        let layout = layout(
            Range::new(0, 0x10),
            &[Range::new(0, 4), Range::new(4, 0x10), Range::new(6, 0xA)],
        );
        let dec = FrDecoder::new(OutputOptions::empty());
        let listing = Disassembler::new(&dec, &image, &layout, &Symbols::new(), OutputOptions::empty()).run();
        assert_eq!(listing.sections.len(), 3);
        assert_eq!(listing.sections[0].status, Status::Decoded);
        assert_eq!(listing.sections[1].range.end, 4);
        assert_eq!(listing.sections[1].status, Status::Truncated { at: 4, error: DecodeError::OutOfImage { addr: 8 } });
        // the next range still decodes up to its own failure
        assert!(listing.sections[2].text.contains("00000006 LD"));
        assert_eq!(listing.sections[2].range.end, 8);
    }

    #[test]
    fn unbacked_range_is_skipped() {
        let image = Image::from_bytes(0, words(&[0x9FA0]));
        let layout = layout(Range::new(0, 2), &[Range::new(0x8000, 0x8010)]);
        let dec = FrDecoder::new(OutputOptions::empty());
        let listing = Disassembler::new(&dec, &image, &layout, &Symbols::new(), OutputOptions::empty()).run();
        assert_eq!(listing.sections[0].status, Status::Unbacked);
        assert_eq!(listing.sections[0].text, "Skip 0x00008000-0x00008010 as CODE: no file mapping\n");
    }

    #[test]
    fn vector_targets_become_named_functions() {
        // vector table at 0 whose last entry (interrupt 0x00) points at 0x400
        let mut bytes = vec![0u8; 0x400];
        bytes[0x3FC..].copy_from_slice(&0x400u32.to_be_bytes());
        bytes.extend(words(&[0x9FA0, 0x9720]));
        let image = Image::from_bytes(0, bytes);
        let vectors = Range::new(0, 0x400).with_content(Content::Data(vec![DataTag::Vector]));
        let layout = layout(Range::new(0, 0x404), &[vectors, Range::new(0x400, 0x404)]);
        let options = OutputOptions::STRUCTURE;
        let dec = FrDecoder::new(options);
        let listing = Disassembler::new(&dec, &image, &layout, &Symbols::new(), options).run();
        let structure = listing.structure.as_ref().unwrap();
        assert_eq!(structure.functions()[&0x400].name, "interrupt_0x00_");
        assert!(listing.sections[1].text.contains("; interrupt_0x00_  (00000400-00000404)"));
        assert!(listing.sections[0].text.contains("000003FC dl      0x00000400  ; interrupt 0x00"));
    }
}
