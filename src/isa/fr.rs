use crate::decoder::{
    negative_extend, sign_extend, ControlFlow, DataRecord, DataTag, DecodeContext, DecodeError, Decoded,
    DecodedRecord, Decoder, FlowKind,
};
use crate::disasm::Syntax;
use crate::instructions::{OpcodeDesc, Operands, RAW_WORD, TABLE};
use crate::memory::Bus;
use crate::output::OutputOptions;

/// Vector table layout: entries count down from TBR + 0x3FC.
pub const VECTOR_TABLE_TOP: u32 = 0x3FC;

/// `TABLE` resolved for every possible first instruction word.
pub struct OpcodeTable {
    index: Box<[Option<u16>]>,
}

impl OpcodeTable {
    pub fn new() -> Self {
        let mut index = vec![None; 0x1_0000].into_boxed_slice();
        for (n, desc) in TABLE.iter().enumerate() {
            for word in 0..=u16::MAX {
                let slot = &mut index[word as usize];
                if slot.is_none() && desc.matches(word) {
                    *slot = Some(n as u16);
                }
            }
        }
        let claimed = index.iter().filter(|s| s.is_some()).count();
        tracing::debug!(descriptors = TABLE.len(), claimed, "opcode table built");
        Self { index }
    }

    pub fn lookup(&self, word: u16) -> Option<&'static OpcodeDesc> {
        self.index[word as usize].map(|n| &TABLE[n as usize])
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull the operand fields described by `desc` out of `words`.
pub fn extract(desc: &'static OpcodeDesc, words: &[u16], pc: u32) -> Decoded {
    let w = words[0] as u32;
    let i = (w & 0xF) as u8;
    let j = ((w >> 4) & 0xF) as u8;
    let u4 = (w >> 4) & 0xF;
    let x8 = (w >> 4) & 0xFF;
    let u8_ = w & 0xFF;
    let next = pc.wrapping_add(2);
    let mut d = Decoded { desc, pc, i, j, imm: 0, target: None };
    match desc.operands {
        Operands::U4Ri | Operands::U4IndRi => d.imm = u4 as i32,
        Operands::N4Ri => d.imm = negative_extend(4, u4),
        Operands::Shift2Ri => d.imm = u4 as i32 + 16,
        Operands::I8Ri => d.imm = x8 as i32,
        Operands::I20Ri => d.imm = ((u4 << 16) | words[1] as u32) as i32,
        Operands::I32Ri => d.imm = (((words[1] as u32) << 16) | words[2] as u32) as i32,
        Operands::R14DispRi { scale } | Operands::RiR14Disp { scale } => d.imm = sign_extend(8, x8) * scale,
        Operands::R15DispRi | Operands::RiR15Disp => d.imm = (u4 * 4) as i32,
        Operands::U8 | Operands::Ccr | Operands::RegList { .. } => d.imm = u8_ as i32,
        Operands::Frame => d.imm = (u8_ * 4) as i32,
        Operands::AddSp => d.imm = sign_extend(8, u8_) * 4,
        Operands::DirR13 { scale } | Operands::R13Dir { scale } => d.imm = (u8_ * scale) as i32,
        Operands::Rel8 => d.target = Some(next.wrapping_add((sign_extend(8, u8_) * 2) as u32)),
        Operands::Rel11 => d.target = Some(next.wrapping_add((sign_extend(11, w & 0x7FF) * 2) as u32)),
        _ => {}
    }
    d
}

/// Table-driven FR decoder. Built once per run and shared by reference.
pub struct FrDecoder {
    table: OpcodeTable,
    syntax: Syntax,
}

impl FrDecoder {
    pub fn new(options: OutputOptions) -> Self {
        Self { table: OpcodeTable::new(), syntax: Syntax::new(options) }
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    fn fetch<B: Bus + ?Sized>(bus: &B, addr: u32) -> Result<u16, DecodeError> {
        bus.read_u16(addr).ok_or(DecodeError::OutOfImage { addr })
    }

    fn decode_datum<B: Bus + ?Sized>(
        &self,
        cx: &DecodeContext<'_, B>,
        pc: u32,
        tag: DataTag,
    ) -> Result<DecodedRecord, DecodeError> {
        let s = &self.syntax;
        let mut control_flow = None;
        let (words, rendered) = match tag {
            DataTag::Long | DataTag::Vector => {
                let hi = Self::fetch(cx.bus, pc)?;
                let lo = Self::fetch(cx.bus, pc.wrapping_add(2))?;
                let value = ((hi as u32) << 16) | lo as u32;
                let (v, mut comment) = s.address(value, cx.symbols);
                if tag == DataTag::Vector {
                    let offset = pc.wrapping_sub(cx.origin);
                    if offset <= VECTOR_TABLE_TOP {
                        let n = (VECTOR_TABLE_TOP - offset) / 4;
                        comment = Some(match comment {
                            Some(c) => format!("interrupt {} {c}", s.hex_width(n, 2)),
                            None => format!("interrupt {}", s.hex_width(n, 2)),
                        });
                    }
                    control_flow = Some(ControlFlow { kind: FlowKind::Call, target: Some(value), unconditional: false, delayed: false });
                }
                let words = vec![hi, lo];
                let text = s.line(&words, "dl", &v, comment.as_deref());
                (words, text)
            }
            DataTag::Word => {
                let w = Self::fetch(cx.bus, pc)?;
                (vec![w], s.line(&[w], "dw", &s.hex_width(w as u32, 4), None))
            }
            DataTag::Byte => {
                let w = Self::fetch(cx.bus, pc)?;
                let ops = format!("{}, {}", s.hex_width((w >> 8) as u32, 2), s.hex_width((w & 0xFF) as u32, 2));
                (vec![w], s.line(&[w], "db", &ops, None))
            }
            DataTag::Str => {
                let mut bytes = Vec::new();
                loop {
                    let addr = pc.wrapping_add(bytes.len() as u32);
                    let b = cx.bus.read_u8(addr).ok_or(DecodeError::UnterminatedString { addr: pc })?;
                    bytes.push(b);
                    if b == 0 {
                        break;
                    }
                }
                if bytes.len() % 2 == 1 {
                    bytes.push(cx.bus.read_u8(pc.wrapping_add(bytes.len() as u32)).unwrap_or(0));
                }
                let words: Vec<u16> = bytes.chunks(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
                let text: String = bytes
                    .iter()
                    .take_while(|&&b| b != 0)
                    .flat_map(|&b| std::ascii::escape_default(b))
                    .map(char::from)
                    .collect();
                let rendered = s.line(&words, "ds", &format!("\"{text}\""), None);
                (words, rendered)
            }
        };
        Ok(DecodedRecord {
            address: pc,
            size_in_bytes: words.len() * 2,
            raw_words: words,
            rendered,
            is_code: false,
            control_flow,
        })
    }
}

impl Decoder for FrDecoder {
    fn decode_code<B: Bus + ?Sized>(&self, cx: &DecodeContext<'_, B>, pc: u32) -> Result<DecodedRecord, DecodeError> {
        let first = Self::fetch(cx.bus, pc)?;
        let desc = self.table.lookup(first).unwrap_or(&RAW_WORD);
        let mut words = Vec::with_capacity(desc.units());
        words.push(first);
        for k in 1..desc.units() {
            words.push(Self::fetch(cx.bus, pc.wrapping_add(2 * k as u32))?);
        }
        let d = extract(desc, &words, pc);
        Ok(DecodedRecord {
            address: pc,
            size_in_bytes: desc.units() * 2,
            rendered: self.syntax.fmt_decoded(&d, &words, cx.symbols),
            raw_words: words,
            is_code: true,
            control_flow: d.control_flow(),
        })
    }

    fn decode_data<B: Bus + ?Sized>(
        &self,
        cx: &DecodeContext<'_, B>,
        pc: u32,
        tags: &[DataTag],
    ) -> Result<DataRecord, DecodeError> {
        let mut items = Vec::with_capacity(tags.len());
        let mut cursor = pc;
        for &tag in tags {
            let item = self.decode_datum(cx, cursor, tag)?;
            cursor = item.end();
            items.push(item);
        }
        let size_in_bytes = items.iter().map(|r| r.size_in_bytes).sum();
        Ok(DataRecord { items, size_in_bytes })
    }
}
