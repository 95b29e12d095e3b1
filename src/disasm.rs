use std::fmt::Write as _;

use crate::decoder::{Decoded, Symbols};
use crate::instructions::Operands;
use crate::output::OutputOptions;

const SPECIAL: [&str; 6] = ["TBR", "RP", "SSP", "USP", "MDH", "MDL"];

/// Text conventions chosen once from the output options.
#[derive(Debug, Clone, Copy)]
pub struct Syntax {
    options: OutputOptions,
}

impl Syntax {
    pub fn new(options: OutputOptions) -> Self {
        Self { options }
    }

    fn prefix(&self) -> &'static str {
        if self.options.contains(OutputOptions::DOLLAR) { "$" } else { "0x" }
    }

    pub fn hex(&self, v: u32) -> String {
        format!("{}{:X}", self.prefix(), v)
    }

    pub fn hex_width(&self, v: u32, digits: usize) -> String {
        format!("{}{:0digits$X}", self.prefix(), v)
    }

    fn signed(&self, v: i32) -> String {
        if v < 0 { format!("-{}", self.hex(v.unsigned_abs())) } else { self.hex(v as u32) }
    }

    pub fn reg(&self, r: u8) -> String {
        if self.options.contains(OutputOptions::REGISTER) {
            match r {
                13 => return "AC".into(),
                14 => return "FP".into(),
                15 => return "SP".into(),
                _ => {}
            }
        }
        format!("R{r}")
    }

    fn special(&self, r: u8) -> String {
        SPECIAL.get(r as usize).map(|s| s.to_string()).unwrap_or_else(|| format!("RS{r}"))
    }

    /// A code or data address, substituted by its symbol when one is declared.
    /// Returns the operand text and, on substitution, the numeric value as a comment.
    pub fn address(&self, addr: u32, symbols: &Symbols) -> (String, Option<String>) {
        match symbols.get(&addr) {
            Some(name) => (name.clone(), Some(self.hex_width(addr, 8))),
            None => (self.hex_width(addr, 8), None),
        }
    }

    fn reg_list(&self, bits: u8, high: bool, reversed: bool) -> String {
        let base = if high { 8 } else { 0 };
        let regs: Vec<String> = (0..8u8)
            .filter(|b| bits & (1 << b) != 0)
            .map(|b| if reversed { base + 7 - b } else { base + b })
            .map(|r| self.reg(r))
            .collect();
        format!("({})", regs.join(", "))
    }

    /// Mnemonic, operands and comment of one instruction, without the address column.
    pub fn fmt_decoded(&self, d: &Decoded, words: &[u16], symbols: &Symbols) -> String {
        let ri = self.reg(d.i);
        let rj = self.reg(d.j);
        let mut comment = None;
        let ops = match d.desc.operands {
            Operands::Implied => String::new(),
            Operands::RawWord => self.hex_width(words[0] as u32, 4),
            Operands::RjRi => format!("{rj}, {ri}"),
            Operands::U4Ri | Operands::N4Ri | Operands::Shift2Ri | Operands::I8Ri => {
                format!("#{}, {ri}", self.signed(d.imm))
            }
            Operands::U4IndRi => format!("#{}, @{ri}", self.hex(d.imm as u32)),
            Operands::I20Ri | Operands::I32Ri => {
                let (v, c) = self.address(d.imm as u32, symbols);
                comment = c;
                format!("#{v}, {ri}")
            }
            Operands::IndRjRi => format!("@{rj}, {ri}"),
            Operands::RiIndRj => format!("{ri}, @{rj}"),
            Operands::RjIndRi => format!("{rj}, @{ri}"),
            Operands::IndR13RjRi => format!("@({}, {rj}), {ri}", self.reg(13)),
            Operands::RiIndR13Rj => format!("{ri}, @({}, {rj})", self.reg(13)),
            Operands::R14DispRi { .. } => format!("@({}, {}), {ri}", self.reg(14), self.signed(d.imm)),
            Operands::RiR14Disp { .. } => format!("{ri}, @({}, {})", self.reg(14), self.signed(d.imm)),
            Operands::R15DispRi => format!("@({}, {}), {ri}", self.reg(15), self.hex(d.imm as u32)),
            Operands::RiR15Disp => format!("{ri}, @({}, {})", self.reg(15), self.hex(d.imm as u32)),
            Operands::Ri => ri,
            Operands::IndRi => format!("@{ri}"),
            Operands::PopRi => format!("@{}+, {ri}", self.reg(15)),
            Operands::PushRi => format!("{ri}, @-{}", self.reg(15)),
            Operands::PopRs => format!("@{}+, {}", self.reg(15), self.special(d.i)),
            Operands::PushRs => format!("{}, @-{}", self.special(d.i), self.reg(15)),
            Operands::PopPs => format!("@{}+, PS", self.reg(15)),
            Operands::PushPs => format!("PS, @-{}", self.reg(15)),
            Operands::RsRi => format!("{}, {ri}", self.special(d.j)),
            Operands::RiRs => format!("{ri}, {}", self.special(d.j)),
            Operands::PsRi => format!("PS, {ri}"),
            Operands::RiPs => format!("{ri}, PS"),
            Operands::U8 | Operands::Ccr | Operands::Frame => format!("#{}", self.hex(d.imm as u32)),
            Operands::AddSp => format!("#{}", self.signed(d.imm)),
            Operands::DirR13 { .. } => format!("@{}, {}", self.hex(d.imm as u32), self.reg(13)),
            Operands::R13Dir { .. } => format!("{}, @{}", self.reg(13), self.hex(d.imm as u32)),
            Operands::Rel8 | Operands::Rel11 => {
                let (v, c) = self.address(d.target.unwrap_or_default(), symbols);
                comment = c;
                v
            }
            Operands::RegList { high, reversed } => self.reg_list(d.imm as u8, high, reversed),
        };
        self.line(words, d.desc.mnemonic, &ops, comment.as_deref())
    }

    /// Assemble one listing line.
    pub fn line(&self, words: &[u16], mnemonic: &str, operands: &str, comment: Option<&str>) -> String {
        let mut s = String::new();
        if self.options.contains(OutputOptions::HEXCODE) {
            // long strings only show their first words
            for w in words.iter().take(3) {
                let _ = write!(s, "{w:04X} ");
            }
            while s.len() < 15 {
                s.push(' ');
            }
        }
        if operands.is_empty() {
            s.push_str(mnemonic);
        } else {
            let _ = write!(s, "{mnemonic:<8}{operands}");
        }
        if let Some(c) = comment {
            let _ = write!(s, "  ; {c}");
        }
        s
    }
}
