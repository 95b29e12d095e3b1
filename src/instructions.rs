/// Operand layout of an FR instruction. Field positions are relative to the first
/// instruction word: `i` is bits 3..0, `j` bits 7..4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    Implied,
    /// Unrecognized word, rendered as its own value.
    RawWord,
    RjRi,
    /// `#u4, Ri`
    U4Ri,
    /// `#-u4, Ri` with the 4-bit field extended with ones.
    N4Ri,
    /// Shift count of 16..31 (LSL2 and friends).
    Shift2Ri,
    /// `#u4, @Ri` bit operations.
    U4IndRi,
    /// `#i8, Ri`, 8-bit field in bits 11..4.
    I8Ri,
    /// `#i20, Ri`, high nibble in bits 7..4 plus one extension word.
    I20Ri,
    /// `#i32, Ri`, two extension words.
    I32Ri,
    IndRjRi,
    RiIndRj,
    IndR13RjRi,
    RiIndR13Rj,
    /// `Rj, @Ri` read-modify-write logic.
    RjIndRi,
    /// `@(R14, disp), Ri`, signed 8-bit field in bits 11..4 times `scale`.
    R14DispRi { scale: i32 },
    RiR14Disp { scale: i32 },
    /// `@(R15, udisp6), Ri`, 4-bit field times 4.
    R15DispRi,
    RiR15Disp,
    Ri,
    IndRi,
    PopRi,
    PushRi,
    PopRs,
    PushRs,
    PopPs,
    PushPs,
    /// `Rs, Ri` with the special register in bits 7..4.
    RsRi,
    RiRs,
    PsRi,
    RiPs,
    U8,
    /// `#u8` applied to the condition code register.
    Ccr,
    /// Frame size, 8-bit field times 4.
    Frame,
    /// Stack adjustment, signed 8-bit field times 4.
    AddSp,
    /// `@dir, R13`, 8-bit field times `scale`.
    DirR13 { scale: u32 },
    R13Dir { scale: u32 },
    /// 8-bit branch displacement in halfwords.
    Rel8,
    /// 11-bit call displacement in halfwords.
    Rel11,
    /// Register bitmap; `high` selects R8..R15, `reversed` is the STM bit order.
    RegList { high: bool, reversed: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Fallthrough,
    /// Conditional branch to a direct target.
    Branch,
    /// Unconditional branch or jump.
    Jump,
    Call,
    Return,
}

#[derive(Debug, Clone, Copy)]
pub struct OpcodeDesc {
    pub encoding: u16,
    pub mask: u16,
    pub mnemonic: &'static str,
    pub operands: Operands,
    /// 16-bit words following the opcode word.
    pub extra_words: u8,
    pub transfer: Transfer,
    pub delayed: bool,
}

impl OpcodeDesc {
    const fn new(encoding: u16, mask: u16, mnemonic: &'static str, operands: Operands) -> Self {
        Self { encoding, mask, mnemonic, operands, extra_words: 0, transfer: Transfer::Fallthrough, delayed: false }
    }

    const fn words(mut self, n: u8) -> Self {
        self.extra_words = n;
        self
    }

    const fn flow(mut self, t: Transfer) -> Self {
        self.transfer = t;
        self
    }

    const fn delayed(mut self) -> Self {
        self.delayed = true;
        self
    }

    pub fn matches(&self, word: u16) -> bool {
        word & self.mask == self.encoding
    }

    /// Instruction size in 16-bit units.
    pub fn units(&self) -> usize {
        1 + self.extra_words as usize
    }
}

/// Stand-in for words no descriptor claims.
pub const RAW_WORD: OpcodeDesc = OpcodeDesc::new(0x0000, 0x0000, "dw", Operands::RawWord);

const A: u16 = 0xFF00; // op8 j4 i4, op8 u4 i4, op8 u8
const B: u16 = 0xF000; // op4 x8 i4
const E: u16 = 0xFFF0; // op12 i4
const Z: u16 = 0xFFFF;
const F: u16 = 0xF800; // op5 rel11

use Operands::*;
use Transfer::*;

const fn bcc(cc: u16, mnemonic: &'static str) -> OpcodeDesc {
    let t = if cc == 0 { Jump } else { Branch };
    OpcodeDesc::new(0xE000 | (cc << 8), A, mnemonic, Rel8).flow(t)
}

const fn bcc_d(cc: u16, mnemonic: &'static str) -> OpcodeDesc {
    let t = if cc == 0 { Jump } else { Branch };
    OpcodeDesc::new(0xF000 | (cc << 8), A, mnemonic, Rel8).flow(t).delayed()
}

/// FR instruction descriptors; the first match for a word wins.
pub const TABLE: &[OpcodeDesc] = &[
    // loads and stores
    OpcodeDesc::new(0x0000, A, "LD", IndR13RjRi),
    OpcodeDesc::new(0x0100, A, "LDUH", IndR13RjRi),
    OpcodeDesc::new(0x0200, A, "LDUB", IndR13RjRi),
    OpcodeDesc::new(0x0300, A, "LD", R15DispRi),
    OpcodeDesc::new(0x0400, A, "LD", IndRjRi),
    OpcodeDesc::new(0x0500, A, "LDUH", IndRjRi),
    OpcodeDesc::new(0x0600, A, "LDUB", IndRjRi),
    OpcodeDesc::new(0x0700, E, "LD", PopRi),
    OpcodeDesc::new(0x0710, E, "MOV", RiPs),
    OpcodeDesc::new(0x0780, E, "LD", PopRs),
    OpcodeDesc::new(0x0790, Z, "LD", PopPs),
    OpcodeDesc::new(0x0800, A, "DMOV", DirR13 { scale: 4 }),
    OpcodeDesc::new(0x0900, A, "DMOVH", DirR13 { scale: 2 }),
    OpcodeDesc::new(0x0A00, A, "DMOVB", DirR13 { scale: 1 }),
    OpcodeDesc::new(0x0F00, A, "ENTER", Frame),
    OpcodeDesc::new(0x1000, A, "ST", RiIndR13Rj),
    OpcodeDesc::new(0x1100, A, "STH", RiIndR13Rj),
    OpcodeDesc::new(0x1200, A, "STB", RiIndR13Rj),
    OpcodeDesc::new(0x1300, A, "ST", RiR15Disp),
    OpcodeDesc::new(0x1400, A, "ST", RiIndRj),
    OpcodeDesc::new(0x1500, A, "STH", RiIndRj),
    OpcodeDesc::new(0x1600, A, "STB", RiIndRj),
    OpcodeDesc::new(0x1700, E, "ST", PushRi),
    OpcodeDesc::new(0x1710, E, "MOV", PsRi),
    OpcodeDesc::new(0x1780, E, "ST", PushRs),
    OpcodeDesc::new(0x1790, Z, "ST", PushPs),
    OpcodeDesc::new(0x1800, A, "DMOV", R13Dir { scale: 4 }),
    OpcodeDesc::new(0x1900, A, "DMOVH", R13Dir { scale: 2 }),
    OpcodeDesc::new(0x1A00, A, "DMOVB", R13Dir { scale: 1 }),
    OpcodeDesc::new(0x1F00, A, "INT", U8),
    OpcodeDesc::new(0x2000, B, "LD", R14DispRi { scale: 4 }),
    OpcodeDesc::new(0x3000, B, "ST", RiR14Disp { scale: 4 }),
    OpcodeDesc::new(0x4000, B, "LDUH", R14DispRi { scale: 2 }),
    OpcodeDesc::new(0x5000, B, "STH", RiR14Disp { scale: 2 }),
    OpcodeDesc::new(0x6000, B, "LDUB", R14DispRi { scale: 1 }),
    OpcodeDesc::new(0x7000, B, "STB", RiR14Disp { scale: 1 }),
    // logic and bit operations
    OpcodeDesc::new(0x8000, A, "BANDL", U4IndRi),
    OpcodeDesc::new(0x8100, A, "BANDH", U4IndRi),
    OpcodeDesc::new(0x8200, A, "AND", RjRi),
    OpcodeDesc::new(0x8300, A, "ANDCCR", Ccr),
    OpcodeDesc::new(0x8400, A, "AND", RjIndRi),
    OpcodeDesc::new(0x8500, A, "ANDH", RjIndRi),
    OpcodeDesc::new(0x8600, A, "ANDB", RjIndRi),
    OpcodeDesc::new(0x8700, A, "STILM", U8),
    OpcodeDesc::new(0x8800, A, "BTSTL", U4IndRi),
    OpcodeDesc::new(0x8900, A, "BTSTH", U4IndRi),
    OpcodeDesc::new(0x8A00, A, "XCHB", IndRjRi),
    OpcodeDesc::new(0x8B00, A, "MOV", RjRi),
    OpcodeDesc::new(0x8C00, A, "LDM0", RegList { high: false, reversed: false }),
    OpcodeDesc::new(0x8D00, A, "LDM1", RegList { high: true, reversed: false }),
    OpcodeDesc::new(0x8E00, A, "STM0", RegList { high: false, reversed: true }),
    OpcodeDesc::new(0x8F00, A, "STM1", RegList { high: true, reversed: true }),
    OpcodeDesc::new(0x9000, A, "BORL", U4IndRi),
    OpcodeDesc::new(0x9100, A, "BORH", U4IndRi),
    OpcodeDesc::new(0x9200, A, "OR", RjRi),
    OpcodeDesc::new(0x9300, A, "ORCCR", Ccr),
    OpcodeDesc::new(0x9400, A, "OR", RjIndRi),
    OpcodeDesc::new(0x9500, A, "ORH", RjIndRi),
    OpcodeDesc::new(0x9600, A, "ORB", RjIndRi),
    // 0x97 group
    OpcodeDesc::new(0x9700, E, "JMP", IndRi).flow(Jump),
    OpcodeDesc::new(0x9710, E, "CALL", IndRi).flow(Call),
    OpcodeDesc::new(0x9720, Z, "RET", Implied).flow(Return),
    OpcodeDesc::new(0x9730, Z, "RETI", Implied).flow(Return),
    OpcodeDesc::new(0x9740, E, "DIV0S", Ri),
    OpcodeDesc::new(0x9750, E, "DIV0U", Ri),
    OpcodeDesc::new(0x9760, E, "DIV1", Ri),
    OpcodeDesc::new(0x9770, E, "DIV2", Ri),
    OpcodeDesc::new(0x9780, E, "EXTSB", Ri),
    OpcodeDesc::new(0x9790, E, "EXTUB", Ri),
    OpcodeDesc::new(0x97A0, E, "EXTSH", Ri),
    OpcodeDesc::new(0x97B0, E, "EXTUH", Ri),
    OpcodeDesc::new(0x9800, A, "BEORL", U4IndRi),
    OpcodeDesc::new(0x9900, A, "BEORH", U4IndRi),
    OpcodeDesc::new(0x9A00, A, "EOR", RjRi),
    OpcodeDesc::new(0x9B00, A, "LDI:20", I20Ri).words(1),
    OpcodeDesc::new(0x9C00, A, "EOR", RjIndRi),
    OpcodeDesc::new(0x9D00, A, "EORH", RjIndRi),
    OpcodeDesc::new(0x9E00, A, "EORB", RjIndRi),
    // 0x9F group
    OpcodeDesc::new(0x9F00, E, "JMP:D", IndRi).flow(Jump).delayed(),
    OpcodeDesc::new(0x9F10, E, "CALL:D", IndRi).flow(Call).delayed(),
    OpcodeDesc::new(0x9F20, Z, "RET:D", Implied).flow(Return).delayed(),
    OpcodeDesc::new(0x9F30, Z, "INTE", Implied),
    OpcodeDesc::new(0x9F60, Z, "DIV3", Implied),
    OpcodeDesc::new(0x9F70, Z, "DIV4S", Implied),
    OpcodeDesc::new(0x9F80, E, "LDI:32", I32Ri).words(2),
    OpcodeDesc::new(0x9F90, Z, "LEAVE", Implied),
    OpcodeDesc::new(0x9FA0, Z, "NOP", Implied),
    // arithmetic
    OpcodeDesc::new(0xA000, A, "ADDN", U4Ri),
    OpcodeDesc::new(0xA100, A, "ADDN2", N4Ri),
    OpcodeDesc::new(0xA200, A, "ADDN", RjRi),
    OpcodeDesc::new(0xA300, A, "ADDSP", AddSp),
    OpcodeDesc::new(0xA400, A, "ADD", U4Ri),
    OpcodeDesc::new(0xA500, A, "ADD2", N4Ri),
    OpcodeDesc::new(0xA600, A, "ADD", RjRi),
    OpcodeDesc::new(0xA700, A, "ADDC", RjRi),
    OpcodeDesc::new(0xA800, A, "CMP", U4Ri),
    OpcodeDesc::new(0xA900, A, "CMP2", N4Ri),
    OpcodeDesc::new(0xAA00, A, "CMP", RjRi),
    OpcodeDesc::new(0xAB00, A, "MULU", RjRi),
    OpcodeDesc::new(0xAC00, A, "SUB", RjRi),
    OpcodeDesc::new(0xAD00, A, "SUBC", RjRi),
    OpcodeDesc::new(0xAE00, A, "SUBN", RjRi),
    OpcodeDesc::new(0xAF00, A, "MUL", RjRi),
    // shifts and special moves
    OpcodeDesc::new(0xB000, A, "LSR", U4Ri),
    OpcodeDesc::new(0xB100, A, "LSR2", Shift2Ri),
    OpcodeDesc::new(0xB200, A, "LSR", RjRi),
    OpcodeDesc::new(0xB300, A, "MOV", RiRs),
    OpcodeDesc::new(0xB400, A, "LSL", U4Ri),
    OpcodeDesc::new(0xB500, A, "LSL2", Shift2Ri),
    OpcodeDesc::new(0xB600, A, "LSL", RjRi),
    OpcodeDesc::new(0xB700, A, "MOV", RsRi),
    OpcodeDesc::new(0xB800, A, "ASR", U4Ri),
    OpcodeDesc::new(0xB900, A, "ASR2", Shift2Ri),
    OpcodeDesc::new(0xBA00, A, "ASR", RjRi),
    OpcodeDesc::new(0xBB00, A, "MULUH", RjRi),
    OpcodeDesc::new(0xBF00, A, "MULH", RjRi),
    OpcodeDesc::new(0xC000, B, "LDI:8", I8Ri),
    // calls
    OpcodeDesc::new(0xD000, F, "CALL", Rel11).flow(Call),
    OpcodeDesc::new(0xD800, F, "CALL:D", Rel11).flow(Call).delayed(),
    // branches
    bcc(0x0, "BRA"),
    bcc(0x1, "BNO"),
    bcc(0x2, "BEQ"),
    bcc(0x3, "BNE"),
    bcc(0x4, "BC"),
    bcc(0x5, "BNC"),
    bcc(0x6, "BN"),
    bcc(0x7, "BP"),
    bcc(0x8, "BV"),
    bcc(0x9, "BNV"),
    bcc(0xA, "BLT"),
    bcc(0xB, "BGE"),
    bcc(0xC, "BLE"),
    bcc(0xD, "BGT"),
    bcc(0xE, "BLS"),
    bcc(0xF, "BHI"),
    bcc_d(0x0, "BRA:D"),
    bcc_d(0x1, "BNO:D"),
    bcc_d(0x2, "BEQ:D"),
    bcc_d(0x3, "BNE:D"),
    bcc_d(0x4, "BC:D"),
    bcc_d(0x5, "BNC:D"),
    bcc_d(0x6, "BN:D"),
    bcc_d(0x7, "BP:D"),
    bcc_d(0x8, "BV:D"),
    bcc_d(0x9, "BNV:D"),
    bcc_d(0xA, "BLT:D"),
    bcc_d(0xB, "BGE:D"),
    bcc_d(0xC, "BLE:D"),
    bcc_d(0xD, "BGT:D"),
    bcc_d(0xE, "BLS:D"),
    bcc_d(0xF, "BHI:D"),
];
