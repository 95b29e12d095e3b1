//! Range expressions used by the `-d`, `-i`, `-m`, `-s` and `-t` options.
//!
//! ```text
//! Number     := decimal | "0x" hex, optionally followed by K (*1024) or M (*1024*1024)
//! Range      := Number "-" Number | Number "," Length
//! TypeTag    := "CODE" | "DATA" ["/" width] [":V"]
//! TypedRange := Range "=" TypeTag
//! FileRange  := Range "=" Number
//! SymbolDecl := Number "=" Name
//! ```

use fr_rs::{Content, DataTag};

use crate::model::Range;

/// Size of the interrupt vector table declared by `-t`.
pub const VECTOR_LENGTH: u32 = 0x400;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("-{option}: {reason}: \"{token}\"")]
pub struct ParsingError {
    pub option: char,
    pub token: String,
    pub reason: &'static str,
}

fn fail<T>(option: char, token: &str, reason: &'static str) -> Result<T, ParsingError> {
    Err(ParsingError { option, token: token.to_string(), reason })
}

pub fn parse_number(option: char, token: &str) -> Result<u32, ParsingError> {
    let t = token.trim();
    let (digits, scale) = match t.as_bytes().last() {
        Some(b'K' | b'k') => (&t[..t.len() - 1], 1024u32),
        Some(b'M' | b'm') => (&t[..t.len() - 1], 1024 * 1024),
        _ => (t, 1),
    };
    let value = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => digits.parse::<u32>(),
    };
    match value {
        Ok(v) => v.checked_mul(scale).map_or_else(|| fail(option, token, "number out of range"), Ok),
        Err(_) => fail(option, token, "malformed number"),
    }
}

pub fn parse_range(option: char, token: &str) -> Result<Range, ParsingError> {
    let Some(split) = token.find(&['-', ','][..]) else {
        return fail(option, token, "expected start-end or start,length");
    };
    let start = parse_number(option, &token[..split])?;
    let second = parse_number(option, &token[split + 1..])?;
    let end = if token.as_bytes()[split] == b',' {
        match start.checked_add(second) {
            Some(end) => end,
            None => return fail(option, token, "range runs past the end of the address space"),
        }
    } else {
        second
    };
    if end < start {
        return fail(option, token, "range ends before it starts");
    }
    Ok(Range::new(start, end))
}

pub fn parse_type(option: char, token: &str) -> Result<Content, ParsingError> {
    let t = token.trim().to_ascii_uppercase();
    if t == "CODE" {
        return Ok(Content::Code);
    }
    let Some(mut rest) = t.strip_prefix("DATA") else {
        return fail(option, token, "unknown memory type");
    };
    let vector = match rest.strip_suffix(":V") {
        Some(r) => {
            rest = r;
            true
        }
        None => false,
    };
    let mut tags = match rest.strip_prefix('/') {
        None if rest.is_empty() => vec![DataTag::Long],
        None => return fail(option, token, "unknown memory type"),
        Some("4") => vec![DataTag::Long],
        Some("2") => vec![DataTag::Word],
        Some("1") => vec![DataTag::Byte],
        Some(letters) if !letters.is_empty() => {
            let mut tags = Vec::with_capacity(letters.len());
            for c in letters.chars() {
                tags.push(match c {
                    'L' => DataTag::Long,
                    'W' => DataTag::Word,
                    'B' => DataTag::Byte,
                    'S' => DataTag::Str,
                    'V' => DataTag::Vector,
                    _ => return fail(option, token, "unknown data width"),
                });
            }
            tags
        }
        Some(_) => return fail(option, token, "missing data width"),
    };
    if vector {
        tags = vec![DataTag::Vector];
    }
    Ok(Content::Data(tags))
}

fn split_assignment<'a>(option: char, arg: &'a str) -> Result<(&'a str, &'a str), ParsingError> {
    match arg.split_once('=') {
        Some((l, r)) if !l.trim().is_empty() && !r.trim().is_empty() => Ok((l.trim(), r.trim())),
        _ => fail(option, arg, "expected left=right"),
    }
}

/// `range=TYPE`, for `-m`.
pub fn parse_type_range(option: char, arg: &str) -> Result<Range, ParsingError> {
    let (range, kind) = split_assignment(option, arg)?;
    Ok(parse_range(option, range)?.with_content(parse_type(option, kind)?))
}

/// `range=offset`, for `-i` and `-f`.
pub fn parse_offset_range(option: char, arg: &str) -> Result<Range, ParsingError> {
    let (range, offset) = split_assignment(option, arg)?;
    Ok(parse_range(option, range)?.with_file_offset(parse_number(option, offset)?))
}

/// `address=name`, for `-s` and `-e`.
pub fn parse_symbol(option: char, arg: &str) -> Result<(u32, String), ParsingError> {
    let (addr, name) = split_assignment(option, arg)?;
    if name.chars().any(char::is_whitespace) {
        return fail(option, arg, "symbol names cannot contain spaces");
    }
    Ok((parse_number(option, addr)?, name.to_string()))
}

/// `-t address`: a vector table of `VECTOR_LENGTH` bytes.
pub fn parse_vector_table(option: char, arg: &str) -> Result<Range, ParsingError> {
    parse_type_range(option, &format!("{},{VECTOR_LENGTH:#x}=DATA:V", arg.trim()))
}

pub fn memory_types_help() -> String {
    [
        "Memory types (-m range=type):",
        "  CODE        instructions",
        "  DATA        32-bit values (same as DATA/L)",
        "  DATA/w      one record per pass over w, a sequence of:",
        "                L  32-bit value      W  16-bit value",
        "                B  pair of bytes     S  NUL-terminated string",
        "              or a single width in bytes: 4, 2 or 1",
        "  DATA:V      interrupt vector table entries",
        "",
    ]
    .join("\n")
}
