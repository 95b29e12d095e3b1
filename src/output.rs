use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputOptions: u32 {
const STRUCTURE = 1 << 0; // label/function reconstruction before rendering
const REGISTER = 1 << 1; // AC/FP/SP instead of R13/R14/R15
const DOLLAR = 1 << 2; // $ hex prefix
const HEXCODE = 1 << 3; // raw instruction words column
const VERBOSE = 1 << 4;
const DEBUG = 1 << 5;
}
}

/// Flags selectable through `-w`, with their help text.
pub const WRITABLE: &[(&str, OutputOptions, &str)] = &[
    ("structure", OutputOptions::STRUCTURE, "analyse code structure and annotate labels, functions and returns"),
    ("register", OutputOptions::REGISTER, "use AC, FP and SP for R13, R14 and R15"),
    ("dollar", OutputOptions::DOLLAR, "print hexadecimal numbers as $1F instead of 0x1F"),
    ("hexcode", OutputOptions::HEXCODE, "show raw instruction words"),
];

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown output option \"{0}\"")]
pub struct UnknownOutputOption(pub String);

impl OutputOptions {
    /// Apply a comma-separated `-w` argument. A `no` prefix clears the flag.
    pub fn apply(&mut self, arg: &str) -> Result<(), UnknownOutputOption> {
        for word in arg.split(',').map(str::trim).filter(|w| !w.is_empty()) {
            let lower = word.to_ascii_lowercase();
            let (name, on) = match lower.strip_prefix("no") {
                Some(rest) if WRITABLE.iter().any(|(n, ..)| *n == rest) => (rest, false),
                _ => (lower.as_str(), true),
            };
            let (_, flag, _) = WRITABLE
                .iter()
                .find(|(n, ..)| *n == name)
                .ok_or_else(|| UnknownOutputOption(word.to_string()))?;
            self.set(*flag, on);
        }
        Ok(())
    }

    pub fn help() -> String {
        let mut s = String::from("Output options (-w name[,name...], prefix with \"no\" to clear):\n");
        for (name, _, text) in WRITABLE {
            s.push_str(&format!("  {name:<12}{text}\n"));
        }
        s
    }
}
