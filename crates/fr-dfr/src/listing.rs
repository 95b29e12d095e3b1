//! Writing sections to `.asm` files.

use std::path::{Path, PathBuf};

use crate::engine::{Listing, Section};

pub const EXTENSION: &str = "asm";

pub fn header(input: &Path, output: Option<&Path>) -> String {
    let output = output.map_or_else(|| "(default)".to_string(), |p| p.display().to_string());
    format!("DFR {}\n  Input:  {}\n  Output: {output}\n\n", env!("CARGO_PKG_VERSION"), input.display())
}

/// `-o` when given, else the input's base name with the listing extension, in the
/// working directory.
pub fn output_path(input: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(p) => p.to_path_buf(),
        None => {
            let stem = input.file_stem().map_or_else(|| "dfr".into(), |s| s.to_string_lossy().into_owned());
            PathBuf::from(format!("{stem}.{EXTENSION}"))
        }
    }
}

/// File for one section under `-r`: `<base>_<START>.asm` next to `base`.
pub fn split_path(base: &Path, start: u32) -> PathBuf {
    let stem = base.file_stem().map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    base.with_file_name(format!("{stem}_{start:08X}.{EXTENSION}"))
}

/// Write the listing and return the files written.
pub fn write(listing: &Listing, input: &Path, output: Option<&Path>, split: bool) -> std::io::Result<Vec<PathBuf>> {
    let base = output_path(input, output);
    let head = header(input, output);
    if !split {
        let mut text = head;
        listing.sections.iter().for_each(|s| text.push_str(&s.text));
        std::fs::write(&base, text)?;
        return Ok(vec![base]);
    }
    let mut written = Vec::with_capacity(listing.sections.len());
    for Section { range, text, .. } in &listing.sections {
        let path = split_path(&base, range.start);
        std::fs::write(&path, format!("{head}{text}"))?;
        written.push(path);
    }
    Ok(written)
}
