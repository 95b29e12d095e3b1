use std::path::{Path, PathBuf};

use fr_dfr::{disassemble, listing, Config, Invocation, Status};
use pretty_assertions::assert_eq;

/// CALL helper; NOP; RET; NOP; helper: NOP; RET
const FIRMWARE: [u16; 6] = [0xD003, 0x9FA0, 0x9720, 0x9FA0, 0x9FA0, 0x9720];

fn firmware(dir: &Path) -> PathBuf {
    let path = dir.join("fw.bin");
    let bytes: Vec<u8> = FIRMWARE.iter().flat_map(|w| w.to_be_bytes()).collect();
    std::fs::write(&path, bytes).unwrap();
    path
}

fn config(dir: &Path, args: &[&str]) -> Config {
    let input = firmware(dir);
    let input = input.to_str().unwrap();
    let invocation = Invocation::try_parse_from(["dfr", input].into_iter().chain(args.iter().copied())).unwrap();
    Config::from_cli(&invocation, dir).unwrap()
}

#[test]
fn structured_listing_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("fw.asm");
    let mut cfg = config(
        dir.path(),
        &[
            "-i", "0x40000-0x4000C=0",
            "-m", "0x40000-0x4000C=CODE",
            "-s", "0x40008=helper",
            "-w", "structure",
            "-o", out.to_str().unwrap(),
        ],
    );
    let result = disassemble(&mut cfg).unwrap();
    let summary = result.structure.as_ref().unwrap().summary();
    assert_eq!((summary.instructions, summary.functions, summary.returns), (6, 1, 2));

    let written = listing::write(&result, cfg.input.as_deref().unwrap(), cfg.output.as_deref(), cfg.split).unwrap();
    assert_eq!(written, vec![out.clone()]);
    let text = std::fs::read_to_string(&out).unwrap();
    let body: Vec<&str> = text.lines().skip_while(|l| !l.starts_with("Disassemble")).collect();
    assert_eq!(
        body,
        vec![
            "Disassemble 0x00040000-0x0004000C (file 0x00000000) as CODE",
            "",
            "00040000 (00000000) CALL    helper  ; 0x00040008",
            "00040002 (00000002) NOP",
            "00040004 (00000004) RET",
            "; --------------------------------------------------------------------------------",
            "00040006 (00000006) NOP",
            "",
            "; ********************************************************************************",
            "; helper  (00040008-0004000C)",
            "00040008 (00000008) NOP",
            "0004000A (0000000A) RET",
            "; --------------------------------------------------------------------------------",
            "",
        ]
    );
}

#[test]
fn whole_file_is_code_without_maps() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("plain.asm");
    let mut cfg = config(dir.path(), &["-o", out.to_str().unwrap(), "-w", "hexcode"]);
    let result = disassemble(&mut cfg).unwrap();
    assert_eq!(result.sections.len(), 1);
    assert_eq!(result.sections[0].status, Status::Decoded);
    let text = &result.sections[0].text;
    assert!(text.contains("00000000 D003           CALL    0x00000008\n"), "{text}");
    assert!(text.contains("0000000A 9720           RET\n"), "{text}");
}

#[test]
fn split_output_and_unbacked_ranges() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("fw.asm");
    let mut cfg = config(
        dir.path(),
        &[
            "-i", "0x40000,12=0",
            "-m", "0x40000-0x40006=CODE",
            "-m", "0x40006-0x4000C=DATA/2",
            "-m", "0x80000,0x10=CODE",
            "-r",
            "-o", out.to_str().unwrap(),
        ],
    );
    let result = disassemble(&mut cfg).unwrap();
    assert_eq!(result.sections[2].status, Status::Unbacked);
    let written = listing::write(&result, cfg.input.as_deref().unwrap(), cfg.output.as_deref(), cfg.split).unwrap();
    let names: Vec<String> =
        written.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
    assert_eq!(names, vec!["fw_00040000.asm", "fw_00040006.asm", "fw_00080000.asm"]);

    let data = std::fs::read_to_string(&written[1]).unwrap();
    assert!(data.starts_with("DFR "));
    assert!(data.contains("as DATA/W\n\n00040006 (00000006) dw      0x9FA0\n"), "{data}");
    let skipped = std::fs::read_to_string(&written[2]).unwrap();
    assert!(skipped.contains("Skip 0x00080000-0x00080010 as CODE: no file mapping"));
}

#[test]
fn selection_restricts_decoding() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), &["-m", "0-0xC=CODE", "-d", "0x8-0xC"]);
    let result = disassemble(&mut cfg).unwrap();
    let lines: Vec<&str> = result.sections[0].text.lines().filter(|l| l.starts_with("0000")).collect();
    assert_eq!(lines, vec!["00000008 NOP", "0000000A RET"]);
}
