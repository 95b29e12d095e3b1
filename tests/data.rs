mod common;

use common::image;
use fr_rs::decoder::{DataTag, DecodeContext, DecodeError, Decoder};
use fr_rs::{FlowKind, FrDecoder, Image, OutputOptions, Symbols};
use pretty_assertions::assert_eq;

fn decode(img: &Image, origin: u32, pc: u32, tags: &[DataTag], symbols: &Symbols) -> Result<Vec<String>, DecodeError> {
    let cx = DecodeContext { bus: img, symbols, origin };
    let rec = FrDecoder::new(OutputOptions::empty()).decode_data(&cx, pc, tags)?;
    Ok(rec.items.into_iter().map(|r| r.rendered).collect())
}

#[test]
fn one_record_is_one_pass_over_the_tags() {
    let img = image(0x100, &[0x0004, 0x0000, 0x1234, 0x4142]);
    let cx = DecodeContext { bus: &img, symbols: &Symbols::new(), origin: 0x100 };
    let rec = FrDecoder::new(OutputOptions::empty())
        .decode_data(&cx, 0x100, &[DataTag::Long, DataTag::Word, DataTag::Byte])
        .unwrap();
    assert_eq!(rec.size_in_bytes, 8);
    let addrs: Vec<u32> = rec.items.iter().map(|r| r.address).collect();
    assert_eq!(addrs, vec![0x100, 0x104, 0x106]);
    let text: Vec<&str> = rec.items.iter().map(|r| r.rendered.as_str()).collect();
    assert_eq!(text, vec!["dl      0x00040000", "dw      0x1234", "db      0x41, 0x42"]);
    assert!(rec.items.iter().all(|r| !r.is_code));
}

#[test]
fn strings_are_padded_to_whole_words() {
    let img = Image::from_bytes(0x200, b"Hi\0xHey\0\n\0".to_vec());
    let symbols = Symbols::new();
    let cx = DecodeContext { bus: &img, symbols: &symbols, origin: 0x200 };
    let dec = FrDecoder::new(OutputOptions::empty());
    let a = dec.decode_data(&cx, 0x200, &[DataTag::Str]).unwrap();
    assert_eq!(a.size_in_bytes, 4);
    assert_eq!(a.items[0].rendered, "ds      \"Hi\"");
    let b = dec.decode_data(&cx, 0x204, &[DataTag::Str]).unwrap();
    assert_eq!(b.size_in_bytes, 4);
    assert_eq!(b.items[0].rendered, "ds      \"Hey\"");
    let c = dec.decode_data(&cx, 0x208, &[DataTag::Str]).unwrap();
    assert_eq!(c.items[0].rendered, "ds      \"\\n\"");
}

#[test]
fn unterminated_string_fails() {
    let img = Image::from_bytes(0x200, b"abcd".to_vec());
    let err = decode(&img, 0x200, 0x200, &[DataTag::Str], &Symbols::new()).unwrap_err();
    assert_eq!(err, DecodeError::UnterminatedString { addr: 0x200 });
}

#[test]
fn vector_entries_name_their_interrupt_and_target() {
    let mut words = vec![0u16; 0x200];
    words[0] = 0x0004;
    words[1] = 0x0100;
    words[0x1FE] = 0x0004;
    words[0x1FF] = 0x0000;
    let img = image(0x000F_FC00, &words);
    let mut symbols = Symbols::new();
    symbols.insert(0x0004_0000, "reset".into());
    let first = decode(&img, 0x000F_FC00, 0x000F_FC00, &[DataTag::Vector], &symbols).unwrap();
    assert_eq!(first, vec!["dl      0x00040100  ; interrupt 0xFF"]);
    let last = decode(&img, 0x000F_FC00, 0x000F_FFFC, &[DataTag::Vector], &symbols).unwrap();
    assert_eq!(last, vec!["dl      reset  ; interrupt 0x00 0x00040000"]);

    let cx = DecodeContext { bus: &img, symbols: &symbols, origin: 0x000F_FC00 };
    let rec = FrDecoder::new(OutputOptions::empty()).decode_data(&cx, 0x000F_FC00, &[DataTag::Vector]).unwrap();
    let cf = rec.items[0].control_flow.unwrap();
    assert_eq!(cf.kind, FlowKind::Call);
    assert_eq!(cf.target, Some(0x0004_0100));
}
