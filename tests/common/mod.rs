#![allow(dead_code)]

use fr_rs::decoder::{DecodeContext, DecodedRecord, Decoder, Symbols};
use fr_rs::{FrDecoder, Image, OutputOptions};

pub const BASE: u32 = 0x0004_0000;

pub fn image(base: u32, words: &[u16]) -> Image {
    Image::from_bytes(base, words.iter().flat_map(|w| w.to_be_bytes()).collect())
}

/// Decode `words` placed at `BASE` as straight-line code.
pub fn decode_all(words: &[u16], options: OutputOptions, symbols: &Symbols) -> Vec<DecodedRecord> {
    let img = image(BASE, words);
    let cx = DecodeContext { bus: &img, symbols, origin: BASE };
    let dec = FrDecoder::new(options);
    let end = BASE + 2 * words.len() as u32;
    let mut pc = BASE;
    let mut out = Vec::new();
    while pc < end {
        let r = dec.decode_code(&cx, pc).unwrap();
        pc += r.size_in_bytes as u32;
        out.push(r);
    }
    out
}

pub fn render(words: &[u16], options: OutputOptions) -> Vec<String> {
    decode_all(words, options, &Symbols::new()).into_iter().map(|r| r.rendered).collect()
}
