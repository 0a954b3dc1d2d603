#![no_main]
use libfuzzer_sys::fuzz_target;
use trickler_core::{Reading, ScaleDecoder, ScaleModel};

// Arbitrary serial noise must never panic any decoder, and a rejected line
// must leave the stability window as it was.
fuzz_target!(|data: (u8, Vec<Vec<u8>>)| {
    let (pick, lines) = data;
    let model = ScaleModel::ALL[usize::from(pick) % ScaleModel::ALL.len()];
    let mut dec = ScaleDecoder::new(model, 3);
    let mut prev = Reading::default();
    for line in &lines {
        let before = dec.clone();
        match dec.decode(line, &prev) {
            Ok(r) => prev = r,
            Err(_) => assert_eq!(format!("{before:?}"), format!("{dec:?}")),
        }
    }
});
