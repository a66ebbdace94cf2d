#![no_main]
use fstr::machinery::{scan, split_specifier, Chunk};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: &str| {
    if let Ok(chunks) = scan(input, false) {
        for chunk in chunks {
            if let Chunk::Region(range) = chunk {
                let (head, spec) = split_specifier(&input[range.clone()]);
                assert!(head.len() + spec.len() <= range.len());
            }
        }
    }
});
