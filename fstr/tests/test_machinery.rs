#![cfg(feature = "unstable_machinery")]
use fstr::machinery::{scan, split_specifier, Chunk};
use fstr::ErrorKind;
use proptest::prelude::*;
use similar_asserts::assert_eq;

fn regions(source: &str) -> Vec<(usize, usize)> {
    scan(source, false)
        .unwrap()
        .into_iter()
        .filter_map(|chunk| match chunk {
            Chunk::Region(range) => Some((range.start, range.end)),
            Chunk::Literal(_) => None,
        })
        .collect()
}

#[test]
fn test_region_offsets() {
    assert_eq!(regions("a {x} b {y:{w}}"), vec![(3, 4), (9, 14)]);
    assert_eq!(regions("{d['}']} {\"{\"}"), vec![(1, 7), (10, 13)]);
    assert_eq!(regions("{{not}} {'''a}b'''}"), vec![(9, 18)]);
}

#[test]
fn test_scan_errors() {
    let err = scan("{(x))}", false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MismatchedParentheses);
    assert_eq!(err.offset(), Some(4));
    let err = scan("abc {x", false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MismatchedBraces);
    assert_eq!(err.offset(), Some(4));
}

#[test]
fn test_split_specifier() {
    assert_eq!(split_specifier("x"), ("x", ""));
    assert_eq!(split_specifier("x!r:>10"), ("x", "!r:>10"));
    assert_eq!(split_specifier("a != b:^5"), ("a != b", ":^5"));
    assert_eq!(split_specifier("d['a:b']"), ("d['a:b']", ""));
    assert_eq!(split_specifier("(lambda y: y)(1):x"), ("(lambda y: y)(1)", ":x"));
    assert_eq!(split_specifier("{1: 2}[1]!s"), ("{1: 2}[1]", "!s"));
}

proptest! {
    /// Regions are ordered, non-overlapping and point at the text between
    /// a brace pair.
    #[test]
    fn regions_are_ordered(names in prop::collection::vec("[a-z]{1,5}", 0..8), sep in "[ .,a-z]{0,3}") {
        let source = names
            .iter()
            .map(|name| format!("{{{name}}}"))
            .collect::<Vec<_>>()
            .join(&sep);
        let found = regions(&source);
        prop_assert_eq!(found.len(), names.len());
        let mut last_end = 0;
        for ((start, end), name) in found.iter().zip(&names) {
            prop_assert!(*start >= last_end);
            prop_assert_eq!(&source[*start..*end], name.as_str());
            prop_assert_eq!(&source[*start - 1..*start], "{");
            prop_assert_eq!(&source[*end..*end + 1], "}");
            last_end = *end;
        }
    }
}
