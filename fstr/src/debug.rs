use std::fmt;

use crate::error::ErrorKind;

/// This is a snapshot of the debug information.
#[derive(Default)]
pub(crate) struct DebugInfo {
    pub(crate) template_source: Option<String>,
}

// Converts a byte offset into a zero based line index and a column counted
// in characters.
fn offset_to_position(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map_or(0, |x| x + 1);
    let col = before[line_start..].chars().count();
    (line, col)
}

pub(super) fn render_debug_info(
    f: &mut fmt::Formatter,
    kind: ErrorKind,
    offset: Option<usize>,
    info: &DebugInfo,
) -> fmt::Result {
    let source = match info.template_source {
        Some(ref source) => source,
        None => return Ok(()),
    };

    writeln!(f)?;
    writeln!(f, "{:-^1$}", " Template Source ", 79)?;
    let lines: Vec<_> = source.split('\n').enumerate().collect();
    let (idx, col) = offset.map_or((0, None), |offset| {
        let (line, col) = offset_to_position(source, offset);
        (line, Some(col))
    });
    let idx = idx.min(lines.len().saturating_sub(1));
    let skip = idx.saturating_sub(3);
    let pre = lines.iter().skip(skip).take(3.min(idx)).collect::<Vec<_>>();
    let post = lines.iter().skip(idx + 1).take(3).collect::<Vec<_>>();
    for (idx, line) in pre {
        writeln!(f, "{:>4} | {}", idx + 1, line)?;
    }

    if let Some((_, line)) = lines.get(idx) {
        writeln!(f, "{:>4} > {}", idx + 1, line)?;
    }
    if let Some(col) = col {
        writeln!(f, "     i {}^ {}", " ".repeat(col), kind)?;
    }

    for (idx, line) in post {
        writeln!(f, "{:>4} | {}", idx + 1, line)?;
    }
    write!(f, "{:~^1$}", "", 79)
}

#[test]
fn test_offset_to_position() {
    assert_eq!(offset_to_position("abc", 0), (0, 0));
    assert_eq!(offset_to_position("abc", 2), (0, 2));
    assert_eq!(offset_to_position("ab\ncd", 4), (1, 1));
    assert_eq!(offset_to_position("ab\ncd", 99), (1, 2));
    assert_eq!(offset_to_position("ä{", 2), (0, 1));
}
