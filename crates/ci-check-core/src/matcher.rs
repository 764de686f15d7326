//! Line-oriented pattern matching over document text.

use regex::Regex;
use tower_lsp_server::ls_types::{Position, Range};

use crate::document::utf16_len;

/// Scans `text` line by line and returns the range of the first match of
/// `pattern` on every line that matches.
///
/// Lines are split on `\n`, so `^` anchors to the start of each line. Ranges
/// never span lines.
pub fn find_match_ranges(text: &str, pattern: &Regex) -> Vec<Range> {
    line_matches(text, pattern).collect()
}

/// Returns the range of the first matching line, if any.
pub fn find_first_match(text: &str, pattern: &Regex) -> Option<Range> {
    line_matches(text, pattern).next()
}

fn line_matches<'a>(text: &'a str, pattern: &'a Regex) -> impl Iterator<Item = Range> + 'a {
    text.split('\n').enumerate().filter_map(|(line_no, line)| {
        let m = pattern.find(line)?;
        let line_no = line_no as u32;
        let start = utf16_len(&line[..m.start()]);
        Some(Range::new(
            Position::new(line_no, start),
            Position::new(line_no, start + utf16_len(m.as_str())),
        ))
    })
}
