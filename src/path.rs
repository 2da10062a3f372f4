//! Bracket notation key paths.
//!
//! `meta[author]` becomes `["meta", "author"]` and `tags[]` becomes
//! `["tags", ""]`, the trailing empty segment asks for a list.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Pos {
    Segment,
    Opened,
    Closed,
}

/// Splits a field name into its path segments.
///
/// Spaces are always dropped. Malformed brackets never fail, they only move
/// the segment boundaries, so the result has at least one segment.
///
/// ```
/// use form_tree::parse_key;
///
/// assert_eq!(parse_key("a[b][c]"), ["a", "b", "c"]);
/// assert_eq!(parse_key("tags[]"), ["tags", ""]);
/// assert_eq!(parse_key("full name"), ["fullname"]);
/// ```
#[must_use]
pub fn parse_key(name: &str) -> Vec<String> {
    let mut keys = vec![String::new()];
    let mut pos = Pos::Segment;

    for c in name.chars() {
        match c {
            ' ' => {}
            '[' => pos = Pos::Opened,
            ']' => {
                if pos == Pos::Opened {
                    keys.push(String::new());
                }
                pos = Pos::Closed;
            }
            _ => {
                if pos != Pos::Segment {
                    keys.push(String::new());
                }
                if let Some(key) = keys.last_mut() {
                    key.push(c);
                }
                pos = Pos::Segment;
            }
        }
    }

    keys
}
