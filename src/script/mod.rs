//! Lightweight scanning of TypeScript/JavaScript tool sources.
//!
//! Tool sources are never executed. The bundler and the definition loader
//! only need to know where comments, strings and delimiters are, which this
//! module provides without a full parser.

pub mod cursor;
pub mod literal;

pub use cursor::{line_of, Cursor, ScanError};
pub use literal::parse_literal_at;

use std::ops::Range;

/// Kind of non-code region reported by [`walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Comment,
    /// String or template text, excluding the quotes.
    String,
    Regex,
}

enum Frame {
    Delim { close: u8, pos: usize },
    TemplateExpr { pos: usize },
}

/// Words after which a `/` starts a regular expression rather than a division.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// Walk `src`, reporting comment/string/regex regions and checking that
/// `()`, `[]` and `{}` are balanced.
pub fn walk(src: &str, mut on_region: impl FnMut(Region, Range<usize>)) -> Result<(), ScanError> {
    let mut cur = Cursor::new(src);
    let mut stack: Vec<Frame> = Vec::new();

    while let Some(b) = cur.peek() {
        match b {
            b'/' if cur.at_comment() => {
                let start = cur.pos();
                cur.skip_comment()?;
                on_region(Region::Comment, start..cur.pos());
            }
            b'/' if regex_allowed(src, cur.pos()) => {
                let start = cur.pos();
                cur.skip_regex()?;
                on_region(Region::Regex, start..cur.pos());
            }
            b'\'' | b'"' => {
                let start = cur.pos();
                cur.skip_quoted()?;
                on_region(Region::String, start + 1..cur.pos() - 1);
            }
            b'`' => {
                let open = cur.pos();
                cur.bump();
                if scan_template_chunk(&mut cur, open, &mut on_region)? {
                    stack.push(Frame::TemplateExpr { pos: cur.pos() });
                }
            }
            b'(' | b'[' | b'{' => {
                let close = match b {
                    b'(' => b')',
                    b'[' => b']',
                    _ => b'}',
                };
                stack.push(Frame::Delim {
                    close,
                    pos: cur.pos(),
                });
                cur.bump();
            }
            b')' | b']' | b'}' => {
                match stack.pop() {
                    Some(Frame::Delim { close, .. }) if close == b => {
                        cur.bump();
                    }
                    Some(Frame::TemplateExpr { pos }) if b == b'}' => {
                        cur.bump();
                        if scan_template_chunk(&mut cur, pos, &mut on_region)? {
                            stack.push(Frame::TemplateExpr { pos: cur.pos() });
                        }
                    }
                    Some(Frame::Delim { close, .. }) => {
                        return Err(cur.error(format!(
                            "expected '{}' but found '{}'",
                            close as char, b as char
                        )));
                    }
                    Some(Frame::TemplateExpr { .. }) => {
                        return Err(cur.error(format!(
                            "unexpected '{}' inside template expression",
                            b as char
                        )));
                    }
                    None => return Err(cur.error(format!("unmatched '{}'", b as char))),
                }
            }
            _ => {
                cur.bump();
            }
        }
    }

    match stack.pop() {
        Some(Frame::Delim { close, pos }) => {
            let open = match close {
                b')' => '(',
                b']' => '[',
                _ => '{',
            };
            Err(cur.error_at(pos, format!("unclosed '{}'", open)))
        }
        Some(Frame::TemplateExpr { pos }) => Err(cur.error_at(pos, "unterminated template literal")),
        None => Ok(()),
    }
}

/// Scan template text up to the closing backtick or the next `${`.
///
/// Returns `true` when the chunk ended at `${` (an expression follows).
fn scan_template_chunk(
    cur: &mut Cursor<'_>,
    open: usize,
    on_region: &mut impl FnMut(Region, Range<usize>),
) -> Result<bool, ScanError> {
    let start = cur.pos();
    loop {
        let here = cur.pos();
        match cur.bump() {
            None => return Err(cur.error_at(open, "unterminated template literal")),
            Some(b'\\') => {
                cur.bump();
            }
            Some(b'`') => {
                on_region(Region::String, start..here);
                return Ok(false);
            }
            Some(b'$') if cur.peek() == Some(b'{') => {
                cur.bump();
                on_region(Region::String, start..here);
                return Ok(true);
            }
            Some(_) => {}
        }
    }
}

/// Decide whether a `/` at `pos` begins a regex literal, by looking at the
/// previous significant token.
fn regex_allowed(src: &str, pos: usize) -> bool {
    let bytes = src.as_bytes();
    let mut i = pos;
    while i > 0 && bytes[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    if i == 0 {
        return true;
    }
    let prev = bytes[i - 1];
    if cursor::is_ident_byte(prev) {
        let end = i;
        while i > 0 && cursor::is_ident_byte(bytes[i - 1]) {
            i -= 1;
        }
        return REGEX_PRECEDING_KEYWORDS.contains(&&src[i..end]);
    }
    !matches!(prev, b')' | b']' | b'}' | b'"' | b'\'' | b'`')
}

/// Return a copy of `src` with comments (and optionally string contents)
/// blanked out. Byte offsets and line breaks are preserved, so positions
/// found in the masked text index the original.
pub fn mask(src: &str, mask_strings: bool) -> Result<String, ScanError> {
    let mut bytes = src.as_bytes().to_vec();
    walk(src, |region, range| {
        let blank = match region {
            Region::Comment => true,
            Region::String => mask_strings,
            Region::Regex => false,
        };
        if blank {
            for b in &mut bytes[range] {
                if *b != b'\n' {
                    *b = b' ';
                }
            }
        }
    })?;
    // Only whole regions of ASCII-delimited text were replaced with ASCII spaces.
    Ok(String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
}
