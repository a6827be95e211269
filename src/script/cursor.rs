//! Byte cursor over TypeScript/JavaScript source.
//!
//! All structural characters the scanner cares about are ASCII, so walking
//! bytes is safe for UTF-8 input: continuation bytes never collide with them.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ScanError {
    pub line: usize,
    pub message: String,
}

/// 1-based line number of a byte offset.
pub fn line_of(src: &str, pos: usize) -> usize {
    let end = pos.min(src.len());
    src.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

pub struct Cursor<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Self::at(src, 0)
    }

    pub fn at(src: &'a str, pos: usize) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: pos.min(src.len()),
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn source(&self) -> &'a str {
        self.src
    }

    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    pub fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    pub fn error(&self, message: impl Into<String>) -> ScanError {
        self.error_at(self.pos, message)
    }

    pub fn error_at(&self, pos: usize, message: impl Into<String>) -> ScanError {
        ScanError {
            line: line_of(self.src, pos),
            message: message.into(),
        }
    }

    pub fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, b: u8) -> Result<(), ScanError> {
        if self.eat(b) {
            Ok(())
        } else {
            let found = self
                .peek()
                .map(|c| format!("'{}'", c as char))
                .unwrap_or_else(|| "end of input".to_string());
            Err(self.error(format!("expected '{}', found {}", b as char, found)))
        }
    }

    /// True when the cursor sits on `//` or `/*`.
    pub fn at_comment(&self) -> bool {
        self.peek() == Some(b'/') && matches!(self.peek_at(1), Some(b'/') | Some(b'*'))
    }

    /// Skip a single comment starting at the cursor.
    pub fn skip_comment(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        match self.peek_at(1) {
            Some(b'/') => {
                while let Some(b) = self.peek() {
                    if b == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
                Ok(())
            }
            Some(b'*') => {
                self.pos += 2;
                while self.pos < self.bytes.len() {
                    if self.bytes[self.pos] == b'*' && self.peek_at(1) == Some(b'/') {
                        self.pos += 2;
                        return Ok(());
                    }
                    self.pos += 1;
                }
                Err(self.error_at(start, "unterminated block comment"))
            }
            _ => Ok(()),
        }
    }

    /// Skip whitespace and comments.
    pub fn skip_trivia(&mut self) -> Result<(), ScanError> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if self.at_comment() => self.skip_comment()?,
                _ => return Ok(()),
            }
        }
    }

    pub fn read_identifier(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_ident_byte(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
        (self.pos > start).then(|| &self.src[start..self.pos])
    }

    /// Skip a `'` or `"` string literal starting at the cursor.
    pub fn skip_quoted(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        let Some(quote) = self.bump() else {
            return Ok(());
        };
        while let Some(b) = self.bump() {
            match b {
                b'\\' => {
                    self.bump();
                }
                b'\n' => return Err(self.error_at(start, "unterminated string literal")),
                _ if b == quote => return Ok(()),
                _ => {}
            }
        }
        Err(self.error_at(start, "unterminated string literal"))
    }

    /// Skip a regular expression literal starting at the `/`.
    pub fn skip_regex(&mut self) -> Result<(), ScanError> {
        let start = self.pos;
        self.pos += 1;
        let mut in_class = false;
        while let Some(b) = self.bump() {
            match b {
                b'\\' => {
                    self.bump();
                }
                b'[' => in_class = true,
                b']' => in_class = false,
                b'/' if !in_class => {
                    while matches!(self.peek(), Some(f) if f.is_ascii_alphabetic()) {
                        self.pos += 1;
                    }
                    return Ok(());
                }
                b'\n' => break,
                _ => {}
            }
        }
        Err(self.error_at(start, "unterminated regular expression"))
    }

    /// Read a string literal (`'`, `"` or an interpolation-free template)
    /// and return its decoded value.
    pub fn read_string(&mut self) -> Result<String, ScanError> {
        let start = self.pos;
        let quote = match self.bump() {
            Some(q @ (b'\'' | b'"' | b'`')) => q,
            _ => return Err(self.error_at(start, "expected string literal")),
        };
        let mut out: Vec<u8> = Vec::new();
        loop {
            let Some(b) = self.bump() else {
                return Err(self.error_at(start, "unterminated string literal"));
            };
            match b {
                _ if b == quote => break,
                b'\\' => self.read_escape(&mut out)?,
                b'\n' if quote != b'`' => {
                    return Err(self.error_at(start, "unterminated string literal"));
                }
                b'$' if quote == b'`' && self.peek() == Some(b'{') => {
                    return Err(self.error("template interpolation is not a literal value"));
                }
                _ => out.push(b),
            }
        }
        String::from_utf8(out).map_err(|_| self.error_at(start, "string is not valid UTF-8"))
    }

    fn read_escape(&mut self, out: &mut Vec<u8>) -> Result<(), ScanError> {
        let Some(b) = self.bump() else {
            return Err(self.error("unterminated escape sequence"));
        };
        let decoded = match b {
            b'n' => '\n',
            b't' => '\t',
            b'r' => '\r',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'v' => '\u{b}',
            b'0' => '\0',
            b'\n' => return Ok(()),
            b'\r' => {
                self.eat(b'\n');
                return Ok(());
            }
            b'x' => {
                let code = self.read_hex(2)?;
                char::from_u32(code).ok_or_else(|| self.error("invalid \\x escape"))?
            }
            b'u' => self.read_unicode_escape()?,
            other => {
                out.push(other);
                return Ok(());
            }
        };
        let mut buf = [0u8; 4];
        out.extend_from_slice(decoded.encode_utf8(&mut buf).as_bytes());
        Ok(())
    }

    fn read_unicode_escape(&mut self) -> Result<char, ScanError> {
        let code = if self.eat(b'{') {
            let start = self.pos;
            while matches!(self.peek(), Some(h) if h.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let digits = &self.src[start..self.pos];
            self.expect(b'}')?;
            u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid \\u{...} escape"))?
        } else {
            self.read_hex(4)?
        };

        // High surrogate: JavaScript strings are UTF-16, so pair it with the following low half.
        if (0xD800..0xDC00).contains(&code) {
            if self.peek() == Some(b'\\') && self.peek_at(1) == Some(b'u') {
                self.pos += 2;
                let low = self.read_hex(4)?;
                if (0xDC00..0xE000).contains(&low) {
                    let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                    return char::from_u32(combined).ok_or_else(|| self.error("invalid surrogate pair"));
                }
            }
            return Err(self.error("unpaired surrogate in \\u escape"));
        }
        char::from_u32(code).ok_or_else(|| self.error("invalid \\u escape"))
    }

    fn read_hex(&mut self, len: usize) -> Result<u32, ScanError> {
        let end = self.pos + len;
        let digits = self
            .src
            .get(self.pos..end)
            .filter(|d| d.bytes().all(|h| h.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("invalid hexadecimal escape"))?;
        self.pos = end;
        u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid hexadecimal escape"))
    }
}

pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_string_decodes_escapes() {
        let mut cur = Cursor::new(r#"'it\'s a \"test\"\nA\u{1F600}'"#);
        assert_eq!(cur.read_string().unwrap(), "it's a \"test\"\nA\u{1F600}");
    }

    #[test]
    fn test_read_string_surrogate_pair() {
        let mut cur = Cursor::new(r#""\uD83D\uDE00""#);
        assert_eq!(cur.read_string().unwrap(), "\u{1F600}");
    }

    #[test]
    fn test_template_without_interpolation() {
        let mut cur = Cursor::new("`multi\nline`");
        assert_eq!(cur.read_string().unwrap(), "multi\nline");
    }

    #[test]
    fn test_template_with_interpolation_rejected() {
        let mut cur = Cursor::new("`hello ${name}`");
        assert!(cur.read_string().is_err());
    }

    #[test]
    fn test_unterminated_string_reports_start_line() {
        let mut cur = Cursor::new("\n\n'open\n'");
        cur.skip_trivia().unwrap();
        let err = cur.read_string().unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_skip_trivia_handles_comments() {
        let mut cur = Cursor::new("  // line\n /* block\n */ x");
        cur.skip_trivia().unwrap();
        assert_eq!(cur.peek(), Some(b'x'));
    }

    #[test]
    fn test_unterminated_block_comment() {
        let mut cur = Cursor::new("/* never closed");
        assert!(cur.skip_trivia().is_err());
    }

    #[test]
    fn test_skip_regex_with_class() {
        let mut cur = Cursor::new("/[/]+\\//gi;");
        cur.skip_regex().unwrap();
        assert_eq!(cur.peek(), Some(b';'));
    }

    #[test]
    fn test_line_of() {
        assert_eq!(line_of("a\nb\nc", 0), 1);
        assert_eq!(line_of("a\nb\nc", 4), 3);
    }
}
