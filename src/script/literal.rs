//! Parser for JavaScript object/array literals made only of constant values.
//!
//! Accepts what tool authors write in their `definition` export: unquoted
//! keys, single/double/backtick strings, trailing commas, comments and
//! `+`-concatenated string literals.

use super::cursor::{Cursor, ScanError};
use serde_json::{Map, Number, Value};

/// Parse a literal value starting at byte offset `pos` of `src`.
///
/// Returns the value and the offset just past it. Anything that needs
/// evaluation (identifiers, calls, spreads, interpolation) is an error.
pub fn parse_literal_at(src: &str, pos: usize) -> Result<(Value, usize), ScanError> {
    let mut cur = Cursor::at(src, pos);
    cur.skip_trivia()?;
    let value = parse_value(&mut cur)?;
    Ok((value, cur.pos()))
}

fn parse_value(cur: &mut Cursor<'_>) -> Result<Value, ScanError> {
    cur.skip_trivia()?;
    match cur.peek() {
        Some(b'{') => parse_object(cur),
        Some(b'[') => parse_array(cur),
        Some(b'\'' | b'"' | b'`') => parse_string_expr(cur),
        Some(b'-' | b'+' | b'.' | b'0'..=b'9') => parse_number(cur),
        Some(_) => {
            let start = cur.pos();
            match cur.read_identifier() {
                Some("true") => Ok(Value::Bool(true)),
                Some("false") => Ok(Value::Bool(false)),
                Some("null") => Ok(Value::Null),
                Some(other) => Err(cur.error_at(
                    start,
                    format!("'{}' is not a literal value", other),
                )),
                None => Err(cur.error(format!(
                    "unexpected '{}'",
                    cur.peek().map(|b| b as char).unwrap_or(' ')
                ))),
            }
        }
        None => Err(cur.error("unexpected end of input")),
    }
}

fn parse_object(cur: &mut Cursor<'_>) -> Result<Value, ScanError> {
    cur.expect(b'{')?;
    let mut map = Map::new();
    loop {
        cur.skip_trivia()?;
        if cur.eat(b'}') {
            break;
        }
        let key = parse_key(cur)?;
        cur.skip_trivia()?;
        cur.expect(b':')?;
        let value = parse_value(cur)?;
        map.insert(key, value);
        cur.skip_trivia()?;
        if cur.eat(b',') {
            continue;
        }
        cur.expect(b'}')?;
        break;
    }
    Ok(Value::Object(map))
}

fn parse_key(cur: &mut Cursor<'_>) -> Result<String, ScanError> {
    match cur.peek() {
        Some(b'\'' | b'"') => cur.read_string(),
        Some(b'0'..=b'9') => match parse_number(cur)? {
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(cur.error("invalid numeric key")),
        },
        Some(b'.') => Err(cur.error("spread syntax is not a literal value")),
        Some(b'[') => Err(cur.error("computed keys are not literal values")),
        _ => cur
            .read_identifier()
            .map(str::to_string)
            .ok_or_else(|| cur.error("expected property name")),
    }
}

fn parse_array(cur: &mut Cursor<'_>) -> Result<Value, ScanError> {
    cur.expect(b'[')?;
    let mut items = Vec::new();
    loop {
        cur.skip_trivia()?;
        if cur.eat(b']') {
            break;
        }
        if cur.peek() == Some(b'.') {
            return Err(cur.error("spread syntax is not a literal value"));
        }
        items.push(parse_value(cur)?);
        cur.skip_trivia()?;
        if cur.eat(b',') {
            continue;
        }
        cur.expect(b']')?;
        break;
    }
    Ok(Value::Array(items))
}

/// A string literal, optionally followed by `+ 'more'` continuations.
fn parse_string_expr(cur: &mut Cursor<'_>) -> Result<Value, ScanError> {
    let mut text = cur.read_string()?;
    loop {
        let checkpoint = cur.pos();
        cur.skip_trivia()?;
        if cur.peek() != Some(b'+') {
            *cur = Cursor::at(cur.source(), checkpoint);
            break;
        }
        cur.bump();
        cur.skip_trivia()?;
        match cur.peek() {
            Some(b'\'' | b'"' | b'`') => text.push_str(&cur.read_string()?),
            _ => return Err(cur.error("only string literals can be concatenated")),
        }
    }
    Ok(Value::String(text))
}

fn parse_number(cur: &mut Cursor<'_>) -> Result<Value, ScanError> {
    let start = cur.pos();
    let negative = if cur.eat(b'-') {
        true
    } else {
        cur.eat(b'+');
        false
    };
    let digits_start = cur.pos();
    while let Some(b) = cur.peek() {
        let exponent_sign = matches!(b, b'+' | b'-')
            && matches!(cur.source().as_bytes().get(cur.pos().wrapping_sub(1)), Some(b'e' | b'E'));
        if b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || exponent_sign {
            cur.bump();
        } else {
            break;
        }
    }
    let raw: String = cur.source()[digits_start..cur.pos()]
        .chars()
        .filter(|c| *c != '_')
        .collect();

    let number = if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
            .ok()
            .map(|n| Number::from(if negative { -n } else { n }))
    } else if let Ok(n) = raw.parse::<i64>() {
        Some(Number::from(if negative { -n } else { n }))
    } else {
        raw.parse::<f64>()
            .ok()
            .and_then(|f| Number::from_f64(if negative { -f } else { f }))
    };

    number
        .map(Value::Number)
        .ok_or_else(|| cur.error_at(start, format!("invalid number literal '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(src: &str) -> Value {
        parse_literal_at(src, 0).unwrap().0
    }

    #[test]
    fn test_parse_typescript_style_object() {
        let src = r#"{
            id: 'shinkai-tool-echo',
            "name": "Echo",
            // free-form notes
            keywords: ['echo', `text`,],
            limits: { retries: 3, ratio: 0.5, big: 1e3, neg: -2 },
            enabled: true,
            nothing: null,
        }"#;
        assert_eq!(
            parse(src),
            json!({
                "id": "shinkai-tool-echo",
                "name": "Echo",
                "keywords": ["echo", "text"],
                "limits": { "retries": 3, "ratio": 0.5, "big": 1000.0, "neg": -2 },
                "enabled": true,
                "nothing": null
            })
        );
    }

    #[test]
    fn test_preserves_key_order() {
        let value = parse("{ zeta: 1, alpha: 2 }");
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["zeta", "alpha"]);
    }

    #[test]
    fn test_string_concatenation() {
        let value = parse("{ description: 'Finds a file ' +\n  \"by name.\" }");
        assert_eq!(value["description"], "Finds a file by name.");
    }

    #[test]
    fn test_returns_end_offset() {
        let src = "{ a: 1 } as const;";
        let (_, end) = parse_literal_at(src, 0).unwrap();
        assert_eq!(&src[end..], " as const;");
    }

    #[test]
    fn test_identifier_value_rejected() {
        let err = parse_literal_at("{\n  id: TOOL_ID,\n}", 0).unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("TOOL_ID"));
    }

    #[test]
    fn test_spread_rejected() {
        assert!(parse_literal_at("{ ...base, id: 'x' }", 0).is_err());
    }

    #[test]
    fn test_missing_comma_rejected() {
        assert!(parse_literal_at("{ a: 1 b: 2 }", 0).is_err());
    }

    #[test]
    fn test_hex_and_separators() {
        assert_eq!(parse("[0xff, 1_000]"), json!([255, 1000]));
    }
}
