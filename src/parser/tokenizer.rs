//! Tokenizer for SCIM filter and path text
//!
//! Single-pass byte scanner producing position-tagged tokens. Attribute
//! paths (including URN-qualified ones) are scanned as one token and split
//! into their parts later by [`crate::path::AttributeReference::parse`];
//! keywords are recognized case-insensitively from a shared lookup table.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use rust_decimal::Decimal;

use super::error::{ParseError, ParseResult};
use crate::ast::CompareOp;

/// One lexical token of filter/path text
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Attribute path text (possibly URN-qualified, possibly dotted)
    AttrPath(String),
    /// Double-quoted string literal, unescaped
    String(String),
    /// Number literal
    Number(Decimal),
    /// `true` literal
    True,
    /// `false` literal
    False,
    /// `null` literal
    Null,
    /// Comparison operator keyword
    Compare(CompareOp),
    /// `pr` presence operator
    Present,
    /// `and` keyword
    And,
    /// `or` keyword
    Or,
    /// `not` keyword
    Not,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `.` starting a sub-attribute after a bracket
    Dot,
}

impl Token {
    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Token::AttrPath(s) => format!("attribute '{s}'"),
            Token::String(_) => "string literal".into(),
            Token::Number(_) => "number literal".into(),
            Token::True | Token::False => "boolean literal".into(),
            Token::Null => "null literal".into(),
            Token::Compare(op) => format!("operator '{op}'"),
            Token::Present => "operator 'pr'".into(),
            Token::And => "'and'".into(),
            Token::Or => "'or'".into(),
            Token::Not => "'not'".into(),
            Token::LeftParen => "'('".into(),
            Token::RightParen => "')'".into(),
            Token::LeftBracket => "'['".into(),
            Token::RightBracket => "']'".into(),
            Token::Dot => "'.'".into(),
        }
    }
}

/// A token together with its byte offset in the input
pub type SpannedToken = (Token, usize);

static KEYWORD_TABLE: Lazy<HashMap<&'static str, Token>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert("and", Token::And);
    map.insert("or", Token::Or);
    map.insert("not", Token::Not);
    map.insert("pr", Token::Present);
    map.insert("true", Token::True);
    map.insert("false", Token::False);
    map.insert("null", Token::Null);
    map.insert("eq", Token::Compare(CompareOp::Equal));
    map.insert("ne", Token::Compare(CompareOp::NotEqual));
    map.insert("co", Token::Compare(CompareOp::Contains));
    map.insert("sw", Token::Compare(CompareOp::StartsWith));
    map.insert("ew", Token::Compare(CompareOp::EndsWith));
    map.insert("gt", Token::Compare(CompareOp::GreaterThan));
    map.insert("ge", Token::Compare(CompareOp::GreaterThanOrEqual));
    map.insert("lt", Token::Compare(CompareOp::LessThan));
    map.insert("le", Token::Compare(CompareOp::LessThanOrEqual));
    map
});

/// Tokenize the whole input up front
pub fn tokenize(input: &str) -> ParseResult<Vec<SpannedToken>> {
    Tokenizer::new(input).collect_all()
}

struct Tokenizer<'input> {
    input: &'input str,
    bytes: &'input [u8],
    pos: usize,
}

impl<'input> Tokenizer<'input> {
    fn new(input: &'input str) -> Self {
        Tokenizer {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn collect_all(mut self) -> ParseResult<Vec<SpannedToken>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> ParseResult<Option<SpannedToken>> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(&b) = self.bytes.get(self.pos) else {
            return Ok(None);
        };

        let token = match b {
            b'(' => {
                self.pos += 1;
                Token::LeftParen
            }
            b')' => {
                self.pos += 1;
                Token::RightParen
            }
            b'[' => {
                self.pos += 1;
                Token::LeftBracket
            }
            b']' => {
                self.pos += 1;
                Token::RightBracket
            }
            b'.' => {
                self.pos += 1;
                Token::Dot
            }
            b'"' => self.scan_string()?,
            b'-' | b'0'..=b'9' => self.scan_number()?,
            b'$' | b'a'..=b'z' | b'A'..=b'Z' => self.scan_word(),
            _ => {
                let fragment = self.fragment_from(start);
                return Err(ParseError::new("unexpected character", fragment, start));
            }
        };
        Ok(Some((token, start)))
    }

    fn skip_whitespace(&mut self) {
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_whitespace())
        {
            self.pos += 1;
        }
    }

    /// Attribute path or keyword: `[A-Za-z$][A-Za-z0-9:._$-]*`
    ///
    /// URN-qualified paths are scanned whole; the trailing `.` of a path is
    /// never a separate token here because a word character follows it.
    fn scan_word(&mut self) -> Token {
        let start = self.pos;
        while self.bytes.get(self.pos).is_some_and(|&b| {
            b.is_ascii_alphanumeric() || matches!(b, b':' | b'.' | b'_' | b'-' | b'$')
        }) {
            self.pos += 1;
        }
        let word = &self.input[start..self.pos];
        if word.bytes().all(|b| b.is_ascii_alphabetic()) {
            if let Some(token) = KEYWORD_TABLE.get(word.to_ascii_lowercase().as_str()) {
                return token.clone();
            }
        }
        Token::AttrPath(word.to_string())
    }

    fn scan_number(&mut self) -> ParseResult<Token> {
        let start = self.pos;
        if self.bytes.get(self.pos) == Some(&b'-') {
            self.pos += 1;
        }
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
        if self.bytes.get(self.pos) == Some(&b'.')
            && self.bytes.get(self.pos + 1).is_some_and(u8::is_ascii_digit)
        {
            self.pos += 1;
            while self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
                self.pos += 1;
            }
        }
        if matches!(self.bytes.get(self.pos), Some(b'e' | b'E')) {
            let mut ahead = self.pos + 1;
            if matches!(self.bytes.get(ahead), Some(b'+' | b'-')) {
                ahead += 1;
            }
            if self.bytes.get(ahead).is_some_and(u8::is_ascii_digit) {
                self.pos = ahead;
                while self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
                    self.pos += 1;
                }
            }
        }
        let text = &self.input[start..self.pos];
        let value = if text.contains(['e', 'E']) {
            Decimal::from_scientific(text)
        } else {
            text.parse::<Decimal>()
        };
        match value {
            Ok(value) => Ok(Token::Number(value)),
            Err(_) => Err(ParseError::new("invalid number literal", text, start)),
        }
    }

    fn scan_string(&mut self) -> ParseResult<Token> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let mut value = String::new();
        loop {
            let Some(&b) = self.bytes.get(self.pos) else {
                return Err(ParseError::new(
                    "unterminated string literal",
                    self.fragment_from(start),
                    start,
                ));
            };
            match b {
                b'"' => {
                    self.pos += 1;
                    return Ok(Token::String(value));
                }
                b'\\' => {
                    self.pos += 1;
                    let Some(&esc) = self.bytes.get(self.pos) else {
                        return Err(ParseError::new(
                            "unterminated escape sequence",
                            self.fragment_from(start),
                            start,
                        ));
                    };
                    self.pos += 1;
                    match esc {
                        b'"' => value.push('"'),
                        b'\\' => value.push('\\'),
                        b'/' => value.push('/'),
                        b'b' => value.push('\u{0008}'),
                        b'f' => value.push('\u{000C}'),
                        b'n' => value.push('\n'),
                        b'r' => value.push('\r'),
                        b't' => value.push('\t'),
                        b'u' => {
                            let hex = self
                                .input
                                .get(self.pos..self.pos + 4)
                                .filter(|h| h.bytes().all(|b| b.is_ascii_hexdigit()));
                            let Some(hex) = hex else {
                                return Err(ParseError::new(
                                    "invalid unicode escape",
                                    self.fragment_from(start),
                                    start,
                                ));
                            };
                            let code = u32::from_str_radix(hex, 16).expect("checked hex digits");
                            let Some(c) = char::from_u32(code) else {
                                return Err(ParseError::new(
                                    "invalid unicode escape",
                                    self.fragment_from(start),
                                    start,
                                ));
                            };
                            value.push(c);
                            self.pos += 4;
                        }
                        _ => {
                            return Err(ParseError::new(
                                "invalid escape sequence",
                                self.fragment_from(start),
                                start,
                            ));
                        }
                    }
                }
                _ => {
                    // multi-byte UTF-8 is copied through as-is
                    let c = self.input[self.pos..].chars().next().expect("valid utf-8");
                    value.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }
    }

    /// Up to 24 bytes of input starting at `start`, for error messages
    fn fragment_from(&self, start: usize) -> String {
        let end = self
            .input
            .char_indices()
            .map(|(i, _)| i)
            .chain([self.input.len()])
            .filter(|&i| i >= start && i <= start + 24)
            .next_back()
            .unwrap_or(self.input.len());
        self.input[start..end].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn tokenizes_simple_comparison() {
        assert_eq!(
            kinds("userName eq \"jdoe\""),
            vec![
                Token::AttrPath("userName".into()),
                Token::Compare(CompareOp::Equal),
                Token::String("jdoe".into()),
            ]
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            kinds("a PR AND b Eq 1"),
            vec![
                Token::AttrPath("a".into()),
                Token::Present,
                Token::And,
                Token::AttrPath("b".into()),
                Token::Compare(CompareOp::Equal),
                Token::Number(Decimal::from(1)),
            ]
        );
    }

    #[test]
    fn urn_paths_are_one_token() {
        let tokens = kinds("urn:ietf:params:scim:schemas:core:2.0:User:userName pr");
        assert_eq!(
            tokens[0],
            Token::AttrPath("urn:ietf:params:scim:schemas:core:2.0:User:userName".into())
        );
    }

    #[test]
    fn bracket_path_with_sub_attribute() {
        assert_eq!(
            kinds("emails[type eq \"work\"].value"),
            vec![
                Token::AttrPath("emails".into()),
                Token::LeftBracket,
                Token::AttrPath("type".into()),
                Token::Compare(CompareOp::Equal),
                Token::String("work".into()),
                Token::RightBracket,
                Token::Dot,
                Token::AttrPath("value".into()),
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#"a eq "line\nbreak \"q\" A""#),
            vec![
                Token::AttrPath("a".into()),
                Token::Compare(CompareOp::Equal),
                Token::String("line\nbreak \"q\" A".into()),
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(kinds("a gt -2.5")[2], Token::Number("-2.5".parse().unwrap()));
        assert_eq!(kinds("a gt 1e2")[2], Token::Number(Decimal::from(100)));
    }

    #[test]
    fn unterminated_string_reports_position() {
        let err = tokenize("userName eq \"jdoe").unwrap_err();
        assert_eq!(err.position, 12);
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn rejects_stray_characters() {
        let err = tokenize("a eq #").unwrap_err();
        assert_eq!(err.position, 5);
    }
}
