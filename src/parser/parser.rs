//! Recursive-descent parser for filter expressions and patch paths
//!
//! Precedence, loosest first: `or`, `and`, `not`, primary. Operator chains
//! are left-folded into nested binary [`FilterExpression::Logical`] nodes,
//! so `a and b and c` parses as `(a and b) and c`.

use super::error::{ParseError, ParseResult};
use super::tokenizer::{SpannedToken, Token, tokenize};
use crate::ast::{FilterExpression, Literal, LogicalOp};
use crate::path::{AttributeReference, PatchPath};

/// Parse a filter string into an expression tree
pub fn parse_filter(input: &str) -> ParseResult<FilterExpression> {
    let mut parser = Parser::new(input)?;
    let expr = parser.parse_or()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse a patch-operation path (`attr`, `attr[filter]`, `attr[filter].sub`,
/// each optionally URN-qualified)
pub fn parse_path(input: &str) -> ParseResult<PatchPath> {
    let mut parser = Parser::new(input)?;

    let reference = parser.expect_attr_path()?;
    let value_filter = if parser.eat(&Token::LeftBracket) {
        let filter = parser.parse_or()?;
        parser.expect(&Token::RightBracket)?;
        Some(filter)
    } else {
        None
    };
    let trailing_sub = if parser.eat(&Token::Dot) {
        let (sub, position) = parser.expect_plain_name()?;
        if reference.sub_attribute().is_some() {
            return Err(ParseError::new(
                "path has more than one sub-attribute",
                &sub,
                position,
            ));
        }
        Some(sub)
    } else {
        None
    };
    parser.expect_end()?;

    if value_filter.is_some() && reference.sub_attribute().is_some() {
        return Err(ParseError::invalid_path(
            input,
            "value filter must follow the attribute, not its sub-attribute",
        ));
    }

    let sub_attribute = trailing_sub.or_else(|| reference.sub_attribute().map(str::to_string));
    Ok(PatchPath::new(
        reference.urn().map(str::to_string),
        Some(reference.attribute().to_string()),
        value_filter,
        sub_attribute,
    ))
}

struct Parser<'input> {
    input: &'input str,
    tokens: Vec<SpannedToken>,
    idx: usize,
}

impl<'input> Parser<'input> {
    fn new(input: &'input str) -> ParseResult<Self> {
        Ok(Parser {
            input,
            tokens: tokenize(input)?,
            idx: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.idx).map(|(t, _)| t)
    }

    fn next(&mut self) -> Option<SpannedToken> {
        let token = self.tokens.get(self.idx).cloned();
        if token.is_some() {
            self.idx += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.idx += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> ParseResult<()> {
        match self.next() {
            Some((token, _)) if token == *expected => Ok(()),
            Some((token, position)) => Err(ParseError::new(
                format!("expected {}, found {}", expected.describe(), token.describe()),
                token_fragment(self.input, position),
                position,
            )),
            None => Err(ParseError::unexpected_end(self.input)),
        }
    }

    fn expect_end(&mut self) -> ParseResult<()> {
        match self.next() {
            None => Ok(()),
            Some((token, position)) => Err(ParseError::new(
                format!("unexpected {} after expression", token.describe()),
                token_fragment(self.input, position),
                position,
            )),
        }
    }

    fn expect_attr_path(&mut self) -> ParseResult<AttributeReference> {
        match self.next() {
            Some((Token::AttrPath(text), position)) => AttributeReference::parse(&text)
                .map_err(|e| ParseError::new(e.message, text, position)),
            Some((token, position)) => Err(ParseError::new(
                format!("expected attribute path, found {}", token.describe()),
                token_fragment(self.input, position),
                position,
            )),
            None => Err(ParseError::unexpected_end(self.input)),
        }
    }

    /// A bare attribute name with no dots or URN qualification
    fn expect_plain_name(&mut self) -> ParseResult<(String, usize)> {
        match self.next() {
            Some((Token::AttrPath(text), position)) => {
                if text.contains(['.', ':']) {
                    return Err(ParseError::new(
                        "expected a plain sub-attribute name",
                        text,
                        position,
                    ));
                }
                Ok((text, position))
            }
            Some((token, position)) => Err(ParseError::new(
                format!("expected sub-attribute name, found {}", token.describe()),
                token_fragment(self.input, position),
                position,
            )),
            None => Err(ParseError::unexpected_end(self.input)),
        }
    }

    fn parse_or(&mut self) -> ParseResult<FilterExpression> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = FilterExpression::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<FilterExpression> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = FilterExpression::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ParseResult<FilterExpression> {
        if self.eat(&Token::Not) {
            self.expect(&Token::LeftParen)?;
            let inner = self.parse_or()?;
            self.expect(&Token::RightParen)?;
            return Ok(FilterExpression::group(inner, true));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<FilterExpression> {
        if self.eat(&Token::LeftParen) {
            let inner = self.parse_or()?;
            self.expect(&Token::RightParen)?;
            return Ok(FilterExpression::group(inner, false));
        }

        let path = self.expect_attr_path()?;
        match self.next() {
            Some((Token::Present, _)) => Ok(FilterExpression::Present { path }),
            Some((Token::Compare(op), _)) => {
                let value = self.parse_literal()?;
                Ok(FilterExpression::Compare { path, op, value })
            }
            Some((Token::LeftBracket, _)) => {
                let inner = self.parse_or()?;
                self.expect(&Token::RightBracket)?;
                Ok(FilterExpression::ValuePath {
                    path,
                    filter: Some(Box::new(inner)),
                })
            }
            Some((token, position)) => Err(ParseError::new(
                format!("expected an operator, found {}", token.describe()),
                token_fragment(self.input, position),
                position,
            )),
            None => Err(ParseError::unexpected_end(self.input)),
        }
    }

    fn parse_literal(&mut self) -> ParseResult<Literal> {
        match self.next() {
            Some((Token::String(s), _)) => Ok(Literal::String(s)),
            Some((Token::Number(n), _)) => Ok(Literal::Number(n)),
            Some((Token::True, _)) => Ok(Literal::Boolean(true)),
            Some((Token::False, _)) => Ok(Literal::Boolean(false)),
            Some((Token::Null, _)) => Ok(Literal::Null),
            Some((token, position)) => Err(ParseError::new(
                format!("expected a literal value, found {}", token.describe()),
                token_fragment(self.input, position),
                position,
            )),
            None => Err(ParseError::unexpected_end(self.input)),
        }
    }
}

fn token_fragment(input: &str, position: usize) -> String {
    input[position..]
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CompareOp;

    #[test]
    fn parses_comparison() {
        let expr = parse_filter("userName eq \"jdoe\"").unwrap();
        assert_eq!(
            expr,
            FilterExpression::Compare {
                path: AttributeReference::of("userName"),
                op: CompareOp::Equal,
                value: Literal::String("jdoe".into()),
            }
        );
    }

    #[test]
    fn parses_presence() {
        let expr = parse_filter("title pr").unwrap();
        assert!(matches!(expr, FilterExpression::Present { .. }));
    }

    #[test]
    fn and_chain_left_folds() {
        let expr = parse_filter("a pr and b pr and c pr").unwrap();
        let FilterExpression::Logical { op: LogicalOp::And, left, right } = expr else {
            panic!("expected logical root");
        };
        // ((a and b) and c): left operand is itself a binary and-node
        assert!(left.is_logical());
        assert!(matches!(*right, FilterExpression::Present { .. }));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse_filter("a pr or b pr and c pr").unwrap();
        let FilterExpression::Logical { op: LogicalOp::Or, left, right } = expr else {
            panic!("expected or at root");
        };
        assert!(matches!(*left, FilterExpression::Present { .. }));
        assert!(right.is_logical());
    }

    #[test]
    fn parses_not_group() {
        let expr = parse_filter("not (title pr)").unwrap();
        assert_eq!(
            expr,
            FilterExpression::group(
                FilterExpression::Present {
                    path: AttributeReference::of("title")
                },
                true
            )
        );
    }

    #[test]
    fn not_requires_parentheses() {
        assert!(parse_filter("not title pr").is_err());
    }

    #[test]
    fn parses_value_path_filter() {
        let expr = parse_filter("emails[type eq \"work\" and primary eq true]").unwrap();
        let FilterExpression::ValuePath { path, filter } = expr else {
            panic!("expected value path");
        };
        assert_eq!(path.attribute(), "emails");
        assert!(filter.unwrap().is_logical());
    }

    #[test]
    fn parses_urn_qualified_comparison() {
        let expr = parse_filter(
            "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:department eq \"Sales\"",
        )
        .unwrap();
        let FilterExpression::Compare { path, .. } = expr else {
            panic!("expected comparison");
        };
        assert_eq!(
            path.urn(),
            Some("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User")
        );
        assert_eq!(path.attribute(), "department");
    }

    #[test]
    fn display_round_trips_through_parser() {
        for text in [
            "userName eq \"jdoe\"",
            "title pr",
            "not (title pr)",
            "(a pr) and (b pr)",
            "emails[type eq \"work\"]",
            "a eq 1 and b eq 2 or c eq 3",
        ] {
            let expr = parse_filter(text).unwrap();
            assert_eq!(parse_filter(&expr.to_string()).unwrap(), expr);
        }
    }

    #[test]
    fn error_carries_position_and_fragment() {
        let err = parse_filter("userName eq").unwrap_err();
        assert_eq!(err.position, "userName eq".len());

        let err = parse_filter("userName noop \"x\"").unwrap_err();
        assert_eq!(err.position, 9);
        assert_eq!(err.fragment, "noop");
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse_filter("a pr b pr").is_err());
        assert!(parse_filter("(a pr").is_err());
    }

    #[test]
    fn parses_plain_path() {
        let path = parse_path("name.familyName").unwrap();
        assert_eq!(path.attribute_name(), Some("name"));
        assert_eq!(path.sub_attribute(), Some("familyName"));
        assert!(path.value_filter().is_none());
    }

    #[test]
    fn parses_filtered_path_with_sub_attribute() {
        let path = parse_path("emails[type eq \"work\"].value").unwrap();
        assert_eq!(path.attribute_name(), Some("emails"));
        assert_eq!(path.sub_attribute(), Some("value"));
        assert!(path.value_filter().is_some());
        assert_eq!(path.to_string(), "emails[type eq \"work\"].value");
    }

    #[test]
    fn parses_urn_qualified_path() {
        let path = parse_path(
            "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager.displayName",
        )
        .unwrap();
        assert_eq!(
            path.urn(),
            Some("urn:ietf:params:scim:schemas:extension:enterprise:2.0:User")
        );
        assert_eq!(path.attribute_name(), Some("manager"));
        assert_eq!(path.sub_attribute(), Some("displayName"));
    }

    #[test]
    fn rejects_filter_after_sub_attribute() {
        assert!(parse_path("name.familyName[x eq 1]").is_err());
        assert!(parse_path("emails[type eq \"work\"].value.extra").is_err());
    }
}
