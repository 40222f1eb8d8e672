//! Recursive-descent parser.
//!
//! ```text
//! expression = term (("+" | "-") term)*
//! term       = factor (("*" | "/") factor)*
//! factor     = number | duration | "-" (number | duration)
//!            | "@" ident | builtin [ "(" args ")" ] | "(" expression ")"
//! arg        = mode | direction | base | expression
//! ```
//!
//! Keyword arguments are read as the kind the argument position expects, so
//! `before_sunrise` is a mode inside `solar` and a direction inside
//! `proportional_minutes`.

use zmanim_astro::SolarMode;

use crate::ast::{Arg, ArgKind, Arity, BinOp, Builtin, DayBase, DayEdge, Node};
use crate::error::ParseError;
use crate::lexer::{Token, TokenKind, tokenize};

/// Deepest nesting of parentheses, calls and operator chains a formula may
/// use. Keeps every recursive walk over the tree within a small stack.
pub const MAX_NESTING: usize = 64;

/// Parse one formula source into its syntax tree.
pub fn parse(source: &str) -> Result<Node, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        depth: 0,
    };
    let node = parser.expression()?;
    let tok = parser.peek();
    match tok.kind {
        TokenKind::End => Ok(node),
        TokenKind::RParen => Err(ParseError::UnbalancedParens {
            fragment: ")".into(),
            offset: tok.offset,
        }),
        _ => Err(parser.unexpected(tok, "operator or end of input")),
    }
}

/// An argument with the byte range it came from.
struct SpannedArg {
    arg: Arg,
    offset: usize,
    end: usize,
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'s> Parser<'s> {
    fn peek(&self) -> Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Token {
        let last = self.tokens.len() - 1;
        self.tokens[(self.pos + n).min(last)].clone()
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek();
        if tok.kind != TokenKind::End {
            self.pos += 1;
        }
        tok
    }

    /// Byte offset just past the previously consumed token.
    fn prev_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .map(|i| self.tokens[i].offset + self.tokens[i].len)
            .unwrap_or(0)
    }

    fn unexpected(&self, tok: Token, expected: &'static str) -> ParseError {
        if tok.kind == TokenKind::End {
            return ParseError::UnexpectedEnd {
                offset: tok.offset,
                expected,
            };
        }
        ParseError::UnexpectedToken {
            fragment: tok.fragment(self.source).to_string(),
            offset: tok.offset,
            expected,
        }
    }

    /// Enter one level of nesting at `tok`.
    fn nest(&mut self, tok: &Token) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ParseError::NestingTooDeep {
                fragment: tok.fragment(self.source).to_string(),
                offset: tok.offset,
                limit: MAX_NESTING,
            });
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<Node, ParseError> {
        let depth = self.depth;
        let mut left = self.term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let tok = self.advance();
            self.nest(&tok)?;
            let right = self.term()?;
            left = Node::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = depth;
        Ok(left)
    }

    fn term(&mut self) -> Result<Node, ParseError> {
        let depth = self.depth;
        let mut left = self.factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            let tok = self.advance();
            self.nest(&tok)?;
            let right = self.factor()?;
            left = Node::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = depth;
        Ok(left)
    }

    fn factor(&mut self) -> Result<Node, ParseError> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Number(n) => Ok(Node::Number(n)),
            TokenKind::Duration(d) => Ok(Node::Duration(d)),
            TokenKind::Minus => {
                let operand = self.advance();
                match operand.kind {
                    TokenKind::Number(n) => Ok(Node::Number(-n)),
                    TokenKind::Duration(d) => Ok(Node::Duration(-d)),
                    _ => Err(self.unexpected(operand, "number or duration after unary '-'")),
                }
            }
            TokenKind::Reference(key) => Ok(Node::Reference { key }),
            TokenKind::LParen => {
                self.nest(&tok)?;
                let inner = self.expression()?;
                self.close_paren(tok.offset)?;
                self.depth -= 1;
                Ok(inner)
            }
            TokenKind::Ident(ref name) => self.builtin(name.clone(), &tok),
            _ => Err(self.unexpected(tok, "expression")),
        }
    }

    fn close_paren(&mut self, open_offset: usize) -> Result<(), ParseError> {
        let tok = self.peek();
        match tok.kind {
            TokenKind::RParen => {
                self.advance();
                Ok(())
            }
            TokenKind::End => Err(ParseError::UnbalancedParens {
                fragment: "(".into(),
                offset: open_offset,
            }),
            _ => Err(self.unexpected(tok, "')'")),
        }
    }

    fn builtin(&mut self, name: String, tok: &Token) -> Result<Node, ParseError> {
        let Some(builtin) = Builtin::from_name(&name) else {
            if keyword_arg(&name, None).is_some() || name == "custom" {
                return Err(self.unexpected(tok.clone(), "expression"));
            }
            return Err(ParseError::UnknownPrimitive {
                fragment: name,
                offset: tok.offset,
            });
        };

        let args = if self.peek().kind == TokenKind::LParen {
            self.call_args(Some(builtin))?
        } else if builtin.is_bare() {
            Vec::new()
        } else {
            return Err(ParseError::Arity {
                function: name,
                expected: builtin.arity().describe(),
                found: 0,
                offset: tok.offset,
            });
        };

        self.check_signature(builtin, &name, tok.offset, &args)?;
        Ok(Node::PrimitiveCall {
            name: builtin,
            args: args.into_iter().map(|a| a.arg).collect(),
        })
    }

    fn check_signature(
        &self,
        builtin: Builtin,
        name: &str,
        offset: usize,
        args: &[SpannedArg],
    ) -> Result<(), ParseError> {
        let arity = builtin.arity();
        if !arity.accepts(args.len()) {
            return Err(ParseError::Arity {
                function: name.to_string(),
                expected: arity.describe(),
                found: args.len(),
                offset,
            });
        }
        for (i, spanned) in args.iter().enumerate() {
            let Some(expected) = builtin.param_at(i) else { continue };
            if spanned.arg.kind() != expected {
                return Err(ParseError::ArgumentKind {
                    function: name.to_string(),
                    position: i + 1,
                    expected: expected.describe(),
                    fragment: self.source[spanned.offset..spanned.end].to_string(),
                    offset: spanned.offset,
                });
            }
        }
        Ok(())
    }

    /// Parses `( arg, ... )`, starting at the opening parenthesis.
    fn call_args(&mut self, callee: Option<Builtin>) -> Result<Vec<SpannedArg>, ParseError> {
        let open = self.advance();
        self.nest(&open)?;
        let mut args = Vec::new();
        if self.peek().kind == TokenKind::RParen {
            self.advance();
            self.depth -= 1;
            return Ok(args);
        }
        loop {
            let expected = callee.and_then(|b| b.param_at(args.len()));
            args.push(self.argument(expected)?);
            let tok = self.advance();
            match tok.kind {
                TokenKind::Comma => continue,
                TokenKind::RParen => {
                    self.depth -= 1;
                    return Ok(args);
                }
                TokenKind::End => {
                    return Err(ParseError::UnbalancedParens {
                        fragment: "(".into(),
                        offset: open.offset,
                    });
                }
                _ => return Err(self.unexpected(tok, "',' or ')'")),
            }
        }
    }

    fn custom_bound(&self, spanned: SpannedArg, position: usize) -> Result<Node, ParseError> {
        match spanned.arg {
            Arg::Expr(node) => Ok(node),
            _ => Err(ParseError::ArgumentKind {
                function: "custom".into(),
                position,
                expected: "an expression",
                fragment: self.source[spanned.offset..spanned.end].to_string(),
                offset: spanned.offset,
            }),
        }
    }

    fn argument(&mut self, expected: Option<ArgKind>) -> Result<SpannedArg, ParseError> {
        let tok = self.peek();
        let offset = tok.offset;
        if let TokenKind::Ident(word) = &tok.kind {
            let terminates = matches!(
                self.peek_nth(1).kind,
                TokenKind::Comma | TokenKind::RParen | TokenKind::End
            );
            if terminates {
                if let Some(arg) = keyword_arg(word, expected) {
                    self.advance();
                    return Ok(SpannedArg {
                        arg,
                        offset,
                        end: self.prev_end(),
                    });
                }
            }
            if word == "custom" && self.peek_nth(1).kind == TokenKind::LParen {
                self.advance();
                let inner = self.call_args(None)?;
                let [start, end]: [SpannedArg; 2] = inner.try_into().map_err(|v: Vec<SpannedArg>| ParseError::Arity {
                    function: "custom".into(),
                    expected: Arity::Exact(2).describe(),
                    found: v.len(),
                    offset,
                })?;
                let base = DayBase::Custom {
                    start: Box::new(self.custom_bound(start, 1)?),
                    end: Box::new(self.custom_bound(end, 2)?),
                };
                return Ok(SpannedArg {
                    arg: Arg::Base(base),
                    offset,
                    end: self.prev_end(),
                });
            }
        }
        let node = self.expression()?;
        Ok(SpannedArg {
            arg: Arg::Expr(node),
            offset,
            end: self.prev_end(),
        })
    }
}

/// Reads `word` as a keyword argument, trying the kind `expected` first.
fn keyword_arg(word: &str, expected: Option<ArgKind>) -> Option<Arg> {
    let mode = || SolarMode::from_keyword(word).map(Arg::Mode);
    let edge = || DayEdge::from_keyword(word).map(Arg::Edge);
    let base = || DayBase::from_keyword(word).map(Arg::Base);
    match expected {
        Some(ArgKind::Edge) => edge().or_else(mode).or_else(base),
        Some(ArgKind::Base) => base().or_else(mode).or_else(edge),
        _ => mode().or_else(edge).or_else(base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Horizon;
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    fn call(name: Builtin, args: Vec<Arg>) -> Node {
        Node::PrimitiveCall { name, args }
    }

    fn bare(name: Builtin) -> Node {
        call(name, Vec::new())
    }

    fn reference(key: &str) -> Node {
        Node::Reference { key: key.into() }
    }

    fn bin(op: BinOp, left: Node, right: Node) -> Node {
        Node::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[test]
    fn bare_primitive_and_offset() {
        assert_eq!(
            parse("sunset - 18min").unwrap(),
            bin(BinOp::Sub, bare(Builtin::Sunset), Node::Duration(TimeDelta::minutes(18)))
        );
        assert_eq!(parse("sunrise()").unwrap(), bare(Builtin::Sunrise));
    }

    #[test]
    fn solar_call_with_mode() {
        assert_eq!(
            parse("solar(16.1, before_sunrise)").unwrap(),
            call(
                Builtin::Solar,
                vec![Arg::Expr(Node::Number(16.1)), Arg::Mode(SolarMode::BeforeSunrise)]
            )
        );
    }

    #[test]
    fn precedence_and_left_associativity() {
        // @a + ((@b - @a) * 3 / 4)
        let parsed = parse("@a + ((@b - @a) * 3 / 4)").unwrap();
        let expected = bin(
            BinOp::Add,
            reference("a"),
            bin(
                BinOp::Div,
                bin(BinOp::Mul, bin(BinOp::Sub, reference("b"), reference("a")), Node::Number(3.0)),
                Node::Number(4.0),
            ),
        );
        assert_eq!(parsed, expected);

        let parsed = parse("@a - 1h - 30min").unwrap();
        let expected = bin(
            BinOp::Sub,
            bin(BinOp::Sub, reference("a"), Node::Duration(TimeDelta::hours(1))),
            Node::Duration(TimeDelta::minutes(30)),
        );
        assert_eq!(parsed, expected);

        let parsed = parse("@a + 2 * 10min").unwrap();
        assert_eq!(
            parsed,
            bin(
                BinOp::Add,
                reference("a"),
                bin(BinOp::Mul, Node::Number(2.0), Node::Duration(TimeDelta::minutes(10)))
            )
        );
    }

    #[test]
    fn parse_is_stable() {
        let src = "proportional_hours(10.75, custom(@alos, @tzeis)) + -5min";
        assert_eq!(parse(src).unwrap(), parse(src).unwrap());
    }

    #[test]
    fn display_round_trips() {
        for src in [
            "@a + ((@b - @a) * 3 / 4)",
            "first_valid(solar(8.5, after_sunset), sunset + 1h 15min)",
            "proportional_hours(3, mga_90)",
            "midpoint(civil_dawn, solar_noon) - -10min",
            "proportional_minutes(72, before_geometric_sunrise)",
            "seasonal_solar(16.1, after_visible_sunset)",
            "proportional_hours(3, mga_19_8)",
            "proportional_hours(4, baal_hatanya) + (geometric_sunset - geometric_sunrise) / 12",
        ] {
            let node = parse(src).unwrap();
            assert_eq!(parse(&node.to_string()).unwrap(), node, "{src}");
        }
    }

    #[test]
    fn proportional_hours_bases() {
        assert_eq!(
            parse("proportional_hours(3, gra)").unwrap(),
            call(
                Builtin::ProportionalHours,
                vec![Arg::Expr(Node::Number(3.0)), Arg::Base(DayBase::Gra)]
            )
        );
        assert_eq!(
            parse("proportional_hours(4, mga)").unwrap(),
            call(
                Builtin::ProportionalHours,
                vec![Arg::Expr(Node::Number(4.0)), Arg::Base(DayBase::Mga { minutes: 72 })]
            )
        );
        let custom = parse("proportional_hours(9.5, custom(@alos, @tzeis))").unwrap();
        assert_eq!(custom.references(), vec!["alos", "tzeis"]);
    }

    #[test]
    fn extended_day_bases() {
        for (word, base) in [
            ("mga_72_zmanis", DayBase::MgaZmanis { minutes: 72 }),
            ("mga_16_1", DayBase::MgaDegrees { degrees: 16.1 }),
            ("mga_26", DayBase::MgaDegrees { degrees: 26.0 }),
            ("baal_hatanya", DayBase::BaalHatanya),
            ("ateret_torah", DayBase::AteretTorah),
        ] {
            assert_eq!(
                parse(&format!("proportional_hours(3, {word})")).unwrap(),
                call(Builtin::ProportionalHours, vec![Arg::Expr(Node::Number(3.0)), Arg::Base(base)]),
                "{word}"
            );
        }
    }

    #[test]
    fn directions_follow_the_argument_position() {
        let visible_morning = DayEdge {
            side: SolarMode::BeforeSunrise,
            horizon: Horizon::Visible,
        };
        assert_eq!(
            parse("proportional_minutes(72, before_visible_sunrise)").unwrap(),
            call(
                Builtin::ProportionalMinutes,
                vec![Arg::Expr(Node::Number(72.0)), Arg::Edge(visible_morning)]
            )
        );
        assert_eq!(
            parse("proportional_minutes(72, before_sunrise)").unwrap(),
            parse("proportional_minutes(72, before_visible_sunrise)").unwrap()
        );
        assert_eq!(
            parse("seasonal_solar(16.1, after_geometric_sunset)").unwrap(),
            call(
                Builtin::SeasonalSolar,
                vec![
                    Arg::Expr(Node::Number(16.1)),
                    Arg::Edge(DayEdge {
                        side: SolarMode::AfterSunset,
                        horizon: Horizon::Geometric,
                    })
                ]
            )
        );
        assert_eq!(
            parse("solar(16.1, before_geometric_sunrise)").unwrap(),
            parse("solar(16.1, before_sunrise)").unwrap()
        );
        assert_eq!(parse("geometric_sunrise").unwrap(), bare(Builtin::GeometricSunrise));
    }

    #[test]
    fn direction_must_suit_the_function() {
        let err = parse("proportional_minutes(72, after_noon)").unwrap_err();
        assert_eq!(
            err,
            ParseError::ArgumentKind {
                function: "proportional_minutes".into(),
                position: 2,
                expected: ArgKind::Edge.describe(),
                fragment: "after_noon".into(),
                offset: 25,
            }
        );
        assert!(matches!(
            parse("seasonal_solar(16.1, gra)").unwrap_err(),
            ParseError::ArgumentKind { position: 2, .. }
        ));
        assert!(matches!(
            parse("solar(16.1, mga_16_1)").unwrap_err(),
            ParseError::ArgumentKind { position: 2, .. }
        ));
        assert!(matches!(
            parse("after_geometric_sunset + 1h").unwrap_err(),
            ParseError::UnexpectedToken { offset: 0, .. }
        ));
    }

    #[test]
    fn aliases_and_comments() {
        assert_eq!(parse("visible_sunset // the shkia\n").unwrap(), bare(Builtin::Sunset));
        assert_eq!(
            parse("solar(8.5, after_noon)").unwrap(),
            call(
                Builtin::Solar,
                vec![Arg::Expr(Node::Number(8.5)), Arg::Mode(SolarMode::AfterSunset)]
            )
        );
    }

    #[test]
    fn unknown_primitive() {
        assert_eq!(
            parse("sunrise + moonrise").unwrap_err(),
            ParseError::UnknownPrimitive {
                fragment: "moonrise".into(),
                offset: 10
            }
        );
    }

    #[test]
    fn unbalanced_parens() {
        assert_eq!(
            parse("(sunrise + 1h").unwrap_err(),
            ParseError::UnbalancedParens {
                fragment: "(".into(),
                offset: 0
            }
        );
        assert_eq!(
            parse("sunrise + 1h)").unwrap_err(),
            ParseError::UnbalancedParens {
                fragment: ")".into(),
                offset: 12
            }
        );
        assert_eq!(
            parse("solar(16.1, before_sunrise").unwrap_err(),
            ParseError::UnbalancedParens {
                fragment: "(".into(),
                offset: 5
            }
        );
    }

    #[test]
    fn malformed_duration_surfaces() {
        let err = parse("@shkia + 42m").unwrap_err();
        assert!(matches!(err, ParseError::MalformedDuration { .. }));
        assert_eq!(err.offset(), 9);
        assert_eq!(err.fragment(), "42m");
    }

    #[test]
    fn arity_and_argument_kinds() {
        assert!(matches!(
            parse("solar(16.1)").unwrap_err(),
            ParseError::Arity { found: 1, .. }
        ));
        assert!(matches!(parse("midpoint").unwrap_err(), ParseError::Arity { found: 0, .. }));
        assert!(matches!(
            parse("first_valid(sunrise)").unwrap_err(),
            ParseError::Arity { found: 1, .. }
        ));
        assert!(matches!(parse("sunrise(1)").unwrap_err(), ParseError::Arity { .. }));

        let err = parse("solar(16.1, gra)").unwrap_err();
        assert_eq!(
            err,
            ParseError::ArgumentKind {
                function: "solar".into(),
                position: 2,
                expected: "a mode (before_sunrise, after_sunset)",
                fragment: "gra".into(),
                offset: 12,
            }
        );
        assert!(matches!(
            parse("proportional_hours(3, sunrise)").unwrap_err(),
            ParseError::ArgumentKind { position: 2, .. }
        ));
        assert!(matches!(
            parse("midpoint(before_sunrise, sunset)").unwrap_err(),
            ParseError::ArgumentKind { position: 1, .. }
        ));
    }

    #[test]
    fn structural_errors() {
        assert_eq!(
            parse("").unwrap_err(),
            ParseError::UnexpectedEnd {
                offset: 0,
                expected: "expression"
            }
        );
        assert!(matches!(parse("sunrise +").unwrap_err(), ParseError::UnexpectedEnd { .. }));
        assert!(matches!(
            parse("sunrise sunset").unwrap_err(),
            ParseError::UnexpectedToken { offset: 8, .. }
        ));
        assert!(matches!(
            parse("before_sunrise + 1h").unwrap_err(),
            ParseError::UnexpectedToken { offset: 0, .. }
        ));
        assert!(matches!(
            parse("-sunrise").unwrap_err(),
            ParseError::UnexpectedToken { offset: 1, .. }
        ));
    }

    #[test]
    fn deep_parentheses_are_rejected() {
        let src = format!("{}sunrise{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(
            parse(&src).unwrap_err(),
            ParseError::NestingTooDeep {
                fragment: "(".into(),
                offset: MAX_NESTING,
                limit: MAX_NESTING,
            }
        );

        let at_limit = format!("{}sunrise{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(parse(&at_limit).unwrap(), bare(Builtin::Sunrise));
    }

    #[test]
    fn long_operator_chains_are_rejected() {
        let src = format!("sunrise{}", " + 1min".repeat(500));
        let err = parse(&src).unwrap_err();
        assert!(matches!(err, ParseError::NestingTooDeep { .. }));
        assert_eq!(err.fragment(), "+");
        assert_eq!(err.offset(), 8 + 7 * MAX_NESTING);

        let ok = format!("sunrise{}", " + 1min".repeat(20));
        assert!(parse(&ok).is_ok());
    }

    #[test]
    fn deeply_nested_calls_are_rejected() {
        let src = format!("{}sunset{}", "earlier_of(sunrise, ".repeat(1_000), ")".repeat(1_000));
        assert!(matches!(parse(&src).unwrap_err(), ParseError::NestingTooDeep { .. }));
    }

    #[test]
    fn negative_literals() {
        assert_eq!(parse("-10min").unwrap(), Node::Duration(TimeDelta::minutes(-10)));
        assert_eq!(
            parse("sunset - -3").unwrap(),
            bin(BinOp::Sub, bare(Builtin::Sunset), Node::Number(-3.0))
        );
    }
}
