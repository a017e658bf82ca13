//! Recursive descent parser for the supported XPath grammar.

use crate::xpath::ast::{BinaryOp, Expr, NameTest, Path, Step};
use crate::xpath::errors::XPathError;
use crate::xpath::lexer::{tokenize, Token};

/// Parse an expression string into an AST.
pub fn parse(input: &str) -> Result<Expr, XPathError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos < parser.tokens.len() {
        return Err(XPathError::syntax(format!(
            "unexpected trailing token {:?}",
            parser.peek()
        )));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek2(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), XPathError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(XPathError::syntax(format!(
                "expected {token:?}, got {:?}",
                self.peek()
            )))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::And) {
            let right = self.parse_equality()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = if self.eat(&Token::Eq) {
                BinaryOp::Eq
            } else if self.eat(&Token::Ne) {
                BinaryOp::Ne
            } else {
                break;
            };
            let right = self.parse_relational()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = if self.eat(&Token::Lt) {
                BinaryOp::Lt
            } else if self.eat(&Token::Le) {
                BinaryOp::Le
            } else if self.eat(&Token::Gt) {
                BinaryOp::Gt
            } else if self.eat(&Token::Ge) {
                BinaryOp::Ge
            } else {
                break;
            };
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.eat(&Token::Plus) {
                BinaryOp::Add
            } else if self.eat(&Token::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, XPathError> {
        if self.eat(&Token::Minus) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Negate(Box::new(inner)));
        }
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_primary()?;
        while self.eat(&Token::Pipe) {
            let right = self.parse_primary()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr, XPathError> {
        match self.peek() {
            Some(Token::LParen) => {
                self.advance();
                let expr = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(Token::Literal(_)) => match self.advance() {
                Some(Token::Literal(s)) => Ok(Expr::Literal(s)),
                _ => unreachable!("peeked literal"),
            },
            Some(Token::Number(_)) => match self.advance() {
                Some(Token::Number(n)) => Ok(Expr::Number(n)),
                _ => unreachable!("peeked number"),
            },
            Some(Token::Name(name)) if self.peek2() == Some(&Token::LParen) => {
                let name = name.clone();
                if matches!(name.as_str(), "text" | "node" | "comment") {
                    return self.parse_location_path().map(Expr::Path);
                }
                self.advance();
                self.advance();
                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    loop {
                        args.push(self.parse_or()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RParen)?;
                Ok(Expr::Call(name, args))
            }
            Some(
                Token::Slash
                | Token::DoubleSlash
                | Token::Dot
                | Token::DotDot
                | Token::At
                | Token::Star
                | Token::Name(_),
            ) => self.parse_location_path().map(Expr::Path),
            other => Err(XPathError::syntax(format!(
                "expected an expression, got {other:?}"
            ))),
        }
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name(_) | Token::Star | Token::Dot | Token::DotDot | Token::At)
        )
    }

    fn parse_location_path(&mut self) -> Result<Path, XPathError> {
        let mut steps = Vec::new();
        let absolute;
        let mut descendant;
        if self.eat(&Token::DoubleSlash) {
            absolute = true;
            descendant = true;
        } else if self.eat(&Token::Slash) {
            absolute = true;
            if !self.starts_step() {
                // A bare "/" selects the document itself.
                return Ok(Path { absolute, steps });
            }
            descendant = false;
        } else {
            absolute = false;
            descendant = false;
        }
        loop {
            steps.push(self.parse_step(descendant)?);
            if self.eat(&Token::Slash) {
                descendant = false;
            } else if self.eat(&Token::DoubleSlash) {
                descendant = true;
            } else {
                break;
            }
        }
        Ok(Path { absolute, steps })
    }

    fn parse_step(&mut self, descendant: bool) -> Result<Step, XPathError> {
        match self.advance() {
            Some(Token::Dot) => {
                if descendant {
                    return Err(XPathError::unsupported("'//.' step"));
                }
                Ok(Step::SelfNode)
            }
            Some(Token::DotDot) => {
                if descendant {
                    return Err(XPathError::unsupported("'//..' step"));
                }
                Ok(Step::Parent)
            }
            Some(Token::At) => {
                if descendant {
                    return Err(XPathError::unsupported("'//@' step"));
                }
                let name = match self.advance() {
                    Some(Token::Name(n)) => n,
                    other => {
                        return Err(XPathError::syntax(format!(
                            "expected an attribute name after '@', got {other:?}"
                        )))
                    }
                };
                if self.peek() == Some(&Token::LBracket) {
                    return Err(XPathError::unsupported("predicate on an attribute step"));
                }
                Ok(Step::Attribute(name))
            }
            Some(Token::Star) => Ok(Step::Element {
                descendant,
                test: NameTest::Any,
                predicates: self.parse_predicates()?,
            }),
            Some(Token::Name(name)) => {
                if self.eat(&Token::LParen) {
                    self.expect(&Token::RParen)?;
                    return match name.as_str() {
                        "text" => {
                            if descendant {
                                return Err(XPathError::unsupported("'//text()' step"));
                            }
                            if self.peek() == Some(&Token::LBracket) {
                                return Err(XPathError::unsupported(
                                    "predicate on a text() step",
                                ));
                            }
                            Ok(Step::Text)
                        }
                        "node" => Ok(Step::Element {
                            descendant,
                            test: NameTest::Any,
                            predicates: self.parse_predicates()?,
                        }),
                        other => Err(XPathError::unsupported(format!("{other}() node test"))),
                    };
                }
                Ok(Step::Element {
                    descendant,
                    test: NameTest::Name(name),
                    predicates: self.parse_predicates()?,
                })
            }
            other => Err(XPathError::syntax(format!(
                "expected a location step, got {other:?}"
            ))),
        }
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.parse_or()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(predicates)
    }
}
