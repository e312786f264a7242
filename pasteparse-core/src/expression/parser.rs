use super::lexer::{Spanned, Token};
use crate::error::EvalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Num(f64),
    Bool(bool),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// `target.name` (property) or `target.name(args)` (method call)
    Member {
        target: Box<Expr>,
        name: String,
        args: Option<Vec<Expr>>,
    },
}

/// Recursive-descent parser over a token stream.
///
/// `depth` tracks how deep the tree under construction is. Left-associative
/// operator chains count one level per operator since each one nests the
/// previous result, which keeps the evaluator's recursion bounded too.
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>, max_depth: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    pub fn parse(mut self) -> Result<Expr, EvalError> {
        let expr = self.expression()?;
        match self.tokens.get(self.pos) {
            None => Ok(expr),
            Some((token, span)) => Err(EvalError::UnexpectedToken {
                found: token.to_string(),
                expected: "end of expression",
                offset: span.start,
            }),
        }
    }

    fn enter(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(EvalError::TooDeep(self.max_depth));
        }
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, description: &'static str) -> Result<(), EvalError> {
        match self.advance() {
            Some((token, _)) if token == expected => Ok(()),
            Some((token, span)) => Err(EvalError::UnexpectedToken {
                found: token.to_string(),
                expected: description,
                offset: span.start,
            }),
            None => Err(EvalError::UnexpectedEnd(description)),
        }
    }

    fn expression(&mut self) -> Result<Expr, EvalError> {
        self.enter()?;
        let expr = self.ternary();
        self.leave(1);
        expr
    }

    fn ternary(&mut self) -> Result<Expr, EvalError> {
        let cond = self.logical_or()?;
        if !self.eat(&Token::Question) {
            return Ok(cond);
        }
        let then = self.expression()?;
        self.expect(Token::Colon, "':'")?;
        let otherwise = self.expression()?;
        Ok(Expr::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn logical_or(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.logical_and()?;
        let mut chain = 0;
        while self.eat(&Token::OrOr) {
            self.enter()?;
            chain += 1;
            let rhs = self.logical_and()?;
            lhs = Expr::Logical {
                op: LogicalOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        self.leave(chain);
        Ok(lhs)
    }

    fn logical_and(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.equality()?;
        let mut chain = 0;
        while self.eat(&Token::AndAnd) {
            self.enter()?;
            chain += 1;
            let rhs = self.equality()?;
            lhs = Expr::Logical {
                op: LogicalOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        self.leave(chain);
        Ok(lhs)
    }

    /// Shared loop for the left-associative binary precedence levels.
    fn binary_level(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, EvalError>,
        operator: fn(&Token) -> Option<BinaryOp>,
    ) -> Result<Expr, EvalError> {
        let mut lhs = operand(self)?;
        let mut chain = 0;
        while let Some(op) = self.peek().and_then(operator) {
            self.pos += 1;
            self.enter()?;
            chain += 1;
            let rhs = operand(self)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        self.leave(chain);
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(Self::comparison, |token| match token {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::NotEq),
            Token::EqEqEq => Some(BinaryOp::StrictEq),
            Token::NotEqEq => Some(BinaryOp::StrictNotEq),
            _ => None,
        })
    }

    fn comparison(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(Self::additive, |token| match token {
            Token::Lt => Some(BinaryOp::Lt),
            Token::LtEq => Some(BinaryOp::LtEq),
            Token::Gt => Some(BinaryOp::Gt),
            Token::GtEq => Some(BinaryOp::GtEq),
            _ => None,
        })
    }

    fn additive(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(Self::multiplicative, |token| match token {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn multiplicative(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(Self::unary, |token| match token {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Percent => Some(BinaryOp::Rem),
            _ => None,
        })
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Bang) => UnaryOp::Not,
            _ => return self.postfix(),
        };
        self.pos += 1;
        self.enter()?;
        let operand = self.unary();
        self.leave(1);
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand?),
        })
    }

    fn postfix(&mut self) -> Result<Expr, EvalError> {
        let mut target = self.primary()?;
        let mut chain = 0;
        while self.eat(&Token::Dot) {
            self.enter()?;
            chain += 1;
            let name = match self.advance() {
                Some((Token::Ident(name), _)) => name,
                Some((token, span)) => {
                    return Err(EvalError::UnexpectedToken {
                        found: token.to_string(),
                        expected: "a member name",
                        offset: span.start,
                    })
                }
                None => return Err(EvalError::UnexpectedEnd("a member name")),
            };
            let args = if self.eat(&Token::OpenParen) {
                Some(self.arguments()?)
            } else {
                None
            };
            target = Expr::Member {
                target: Box::new(target),
                name,
                args,
            };
        }
        self.leave(chain);
        Ok(target)
    }

    /// Arguments after an opening parenthesis, consuming the closing one.
    fn arguments(&mut self) -> Result<Vec<Expr>, EvalError> {
        let mut args = Vec::new();
        if self.eat(&Token::CloseParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(Token::CloseParen, "',' or ')'")?;
            return Ok(args);
        }
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        match self.advance() {
            Some((Token::Str(s), _)) => Ok(Expr::Str(s)),
            Some((Token::Num(n), _)) => Ok(Expr::Num(n)),
            Some((Token::Bool(b), _)) => Ok(Expr::Bool(b)),
            Some((Token::OpenParen, _)) => {
                let inner = self.expression()?;
                self.expect(Token::CloseParen, "')'")?;
                Ok(inner)
            }
            Some((Token::Ident(name), _)) => Err(EvalError::UnknownIdentifier(name)),
            Some((token, span)) => Err(EvalError::UnexpectedToken {
                found: token.to_string(),
                expected: "an expression",
                offset: span.start,
            }),
            None => Err(EvalError::UnexpectedEnd("an expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::lexer::tokenize;

    fn parse(source: &str) -> Result<Expr, EvalError> {
        Parser::new(tokenize(source)?, 64).parse()
    }

    fn s(text: &str) -> Box<Expr> {
        Box::new(Expr::Str(text.to_string()))
    }

    #[test]
    fn test_precedence() {
        let expr = parse("'a' + 'b' == 'ab' || 'c'").unwrap();
        assert_eq!(
            expr,
            Expr::Logical {
                op: LogicalOp::Or,
                lhs: Box::new(Expr::Binary {
                    op: BinaryOp::Eq,
                    lhs: Box::new(Expr::Binary {
                        op: BinaryOp::Add,
                        lhs: s("a"),
                        rhs: s("b"),
                    }),
                    rhs: s("ab"),
                }),
                rhs: s("c"),
            }
        );
    }

    #[test]
    fn test_left_associativity() {
        let expr = parse("1 - 2 - 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Sub,
                lhs: Box::new(Expr::Binary {
                    op: BinaryOp::Sub,
                    lhs: Box::new(Expr::Num(1.0)),
                    rhs: Box::new(Expr::Num(2.0)),
                }),
                rhs: Box::new(Expr::Num(3.0)),
            }
        );
    }

    #[test]
    fn test_member_calls() {
        let expr = parse("'x'.padStart(3, '0').length").unwrap();
        assert_eq!(
            expr,
            Expr::Member {
                target: Box::new(Expr::Member {
                    target: s("x"),
                    name: "padStart".to_string(),
                    args: Some(vec![Expr::Num(3.0), Expr::Str("0".to_string())]),
                }),
                name: "length".to_string(),
                args: None,
            }
        );
    }

    #[test]
    fn test_nested_ternary() {
        let expr = parse("true ? false ? 'a' : 'b' : 'c'").unwrap();
        assert!(matches!(expr, Expr::Conditional { .. }));
    }

    #[test]
    fn test_long_chains_are_bounded() {
        let source = vec!["'a'"; 100].join(" + ");
        assert_eq!(parse(&source), Err(EvalError::TooDeep(64)));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(matches!(
            parse("'a' )"),
            Err(EvalError::UnexpectedToken {
                expected: "end of expression",
                offset: 4,
                ..
            })
        ));
    }
}
