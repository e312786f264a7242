//! Token definitions for rule expressions.
use crate::error::EvalError;
use logos::{Lexer, Logos};
use std::fmt;
use std::ops::Range;

/// A token together with its byte span in the source.
pub type Spanned = (Token, Range<usize>);

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // Literals
    #[regex(r"'([^'\\]|\\[^\n]|\\\n)*'", unescape)]
    #[regex(r#""([^"\\]|\\[^\n]|\\\n)*""#, unescape)]
    Str(String),
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Num(f64),
    #[token("true", |_| true)]
    #[token("false", |_| false)]
    Bool(bool),
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Punctuation
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("==")]
    EqEq,
    #[token("===")]
    EqEqEq,
    #[token("!=")]
    NotEq,
    #[token("!==")]
    NotEqEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
}

/// Strip the quotes from a string literal and resolve its escapes.
fn unescape(lex: &mut Lexer<Token>) -> String {
    let raw = lex.slice();
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            // line continuation
            Some('\n') => {}
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Str(s) => write!(f, "string {s:?}"),
            Token::Num(n) => write!(f, "number {n}"),
            Token::Bool(b) => write!(f, "'{b}'"),
            Token::Ident(name) => write!(f, "identifier '{name}'"),
            other => {
                let symbol = match other {
                    Token::OpenParen => "(",
                    Token::CloseParen => ")",
                    Token::Dot => ".",
                    Token::Comma => ",",
                    Token::Question => "?",
                    Token::Colon => ":",
                    Token::Plus => "+",
                    Token::Minus => "-",
                    Token::Star => "*",
                    Token::Slash => "/",
                    Token::Percent => "%",
                    Token::Bang => "!",
                    Token::EqEq => "==",
                    Token::EqEqEq => "===",
                    Token::NotEq => "!=",
                    Token::NotEqEq => "!==",
                    Token::Lt => "<",
                    Token::LtEq => "<=",
                    Token::Gt => ">",
                    Token::GtEq => ">=",
                    Token::AndAnd => "&&",
                    Token::OrOr => "||",
                    _ => "?",
                };
                write!(f, "'{symbol}'")
            }
        }
    }
}

/// Tokenize an expression, keeping the byte span of every token.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, EvalError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let offset = span.start;
                return Err(match source[offset..].chars().next() {
                    Some('\'' | '"') => EvalError::UnterminatedString(offset),
                    Some(ch) => EvalError::UnexpectedChar { ch, offset },
                    None => EvalError::UnexpectedEnd("a token"),
                });
            }
        }
    }

    Ok(tokens)
}
