//! Restricted expression language for derived field values.
//!
//! Rule expressions are evaluated after their `${field}` placeholders have
//! been replaced with quoted string literals. The grammar only knows
//! literals, operators, parentheses and a fixed set of string members, so
//! nothing in an expression can reach ambient state:
//!
//! ```text
//! expr           := ternary
//! ternary        := or ( '?' expr ':' expr )?
//! or             := and ( '||' and )*
//! and            := equality ( '&&' equality )*
//! equality       := compare ( ('==' | '!=' | '===' | '!==') compare )*
//! compare        := additive ( ('<' | '<=' | '>' | '>=') additive )*
//! additive       := multiplicative ( ('+' | '-') multiplicative )*
//! multiplicative := unary ( ('*' | '/' | '%') unary )*
//! unary          := ('-' | '+' | '!') unary | postfix
//! postfix        := primary ( '.' ident ( '(' args? ')' )? )*
//! primary        := string | number | 'true' | 'false' | '(' expr ')'
//! ```
//!
//! Evaluation is bounded by [`EvalLimits`]. `max_depth` counts every
//! operator in a left-associative chain as one level, since each one nests
//! the previous result: `${a} + ${b} + ${c}` is three levels deep. A flat
//! concatenation of more than `max_depth` terms therefore fails with
//! [`EvalError::TooDeep`]; raise `limits.max_depth` in the rule set for
//! very long templates.

pub mod eval;
pub mod lexer;
pub mod parser;
pub mod value;

use crate::error::EvalError;
use serde::{Deserialize, Serialize};

pub use eval::Evaluator;
pub use parser::{BinaryOp, Expr, LogicalOp, UnaryOp};
pub use value::Value;

// Default value functions for serde
fn default_max_steps() -> usize {
    10_000
}

fn default_max_depth() -> usize {
    256
}

fn default_max_output_len() -> usize {
    1024 * 1024
}

/// Guard limits applied to every expression evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalLimits {
    /// Evaluation fuel: one unit per expression node visited
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Maximum nesting of the parsed expression
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Maximum byte length of any string produced while evaluating
    #[serde(default = "default_max_output_len")]
    pub max_output_len: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_depth: default_max_depth(),
            max_output_len: default_max_output_len(),
        }
    }
}

/// Parse `source` into an expression tree.
pub fn parse(source: &str, limits: &EvalLimits) -> Result<Expr, EvalError> {
    let tokens = lexer::tokenize(source)?;
    parser::Parser::new(tokens, limits.max_depth).parse()
}

/// Parse and evaluate `source`, rendering the result as a string.
pub fn evaluate(source: &str, limits: &EvalLimits) -> Result<String, EvalError> {
    let expr = parse(source, limits)?;
    let value = Evaluator::new(limits).eval(&expr)?;
    Ok(value.into_string())
}
