use super::parser::{BinaryOp, Expr, LogicalOp, UnaryOp};
use super::value::Value;
use super::EvalLimits;
use crate::error::EvalError;
use std::cmp::Ordering;

/// Tree-walking evaluator with a step budget.
pub struct Evaluator<'a> {
    limits: &'a EvalLimits,
    steps: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(limits: &'a EvalLimits) -> Self {
        Self { limits, steps: 0 }
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        self.tick()?;
        match expr {
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Num(n) => Ok(Value::Num(*n)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Neg => Value::Num(-value.to_number()),
                    UnaryOp::Plus => Value::Num(value.to_number()),
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                })
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                self.binary(*op, lhs, rhs)
            }
            Expr::Logical { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                match (op, lhs.truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(lhs),
                    _ => self.eval(rhs),
                }
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Member { target, name, args } => {
                let target = self.eval(target)?.into_string();
                let args = match args {
                    Some(args) => Some(
                        args.iter()
                            .map(|arg| self.eval(arg))
                            .collect::<Result<Vec<_>, _>>()?,
                    ),
                    None => None,
                };
                self.member(&target, name, args)
            }
        }
    }

    fn tick(&mut self) -> Result<(), EvalError> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(EvalError::StepBudgetExceeded(self.limits.max_steps));
        }
        Ok(())
    }

    fn check_len(&self, s: String) -> Result<Value, EvalError> {
        if s.len() > self.limits.max_output_len {
            return Err(EvalError::OutputTooLong(self.limits.max_output_len));
        }
        Ok(Value::Str(s))
    }

    fn binary(&self, op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
        let value = match op {
            BinaryOp::Add if lhs.is_str() || rhs.is_str() => {
                let mut joined = lhs.into_string();
                joined.push_str(&rhs.into_string());
                return self.check_len(joined);
            }
            BinaryOp::Add => Value::Num(lhs.to_number() + rhs.to_number()),
            BinaryOp::Sub => Value::Num(lhs.to_number() - rhs.to_number()),
            BinaryOp::Mul => Value::Num(lhs.to_number() * rhs.to_number()),
            BinaryOp::Div => Value::Num(lhs.to_number() / rhs.to_number()),
            BinaryOp::Rem => Value::Num(lhs.to_number() % rhs.to_number()),
            BinaryOp::Eq => Value::Bool(loose_eq(&lhs, &rhs)),
            BinaryOp::NotEq => Value::Bool(!loose_eq(&lhs, &rhs)),
            BinaryOp::StrictEq => Value::Bool(strict_eq(&lhs, &rhs)),
            BinaryOp::StrictNotEq => Value::Bool(!strict_eq(&lhs, &rhs)),
            BinaryOp::Lt => Value::Bool(compare(&lhs, &rhs) == Some(Ordering::Less)),
            BinaryOp::LtEq => Value::Bool(matches!(
                compare(&lhs, &rhs),
                Some(Ordering::Less | Ordering::Equal)
            )),
            BinaryOp::Gt => Value::Bool(compare(&lhs, &rhs) == Some(Ordering::Greater)),
            BinaryOp::GtEq => Value::Bool(matches!(
                compare(&lhs, &rhs),
                Some(Ordering::Greater | Ordering::Equal)
            )),
        };
        Ok(value)
    }

    fn member(
        &self,
        target: &str,
        name: &str,
        args: Option<Vec<Value>>,
    ) -> Result<Value, EvalError> {
        let args = match (name, args) {
            ("length", None) => return Ok(Value::Num(target.chars().count() as f64)),
            ("length", Some(_)) => {
                return Err(EvalError::InvalidMemberUse {
                    member: name.to_string(),
                    reason: "is a property, not a method",
                })
            }
            (_, Some(args)) => args,
            (_, None) if is_method(name) => {
                return Err(EvalError::InvalidMemberUse {
                    member: name.to_string(),
                    reason: "is a method and must be called",
                })
            }
            (_, None) => return Err(EvalError::UnknownMember(name.to_string())),
        };

        let arity = |min: usize, max: usize, expected: &'static str| {
            if args.len() < min || args.len() > max {
                Err(EvalError::WrongArity {
                    member: name.to_string(),
                    expected,
                    found: args.len(),
                })
            } else {
                Ok(())
            }
        };
        let text = |i: usize| args.get(i).map(|v| v.to_string()).unwrap_or_default();
        let number = |i: usize| args.get(i).map(Value::to_number);

        match name {
            "trim" => {
                arity(0, 0, "no")?;
                Ok(Value::Str(target.trim().to_string()))
            }
            "trimStart" => {
                arity(0, 0, "no")?;
                Ok(Value::Str(target.trim_start().to_string()))
            }
            "trimEnd" => {
                arity(0, 0, "no")?;
                Ok(Value::Str(target.trim_end().to_string()))
            }
            "toUpperCase" => {
                arity(0, 0, "no")?;
                self.check_len(target.to_uppercase())
            }
            "toLowerCase" => {
                arity(0, 0, "no")?;
                self.check_len(target.to_lowercase())
            }
            "toString" => {
                arity(0, 0, "no")?;
                Ok(Value::Str(target.to_string()))
            }
            "replace" => {
                arity(2, 2, "2")?;
                self.check_len(target.replacen(&text(0), &text(1), 1))
            }
            "replaceAll" => {
                arity(2, 2, "2")?;
                let (from, to) = (text(0), text(1));
                let occurrences = if from.is_empty() {
                    target.chars().count() + 1
                } else {
                    target.matches(from.as_str()).count()
                };
                let grown = occurrences.saturating_mul(to.len());
                if target.len().saturating_add(grown) > self.limits.max_output_len {
                    return Err(EvalError::OutputTooLong(self.limits.max_output_len));
                }
                Ok(Value::Str(target.replace(from.as_str(), &to)))
            }
            "substring" => {
                arity(1, 2, "1 or 2")?;
                let len = target.chars().count();
                let clamp = |n: f64| to_integer(n).clamp(0, len as i64) as usize;
                let start = clamp(number(0).unwrap_or(0.0));
                let end = number(1).map(clamp).unwrap_or(len);
                let (start, end) = if start > end { (end, start) } else { (start, end) };
                Ok(Value::Str(char_slice(target, start, end)))
            }
            "slice" => {
                arity(1, 2, "1 or 2")?;
                let len = target.chars().count() as i64;
                let resolve = |n: f64| {
                    let n = to_integer(n);
                    if n < 0 {
                        (len + n).max(0) as usize
                    } else {
                        n.min(len) as usize
                    }
                };
                let start = resolve(number(0).unwrap_or(0.0));
                let end = number(1).map(resolve).unwrap_or(len as usize);
                if start >= end {
                    return Ok(Value::Str(String::new()));
                }
                Ok(Value::Str(char_slice(target, start, end)))
            }
            "startsWith" => {
                arity(1, 1, "1")?;
                Ok(Value::Bool(target.starts_with(text(0).as_str())))
            }
            "endsWith" => {
                arity(1, 1, "1")?;
                Ok(Value::Bool(target.ends_with(text(0).as_str())))
            }
            "includes" => {
                arity(1, 1, "1")?;
                Ok(Value::Bool(target.contains(text(0).as_str())))
            }
            "indexOf" => {
                arity(1, 1, "1")?;
                let index = target
                    .find(text(0).as_str())
                    .map(|byte| target[..byte].chars().count() as f64)
                    .unwrap_or(-1.0);
                Ok(Value::Num(index))
            }
            "padStart" | "padEnd" => {
                arity(1, 2, "1 or 2")?;
                let target_len = to_integer(number(0).unwrap_or(0.0)).max(0) as usize;
                let fill = if args.len() > 1 { text(1) } else { " ".to_string() };
                let current = target.chars().count();
                if target_len <= current || fill.is_empty() {
                    return Ok(Value::Str(target.to_string()));
                }
                if target_len > self.limits.max_output_len {
                    return Err(EvalError::OutputTooLong(self.limits.max_output_len));
                }
                let padding: String = fill.chars().cycle().take(target_len - current).collect();
                let padded = if name == "padStart" {
                    padding + target
                } else {
                    target.to_string() + &padding
                };
                self.check_len(padded)
            }
            "repeat" => {
                arity(1, 1, "1")?;
                let count = number(0).unwrap_or(0.0);
                if count < 0.0 || count.is_infinite() {
                    return Err(EvalError::InvalidArgument {
                        member: name.to_string(),
                        reason: format!("count must be a finite non-negative number, got {count}"),
                    });
                }
                let count = to_integer(count) as usize;
                if target.len().saturating_mul(count) > self.limits.max_output_len {
                    return Err(EvalError::OutputTooLong(self.limits.max_output_len));
                }
                Ok(Value::Str(target.repeat(count)))
            }
            _ => Err(EvalError::UnknownMember(name.to_string())),
        }
    }
}

const METHODS: &[&str] = &[
    "trim",
    "trimStart",
    "trimEnd",
    "toUpperCase",
    "toLowerCase",
    "toString",
    "replace",
    "replaceAll",
    "substring",
    "slice",
    "startsWith",
    "endsWith",
    "includes",
    "indexOf",
    "padStart",
    "padEnd",
    "repeat",
];

fn is_method(name: &str) -> bool {
    METHODS.contains(&name)
}

/// Truncate toward zero; NaN becomes zero.
fn to_integer(n: f64) -> i64 {
    if n.is_nan() {
        0
    } else {
        n.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i64
    }
}

fn char_slice(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => lhs.to_number() == rhs.to_number(),
    }
}

fn strict_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Num(a), Value::Num(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => false,
    }
}

/// Strings compare lexically, everything else numerically. `None` when
/// either side is NaN.
fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => lhs.to_number().partial_cmp(&rhs.to_number()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::evaluate;

    fn eval(source: &str) -> String {
        evaluate(source, &EvalLimits::default()).unwrap()
    }

    #[test]
    fn test_equality_coercion() {
        assert_eq!(eval("'1' == 1"), "true");
        assert_eq!(eval("'1' === 1"), "false");
        assert_eq!(eval("'a' != 'b'"), "true");
        assert_eq!(eval("true == 1"), "true");
    }

    #[test]
    fn test_comparison() {
        assert_eq!(eval("'apple' < 'banana'"), "true");
        assert_eq!(eval("'10' < 9"), "false");
        assert_eq!(eval("'x' < 1"), "false");
        assert_eq!(eval("2 >= 2"), "true");
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(eval("0 || 'zero'"), "zero");
        assert_eq!(eval("'' && 'never'"), "");
        assert_eq!(eval("!''"), "true");
    }

    #[test]
    fn test_unary_and_remainder() {
        assert_eq!(eval("-'5' + 2"), "-3");
        assert_eq!(eval("-7 % 3"), "-1");
        assert_eq!(eval("1 / 0"), "Infinity");
    }

    #[test]
    fn test_members_work_on_characters() {
        assert_eq!(eval("'héllo'.length"), "5");
        assert_eq!(eval("'héllo'.substring(1, 3)"), "él");
        assert_eq!(eval("'héllo'.indexOf('l')"), "2");
        assert_eq!(eval("'abc'.indexOf('z')"), "-1");
        assert_eq!(eval("'x'.padEnd(4, 'ab')"), "xaba");
        assert_eq!(eval("'ab'.repeat(3)"), "ababab");
        assert_eq!(eval("(12).toString() + '!'"), "12!");
    }

    #[test]
    fn test_member_misuse() {
        let limits = EvalLimits::default();
        assert!(matches!(
            evaluate("'a'.trim", &limits),
            Err(EvalError::InvalidMemberUse { .. })
        ));
        assert!(matches!(
            evaluate("'a'.length()", &limits),
            Err(EvalError::InvalidMemberUse { .. })
        ));
        assert!(matches!(
            evaluate("'a'.replace('a')", &limits),
            Err(EvalError::WrongArity { found: 1, .. })
        ));
        assert!(matches!(
            evaluate("'a'.repeat(-1)", &limits),
            Err(EvalError::InvalidArgument { .. })
        ));
    }
}
