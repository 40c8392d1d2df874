//! Vectorized boolean expressions over frame columns.
//!
//! An [`Expr`] is a pure function of already-computed columns; the filter
//! engine merges consecutive fast-matcher expressions with AND before
//! evaluating them in one pass.

use crate::error::{Result, SluiceError};

use super::table::Frame;
use super::value::Value;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// Arithmetic operators. Division is floor division, matching the
/// crop-to-grid arithmetic the resolution rule needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    FloorDiv,
}

/// An expression tree evaluated elementwise over a frame.
///
/// Null handling follows three-valued logic: a comparison or arithmetic
/// node with a null operand yields null, and a null survives AND/OR unless
/// the other side decides the outcome. [`Expr::mask`] treats null as false.
#[derive(Debug, Clone)]
pub enum Expr {
    Col(String),
    Lit(Value),
    Cmp {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Arith {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// True where the string value contains `needle`.
    Contains { inner: Box<Expr>, needle: String },
    /// Elementwise minimum across sub-expressions, ignoring nulls.
    MinHorizontal(Vec<Expr>),
    /// Elementwise maximum across sub-expressions, ignoring nulls.
    MaxHorizontal(Vec<Expr>),
}

impl Expr {
    pub fn col(name: impl Into<String>) -> Expr {
        Expr::Col(name.into())
    }

    pub fn lit(value: impl Into<Value>) -> Expr {
        Expr::Lit(value.into())
    }

    fn cmp(self, op: CmpOp, rhs: Expr) -> Expr {
        Expr::Cmp {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs),
        }
    }

    pub fn lt(self, rhs: Expr) -> Expr {
        self.cmp(CmpOp::Lt, rhs)
    }

    pub fn le(self, rhs: Expr) -> Expr {
        self.cmp(CmpOp::Le, rhs)
    }

    pub fn gt(self, rhs: Expr) -> Expr {
        self.cmp(CmpOp::Gt, rhs)
    }

    pub fn ge(self, rhs: Expr) -> Expr {
        self.cmp(CmpOp::Ge, rhs)
    }

    pub fn eq(self, rhs: Expr) -> Expr {
        self.cmp(CmpOp::Eq, rhs)
    }

    pub fn ne(self, rhs: Expr) -> Expr {
        self.cmp(CmpOp::Ne, rhs)
    }

    fn arith(self, op: ArithOp, rhs: Expr) -> Expr {
        Expr::Arith {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs),
        }
    }

    pub fn add(self, rhs: Expr) -> Expr {
        self.arith(ArithOp::Add, rhs)
    }

    pub fn sub(self, rhs: Expr) -> Expr {
        self.arith(ArithOp::Sub, rhs)
    }

    pub fn mul(self, rhs: Expr) -> Expr {
        self.arith(ArithOp::Mul, rhs)
    }

    pub fn floor_div(self, rhs: Expr) -> Expr {
        self.arith(ArithOp::FloorDiv, rhs)
    }

    pub fn and(self, rhs: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(rhs))
    }

    pub fn or(self, rhs: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(rhs))
    }

    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }

    pub fn contains(self, needle: impl Into<String>) -> Expr {
        Expr::Contains {
            inner: Box::new(self),
            needle: needle.into(),
        }
    }

    pub fn min_horizontal(exprs: Vec<Expr>) -> Expr {
        Expr::MinHorizontal(exprs)
    }

    pub fn max_horizontal(exprs: Vec<Expr>) -> Expr {
        Expr::MaxHorizontal(exprs)
    }

    /// AND-combine a non-empty list of expressions.
    pub fn all(exprs: Vec<Expr>) -> Result<Expr> {
        let mut merged: Option<Expr> = None;
        for expr in exprs {
            merged = Some(match merged {
                Some(acc) => acc.and(expr),
                None => expr,
            });
        }
        merged.ok_or_else(|| SluiceError::Config("empty expression list".to_string()))
    }

    /// OR-combine a non-empty list of expressions.
    pub fn any(exprs: Vec<Expr>) -> Result<Expr> {
        let mut merged: Option<Expr> = None;
        for expr in exprs {
            merged = Some(match merged {
                Some(acc) => acc.or(expr),
                None => expr,
            });
        }
        merged.ok_or_else(|| SluiceError::Config("empty expression list".to_string()))
    }

    /// Evaluate elementwise, producing one optional value per row.
    pub fn evaluate(&self, frame: &Frame) -> Result<Vec<Option<Value>>> {
        let height = frame.height();
        match self {
            Expr::Col(name) => {
                let col = frame.column(name)?;
                Ok((0..height).map(|i| col.get(i)).collect())
            }
            Expr::Lit(value) => Ok(vec![Some(value.clone()); height]),
            Expr::Cmp { op, lhs, rhs } => {
                let left = lhs.evaluate(frame)?;
                let right = rhs.evaluate(frame)?;
                left.into_iter()
                    .zip(right)
                    .map(|(l, r)| match (l, r) {
                        (Some(a), Some(b)) => Ok(Some(Value::Bool(apply_cmp(*op, &a, &b)?))),
                        _ => Ok(None),
                    })
                    .collect()
            }
            Expr::Arith { op, lhs, rhs } => {
                let left = lhs.evaluate(frame)?;
                let right = rhs.evaluate(frame)?;
                left.into_iter()
                    .zip(right)
                    .map(|(l, r)| match (l, r) {
                        (Some(a), Some(b)) => apply_arith(*op, &a, &b).map(Some),
                        _ => Ok(None),
                    })
                    .collect()
            }
            Expr::And(lhs, rhs) => {
                let left = lhs.evaluate(frame)?;
                let right = rhs.evaluate(frame)?;
                left.into_iter()
                    .zip(right)
                    .map(|(l, r)| {
                        let (a, b) = (as_bool(l)?, as_bool(r)?);
                        Ok(kleene_and(a, b).map(Value::Bool))
                    })
                    .collect()
            }
            Expr::Or(lhs, rhs) => {
                let left = lhs.evaluate(frame)?;
                let right = rhs.evaluate(frame)?;
                left.into_iter()
                    .zip(right)
                    .map(|(l, r)| {
                        let (a, b) = (as_bool(l)?, as_bool(r)?);
                        Ok(kleene_or(a, b).map(Value::Bool))
                    })
                    .collect()
            }
            Expr::Not(inner) => {
                let values = inner.evaluate(frame)?;
                values
                    .into_iter()
                    .map(|v| Ok(as_bool(v)?.map(|b| Value::Bool(!b))))
                    .collect()
            }
            Expr::Contains { inner, needle } => {
                let values = inner.evaluate(frame)?;
                values
                    .into_iter()
                    .map(|v| match v {
                        Some(Value::Str(s)) => Ok(Some(Value::Bool(s.contains(needle)))),
                        Some(other) => Err(SluiceError::TypeMismatch(format!(
                            "contains() needs a str operand, got {}",
                            other.dtype()
                        ))),
                        None => Ok(None),
                    })
                    .collect()
            }
            Expr::MinHorizontal(exprs) => horizontal(exprs, frame, |a, b| {
                matches!(Value::compare(a, b), Some(std::cmp::Ordering::Less))
            }),
            Expr::MaxHorizontal(exprs) => horizontal(exprs, frame, |a, b| {
                matches!(Value::compare(a, b), Some(std::cmp::Ordering::Greater))
            }),
        }
    }

    /// Evaluate to a keep-mask: one bool per row, null treated as false.
    pub fn mask(&self, frame: &Frame) -> Result<Vec<bool>> {
        self.evaluate(frame)?
            .into_iter()
            .map(|v| match v {
                Some(Value::Bool(b)) => Ok(b),
                None => Ok(false),
                Some(other) => Err(SluiceError::TypeMismatch(format!(
                    "filter expression must yield bool, got {}",
                    other.dtype()
                ))),
            })
            .collect()
    }
}

fn as_bool(value: Option<Value>) -> Result<Option<bool>> {
    match value {
        Some(Value::Bool(b)) => Ok(Some(b)),
        None => Ok(None),
        Some(other) => Err(SluiceError::TypeMismatch(format!(
            "boolean operator applied to {}",
            other.dtype()
        ))),
    }
}

fn kleene_and(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn kleene_or(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

fn apply_cmp(op: CmpOp, a: &Value, b: &Value) -> Result<bool> {
    use std::cmp::Ordering;

    let ordering = Value::compare(a, b).ok_or_else(|| {
        SluiceError::TypeMismatch(format!(
            "cannot compare {} with {}",
            a.dtype(),
            b.dtype()
        ))
    })?;
    Ok(match op {
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Ge => ordering != Ordering::Less,
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::Ne => ordering != Ordering::Equal,
    })
}

fn apply_arith(op: ArithOp, a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => {
            let result = match op {
                ArithOp::Add => x.checked_add(*y),
                ArithOp::Sub => x.checked_sub(*y),
                ArithOp::Mul => x.checked_mul(*y),
                ArithOp::FloorDiv => {
                    if *y == 0 {
                        return Err(SluiceError::TypeMismatch(
                            "division by zero in expression".to_string(),
                        ));
                    }
                    Some(x.div_euclid(*y))
                }
            };
            result.map(Value::Int).ok_or_else(|| {
                SluiceError::TypeMismatch("integer overflow in expression".to_string())
            })
        }
        _ => {
            let (x, y) = match (a.as_float(), b.as_float()) {
                (Some(x), Some(y)) => (x, y),
                _ => {
                    return Err(SluiceError::TypeMismatch(format!(
                        "arithmetic on {} and {}",
                        a.dtype(),
                        b.dtype()
                    )));
                }
            };
            let result = match op {
                ArithOp::Add => x + y,
                ArithOp::Sub => x - y,
                ArithOp::Mul => x * y,
                ArithOp::FloorDiv => {
                    if y == 0.0 {
                        return Err(SluiceError::TypeMismatch(
                            "division by zero in expression".to_string(),
                        ));
                    }
                    (x / y).floor()
                }
            };
            Ok(Value::Float(result))
        }
    }
}

/// Elementwise reduction across sub-expression results, skipping nulls.
fn horizontal(
    exprs: &[Expr],
    frame: &Frame,
    wins: impl Fn(&Value, &Value) -> bool,
) -> Result<Vec<Option<Value>>> {
    let mut result: Vec<Option<Value>> = vec![None; frame.height()];
    for expr in exprs {
        for (slot, value) in result.iter_mut().zip(expr.evaluate(frame)?) {
            let Some(value) = value else { continue };
            match slot {
                Some(current) if !wins(&value, current) => {}
                _ => *slot = Some(value),
            }
        }
    }
    Ok(result)
}
