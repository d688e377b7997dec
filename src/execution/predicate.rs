use std::cmp::Ordering;
use std::fmt;

use crate::catalog::{ColMeta, ColType};
use crate::common::{DbError, Result};
use crate::index::key::compare_values;

/// A possibly table-qualified column reference. An empty `tab_name` matches
/// any table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabCol {
    pub tab_name: String,
    pub col_name: String,
}

impl TabCol {
    pub fn new(tab_name: impl Into<String>, col_name: impl Into<String>) -> Self {
        Self {
            tab_name: tab_name.into(),
            col_name: col_name.into(),
        }
    }

    /// An unqualified column reference.
    pub fn bare(col_name: impl Into<String>) -> Self {
        Self::new("", col_name)
    }
}

impl fmt::Display for TabCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tab_name.is_empty() {
            write!(f, "{}", self.col_name)
        } else {
            write!(f, "{}.{}", self.tab_name, self.col_name)
        }
    }
}

/// Comparison operators over column values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CompOp {
    /// Maps a three-way comparison onto this operator.
    pub fn matches(&self, ord: Ordering) -> bool {
        match self {
            CompOp::Eq => ord == Ordering::Equal,
            CompOp::Ne => ord != Ordering::Equal,
            CompOp::Lt => ord == Ordering::Less,
            CompOp::Gt => ord == Ordering::Greater,
            CompOp::Le => ord != Ordering::Greater,
            CompOp::Ge => ord != Ordering::Less,
        }
    }
}

/// A literal value in a predicate or assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Str(String),
}

impl Value {
    /// Serializes the value into the storage encoding of a column of type
    /// `ty` and width `len`.
    pub fn to_bytes(&self, ty: ColType, len: usize) -> Result<Vec<u8>> {
        let bytes = match (self, ty) {
            (Value::Int(v), ColType::Int) => v.to_le_bytes().to_vec(),
            (Value::Float(v), ColType::Float) => v.to_le_bytes().to_vec(),
            (Value::Int(v), ColType::Float) => (*v as f32).to_le_bytes().to_vec(),
            (Value::Str(s), ColType::Str) => {
                if s.len() > len {
                    return Err(DbError::Internal(format!(
                        "string value of {} bytes exceeds column width {len}",
                        s.len()
                    )));
                }
                let mut buf = s.as_bytes().to_vec();
                buf.resize(len, 0);
                buf
            }
            (v, ty) => {
                return Err(DbError::Internal(format!(
                    "value {v:?} is incompatible with column type {ty}"
                )))
            }
        };
        if bytes.len() != len {
            return Err(DbError::Internal(format!(
                "value width {} does not match column width {len}",
                bytes.len()
            )));
        }
        Ok(bytes)
    }
}

/// Right-hand side of a condition: a literal or another column of the same
/// row.
#[derive(Debug, Clone, PartialEq)]
pub enum Rhs {
    Value(Value),
    Col(TabCol),
}

/// One conjunct of a predicate set.
#[derive(Debug, Clone)]
pub struct Condition {
    pub lhs_col: TabCol,
    pub op: CompOp,
    pub rhs: Rhs,
}

impl Condition {
    pub fn with_value(lhs_col: TabCol, op: CompOp, value: Value) -> Self {
        Self {
            lhs_col,
            op,
            rhs: Rhs::Value(value),
        }
    }

    pub fn with_col(lhs_col: TabCol, op: CompOp, rhs_col: TabCol) -> Self {
        Self {
            lhs_col,
            op,
            rhs: Rhs::Col(rhs_col),
        }
    }
}

/// One `column = value` assignment of an update.
#[derive(Debug, Clone)]
pub struct SetClause {
    pub col_name: String,
    pub value: Value,
}

impl SetClause {
    pub fn new(col_name: impl Into<String>, value: Value) -> Self {
        Self {
            col_name: col_name.into(),
            value,
        }
    }
}

/// Locates a column reference within a schema.
pub fn find_col<'a>(cols: &'a [ColMeta], target: &TabCol) -> Result<&'a ColMeta> {
    cols.iter()
        .find(|c| {
            c.name == target.col_name && (target.tab_name.is_empty() || c.tab_name == target.tab_name)
        })
        .ok_or_else(|| DbError::ColumnNotFound(target.to_string()))
}

/// Evaluates one condition against a single record.
pub fn eval_condition(cols: &[ColMeta], rec: &[u8], cond: &Condition) -> Result<bool> {
    let lhs = find_col(cols, &cond.lhs_col)?;
    let lhs_bytes = &rec[lhs.offset..lhs.offset + lhs.len];

    let ord = match &cond.rhs {
        Rhs::Value(v) => {
            let rhs_bytes = v.to_bytes(lhs.ty, lhs.len)?;
            compare_values(lhs_bytes, &rhs_bytes, lhs.ty, lhs.len)
        }
        Rhs::Col(c) => {
            let rhs = find_col(cols, c)?;
            let rhs_bytes = &rec[rhs.offset..rhs.offset + rhs.len];
            compare_values(lhs_bytes, rhs_bytes, lhs.ty, lhs.len.min(rhs.len))
        }
    };
    Ok(cond.op.matches(ord))
}

/// Conjunction of all conditions against a single record.
pub fn eval_conditions(cols: &[ColMeta], rec: &[u8], conds: &[Condition]) -> Result<bool> {
    for cond in conds {
        if !eval_condition(cols, rec, cond)? {
            return Ok(false);
        }
    }
    Ok(true)
}
