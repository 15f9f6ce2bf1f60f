//! Predicate and value expressions held by statement builders.
//!
//! Builders own these trees and replace them wholesale. Conjunctions are
//! kept flat, so `a.and(b).and(c)` is a single three-term `And`; turning a
//! tree into dialect SQL happens in a compiler outside this crate.

use sqlmodel_core::Value;

/// A predicate or value expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column, optionally qualified by a table name or alias.
    Column {
        table: Option<String>,
        name: String,
    },
    /// Literal bound as a parameter (or a keyword for `NULL`/`DEFAULT`).
    Bind(Value),
    Compare {
        left: Box<Expr>,
        op: CompareOp,
        right: Box<Expr>,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    IsNull {
        operand: Box<Expr>,
        negated: bool,
    },
    InList {
        operand: Box<Expr>,
        items: Vec<Expr>,
        negated: bool,
    },
    /// SELECT text feeding `INSERT .. FROM SELECT`.
    Select(String),
    /// Verbatim SQL.
    Text(String),
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

impl Expr {
    pub fn col(name: impl Into<String>) -> Self {
        Self::Column {
            table: None,
            name: name.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Column {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    pub fn lit(value: impl Into<Value>) -> Self {
        Self::Bind(value.into())
    }

    pub fn null() -> Self {
        Self::Bind(Value::Null)
    }

    pub fn text(sql: impl Into<String>) -> Self {
        Self::Text(sql.into())
    }

    pub fn subquery(sql: impl Into<String>) -> Self {
        Self::Select(sql.into())
    }

    fn compare(self, op: CompareOp, right: impl Into<Expr>) -> Self {
        Self::Compare {
            left: Box::new(self),
            op,
            right: Box::new(right.into()),
        }
    }

    pub fn eq(self, right: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Eq, right)
    }

    pub fn ne(self, right: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Ne, right)
    }

    pub fn lt(self, right: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Lt, right)
    }

    pub fn le(self, right: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Le, right)
    }

    pub fn gt(self, right: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Gt, right)
    }

    pub fn ge(self, right: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Ge, right)
    }

    /// Conjunction, appended to `self` when it already is one.
    #[must_use]
    pub fn and(self, other: impl Into<Expr>) -> Self {
        let mut terms = match self {
            Self::And(terms) => terms,
            first => vec![first],
        };
        match other.into() {
            Self::And(more) => terms.extend(more),
            other => terms.push(other),
        }
        Self::And(terms)
    }

    /// Disjunction, flattened like [`Expr::and`].
    #[must_use]
    pub fn or(self, other: impl Into<Expr>) -> Self {
        let mut terms = match self {
            Self::Or(terms) => terms,
            first => vec![first],
        };
        match other.into() {
            Self::Or(more) => terms.extend(more),
            other => terms.push(other),
        }
        Self::Or(terms)
    }

    #[must_use]
    pub fn not(self) -> Self {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }

    pub fn is_null(self) -> Self {
        Self::IsNull {
            operand: Box::new(self),
            negated: false,
        }
    }

    pub fn is_not_null(self) -> Self {
        Self::IsNull {
            operand: Box::new(self),
            negated: true,
        }
    }

    pub fn in_list<I, V>(self, items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Expr>,
    {
        Self::InList {
            operand: Box::new(self),
            items: items.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    pub fn not_in_list<I, V>(self, items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Expr>,
    {
        match self.in_list(items) {
            Self::InList { operand, items, .. } => Self::InList {
                operand,
                items,
                negated: true,
            },
            other => other,
        }
    }

    /// The literal, if this is a bound value.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Bind(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Self::Bind(v)
    }
}

macro_rules! bind_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Expr {
                fn from(v: $ty) -> Self {
                    Self::Bind(Value::from(v))
                }
            }
        )*
    };
}

bind_from!(bool, i32, i64, f64, String, &str);
