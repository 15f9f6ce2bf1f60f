//! WHERE predicates accumulated by UPDATE and DELETE.

use crate::expr::Expr;

/// The predicate of an UPDATE or DELETE.
///
/// Each `where_` call on a statement ANDs another term on; the terms stay
/// in call order.
#[derive(Debug, Clone, PartialEq)]
pub struct Where {
    expr: Expr,
}

impl Where {
    pub fn new(expr: Expr) -> Self {
        Self { expr }
    }

    #[must_use]
    pub fn and(self, expr: Expr) -> Self {
        Self::new(self.expr.and(expr))
    }

    #[must_use]
    pub fn or(self, expr: Expr) -> Self {
        Self::new(self.expr.or(expr))
    }

    /// `expr` alone, or ANDed onto `existing`.
    pub fn and_opt(existing: Option<Self>, expr: Expr) -> Self {
        match existing {
            Some(w) => w.and(expr),
            None => Self::new(expr),
        }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Number of top-level AND terms.
    pub fn terms(&self) -> usize {
        match &self.expr {
            Expr::And(terms) => terms.len(),
            _ => 1,
        }
    }
}
