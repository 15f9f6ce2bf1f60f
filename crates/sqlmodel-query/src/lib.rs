//! Loader options and statement builders for SQLModel Rust.
//!
//! `sqlmodel-query` is the **query preparation layer**. It takes the mapping
//! graph from `sqlmodel-core` and records, per query, how each attribute
//! along each path should be loaded, and it builds the INSERT / UPDATE /
//! DELETE statements a flush emits.
//!
//! # Role In The Architecture
//!
//! - **Paths**: `PathRegistry` addresses a position in the entity graph.
//! - **Options**: `Load`, `UnboundLoad`, `PropertyOption` and
//!   `UndeferGroupOption` resolve their keys against a `Query` and write
//!   directives into its `AttributeContext`.
//! - **Strategies**: `Query::resolve_strategy` reads the directives back for
//!   the loading engine.
//! - **DML builders**: `Insert`, `Update` and `Delete` accumulate value sets,
//!   RETURNING columns, hints and prefixes.
//!
//! Most users access these through the `sqlmodel` facade crate.

pub mod adapter;
pub mod builder;
pub mod clause;
pub mod context;
pub mod expr;
pub mod options;
pub mod path;
pub mod query;
pub mod strategy;

#[cfg(test)]
mod fixtures;

pub use adapter::RowAdapter;
pub use builder::{
    ALL_DIALECTS, Delete, DmlStatement, Insert, Parameters, ReturnDefaults, RowArg, Update,
    ValueRow, ValuesArg, ValuesStatement,
};
pub use clause::Where;
pub use context::{AttributeContext, ContextLoader, EagerRowProcessor, PathAttributes};
pub use expr::{CompareOp, Expr};
pub use options::{
    AliasSpec, AttrToken, Load, LocalOpts, MapperOption, PropertyOption, PropertyOptionKind,
    PropertyOptionState, StateToken, UnboundLoad, UndeferGroupOption, contains_eager, defer,
    immediateload, joinedload, joinedload_all, joinedload_all_innerjoin, joinedload_innerjoin,
    lazyload, lazyload_all, noload, subqueryload, subqueryload_all, undefer, undefer_group,
};
pub use path::{PathRegistry, PathToken, RELATIONSHIP_WILDCARD};
pub use query::{COLUMN_WILDCARD, Query, QueryEntity};
pub use strategy::{LoaderStrategy, StrategyKey};

/// Create an INSERT statement for a table.
///
/// # Example
///
/// ```
/// use sqlmodel_core::Table;
/// use sqlmodel_query::{ValuesArg, ValuesStatement, insert};
///
/// let users = Table::new("users", ["id", "name"]);
/// let stmt = insert!(users).values(ValuesArg::row([("name", "jack")])).unwrap();
/// assert!(stmt.parameters().is_some());
/// ```
#[macro_export]
macro_rules! insert {
    ($table:expr) => {
        $crate::builder::Insert::new($table)
    };
}

/// Create an UPDATE statement for a table.
#[macro_export]
macro_rules! update {
    ($table:expr) => {
        $crate::builder::Update::new($table)
    };
}

/// Create a DELETE statement for a table.
#[macro_export]
macro_rules! delete {
    ($table:expr) => {
        $crate::builder::Delete::new($table)
    };
}
