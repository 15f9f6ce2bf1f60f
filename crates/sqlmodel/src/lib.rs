//! SQLModel Rust - mapped classes, loader options and DML statements.
//!
//! This facade re-exports the two layers most applications need:
//!
//! - Mapping metadata from `sqlmodel-core`: declare classes with [`Model`]
//!   or [`MapperDef`], configure them into a [`Registry`], and address
//!   their properties through [`Entity`] and [`ClassAttribute`]
//! - Query preparation from `sqlmodel-query`: loader options applied to a
//!   [`Query`], and the [`Insert`] / [`Update`] / [`Delete`] builders
//!
//! # Quick Start
//!
//! ```
//! use sqlmodel::prelude::*;
//!
//! let registry = Registry::builder()
//!     .mapper(
//!         MapperDef::new("User", "users")
//!             .field(FieldInfo::new("id").primary_key(true))
//!             .relationship(RelationshipInfo::new("orders", "Order", RelationshipKind::OneToMany)),
//!     )
//!     .mapper(
//!         MapperDef::new("Order", "orders")
//!             .field(FieldInfo::new("id").primary_key(true))
//!             .field(FieldInfo::new("description").deferred(true)),
//!     )
//!     .configure()
//!     .unwrap();
//!
//! let user = registry.mapper("User").unwrap();
//! let query = Query::new([user])
//!     .option(joinedload(["orders"]).unwrap())
//!     .unwrap()
//!     .option(undefer(["orders.description"]))
//!     .unwrap();
//!
//! let orders = PathRegistry::for_entity(user).push_property(user.get_property("orders").unwrap());
//! assert_eq!(query.resolve_strategy(&orders).unwrap(), Some(LoaderStrategy::Joined));
//! ```

pub use sqlmodel_core::{
    AliasedClass, ArgumentError, ArgumentErrorKind, ClassAttribute, Entity, Error, FieldInfo,
    InvalidRequestError, InvalidRequestErrorKind, LazyLoadStrategy, Mapper, MapperDef,
    MappingError, MappingErrorKind, Model, Property, PropertyKind, Registry, RegistryBuilder,
    RelationshipInfo, RelationshipKind, Result, Table, Value, with_polymorphic,
};
pub use sqlmodel_query::{
    ALL_DIALECTS, AliasSpec, AttrToken, AttributeContext, COLUMN_WILDCARD, CompareOp,
    ContextLoader, Delete, DmlStatement, EagerRowProcessor, Expr, Insert, Load, LoaderStrategy,
    LocalOpts, MapperOption, Parameters, PathAttributes, PathRegistry, PathToken,
    PropertyOption, PropertyOptionKind, PropertyOptionState, Query, QueryEntity,
    RELATIONSHIP_WILDCARD, ReturnDefaults, RowAdapter, RowArg, StateToken, StrategyKey,
    UnboundLoad, UndeferGroupOption, Update, ValueRow, ValuesArg, ValuesStatement,
    Where, contains_eager, defer, delete, immediateload, insert, joinedload, joinedload_all,
    joinedload_all_innerjoin, joinedload_innerjoin, lazyload, lazyload_all, noload,
    subqueryload, subqueryload_all, undefer, undefer_group, update,
};

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        // Mapping
        AliasedClass,
        ClassAttribute,
        // Statements
        Delete,
        DmlStatement,
        Entity,
        Error,
        Expr,
        FieldInfo,
        Insert,
        LazyLoadStrategy,
        // Options
        Load,
        LoaderStrategy,
        MapperDef,
        MapperOption,
        Model,
        PathRegistry,
        Query,
        QueryEntity,
        Registry,
        RelationshipInfo,
        RelationshipKind,
        Result,
        RowArg,
        Table,
        Update,
        Value,
        ValuesArg,
        ValuesStatement,
        contains_eager,
        defer,
        // Macros
        delete,
        immediateload,
        insert,
        joinedload,
        joinedload_all,
        lazyload,
        noload,
        subqueryload,
        subqueryload_all,
        undefer,
        undefer_group,
        update,
        with_polymorphic,
    };
}
