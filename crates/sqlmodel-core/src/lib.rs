//! Core types for SQLModel Rust.
//!
//! This crate provides the mapping metadata the loader-option engine and
//! the statement builders work against:
//!
//! - `Error` taxonomy shared by every crate
//! - `FieldInfo` / `RelationshipInfo` for declaring properties
//! - `Registry`, `Mapper` and `Property` for the configured mapping graph
//! - `Entity`, `AliasedClass` and `ClassAttribute` for addressing it
//! - `Table` and `Value` for statement construction

pub mod entity;
pub mod error;
pub mod field;
pub mod mapper;
pub mod model;
pub mod relationship;
pub mod table;
pub mod value;

pub use entity::{AliasedClass, ClassAttribute, Entity, with_polymorphic};
pub use error::{
    ArgumentError, ArgumentErrorKind, Error, InvalidRequestError, InvalidRequestErrorKind,
    MappingError, MappingErrorKind, Result,
};
pub use field::FieldInfo;
pub use mapper::{Mapper, MapperDef, Property, PropertyKind, Registry, RegistryBuilder};
pub use model::Model;
pub use relationship::{LazyLoadStrategy, RelationshipInfo, RelationshipKind};
pub use table::Table;
pub use value::Value;
