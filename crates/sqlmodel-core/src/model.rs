//! Model trait for declaring mapped classes.
//!
//! The `Model` trait is the static description of a mapped class: its
//! table, its column properties and its relationships. A registry turns
//! these descriptions into configured [`Mapper`](crate::Mapper)s.

use crate::field::FieldInfo;
use crate::relationship::RelationshipInfo;

/// Static mapping metadata for a struct.
///
/// # Example
///
/// ```
/// use sqlmodel_core::{FieldInfo, Model, RelationshipInfo, RelationshipKind};
///
/// struct User;
///
/// impl Model for User {
///     const CLASS_NAME: &'static str = "User";
///     const TABLE_NAME: &'static str = "users";
///     const RELATIONSHIPS: &'static [RelationshipInfo] =
///         &[RelationshipInfo::new("addresses", "Address", RelationshipKind::OneToMany)];
///
///     fn fields() -> &'static [FieldInfo] {
///         const FIELDS: &[FieldInfo] = &[
///             FieldInfo::new("id").primary_key(true),
///             FieldInfo::new("name"),
///         ];
///         FIELDS
///     }
/// }
/// ```
pub trait Model {
    /// Name the mapper is registered under.
    const CLASS_NAME: &'static str;

    /// The name of the database table.
    const TABLE_NAME: &'static str;

    /// Class name of the inherited mapper, for joined/single table inheritance.
    const INHERITS: Option<&'static str> = None;

    /// Relationship metadata for this model.
    const RELATIONSHIPS: &'static [RelationshipInfo] = &[];

    /// Get field metadata for all locally declared columns.
    fn fields() -> &'static [FieldInfo];

    /// Primary key attribute names.
    fn primary_key() -> Vec<&'static str> {
        Self::fields()
            .iter()
            .filter(|f| f.primary_key)
            .map(|f| f.name)
            .collect()
    }
}
