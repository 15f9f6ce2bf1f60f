//! Relationship metadata for SQLModel Rust.
//!
//! Relationships are declared as static metadata on a mapper definition and
//! resolved against their target mapper when the registry is configured.
//! Loader options consult the configured `lazy_strategy` as the fallback
//! when no option overrides it for a given path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The type of relationship between two mapped classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelationshipKind {
    /// One-to-one: `User` has one `Profile`.
    OneToOne,
    /// Many-to-one: many `Address`es belong to one `User`.
    #[default]
    ManyToOne,
    /// One-to-many: one `User` has many `Address`es.
    OneToMany,
    /// Many-to-many: `Item`s have many `Keyword`s via a link table.
    ManyToMany,
}

impl RelationshipKind {
    /// Whether the relationship loads a collection rather than a scalar.
    #[must_use]
    pub const fn uselist(self) -> bool {
        matches!(self, RelationshipKind::OneToMany | RelationshipKind::ManyToMany)
    }
}

/// Lazy loading strategy for relationships.
///
/// Mirrors the relationship `lazy` tag: `true` is [`Select`](Self::Select),
/// `false` / `"joined"` is [`Joined`](Self::Joined), and "no load" is
/// [`NoLoad`](Self::NoLoad).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LazyLoadStrategy {
    /// Load items on first access via separate SELECT (default).
    #[default]
    Select,
    /// Eager load via JOIN in parent query.
    Joined,
    /// Eager load via a second query wrapping the parent query.
    Subquery,
    /// Load via separate SELECT as soon as the parent is loaded.
    Immediate,
    /// Never load.
    NoLoad,
}

impl LazyLoadStrategy {
    /// The `lazy` tag for this strategy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LazyLoadStrategy::Select => "select",
            LazyLoadStrategy::Joined => "joined",
            LazyLoadStrategy::Subquery => "subquery",
            LazyLoadStrategy::Immediate => "immediate",
            LazyLoadStrategy::NoLoad => "noload",
        }
    }

    /// Whether the strategy loads the relationship together with its parent.
    #[must_use]
    pub const fn is_eager(self) -> bool {
        matches!(
            self,
            LazyLoadStrategy::Joined | LazyLoadStrategy::Subquery | LazyLoadStrategy::Immediate
        )
    }
}

impl From<bool> for LazyLoadStrategy {
    fn from(lazy: bool) -> Self {
        if lazy {
            LazyLoadStrategy::Select
        } else {
            LazyLoadStrategy::Joined
        }
    }
}

impl FromStr for LazyLoadStrategy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "select" | "true" => Ok(LazyLoadStrategy::Select),
            "joined" | "false" => Ok(LazyLoadStrategy::Joined),
            "subquery" => Ok(LazyLoadStrategy::Subquery),
            "immediate" => Ok(LazyLoadStrategy::Immediate),
            "noload" | "none" => Ok(LazyLoadStrategy::NoLoad),
            other => Err(crate::Error::mapping(
                crate::MappingErrorKind::NoStrategy,
                format!("can't locate strategy for lazy={other}"),
            )),
        }
    }
}

impl fmt::Display for LazyLoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata about a relationship between mapped classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipInfo {
    /// Name of the relationship attribute.
    pub name: &'static str,

    /// Class name of the target mapper.
    pub target: &'static str,

    /// Kind of relationship.
    pub kind: RelationshipKind,

    /// Default loading strategy for this relationship.
    pub lazy_strategy: LazyLoadStrategy,

    /// Default join kind used when the relationship is joined-eager-loaded.
    pub innerjoin: bool,

    /// The attribute on the target mapper that points back.
    pub back_populates: Option<&'static str>,
}

impl RelationshipInfo {
    /// Create a new relationship with required fields.
    #[must_use]
    pub const fn new(name: &'static str, target: &'static str, kind: RelationshipKind) -> Self {
        Self {
            name,
            target,
            kind,
            lazy_strategy: LazyLoadStrategy::Select,
            innerjoin: false,
            back_populates: None,
        }
    }

    /// Set the default loading strategy.
    #[must_use]
    pub const fn lazy_strategy(mut self, strategy: LazyLoadStrategy) -> Self {
        self.lazy_strategy = strategy;
        self
    }

    /// Use an inner join instead of an outer join when eager-joining.
    #[must_use]
    pub const fn innerjoin(mut self, value: bool) -> Self {
        self.innerjoin = value;
        self
    }

    /// Set the back-populates attribute name (bidirectional relationships).
    #[must_use]
    pub const fn back_populates(mut self, field: &'static str) -> Self {
        self.back_populates = Some(field);
        self
    }

    /// Whether this relationship loads a collection.
    #[must_use]
    pub const fn uselist(&self) -> bool {
        self.kind.uselist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lazy_tags_parse() {
        assert_eq!("joined".parse::<LazyLoadStrategy>().unwrap(), LazyLoadStrategy::Joined);
        assert_eq!("true".parse::<LazyLoadStrategy>().unwrap(), LazyLoadStrategy::Select);
        assert_eq!("False".parse::<LazyLoadStrategy>().unwrap(), LazyLoadStrategy::Joined);
        assert_eq!("none".parse::<LazyLoadStrategy>().unwrap(), LazyLoadStrategy::NoLoad);
        assert!("dynamic".parse::<LazyLoadStrategy>().is_err());
    }

    #[test]
    fn lazy_from_bool() {
        assert_eq!(LazyLoadStrategy::from(true), LazyLoadStrategy::Select);
        assert_eq!(LazyLoadStrategy::from(false), LazyLoadStrategy::Joined);
        assert!(!LazyLoadStrategy::NoLoad.is_eager());
        assert!(LazyLoadStrategy::Immediate.is_eager());
    }

    #[test]
    fn relationship_builder() {
        const ADDRESSES: RelationshipInfo =
            RelationshipInfo::new("addresses", "Address", RelationshipKind::OneToMany)
                .lazy_strategy(LazyLoadStrategy::Subquery)
                .back_populates("user");

        assert!(ADDRESSES.uselist());
        assert_eq!(ADDRESSES.lazy_strategy, LazyLoadStrategy::Subquery);
        assert_eq!(ADDRESSES.back_populates, Some("user"));
        assert!(!ADDRESSES.innerjoin);
    }

    #[test]
    fn serde_uses_lazy_tags() {
        let json = serde_json::to_string(&LazyLoadStrategy::NoLoad).unwrap();
        assert_eq!(json, "\"noload\"");
    }
}
