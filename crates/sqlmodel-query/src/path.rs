//! Traversal paths through the mapped entity graph.
//!
//! A [`PathRegistry`] is an immutable sequence alternating entity and
//! property tokens, e.g. `User / orders / Order / items`. Paths are
//! compared and hashed structurally, so two options that resolve to the
//! same position address the same entry in an
//! [`AttributeContext`](crate::context::AttributeContext).

use std::fmt;

use sqlmodel_core::{Entity, Mapper, Property};

/// Wildcard token matching every relationship at a level.
pub const RELATIONSHIP_WILDCARD: &str = "relationship:*";

/// One element of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathToken {
    Entity(Entity),
    Property(&'static Property),
    /// A `"<kind>:*"` token standing for all remaining properties.
    Wildcard(String),
}

/// An immutable position in the entity graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PathRegistry {
    tokens: Vec<PathToken>,
}

impl PathRegistry {
    /// The empty path.
    pub fn root() -> Self {
        Self::default()
    }

    /// A path rooted at `entity`.
    pub fn for_entity(entity: impl Into<Entity>) -> Self {
        Self {
            tokens: vec![PathToken::Entity(entity.into())],
        }
    }

    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[PathToken] {
        &self.tokens
    }

    fn with(&self, token: PathToken) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(token);
        Self { tokens }
    }

    /// Extend by an entity.
    pub fn push_entity(&self, entity: impl Into<Entity>) -> Self {
        self.with(PathToken::Entity(entity.into()))
    }

    /// Extend by a property.
    ///
    /// When the path ends on a plain mapper, or on an alias that uses
    /// mapper paths, that tip is replaced by the mapper declaring `prop`,
    /// so a property inherited by a subclass is addressed the same way
    /// from the subclass and from its base.
    pub fn push_property(&self, prop: &'static Property) -> Self {
        let mut tokens = self.tokens.clone();
        if let Some(PathToken::Entity(tip)) = tokens.last_mut() {
            if tip.use_mapper_path() {
                *tip = Entity::Mapped(prop.parent());
            }
        }
        tokens.push(PathToken::Property(prop));
        Self { tokens }
    }

    /// Extend by a wildcard token such as [`RELATIONSHIP_WILDCARD`].
    pub fn token(&self, wildcard: &str) -> Self {
        self.with(PathToken::Wildcard(wildcard.to_string()))
    }

    /// The path minus its last token.
    pub fn parent(&self) -> Self {
        let end = self.tokens.len().saturating_sub(1);
        Self {
            tokens: self.tokens[..end].to_vec(),
        }
    }

    pub fn tip(&self) -> Option<&PathToken> {
        self.tokens.last()
    }

    /// The entity the path ends on, if it ends on one.
    pub fn entity(&self) -> Option<&Entity> {
        match self.tip() {
            Some(PathToken::Entity(e)) => Some(e),
            _ => None,
        }
    }

    /// The mapper of the entity the path ends on.
    pub fn mapper(&self) -> Option<&'static Mapper> {
        self.entity().map(Entity::mapper)
    }

    /// The property the path ends on, if it ends on one.
    pub fn prop(&self) -> Option<&'static Property> {
        match self.tip() {
            Some(PathToken::Property(p)) => Some(*p),
            _ => None,
        }
    }

    /// Whether the path ends on an entity or on a relationship leading to one.
    pub fn has_entity(&self) -> bool {
        match self.tip() {
            Some(PathToken::Entity(_)) => true,
            Some(PathToken::Property(p)) => p.is_relationship(),
            _ => false,
        }
    }

    /// The path extended to the entity a relationship tip points at.
    ///
    /// A path already ending on an entity is returned unchanged.
    pub fn entity_path(&self) -> Self {
        match self.prop().and_then(Property::target) {
            Some(target) => self.push_entity(target),
            None => self.clone(),
        }
    }

    /// The `(entity, property)` pairs along the path.
    pub fn pairs(&self) -> Vec<(&Entity, &'static Property)> {
        self.tokens
            .chunks(2)
            .filter_map(|pair| match pair {
                [PathToken::Entity(e), PathToken::Property(p)] => Some((e, *p)),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for PathRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tokens.is_empty() {
            return f.write_str("<root>");
        }
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" / ")?;
            }
            match token {
                PathToken::Entity(e) => write!(f, "{e}")?,
                PathToken::Property(p) => f.write_str(p.key())?,
                PathToken::Wildcard(w) => f.write_str(w)?,
            }
        }
        Ok(())
    }
}
