//! Entities: mapped classes and their aliases.
//!
//! An [`Entity`] is what a query selects from and what a loader path is
//! rooted at. It is either a plain mapper or an [`AliasedClass`], which
//! has its own identity even when it aliases the same mapper twice.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ArgumentErrorKind, Error, Result};
use crate::mapper::{Mapper, Property};

static NEXT_ALIAS_ID: AtomicU64 = AtomicU64::new(1);

/// An aliased view of a mapper.
///
/// Two aliases are equal only if they are the same alias; cloning an
/// `Arc<AliasedClass>` shares the identity.
#[derive(Debug)]
pub struct AliasedClass {
    id: u64,
    name: String,
    mapper: &'static Mapper,
    with_polymorphic_mappers: Vec<&'static Mapper>,
    use_mapper_path: bool,
}

impl AliasedClass {
    /// Alias `mapper`. Without a name, one is generated from the table.
    pub fn new(mapper: &'static Mapper, name: Option<&str>) -> Self {
        let id = NEXT_ALIAS_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            id,
            name: name.map_or_else(|| format!("{}_{}", mapper.table(), id), str::to_string),
            mapper,
            with_polymorphic_mappers: Vec::new(),
            use_mapper_path: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn mapper(&self) -> &'static Mapper {
        self.mapper
    }

    /// Mappers loaded together through this alias (empty for a plain alias).
    pub fn with_polymorphic_mappers(&self) -> &[&'static Mapper] {
        &self.with_polymorphic_mappers
    }

    /// Whether paths through this alias are addressed by plain mappers.
    pub const fn use_mapper_path(&self) -> bool {
        self.use_mapper_path
    }
}

impl PartialEq for AliasedClass {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for AliasedClass {}

impl Hash for AliasedClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Build an alias that loads `base` together with the given subclasses.
///
/// With `aliased`, the alias gets a unique name of its own; otherwise it is
/// named after the joined tables. `use_mapper_path` makes paths through the
/// alias indistinguishable from paths through the plain mappers.
pub fn with_polymorphic(
    base: &'static Mapper,
    classes: &[&'static Mapper],
    aliased: bool,
    use_mapper_path: bool,
) -> Arc<AliasedClass> {
    let mut mappers = vec![base];
    for &m in classes {
        if !mappers.contains(&m) {
            mappers.push(m);
        }
    }
    let tables: Vec<&str> = mappers.iter().map(|m| m.table()).collect();
    let name = format!("pjoin_{}", tables.join("_"));

    let mut alias = AliasedClass::new(base, (!aliased).then_some(name.as_str()));
    alias.with_polymorphic_mappers = mappers;
    alias.use_mapper_path = use_mapper_path;
    tracing::trace!(alias = %alias.name, base = base.class_name(), "with_polymorphic");
    Arc::new(alias)
}

/// A mapped class or an alias of one.
#[derive(Debug, Clone)]
pub enum Entity {
    Mapped(&'static Mapper),
    Aliased(Arc<AliasedClass>),
}

impl Entity {
    /// The mapper behind this entity.
    pub fn mapper(&self) -> &'static Mapper {
        match self {
            Entity::Mapped(m) => *m,
            Entity::Aliased(a) => a.mapper,
        }
    }

    pub fn is_aliased_class(&self) -> bool {
        matches!(self, Entity::Aliased(_))
    }

    pub fn as_alias(&self) -> Option<&Arc<AliasedClass>> {
        match self {
            Entity::Aliased(a) => Some(a),
            Entity::Mapped(_) => None,
        }
    }

    /// Mappers covered by a polymorphic alias; empty otherwise.
    pub fn with_polymorphic_mappers(&self) -> &[&'static Mapper] {
        match self {
            Entity::Aliased(a) => &a.with_polymorphic_mappers,
            Entity::Mapped(_) => &[],
        }
    }

    /// Whether a path tip on this entity may be replaced by a plain mapper.
    pub fn use_mapper_path(&self) -> bool {
        match self {
            Entity::Mapped(_) => true,
            Entity::Aliased(a) => a.use_mapper_path,
        }
    }

    /// Class-bound reference to the property `key`.
    pub fn attr(&self, key: &str) -> Result<ClassAttribute> {
        let property = self.mapper().get_property(key).ok_or_else(|| {
            Error::unresolved(
                ArgumentErrorKind::PropertyNotFound,
                format!("Can't find property named '{key}' on {self}"),
                key,
                self.to_string(),
            )
        })?;
        Ok(ClassAttribute {
            parent_entity: self.clone(),
            property,
            of_type: None,
        })
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Entity::Mapped(a), Entity::Mapped(b)) => a == b,
            (Entity::Aliased(a), Entity::Aliased(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Entity::Mapped(m) => m.hash(state),
            Entity::Aliased(a) => a.hash(state),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Mapped(m) => write!(f, "{}", m.class_name()),
            Entity::Aliased(a) => write!(f, "aliased({}, {})", a.mapper.class_name(), a.name),
        }
    }
}

impl From<&'static Mapper> for Entity {
    fn from(mapper: &'static Mapper) -> Self {
        Entity::Mapped(mapper)
    }
}

impl From<Arc<AliasedClass>> for Entity {
    fn from(alias: Arc<AliasedClass>) -> Self {
        Entity::Aliased(alias)
    }
}

impl From<AliasedClass> for Entity {
    fn from(alias: AliasedClass) -> Self {
        Entity::Aliased(Arc::new(alias))
    }
}

impl Mapper {
    /// Class-bound reference to the property `key` of this mapper.
    pub fn attr(&'static self, key: &str) -> Result<ClassAttribute> {
        Entity::Mapped(self).attr(key)
    }
}

/// A property reached through a specific entity, e.g. `User.addresses`.
///
/// `of_type` narrows a relationship to a subclass (or polymorphic alias)
/// of its target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassAttribute {
    parent_entity: Entity,
    property: &'static Property,
    of_type: Option<Entity>,
}

impl ClassAttribute {
    pub fn parent_entity(&self) -> &Entity {
        &self.parent_entity
    }

    pub const fn property(&self) -> &'static Property {
        self.property
    }

    pub fn key(&self) -> &'static str {
        self.property.key()
    }

    /// The subtype this attribute was narrowed to, if any.
    pub fn of_type_entity(&self) -> Option<&Entity> {
        self.of_type.as_ref()
    }

    /// Narrow a relationship attribute to a subtype of its target.
    #[must_use]
    pub fn of_type(mut self, entity: impl Into<Entity>) -> Self {
        self.of_type = Some(entity.into());
        self
    }
}

impl fmt::Display for ClassAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.parent_entity, self.property.key())?;
        if let Some(of_type) = &self.of_type {
            write!(f, ".of_type({of_type})")?;
        }
        Ok(())
    }
}
