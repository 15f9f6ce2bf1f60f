//! Configured mappers and their properties.
//!
//! A [`Registry`] is built from [`MapperDef`]s (or [`Model`] impls) and
//! validated once. Configuration resolves base mappers and relationship
//! targets and produces `&'static` mappers, so properties and paths can
//! hold plain references into the mapping graph the same way generated
//! model metadata lives in statics.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use crate::error::{Error, MappingErrorKind, Result};
use crate::field::FieldInfo;
use crate::model::Model;
use crate::relationship::RelationshipInfo;

/// A mapped class.
pub struct Mapper {
    class_name: &'static str,
    table: &'static str,
    inherits: Option<&'static Mapper>,
    polymorphic_identity: Option<&'static str>,
    properties: OnceLock<Vec<&'static Property>>,
}

impl Mapper {
    /// Name of the mapped class.
    pub const fn class_name(&self) -> &'static str {
        self.class_name
    }

    /// Name of the local table.
    pub const fn table(&self) -> &'static str {
        self.table
    }

    /// The directly inherited mapper, if any.
    pub const fn inherits(&self) -> Option<&'static Mapper> {
        self.inherits
    }

    /// Discriminator value for polymorphic loading.
    pub const fn polymorphic_identity(&self) -> Option<&'static str> {
        self.polymorphic_identity
    }

    /// The root of this mapper's inheritance hierarchy.
    pub fn base_mapper(&'static self) -> &'static Mapper {
        let mut current = self;
        while let Some(parent) = current.inherits {
            current = parent;
        }
        current
    }

    /// Iterate from this mapper up to the base mapper.
    pub fn iterate_to_root(&'static self) -> impl Iterator<Item = &'static Mapper> {
        std::iter::successors(Some(self), |m| m.inherits)
    }

    /// Whether this mapper is `other` or inherits from it.
    pub fn isa(&'static self, other: &Mapper) -> bool {
        self.iterate_to_root().any(|m| std::ptr::eq(m, other))
    }

    /// Whether both mappers belong to the same inheritance hierarchy.
    pub fn common_parent(&'static self, other: &'static Mapper) -> bool {
        std::ptr::eq(self.base_mapper(), other.base_mapper())
    }

    /// All properties, inherited ones first.
    pub fn properties(&self) -> &[&'static Property] {
        self.properties.get().map(Vec::as_slice).unwrap_or_default()
    }

    /// Look up a property by attribute name.
    pub fn get_property(&self, key: &str) -> Option<&'static Property> {
        self.properties().iter().copied().find(|p| p.key == key)
    }

    /// Column properties.
    pub fn columns(&self) -> impl Iterator<Item = &'static Property> + '_ {
        self.properties().iter().copied().filter(|p| p.is_column())
    }

    /// Relationship properties.
    pub fn relationships(&self) -> impl Iterator<Item = &'static Property> + '_ {
        self.properties().iter().copied().filter(|p| p.is_relationship())
    }
}

impl PartialEq for Mapper {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for Mapper {}

impl Hash for Mapper {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self, state);
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mapper|{}|{}", self.class_name, self.table)
    }
}

impl fmt::Display for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name)
    }
}

/// What a property maps to.
#[derive(Debug, Clone, Copy)]
pub enum PropertyKind {
    /// A scalar column.
    Column(FieldInfo),
    /// A relationship to another mapper.
    Relationship {
        info: RelationshipInfo,
        target: &'static Mapper,
    },
}

/// A named attribute of a mapper.
///
/// Properties are compared by identity. An inherited property is the same
/// object on the base mapper and on every subclass, and keeps the base as
/// its `parent`.
pub struct Property {
    key: &'static str,
    parent: &'static Mapper,
    kind: PropertyKind,
}

impl Property {
    /// Attribute name.
    pub const fn key(&self) -> &'static str {
        self.key
    }

    /// The mapper that declares this property.
    pub const fn parent(&self) -> &'static Mapper {
        self.parent
    }

    pub const fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    pub const fn is_column(&self) -> bool {
        matches!(self.kind, PropertyKind::Column(_))
    }

    pub const fn is_relationship(&self) -> bool {
        matches!(self.kind, PropertyKind::Relationship { .. })
    }

    /// Column metadata, for column properties.
    pub const fn column(&self) -> Option<&FieldInfo> {
        match &self.kind {
            PropertyKind::Column(info) => Some(info),
            PropertyKind::Relationship { .. } => None,
        }
    }

    /// Relationship metadata, for relationship properties.
    pub const fn relationship(&self) -> Option<&RelationshipInfo> {
        match &self.kind {
            PropertyKind::Relationship { info, .. } => Some(info),
            PropertyKind::Column(_) => None,
        }
    }

    /// The mapper a relationship points at.
    pub const fn target(&self) -> Option<&'static Mapper> {
        match &self.kind {
            PropertyKind::Relationship { target, .. } => Some(*target),
            PropertyKind::Column(_) => None,
        }
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for Property {}

impl Hash for Property {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self, state);
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.parent.class_name, self.key)
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.parent.class_name, self.key)
    }
}

/// Declaration of one mapped class, before configuration.
#[derive(Debug, Clone)]
pub struct MapperDef {
    class_name: &'static str,
    table: &'static str,
    inherits: Option<&'static str>,
    polymorphic_identity: Option<&'static str>,
    fields: Vec<FieldInfo>,
    relationships: Vec<RelationshipInfo>,
}

impl MapperDef {
    /// Declare a class mapped to `table`.
    #[must_use]
    pub fn new(class_name: &'static str, table: &'static str) -> Self {
        Self {
            class_name,
            table,
            inherits: None,
            polymorphic_identity: None,
            fields: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Declare a class from its [`Model`] impl.
    #[must_use]
    pub fn for_model<M: Model>() -> Self {
        Self {
            class_name: M::CLASS_NAME,
            table: M::TABLE_NAME,
            inherits: M::INHERITS,
            polymorphic_identity: None,
            fields: M::fields().to_vec(),
            relationships: M::RELATIONSHIPS.to_vec(),
        }
    }

    /// Inherit from the mapper registered as `class_name`.
    #[must_use]
    pub fn inherits(mut self, class_name: &'static str) -> Self {
        self.inherits = Some(class_name);
        self
    }

    #[must_use]
    pub fn polymorphic_identity(mut self, identity: &'static str) -> Self {
        self.polymorphic_identity = Some(identity);
        self
    }

    /// Add a column property.
    #[must_use]
    pub fn field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a relationship property.
    #[must_use]
    pub fn relationship(mut self, relationship: RelationshipInfo) -> Self {
        self.relationships.push(relationship);
        self
    }
}

/// Collects mapper definitions for [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    defs: Vec<MapperDef>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn mapper(mut self, def: MapperDef) -> Self {
        self.defs.push(def);
        self
    }

    #[must_use]
    pub fn model<M: Model>(self) -> Self {
        self.mapper(MapperDef::for_model::<M>())
    }

    /// Validate the definitions and produce the configured registry.
    ///
    /// Base mappers must be declared before their subclasses. Relationship
    /// targets may be declared in any order.
    #[tracing::instrument(level = "debug", skip(self), fields(mappers = self.defs.len()))]
    pub fn configure(self) -> Result<Registry> {
        let mut by_name: HashMap<&'static str, &'static Mapper> = HashMap::new();
        let mut order = Vec::with_capacity(self.defs.len());

        for def in &self.defs {
            if by_name.contains_key(def.class_name) {
                return Err(Error::mapping(
                    MappingErrorKind::DuplicateMapper,
                    format!("class '{}' is mapped more than once", def.class_name),
                ));
            }
            let inherits = match def.inherits {
                Some(base) => Some(by_name.get(base).copied().ok_or_else(|| {
                    Error::mapping(
                        MappingErrorKind::UnknownBase,
                        format!(
                            "class '{}' inherits from '{}', which is not mapped before it",
                            def.class_name, base
                        ),
                    )
                })?),
                None => None,
            };
            let mapper: &'static Mapper = Box::leak(Box::new(Mapper {
                class_name: def.class_name,
                table: def.table,
                inherits,
                polymorphic_identity: def.polymorphic_identity,
                properties: OnceLock::new(),
            }));
            by_name.insert(def.class_name, mapper);
            order.push(mapper);
        }

        for (def, &mapper) in self.defs.iter().zip(&order) {
            let mut props: Vec<&'static Property> = mapper
                .inherits
                .map(|base| base.properties().to_vec())
                .unwrap_or_default();

            let local = def
                .fields
                .iter()
                .map(|f| (f.name, PropertyKind::Column(*f)))
                .map(Ok::<_, Error>)
                .chain(def.relationships.iter().map(|r| {
                    let target = by_name.get(r.target).copied().ok_or_else(|| {
                        Error::mapping(
                            MappingErrorKind::UnknownTarget,
                            format!(
                                "relationship {}.{} targets unmapped class '{}'",
                                def.class_name, r.name, r.target
                            ),
                        )
                    })?;
                    Ok((r.name, PropertyKind::Relationship { info: *r, target }))
                }));

            for entry in local {
                let (key, kind) = entry?;
                if props.iter().any(|p| p.key == key) {
                    return Err(Error::mapping(
                        MappingErrorKind::DuplicateProperty,
                        format!("property '{key}' is declared twice on {}", def.class_name),
                    ));
                }
                props.push(Box::leak(Box::new(Property {
                    key,
                    parent: mapper,
                    kind,
                })));
            }

            tracing::trace!(mapper = mapper.class_name, properties = props.len(), "configured mapper");
            // Each mapper is configured exactly once, right here.
            let _ = mapper.properties.set(props);
        }

        Ok(Registry { by_name, order })
    }
}

/// A set of configured mappers, addressable by class name.
#[derive(Debug, Clone)]
pub struct Registry {
    by_name: HashMap<&'static str, &'static Mapper>,
    order: Vec<&'static Mapper>,
}

impl Registry {
    /// Start declaring mappers.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Look up a mapper by class name.
    pub fn get(&self, class_name: &str) -> Option<&'static Mapper> {
        self.by_name.get(class_name).copied()
    }

    /// Look up a mapper by class name, failing if it is not mapped.
    pub fn mapper(&self, class_name: &str) -> Result<&'static Mapper> {
        self.get(class_name).ok_or_else(|| {
            Error::mapping(
                MappingErrorKind::UnknownMapper,
                format!("class '{class_name}' is not mapped"),
            )
        })
    }

    /// Mappers in declaration order.
    pub fn mappers(&self) -> &[&'static Mapper] {
        &self.order
    }
}
