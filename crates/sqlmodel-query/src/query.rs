//! The query surface loader options act upon.
//!
//! A [`Query`] carries what option processing needs: the selected entities
//! in declaration order, the current traversal path (non-empty for the
//! secondary query a lazy load issues), the attribute context options write
//! into, and the options applied so far.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sqlmodel_core::{Entity, Mapper, Property, Result};

use crate::adapter::RowAdapter;
use crate::context::AttributeContext;
use crate::options::MapperOption;
use crate::path::{PathRegistry, RELATIONSHIP_WILDCARD};
use crate::strategy::LoaderStrategy;

/// Wildcard token matching every column at a level.
pub const COLUMN_WILDCARD: &str = "column:*";

/// One element of a query's select list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryEntity {
    /// A mapped class or alias.
    Mapper(Entity),
    /// A plain column expression, e.g. `count(*)`.
    Expression(String),
}

impl QueryEntity {
    /// The root entity, for mapper entities.
    pub fn entity_zero(&self) -> Option<&Entity> {
        match self {
            QueryEntity::Mapper(e) => Some(e),
            QueryEntity::Expression(_) => None,
        }
    }

    pub fn mapper(&self) -> Option<&'static Mapper> {
        self.entity_zero().map(Entity::mapper)
    }

    /// Whether a class-bound attribute declared on `searchfor` can be
    /// applied through this entity.
    ///
    /// Aliases only match themselves. A polymorphic alias addressed by
    /// mapper paths matches any of the mappers it loads; otherwise plain
    /// mappers match anywhere in the same hierarchy.
    pub fn corresponds_to(&self, searchfor: &Entity) -> bool {
        let Some(zero) = self.entity_zero() else {
            return false;
        };
        match (searchfor, zero) {
            (Entity::Aliased(_), _) => searchfor == zero,
            (Entity::Mapped(m), Entity::Aliased(alias)) => {
                if alias.use_mapper_path() {
                    alias.with_polymorphic_mappers().contains(m)
                } else {
                    false
                }
            }
            (Entity::Mapped(m), Entity::Mapped(z)) => m.common_parent(*z),
        }
    }
}

impl fmt::Display for QueryEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryEntity::Mapper(e) => write!(f, "{e}"),
            QueryEntity::Expression(expr) => f.write_str(expr),
        }
    }
}

impl From<Entity> for QueryEntity {
    fn from(entity: Entity) -> Self {
        QueryEntity::Mapper(entity)
    }
}

impl From<&'static Mapper> for QueryEntity {
    fn from(mapper: &'static Mapper) -> Self {
        QueryEntity::Mapper(Entity::Mapped(mapper))
    }
}

/// A query being prepared for execution.
#[derive(Debug, Clone, Default)]
pub struct Query {
    entities: Vec<QueryEntity>,
    current_path: PathRegistry,
    attributes: AttributeContext,
    polymorphic_adapters: HashMap<&'static Mapper, RowAdapter>,
    with_options: Vec<Arc<dyn MapperOption>>,
}

impl Query {
    /// Create a query selecting `entities`, in order.
    pub fn new<I, E>(entities: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<QueryEntity>,
    {
        Self {
            entities: entities.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn entities(&self) -> &[QueryEntity] {
        &self.entities
    }

    /// Entities backed by a mapper, in declaration order.
    pub fn mapper_entities(&self) -> impl Iterator<Item = &QueryEntity> {
        self.entities
            .iter()
            .filter(|e| matches!(e, QueryEntity::Mapper(_)))
    }

    pub fn current_path(&self) -> &PathRegistry {
        &self.current_path
    }

    /// Set the path this query loads from.
    #[must_use]
    pub fn with_current_path(mut self, path: PathRegistry) -> Self {
        self.current_path = path;
        self
    }

    /// Register the adapter rows of `mapper` are read through.
    #[must_use]
    pub fn with_polymorphic_adapter(mut self, mapper: &'static Mapper, adapter: RowAdapter) -> Self {
        self.polymorphic_adapters.insert(mapper, adapter);
        self
    }

    pub fn polymorphic_adapter(&self, mapper: &'static Mapper) -> Option<&RowAdapter> {
        self.polymorphic_adapters.get(mapper)
    }

    pub fn attributes(&self) -> &AttributeContext {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut AttributeContext {
        &mut self.attributes
    }

    /// Options applied so far, in order.
    pub fn with_options(&self) -> &[Arc<dyn MapperOption>] {
        &self.with_options
    }

    /// Apply one option.
    pub fn option(self, option: impl Into<Arc<dyn MapperOption>>) -> Result<Self> {
        self.options([option.into()])
    }

    /// Apply options, failing on the first one that cannot be resolved.
    pub fn options<I>(self, options: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Arc<dyn MapperOption>>,
    {
        self.apply_options(options, false)
    }

    /// Apply options, skipping any that do not resolve against this query.
    pub fn conditional_options<I>(self, options: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Arc<dyn MapperOption>>,
    {
        self.apply_options(options, true)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(conditional = conditional))]
    fn apply_options<I>(mut self, options: I, conditional: bool) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Arc<dyn MapperOption>>,
    {
        for option in options {
            let option = option.into();
            if conditional {
                option.process_query_conditionally(&mut self)?;
            } else {
                option.process_query(&mut self)?;
            }
            self.with_options.push(option);
        }
        Ok(self)
    }

    /// The query a lazy load of `path` would issue for `entity`.
    ///
    /// Only options that propagate to loaders are carried over, and they
    /// are applied conditionally: an option that does not reach below
    /// `path` is silently dropped.
    pub fn for_secondary_load(
        &self,
        path: PathRegistry,
        entity: impl Into<Entity>,
    ) -> Result<Query> {
        let propagated: Vec<Arc<dyn MapperOption>> = self
            .with_options
            .iter()
            .filter(|o| o.propagate_to_loaders())
            .cloned()
            .collect();
        tracing::debug!(%path, count = propagated.len(), "secondary load");
        Query::new([QueryEntity::Mapper(entity.into())])
            .with_current_path(path)
            .conditional_options(propagated)
    }

    /// The strategy the loading engine uses for the property `path` ends on.
    ///
    /// Checked in order: the option recorded as loader for the path, an
    /// explicit strategy, a wildcard strategy for the property's kind,
    /// undeferred groups (columns only), and finally the configured default.
    pub fn resolve_strategy(&self, path: &PathRegistry) -> Result<Option<LoaderStrategy>> {
        let Some(prop) = path.prop() else {
            return Ok(None);
        };
        if let Some(loader) = self.attributes.loader(path) {
            if let Some(strategy) = loader.strategy_impl()? {
                return Ok(Some(strategy));
            }
        }
        if let Some(key) = self.attributes.loader_strategy(path) {
            return LoaderStrategy::lookup(prop, key).map(Some);
        }
        if let Some(strategy) = self.wildcard_strategy(path, prop)? {
            return Ok(Some(strategy));
        }
        if let Some(group) = prop.column().and_then(|c| c.group) {
            if self.attributes.is_group_undeferred(group) {
                return Ok(Some(LoaderStrategy::Column));
            }
        }
        Ok(Some(LoaderStrategy::default_for(prop)))
    }

    fn wildcard_strategy(
        &self,
        path: &PathRegistry,
        prop: &'static Property,
    ) -> Result<Option<LoaderStrategy>> {
        let token = if prop.is_relationship() {
            RELATIONSHIP_WILDCARD
        } else {
            COLUMN_WILDCARD
        };
        let candidates = [path.parent().token(token), PathRegistry::root().token(token)];
        for candidate in &candidates {
            let key = self
                .attributes
                .loader(candidate)
                .and_then(|l| l.strategy)
                .or_else(|| self.attributes.loader_strategy(candidate));
            if let Some(key) = key {
                return LoaderStrategy::lookup(prop, key).map(Some);
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextLoader;
    use crate::fixtures::mapper;
    use crate::strategy::StrategyKey;
    use sqlmodel_core::{AliasedClass, LazyLoadStrategy, with_polymorphic};

    #[test]
    fn corresponds_to_rules() {
        let person = mapper("Person");
        let engineer = mapper("Engineer");
        let user = mapper("User");

        let plain = QueryEntity::from(engineer);
        assert!(plain.corresponds_to(&Entity::Mapped(person)));
        assert!(!plain.corresponds_to(&Entity::Mapped(user)));

        let alias = Entity::from(AliasedClass::new(engineer, Some("e1")));
        let aliased = QueryEntity::Mapper(alias.clone());
        assert!(aliased.corresponds_to(&alias));
        assert!(!aliased.corresponds_to(&Entity::Mapped(engineer)));
        assert!(!plain.corresponds_to(&alias));

        let wp = QueryEntity::Mapper(Entity::from(with_polymorphic(person, &[engineer], false, true)));
        assert!(wp.corresponds_to(&Entity::Mapped(engineer)));
        assert!(!wp.corresponds_to(&Entity::Mapped(mapper("Manager"))));

        assert!(!QueryEntity::Expression("count(*)".into()).corresponds_to(&Entity::Mapped(user)));
    }

    #[test]
    fn resolve_strategy_falls_back_to_defaults() {
        let user = mapper("User");
        let query = Query::new([user]);
        let root = PathRegistry::for_entity(user);

        let orders = root.push_property(user.get_property("orders").unwrap());
        let bio = root.push_property(user.get_property("bio").unwrap());
        assert_eq!(query.resolve_strategy(&orders).unwrap(), Some(LoaderStrategy::Select));
        assert_eq!(
            query.resolve_strategy(&bio).unwrap(),
            Some(LoaderStrategy::DeferredColumn)
        );
        assert_eq!(query.resolve_strategy(&root).unwrap(), None);
    }

    #[test]
    fn resolve_strategy_precedence() {
        let user = mapper("User");
        let mut query = Query::new([user]);
        let root = PathRegistry::for_entity(user);
        let orders = root.push_property(user.get_property("orders").unwrap());
        let addresses = root.push_property(user.get_property("addresses").unwrap());
        let bio = root.push_property(user.get_property("bio").unwrap());

        let ctx = query.attributes_mut();
        ctx.set_loader_strategy(
            &PathRegistry::root().token(RELATIONSHIP_WILDCARD),
            StrategyKey::Lazy(LazyLoadStrategy::NoLoad),
        );
        ctx.set_loader_strategy(&orders, StrategyKey::Lazy(LazyLoadStrategy::Subquery));
        ctx.set_loader(
            &orders,
            ContextLoader::new(orders.entity_path(), Some(StrategyKey::Lazy(LazyLoadStrategy::Joined))),
        );
        ctx.add_undefer_group("profile");

        assert_eq!(query.resolve_strategy(&orders).unwrap(), Some(LoaderStrategy::Joined));
        assert_eq!(query.resolve_strategy(&addresses).unwrap(), Some(LoaderStrategy::NoLoad));
        assert_eq!(query.resolve_strategy(&bio).unwrap(), Some(LoaderStrategy::Column));
    }

    #[test]
    fn expression_entities_are_not_mapper_entities() {
        let query = Query::new([
            QueryEntity::Expression("count(*)".into()),
            QueryEntity::from(mapper("User")),
        ]);
        assert_eq!(query.entities().len(), 2);
        assert_eq!(query.mapper_entities().count(), 1);
    }
}
