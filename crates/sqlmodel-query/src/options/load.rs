//! Bound loader options.

use sqlmodel_core::{ArgumentErrorKind, Entity, Error, LazyLoadStrategy, Result, with_polymorphic};

use super::{AttrToken, LocalOpts, MapperOption};
use crate::context::{AttributeContext, ContextLoader};
use crate::path::PathRegistry;
use crate::query::Query;
use crate::strategy::{LoaderStrategy, StrategyKey};

/// A loader option rooted at a known entity.
///
/// Each generative call resolves one more attribute against the current
/// tip, so mistakes surface when the option is built:
///
/// ```
/// # use sqlmodel_core::{FieldInfo, MapperDef, Registry, RelationshipInfo, RelationshipKind};
/// # use sqlmodel_query::options::Load;
/// # let registry = Registry::builder()
/// #     .mapper(MapperDef::new("User", "users")
/// #         .field(FieldInfo::new("id").primary_key(true))
/// #         .relationship(RelationshipInfo::new("orders", "Order", RelationshipKind::OneToMany)))
/// #     .mapper(MapperDef::new("Order", "orders").field(FieldInfo::new("id").primary_key(true)))
/// #     .configure()
/// #     .unwrap();
/// let user = registry.mapper("User").unwrap();
/// let opt = Load::new(user).joined("orders", Some(true)).unwrap();
/// assert_eq!(opt.path().to_string(), "User / orders / Order");
/// assert!(Load::new(user).joined("nope", None).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Load {
    path: PathRegistry,
    strategy: Option<StrategyKey>,
    context: AttributeContext,
}

impl Load {
    pub fn new(entity: impl Into<Entity>) -> Self {
        Self {
            path: PathRegistry::for_entity(entity),
            strategy: None,
            context: AttributeContext::new(),
        }
    }

    pub fn path(&self) -> &PathRegistry {
        &self.path
    }

    pub fn strategy(&self) -> Option<StrategyKey> {
        self.strategy
    }

    /// Directives accumulated so far.
    pub fn context(&self) -> &AttributeContext {
        &self.context
    }

    /// Extend `path` by one token.
    ///
    /// Returns `Ok(None)` when the token doesn't resolve and `raiseerr` is
    /// off. Relationship steps end on the target entity. A subtype cast that
    /// isn't already an alias gets a polymorphic alias, recorded against the
    /// relationship's path.
    pub(crate) fn generate_path(
        context: &mut AttributeContext,
        path: &PathRegistry,
        token: &AttrToken,
        raiseerr: bool,
    ) -> Result<Option<PathRegistry>> {
        let next = match token {
            AttrToken::Raw(raw) => path.token(raw),
            AttrToken::Name(name) if token.is_wildcard() => return Ok(Some(path.token(name))),
            AttrToken::Name(name) => {
                let prop = path.mapper().and_then(|m| m.get_property(name));
                match prop {
                    Some(prop) => path.push_property(prop),
                    None if raiseerr => {
                        return Err(Error::unresolved(
                            ArgumentErrorKind::PropertyNotFound,
                            format!("Can't find property named '{name}' at path {path}"),
                            name.as_str(),
                            path.to_string(),
                        ));
                    }
                    None => return Ok(None),
                }
            }
            AttrToken::Attribute(attr) => {
                let prop = attr.property();
                let linked = path
                    .mapper()
                    .is_some_and(|m| prop.parent().common_parent(m));
                if !linked {
                    if raiseerr {
                        return Err(Error::unresolved(
                            ArgumentErrorKind::NotLinked,
                            format!("Attribute '{attr}' does not link from element '{path}'"),
                            attr.to_string(),
                            path.to_string(),
                        ));
                    }
                    return Ok(None);
                }
                let prop_path = path.push_property(prop);
                match attr.of_type_entity() {
                    Some(of_type) => {
                        let element = of_type.mapper();
                        if !of_type.is_aliased_class() {
                            let wp = with_polymorphic(element.base_mapper(), &[element], true, true);
                            context.set_path_with_polymorphic(&prop_path, Entity::from(wp));
                        }
                        prop_path.push_entity(element)
                    }
                    None => prop_path,
                }
            }
        };
        Ok(Some(if next.has_entity() {
            next.entity_path()
        } else {
            next
        }))
    }

    fn resolve(&mut self, token: &AttrToken) -> Result<PathRegistry> {
        Self::generate_path(&mut self.context, &self.path, token, true)?.ok_or_else(|| {
            Error::unresolved(
                ArgumentErrorKind::PropertyNotFound,
                format!("Can't resolve '{token}' from {}", self.path),
                token.to_string(),
                self.path.to_string(),
            )
        })
    }

    /// Extend the path by `token` and load it with `strategy`.
    ///
    /// `None` only steps through the attribute.
    pub fn set_strategy(
        &self,
        token: impl Into<AttrToken>,
        strategy: Option<StrategyKey>,
    ) -> Result<Self> {
        let mut cloned = self.clone();
        cloned.path = cloned.resolve(&token.into())?;
        cloned.strategy = strategy;
        if strategy.is_some() {
            record_loader(&mut cloned.context, &cloned.path, strategy);
        }
        Ok(cloned)
    }

    /// Load each column in `tokens` with the column strategy `key`.
    ///
    /// The option's own path is not extended; every column gets its own
    /// loader record.
    pub fn set_column_strategy<I, T>(&self, tokens: I, key: StrategyKey) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<AttrToken>,
    {
        let mut cloned = self.clone();
        for token in tokens {
            let path = Self::generate_path(&mut cloned.context, &self.path, &token.into(), true)?;
            if let Some(path) = path {
                record_loader(&mut cloned.context, &path, Some(key));
            }
        }
        Ok(cloned)
    }

    /// Step through `token` without changing how it loads.
    pub fn default(&self, token: impl Into<AttrToken>) -> Result<Self> {
        self.set_strategy(token, None)
    }

    /// Joined eager load; `innerjoin` picks INNER over LEFT OUTER JOIN.
    pub fn joined(&self, token: impl Into<AttrToken>, innerjoin: Option<bool>) -> Result<Self> {
        let mut loader = self.set_strategy(token, Some(StrategyKey::Lazy(LazyLoadStrategy::Joined)))?;
        if let Some(innerjoin) = innerjoin {
            loader.set_options(LocalOpts {
                eager_join_type: Some(innerjoin),
            });
        }
        Ok(loader)
    }

    pub fn subqueryload(&self, token: impl Into<AttrToken>) -> Result<Self> {
        self.set_strategy(token, Some(StrategyKey::Lazy(LazyLoadStrategy::Subquery)))
    }

    pub fn lazyload(&self, token: impl Into<AttrToken>) -> Result<Self> {
        self.set_strategy(token, Some(StrategyKey::Lazy(LazyLoadStrategy::Select)))
    }

    pub fn immediateload(&self, token: impl Into<AttrToken>) -> Result<Self> {
        self.set_strategy(token, Some(StrategyKey::Lazy(LazyLoadStrategy::Immediate)))
    }

    pub fn noload(&self, token: impl Into<AttrToken>) -> Result<Self> {
        self.set_strategy(token, Some(StrategyKey::Lazy(LazyLoadStrategy::NoLoad)))
    }

    pub fn defer<I, T>(&self, tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<AttrToken>,
    {
        self.set_column_strategy(tokens, StrategyKey::Column { deferred: true })
    }

    pub fn undefer<I, T>(&self, tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<AttrToken>,
    {
        self.set_column_strategy(tokens, StrategyKey::Column { deferred: false })
    }

    fn set_options(&mut self, opts: LocalOpts) {
        apply_local_opts(&mut self.context, &self.path, opts);
    }

    /// The strategy this option loads its property with.
    pub fn strategy_impl(&self) -> Result<Option<LoaderStrategy>> {
        ContextLoader::new(self.path.clone(), self.strategy).strategy_impl()
    }
}

/// The path a directive about `path`'s property is stored under: the
/// relationship before a trailing entity, or the path itself.
pub(crate) fn directive_path(path: &PathRegistry) -> PathRegistry {
    if path.has_entity() {
        path.parent()
    } else {
        path.clone()
    }
}

pub(crate) fn record_loader(
    context: &mut AttributeContext,
    path: &PathRegistry,
    strategy: Option<StrategyKey>,
) {
    context.set_loader(&directive_path(path), ContextLoader::new(path.clone(), strategy));
}

pub(crate) fn apply_local_opts(context: &mut AttributeContext, path: &PathRegistry, opts: LocalOpts) {
    if let Some(innerjoin) = opts.eager_join_type {
        context.set_eager_join_type(&directive_path(path), innerjoin);
    }
}

impl MapperOption for Load {
    #[tracing::instrument(level = "trace", skip_all, fields(path = %self.path))]
    fn process_query(&self, query: &mut Query) -> Result<()> {
        query.attributes_mut().update(&self.context);
        Ok(())
    }
}
