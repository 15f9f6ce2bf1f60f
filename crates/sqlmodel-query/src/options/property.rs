//! Options addressing one property path.
//!
//! A [`PropertyOption`] resolves its key against the query at process time
//! and writes a single directive per resolved path: a loader strategy, a
//! join kind, or a row adapter for `contains_eager`.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use sqlmodel_core::{
    ArgumentErrorKind, Entity, Error, LazyLoadStrategy, Mapper, Property, Registry, Result,
    with_polymorphic,
};

use super::{AttrToken, MapperOption, find_entity_basestring, find_entity_prop_comparator, invalid_token};
use crate::adapter::RowAdapter;
use crate::context::EagerRowProcessor;
use crate::path::{PathRegistry, RELATIONSHIP_WILDCARD};
use crate::query::{Query, QueryEntity};
use crate::strategy::StrategyKey;

/// Where `contains_eager` finds the eager entity's columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasSpec {
    /// A table alias of the relationship target, by name.
    Name(String),
    /// An aliased entity selected by the query.
    Entity(Entity),
}

impl From<&str> for AliasSpec {
    fn from(name: &str) -> Self {
        AliasSpec::Name(name.to_string())
    }
}

impl From<Entity> for AliasSpec {
    fn from(entity: Entity) -> Self {
        AliasSpec::Entity(entity)
    }
}

/// The directive a [`PropertyOption`] writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyOptionKind {
    /// Column loading: deferred or loaded with the row.
    Deferred { defer: bool },
    /// Relationship loading strategy.
    EagerLazy { lazy: LazyLoadStrategy },
    /// INNER (`true`) or LEFT OUTER (`false`) join for an eager load.
    EagerJoin { innerjoin: bool },
    /// Row adapter for an eager load read from the query's own rows.
    EagerFromAlias { alias: Option<AliasSpec> },
}

/// A directive anchored to the paths a key resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyOption {
    key: Vec<AttrToken>,
    kind: PropertyOptionKind,
    chained: bool,
    propagate_to_loaders: bool,
}

#[derive(Debug, Clone)]
struct Cursor {
    element: Entity,
    mapper: &'static Mapper,
}

impl PropertyOption {
    /// Defer (`true`) or undefer (`false`) the column at the end of `key`.
    pub fn deferred(key: Vec<AttrToken>, defer: bool) -> Self {
        Self {
            key,
            kind: PropertyOptionKind::Deferred { defer },
            chained: false,
            propagate_to_loaders: true,
        }
    }

    /// Load relationships along `key` with `lazy`.
    ///
    /// A lone `"*"` key sets the default for every relationship and never
    /// propagates to lazy loads; `"*"` mixed with other tokens is an error.
    pub fn eager_lazy(
        key: Vec<AttrToken>,
        lazy: LazyLoadStrategy,
        chained: bool,
        propagate_to_loaders: bool,
    ) -> Result<Self> {
        let mut key = key;
        let mut propagate_to_loaders = propagate_to_loaders;
        let has_star = key
            .iter()
            .any(|t| matches!(t, AttrToken::Name(n) if n.split('.').any(|s| s == "*")));
        if has_star {
            let alone = matches!(key.as_slice(), [AttrToken::Name(n)] if n == "*");
            if !alone {
                return Err(Error::argument(
                    ArgumentErrorKind::AmbiguousWildcard,
                    "Wildcard identifier '*' must be specified alone.",
                ));
            }
            key = vec![AttrToken::from(RELATIONSHIP_WILDCARD)];
            propagate_to_loaders = false;
        }
        Ok(Self {
            key,
            kind: PropertyOptionKind::EagerLazy { lazy },
            chained,
            propagate_to_loaders,
        })
    }

    /// Record the join kind for the eager loads along `key`.
    pub fn eager_join(key: Vec<AttrToken>, innerjoin: bool, chained: bool) -> Self {
        Self {
            key,
            kind: PropertyOptionKind::EagerJoin { innerjoin },
            chained,
            propagate_to_loaders: false,
        }
    }

    /// Read the eager entities along `key` from the query's rows.
    pub fn eager_from_alias(key: Vec<AttrToken>, alias: Option<AliasSpec>, chained: bool) -> Self {
        Self {
            key,
            kind: PropertyOptionKind::EagerFromAlias { alias },
            chained,
            propagate_to_loaders: false,
        }
    }

    pub fn key(&self) -> &[AttrToken] {
        &self.key
    }

    pub fn kind(&self) -> &PropertyOptionKind {
        &self.kind
    }

    pub fn is_chained(&self) -> bool {
        self.chained
    }

    /// Reconcile the key with the query's current path and entities.
    ///
    /// Returns the resolved paths in traversal order, or an empty list when
    /// the key doesn't apply to this query (a secondary load below another
    /// relationship, or a miss with `raiseerr` off).
    pub fn process_paths(&self, query: &mut Query, raiseerr: bool) -> Result<Vec<PathRegistry>> {
        let mut path = PathRegistry::root();
        let mut paths = Vec::new();
        let mut cursor: Option<Cursor> = None;
        let mut anchor: Option<Entity> = None;

        let current = query.current_path().clone();
        let pairs = current.pairs();
        let mut consumed = 0;

        let mut tokens: VecDeque<AttrToken> = self.key.iter().cloned().collect();
        while let Some(token) = tokens.pop_front() {
            let (label, prop) = match &token {
                AttrToken::Name(name) => {
                    if token.is_wildcard() {
                        return Ok(vec![path.token(name)]);
                    }
                    let (head, rest) = match name.split_once('.') {
                        Some((head, rest)) => (head.to_string(), Some(rest.to_string())),
                        None => (name.clone(), None),
                    };
                    if let Some(rest) = rest {
                        tokens.push_front(AttrToken::Name(rest));
                    }

                    if consumed < pairs.len() {
                        if pairs[consumed].1.key() == head {
                            consumed += 1;
                            continue;
                        }
                        return Ok(Vec::new());
                    }

                    if cursor.is_none() {
                        let found = find_entity_basestring(query, &head, raiseerr)?
                            .and_then(QueryEntity::entity_zero)
                            .cloned();
                        let Some(found) = found else {
                            return Ok(Vec::new());
                        };
                        cursor = Some(Cursor {
                            mapper: found.mapper(),
                            element: found.clone(),
                        });
                        anchor = Some(found);
                    }
                    let Some(current_cursor) = cursor.as_ref() else {
                        return Ok(Vec::new());
                    };
                    match current_cursor.mapper.get_property(&head) {
                        Some(prop) => (head, prop),
                        None if raiseerr => {
                            return Err(Error::unresolved(
                                ArgumentErrorKind::PropertyNotFound,
                                format!(
                                    "Can't find property named '{head}' on the mapped entity {} in this Query. ",
                                    current_cursor.mapper
                                ),
                                head.as_str(),
                                current_cursor.element.to_string(),
                            ));
                        }
                        None => return Ok(Vec::new()),
                    }
                }
                AttrToken::Attribute(attr) => {
                    let prop = attr.property();
                    if consumed < pairs.len() {
                        let (entity, current_prop) = pairs[consumed];
                        if *entity == path_entity(attr.parent_entity(), prop) && current_prop == prop {
                            consumed += 1;
                            continue;
                        }
                        return Ok(Vec::new());
                    }

                    if cursor.is_none() {
                        let found = find_entity_prop_comparator(
                            query,
                            prop.key(),
                            attr.parent_entity(),
                            raiseerr,
                        )?
                        .and_then(QueryEntity::entity_zero)
                        .cloned();
                        let Some(found) = found else {
                            return Ok(Vec::new());
                        };
                        cursor = Some(Cursor {
                            mapper: found.mapper(),
                            element: found.clone(),
                        });
                        anchor = Some(found);
                    }
                    (attr.to_string(), prop)
                }
                AttrToken::Raw(_) => return Err(invalid_token()),
            };

            let Some(Cursor { element, mapper }) = cursor.take() else {
                return Ok(Vec::new());
            };
            if raiseerr && !prop.parent().common_parent(mapper) {
                return Err(Error::unresolved(
                    ArgumentErrorKind::NotLinked,
                    format!("Attribute '{label}' does not link from element '{element}'"),
                    label,
                    element.to_string(),
                ));
            }

            path = path.push_entity(element).push_property(prop);
            paths.push(path.clone());

            let of_type = match &token {
                AttrToken::Attribute(attr) => attr.of_type_entity().cloned(),
                _ => None,
            };
            if let Some(of_type) = of_type {
                let target = of_type.mapper();
                let info = if of_type.is_aliased_class() {
                    of_type
                } else {
                    Entity::from(with_polymorphic(target.base_mapper(), &[target], true, true))
                };
                query.attributes_mut().set_path_with_polymorphic(&path, info);
                cursor = Some(Cursor {
                    element: Entity::Mapped(target),
                    mapper: target,
                });
            } else if let Some(target) = prop.target() {
                cursor = Some(Cursor {
                    element: Entity::Mapped(target),
                    mapper: target,
                });
            } else if !tokens.is_empty() {
                let entity = anchor.as_ref().map(ToString::to_string).unwrap_or_default();
                return Err(Error::unresolved(
                    ArgumentErrorKind::NotMapped,
                    format!("Attribute '{label}' of entity '{entity}' does not refer to a mapped entity"),
                    label,
                    entity,
                ));
            }
        }

        if consumed < pairs.len() {
            return Ok(Vec::new());
        }
        Ok(paths)
    }

    fn targets<'p>(&self, paths: &'p [PathRegistry]) -> &'p [PathRegistry] {
        match paths.split_last() {
            Some((last, _)) if !self.chained => std::slice::from_ref(last),
            _ => paths,
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(kind = ?self.kind, raiseerr = raiseerr))]
    fn process(&self, query: &mut Query, raiseerr: bool) -> Result<()> {
        let paths = self.process_paths(query, raiseerr)?;
        if paths.is_empty() {
            tracing::debug!(key = ?self.key, "option does not apply to this query");
            return Ok(());
        }
        match &self.kind {
            PropertyOptionKind::Deferred { defer } => {
                self.set_loader_strategy(query, &paths, StrategyKey::Column { deferred: *defer });
            }
            PropertyOptionKind::EagerLazy { lazy } => {
                self.set_loader_strategy(query, &paths, StrategyKey::Lazy(*lazy));
            }
            PropertyOptionKind::EagerJoin { innerjoin } => {
                for path in self.targets(&paths) {
                    query.attributes_mut().set_eager_join_type(path, *innerjoin);
                }
            }
            PropertyOptionKind::EagerFromAlias { alias } => {
                self.set_row_processors(query, &paths, alias.as_ref());
            }
        }
        Ok(())
    }

    fn set_loader_strategy(&self, query: &mut Query, paths: &[PathRegistry], key: StrategyKey) {
        for path in self.targets(paths) {
            query.attributes_mut().set_loader_strategy(path, key);
        }
    }

    fn set_row_processors(&self, query: &mut Query, paths: &[PathRegistry], alias: Option<&AliasSpec>) {
        let Some((last, init)) = paths.split_last() else {
            return;
        };
        if self.chained {
            for path in init {
                let adapter = path
                    .prop()
                    .and_then(Property::target)
                    .and_then(|target| query.polymorphic_adapter(target).cloned());
                query
                    .attributes_mut()
                    .setdefault_row_processor(path, EagerRowProcessor::new(adapter));
            }
        }

        let Some(prop) = last.prop() else {
            return;
        };
        let adapter = match alias {
            Some(AliasSpec::Name(name)) => {
                prop.target().map(|target| RowAdapter::for_table_alias(target, name))
            }
            Some(AliasSpec::Entity(entity)) => Some(RowAdapter::for_entity(entity)),
            None => match query.attributes().path_with_polymorphic(last) {
                Some(with_poly) => Some(RowAdapter::for_entity(with_poly)),
                None => prop
                    .target()
                    .and_then(|target| query.polymorphic_adapter(target).cloned()),
            },
        };
        query
            .attributes_mut()
            .set_row_processor(last, EagerRowProcessor::new(adapter));
    }

    /// Persistable form of the option.
    ///
    /// Class-bound attributes become `(class, key)` pairs. Options that
    /// refer to aliased entities can't be expressed that way.
    pub fn to_state(&self) -> Result<PropertyOptionState> {
        let key = self
            .key
            .iter()
            .map(StateToken::from_token)
            .collect::<Result<Vec<_>>>()?;
        let kind = match &self.kind {
            PropertyOptionKind::Deferred { defer } => KindState::Deferred { defer: *defer },
            PropertyOptionKind::EagerLazy { lazy } => KindState::EagerLazy { lazy: *lazy },
            PropertyOptionKind::EagerJoin { innerjoin } => KindState::EagerJoin {
                innerjoin: *innerjoin,
            },
            PropertyOptionKind::EagerFromAlias { alias } => KindState::EagerFromAlias {
                alias: match alias {
                    None => None,
                    Some(AliasSpec::Name(name)) => Some(name.clone()),
                    Some(AliasSpec::Entity(entity)) => {
                        return Err(Error::Serde(format!(
                            "can't serialize contains_eager alias {entity}"
                        )));
                    }
                },
            },
        };
        Ok(PropertyOptionState {
            key,
            kind,
            chained: self.chained,
            propagate_to_loaders: self.propagate_to_loaders,
        })
    }

    /// Rebuild an option from its state, resolving classes in `registry`.
    pub fn from_state(state: PropertyOptionState, registry: &Registry) -> Result<Self> {
        let key = state
            .key
            .into_iter()
            .map(|t| t.into_token(registry))
            .collect::<Result<Vec<_>>>()?;
        let kind = match state.kind {
            KindState::Deferred { defer } => PropertyOptionKind::Deferred { defer },
            KindState::EagerLazy { lazy } => PropertyOptionKind::EagerLazy { lazy },
            KindState::EagerJoin { innerjoin } => PropertyOptionKind::EagerJoin { innerjoin },
            KindState::EagerFromAlias { alias } => PropertyOptionKind::EagerFromAlias {
                alias: alias.map(AliasSpec::Name),
            },
        };
        Ok(Self {
            key,
            kind,
            chained: state.chained,
            propagate_to_loaders: state.propagate_to_loaders,
        })
    }
}

/// The entity a path records for `prop` reached through `parent`.
fn path_entity(parent: &Entity, prop: &'static Property) -> Entity {
    if parent.use_mapper_path() {
        Entity::Mapped(prop.parent())
    } else {
        parent.clone()
    }
}

impl MapperOption for PropertyOption {
    fn process_query(&self, query: &mut Query) -> Result<()> {
        self.process(query, true)
    }

    fn process_query_conditionally(&self, query: &mut Query) -> Result<()> {
        self.process(query, false)
    }

    fn propagate_to_loaders(&self) -> bool {
        self.propagate_to_loaders
    }
}

/// One key token in persistable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateToken {
    Name(String),
    Raw(String),
    Attribute {
        class: String,
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        of_type: Option<String>,
    },
}

impl StateToken {
    fn from_token(token: &AttrToken) -> Result<Self> {
        match token {
            AttrToken::Name(name) => Ok(StateToken::Name(name.clone())),
            AttrToken::Raw(raw) => Ok(StateToken::Raw(raw.clone())),
            AttrToken::Attribute(attr) => {
                if attr.parent_entity().is_aliased_class() {
                    return Err(Error::Serde(format!(
                        "can't serialize attribute {attr} of an aliased entity"
                    )));
                }
                let of_type = match attr.of_type_entity() {
                    None => None,
                    Some(Entity::Mapped(m)) => Some(m.class_name().to_string()),
                    Some(alias @ Entity::Aliased(_)) => {
                        return Err(Error::Serde(format!(
                            "can't serialize of_type({alias}) on {attr}"
                        )));
                    }
                };
                Ok(StateToken::Attribute {
                    class: attr.parent_entity().mapper().class_name().to_string(),
                    key: attr.key().to_string(),
                    of_type,
                })
            }
        }
    }

    fn into_token(self, registry: &Registry) -> Result<AttrToken> {
        match self {
            StateToken::Name(name) => Ok(AttrToken::Name(name)),
            StateToken::Raw(raw) => Ok(AttrToken::Raw(raw)),
            StateToken::Attribute {
                class,
                key,
                of_type,
            } => {
                let mut attr = registry.mapper(&class)?.attr(&key)?;
                if let Some(of_type) = of_type {
                    attr = attr.of_type(registry.mapper(&of_type)?);
                }
                Ok(AttrToken::Attribute(attr))
            }
        }
    }
}

/// Persistable form of [`PropertyOptionKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KindState {
    Deferred { defer: bool },
    EagerLazy { lazy: LazyLoadStrategy },
    EagerJoin { innerjoin: bool },
    EagerFromAlias { alias: Option<String> },
}

/// Persistable form of a [`PropertyOption`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyOptionState {
    pub key: Vec<StateToken>,
    pub kind: KindState,
    pub chained: bool,
    pub propagate_to_loaders: bool,
}

/// Undefer every deferred column configured with a group name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndeferGroupOption {
    group: String,
}

impl UndeferGroupOption {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }
}

impl MapperOption for UndeferGroupOption {
    fn process_query(&self, query: &mut Query) -> Result<()> {
        query.attributes_mut().add_undefer_group(self.group.clone());
        Ok(())
    }

    fn propagate_to_loaders(&self) -> bool {
        true
    }
}
