//! Loader options.
//!
//! An option tells the loading engine how to fetch the attributes along one
//! path of the entity graph. Three families exist:
//!
//! - [`Load`]: bound to a root entity up front, resolving each attribute
//!   as it is added.
//! - [`UnboundLoad`]: a chain of raw tokens, matched against a query's
//!   entities only when the query processes it (`joinedload`).
//! - [`PropertyOption`]: resolves a key into a list of paths at process
//!   time and writes one directive per path (`subqueryload`, `defer`,
//!   `contains_eager`, ...). [`UndeferGroupOption`] has no path at all.
//!
//! Every option implements [`MapperOption`] and is applied through
//! [`Query::options`](crate::query::Query::options).

mod load;
mod property;
mod unbound;

use std::fmt;
use std::sync::Arc;

use sqlmodel_core::{ArgumentErrorKind, ClassAttribute, Entity, Error, LazyLoadStrategy, Result};

use crate::query::{Query, QueryEntity};

pub use load::Load;
pub use property::{
    AliasSpec, PropertyOption, PropertyOptionKind, PropertyOptionState, StateToken,
    UndeferGroupOption,
};
pub use unbound::UnboundLoad;

/// A modification applied to a query before it runs.
pub trait MapperOption: fmt::Debug + Send + Sync {
    /// Apply to `query`, failing if any part of the option can't be resolved.
    fn process_query(&self, query: &mut Query) -> Result<()>;

    /// Apply to `query`, skipping the parts that don't resolve.
    ///
    /// Used when options are carried into the secondary query of a lazy
    /// load, where a miss is expected.
    fn process_query_conditionally(&self, query: &mut Query) -> Result<()> {
        self.process_query(query)
    }

    /// Whether the option is carried into queries issued by lazy loads.
    fn propagate_to_loaders(&self) -> bool {
        false
    }
}

/// One step of an option's path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrToken {
    /// A property name, or a dotted chain of them (`"orders.items"`).
    Name(String),
    /// A class-bound attribute such as `User.orders`.
    Attribute(ClassAttribute),
    /// A token passed through unresolved; only meaningful after a
    /// resolved prefix.
    Raw(String),
}

impl AttrToken {
    /// Whether this is a `"<kind>:*"` wildcard name.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, AttrToken::Name(name) if name.ends_with(":*"))
    }
}

impl fmt::Display for AttrToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrToken::Name(name) | AttrToken::Raw(name) => f.write_str(name),
            AttrToken::Attribute(attr) => write!(f, "{attr}"),
        }
    }
}

impl From<&str> for AttrToken {
    fn from(name: &str) -> Self {
        AttrToken::Name(name.to_string())
    }
}

impl From<String> for AttrToken {
    fn from(name: String) -> Self {
        AttrToken::Name(name)
    }
}

impl From<ClassAttribute> for AttrToken {
    fn from(attr: ClassAttribute) -> Self {
        AttrToken::Attribute(attr)
    }
}

/// Auxiliary settings applied at the end of a resolved path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalOpts {
    pub eager_join_type: Option<bool>,
}

impl LocalOpts {
    pub fn is_empty(&self) -> bool {
        self.eager_join_type.is_none()
    }

    fn update(&mut self, other: LocalOpts) {
        if other.eager_join_type.is_some() {
            self.eager_join_type = other.eager_join_type;
        }
    }
}

pub(crate) fn invalid_token() -> Error {
    Error::argument(
        ArgumentErrorKind::InvalidToken,
        "mapper option expects string key or list of attributes",
    )
}

fn no_mapper_entities(token: &str) -> Error {
    Error::unresolved(
        ArgumentErrorKind::NoMapperEntities,
        format!("Query has only expression-based entities - can't find property named '{token}'."),
        token,
        "",
    )
}

/// The query entity a string token is resolved against: the first mapper
/// entity, in declaration order.
///
/// With several entities sharing a property name this picks the first one;
/// class-bound attributes address a specific entity.
pub(crate) fn find_entity_basestring<'q>(
    query: &'q Query,
    token: &str,
    raiseerr: bool,
) -> Result<Option<&'q QueryEntity>> {
    match query.mapper_entities().next() {
        Some(entity) => Ok(Some(entity)),
        None if raiseerr => Err(no_mapper_entities(token)),
        None => Ok(None),
    }
}

/// The query entity a class-bound attribute declared on `parent` resolves
/// against.
pub(crate) fn find_entity_prop_comparator<'q>(
    query: &'q Query,
    token: &str,
    parent: &Entity,
    raiseerr: bool,
) -> Result<Option<&'q QueryEntity>> {
    if let Some(entity) = query.mapper_entities().find(|e| e.corresponds_to(parent)) {
        return Ok(Some(entity));
    }
    if !raiseerr {
        return Ok(None);
    }
    let entities: Vec<String> = query.mapper_entities().map(ToString::to_string).collect();
    if entities.is_empty() {
        return Err(no_mapper_entities(token));
    }
    let listed = entities.join(",");
    Err(Error::unresolved(
        ArgumentErrorKind::EntityNotFound,
        format!(
            "Can't find property '{token}' on any entity specified in this Query.  \
             Note the full path from root ({listed}) to target entity must be specified."
        ),
        token,
        listed,
    ))
}

macro_rules! impl_into_option {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Arc<dyn MapperOption> {
                fn from(option: $ty) -> Self {
                    Arc::new(option)
                }
            }
        )*
    };
}

impl_into_option!(Load, UnboundLoad, PropertyOption, UndeferGroupOption);

fn collect_keys<I, T>(keys: I) -> Vec<AttrToken>
where
    I: IntoIterator<Item = T>,
    T: Into<AttrToken>,
{
    keys.into_iter().map(Into::into).collect()
}

/// Joined eager load of the final attribute in `keys`.
///
/// ```
/// use sqlmodel_query::options::joinedload;
///
/// // User.orders is loaded by a LEFT OUTER JOIN; User.orders.items stays lazy
/// let opt = joinedload(["orders"]).unwrap();
/// # let _ = opt;
/// ```
pub fn joinedload<I, T>(keys: I) -> Result<UnboundLoad>
where
    I: IntoIterator<Item = T>,
    T: Into<AttrToken>,
{
    UnboundLoad::from_keys(|o, t| o.joined(t, None), collect_keys(keys), false)
}

/// Joined eager load of every attribute along `keys`.
pub fn joinedload_all<I, T>(keys: I) -> Result<UnboundLoad>
where
    I: IntoIterator<Item = T>,
    T: Into<AttrToken>,
{
    UnboundLoad::from_keys(|o, t| o.joined(t, None), collect_keys(keys), true)
}

/// [`joinedload`] with an explicit inner/outer join choice.
pub fn joinedload_innerjoin<I, T>(keys: I, innerjoin: bool) -> Result<UnboundLoad>
where
    I: IntoIterator<Item = T>,
    T: Into<AttrToken>,
{
    UnboundLoad::from_keys(
        |o, t| o.joined(t, Some(innerjoin)),
        collect_keys(keys),
        false,
    )
}

/// [`joinedload_all`] with an explicit inner/outer join choice.
pub fn joinedload_all_innerjoin<I, T>(keys: I, innerjoin: bool) -> Result<UnboundLoad>
where
    I: IntoIterator<Item = T>,
    T: Into<AttrToken>,
{
    UnboundLoad::from_keys(
        |o, t| o.joined(t, Some(innerjoin)),
        collect_keys(keys),
        true,
    )
}

/// Subquery eager load of the final attribute in `keys`. `["*"]` makes it
/// the default for every relationship.
pub fn subqueryload<I, T>(keys: I) -> Result<PropertyOption>
where
    I: IntoIterator<Item = T>,
    T: Into<AttrToken>,
{
    PropertyOption::eager_lazy(collect_keys(keys), LazyLoadStrategy::Subquery, false, true)
}

/// Subquery eager load of every attribute along `keys`.
pub fn subqueryload_all<I, T>(keys: I) -> Result<PropertyOption>
where
    I: IntoIterator<Item = T>,
    T: Into<AttrToken>,
{
    PropertyOption::eager_lazy(collect_keys(keys), LazyLoadStrategy::Subquery, true, true)
}

/// Lazy load of the final attribute in `keys`.
pub fn lazyload<I, T>(keys: I) -> Result<PropertyOption>
where
    I: IntoIterator<Item = T>,
    T: Into<AttrToken>,
{
    PropertyOption::eager_lazy(collect_keys(keys), LazyLoadStrategy::Select, false, true)
}

/// Lazy load of every attribute along `keys`.
pub fn lazyload_all<I, T>(keys: I) -> Result<PropertyOption>
where
    I: IntoIterator<Item = T>,
    T: Into<AttrToken>,
{
    PropertyOption::eager_lazy(collect_keys(keys), LazyLoadStrategy::Select, true, true)
}

/// Never load the final attribute in `keys`.
pub fn noload<I, T>(keys: I) -> Result<PropertyOption>
where
    I: IntoIterator<Item = T>,
    T: Into<AttrToken>,
{
    PropertyOption::eager_lazy(collect_keys(keys), LazyLoadStrategy::NoLoad, false, true)
}

/// Load the final attribute in `keys` with its own SELECT right after the
/// parent rows.
pub fn immediateload<I, T>(keys: I) -> Result<PropertyOption>
where
    I: IntoIterator<Item = T>,
    T: Into<AttrToken>,
{
    PropertyOption::eager_lazy(collect_keys(keys), LazyLoadStrategy::Immediate, false, true)
}

/// Populate the attributes along `keys` from columns already present in
/// the query's rows, optionally selected under `alias`.
///
/// Returns the joined-strategy option and the row-adapter option; apply both.
pub fn contains_eager<I, T>(keys: I, alias: Option<AliasSpec>) -> Result<[PropertyOption; 2]>
where
    I: IntoIterator<Item = T>,
    T: Into<AttrToken>,
{
    let keys = collect_keys(keys);
    let strategy = PropertyOption::eager_lazy(keys.clone(), LazyLoadStrategy::Joined, true, false)?;
    let adapter = PropertyOption::eager_from_alias(keys, alias, true);
    Ok([strategy, adapter])
}

/// Defer loading of the column at the end of `key` until first access.
pub fn defer<I, T>(key: I) -> PropertyOption
where
    I: IntoIterator<Item = T>,
    T: Into<AttrToken>,
{
    PropertyOption::deferred(collect_keys(key), true)
}

/// Load the column at the end of `key` with its parent row.
pub fn undefer<I, T>(key: I) -> PropertyOption
where
    I: IntoIterator<Item = T>,
    T: Into<AttrToken>,
{
    PropertyOption::deferred(collect_keys(key), false)
}

/// Undefer every deferred column configured with `group`.
pub fn undefer_group(group: impl Into<String>) -> UndeferGroupOption {
    UndeferGroupOption::new(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::mapper;

    #[test]
    fn tokens_display_and_convert() {
        let user = mapper("User");
        let attr = AttrToken::from(user.attr("orders").unwrap());
        assert_eq!(attr.to_string(), "User.orders");
        assert_eq!(AttrToken::from("orders.items").to_string(), "orders.items");
        assert!(AttrToken::from("relationship:*").is_wildcard());
        assert!(!AttrToken::Raw("relationship:*".into()).is_wildcard());
    }

    #[test]
    fn string_tokens_pick_first_mapper_entity() {
        let query = Query::new([
            QueryEntity::Expression("count(*)".into()),
            QueryEntity::from(mapper("Order")),
            QueryEntity::from(mapper("User")),
        ]);
        let found = find_entity_basestring(&query, "items", true).unwrap().unwrap();
        assert_eq!(found.mapper(), Some(mapper("Order")));
    }

    #[test]
    fn missing_entities_raise_or_miss() {
        let query = Query::new([QueryEntity::Expression("count(*)".into())]);
        let err = find_entity_basestring(&query, "orders", true).unwrap_err();
        assert_eq!(err.argument_kind(), Some(ArgumentErrorKind::NoMapperEntities));
        assert!(find_entity_basestring(&query, "orders", false).unwrap().is_none());

        let query = Query::new([mapper("Order")]);
        let user = Entity::Mapped(mapper("User"));
        let err = find_entity_prop_comparator(&query, "orders", &user, true).unwrap_err();
        assert_eq!(err.argument_kind(), Some(ArgumentErrorKind::EntityNotFound));
        assert_eq!(err.token(), Some("orders"));
        assert!(err.to_string().contains("from root (Order)"));
        assert!(
            find_entity_prop_comparator(&query, "orders", &user, false)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn local_opts_update_keeps_set_values() {
        let mut opts = LocalOpts {
            eager_join_type: Some(true),
        };
        opts.update(LocalOpts::default());
        assert_eq!(opts.eager_join_type, Some(true));
        assert!(!opts.is_empty());
        assert!(LocalOpts::default().is_empty());
    }
}
