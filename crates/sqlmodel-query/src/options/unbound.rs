//! Unbound loader options.
//!
//! An [`UnboundLoad`] records raw tokens instead of resolved paths. When a
//! query processes it, each pending target is matched against the query's
//! entities and replayed through [`Load`]'s path resolution.

use super::load::{Load, apply_local_opts, record_loader};
use super::{AttrToken, LocalOpts, MapperOption, find_entity_basestring, find_entity_prop_comparator, invalid_token};
use crate::context::AttributeContext;
use crate::path::{PathRegistry, RELATIONSHIP_WILDCARD};
use crate::query::{Query, QueryEntity};
use crate::strategy::StrategyKey;
use sqlmodel_core::{ArgumentErrorKind, Error, LazyLoadStrategy, Result};

/// One strategy-setting call waiting to be bound.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BindTarget {
    tokens: Vec<AttrToken>,
    strategy: Option<StrategyKey>,
    local_opts: LocalOpts,
}

/// A loader option not yet tied to a query.
///
/// Built by [`joinedload`](super::joinedload) and friends; every
/// strategy-setting call adds a target that binds independently.
#[derive(Debug, Clone, Default)]
pub struct UnboundLoad {
    tokens: Vec<AttrToken>,
    strategy: Option<StrategyKey>,
    local_opts: LocalOpts,
    to_bind: Vec<BindTarget>,
}

impl UnboundLoad {
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    /// Tokens of the most recent step.
    pub fn tokens(&self) -> &[AttrToken] {
        &self.tokens
    }

    pub fn strategy(&self) -> Option<StrategyKey> {
        self.strategy
    }

    /// Number of targets that bind when the option is processed.
    pub fn pending(&self) -> usize {
        self.to_bind.len()
    }

    fn generate(&self) -> Self {
        Self {
            local_opts: LocalOpts::default(),
            ..self.clone()
        }
    }

    fn set_strategy_with(
        &self,
        token: AttrToken,
        strategy: Option<StrategyKey>,
        opts: LocalOpts,
    ) -> Self {
        let mut cloned = self.generate();
        cloned.tokens.push(token);
        cloned.strategy = strategy;
        cloned.local_opts.update(opts);
        if strategy.is_some() {
            let target = BindTarget {
                tokens: cloned.tokens.clone(),
                strategy,
                local_opts: cloned.local_opts,
            };
            cloned.to_bind.push(target);
        }
        cloned
    }

    /// Add `token` and load it with `strategy`; `None` steps through it.
    #[must_use]
    pub fn set_strategy(&self, token: impl Into<AttrToken>, strategy: Option<StrategyKey>) -> Self {
        self.set_strategy_with(token.into(), strategy, LocalOpts::default())
    }

    /// Load each column in `tokens` with the column strategy `key`.
    #[must_use]
    pub fn set_column_strategy<I, T>(&self, tokens: I, key: StrategyKey) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<AttrToken>,
    {
        let mut cloned = self.generate();
        for token in tokens {
            let mut path = self.tokens.clone();
            path.push(token.into());
            cloned.to_bind.push(BindTarget {
                tokens: path,
                strategy: Some(key),
                local_opts: LocalOpts::default(),
            });
        }
        cloned
    }

    #[must_use]
    pub fn default(&self, token: impl Into<AttrToken>) -> Self {
        self.set_strategy(token, None)
    }

    #[must_use]
    pub fn joined(&self, token: impl Into<AttrToken>, innerjoin: Option<bool>) -> Self {
        self.set_strategy_with(
            token.into(),
            Some(StrategyKey::Lazy(LazyLoadStrategy::Joined)),
            LocalOpts {
                eager_join_type: innerjoin,
            },
        )
    }

    #[must_use]
    pub fn subqueryload(&self, token: impl Into<AttrToken>) -> Self {
        self.set_strategy(token, Some(StrategyKey::Lazy(LazyLoadStrategy::Subquery)))
    }

    #[must_use]
    pub fn lazyload(&self, token: impl Into<AttrToken>) -> Self {
        self.set_strategy(token, Some(StrategyKey::Lazy(LazyLoadStrategy::Select)))
    }

    #[must_use]
    pub fn immediateload(&self, token: impl Into<AttrToken>) -> Self {
        self.set_strategy(token, Some(StrategyKey::Lazy(LazyLoadStrategy::Immediate)))
    }

    #[must_use]
    pub fn noload(&self, token: impl Into<AttrToken>) -> Self {
        self.set_strategy(token, Some(StrategyKey::Lazy(LazyLoadStrategy::NoLoad)))
    }

    #[must_use]
    pub fn defer<I, T>(&self, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<AttrToken>,
    {
        self.set_column_strategy(tokens, StrategyKey::Column { deferred: true })
    }

    #[must_use]
    pub fn undefer<I, T>(&self, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<AttrToken>,
    {
        self.set_column_strategy(tokens, StrategyKey::Column { deferred: false })
    }

    /// Build an option from `keys`, splitting names on `.`.
    ///
    /// With `chained`, `meth` is applied to every token so the whole chain
    /// gets the strategy; otherwise the leading tokens are only stepped
    /// through and `meth` applies to the last one.
    ///
    /// A lone `"*"` sets the strategy for every relationship of the lead
    /// entity; mixed with other tokens it is an error.
    pub fn from_keys<F>(meth: F, keys: Vec<AttrToken>, chained: bool) -> Result<Self>
    where
        F: Fn(&UnboundLoad, AttrToken) -> UnboundLoad,
    {
        let mut all_tokens: Vec<AttrToken> = Vec::new();
        for key in keys {
            match key {
                AttrToken::Name(name) => all_tokens.extend(name.split('.').map(AttrToken::from)),
                other => all_tokens.push(other),
            }
        }
        if all_tokens.iter().any(|t| matches!(t, AttrToken::Name(n) if n == "*")) {
            if all_tokens.len() > 1 {
                return Err(Error::argument(
                    ArgumentErrorKind::AmbiguousWildcard,
                    "Wildcard identifier '*' must be specified alone.",
                ));
            }
            all_tokens = vec![AttrToken::from(RELATIONSHIP_WILDCARD)];
        }
        let Some(last) = all_tokens.pop() else {
            return Err(invalid_token());
        };
        let mut opt = UnboundLoad::new();
        for token in all_tokens {
            opt = if chained {
                meth(&opt, token)
            } else {
                opt.default(token)
            };
        }
        Ok(meth(&opt, last))
    }

    #[tracing::instrument(level = "trace", skip_all, fields(targets = self.to_bind.len(), raiseerr = raiseerr))]
    fn process(&self, query: &mut Query, raiseerr: bool) -> Result<()> {
        let mut context = AttributeContext::new();
        for target in &self.to_bind {
            target.bind_loader(query, &mut context, raiseerr)?;
        }
        query.attributes_mut().update(&context);
        Ok(())
    }
}

impl BindTarget {
    fn bind_loader(&self, query: &Query, context: &mut AttributeContext, raiseerr: bool) -> Result<()> {
        let mut start: &[AttrToken] = &self.tokens;
        let current = query.current_path();
        if !current.is_empty() {
            match chop_path(start, current) {
                Some(rest) => start = rest,
                None => {
                    tracing::debug!(%current, "option does not continue the current path");
                    return Ok(());
                }
            }
        }
        let Some(first) = start.first() else {
            return Ok(());
        };

        let found = match first {
            AttrToken::Name(name) => find_entity_basestring(query, name, raiseerr)?,
            AttrToken::Attribute(attr) => {
                find_entity_prop_comparator(query, attr.key(), attr.parent_entity(), raiseerr)?
            }
            AttrToken::Raw(_) => return Err(invalid_token()),
        };
        let Some(entity) = found.and_then(QueryEntity::entity_zero) else {
            tracing::debug!(token = %first, "no entity to bind to");
            return Ok(());
        };

        let mut path = PathRegistry::for_entity(entity.clone());
        for token in start {
            match Load::generate_path(context, &path, token, raiseerr)? {
                Some(next) => path = next,
                None => {
                    tracing::debug!(%token, %path, "token does not resolve");
                    return Ok(());
                }
            }
        }
        record_loader(context, &path, self.strategy);
        if !self.local_opts.is_empty() {
            apply_local_opts(context, &path, self.local_opts);
        }
        Ok(())
    }
}

/// Strip the prefix of `tokens` that retraces `current`.
///
/// Every `(entity, property)` pair of `current` must be matched by the
/// corresponding token; any mismatch, or a current path longer than the
/// tokens, means the option doesn't apply.
fn chop_path<'t>(tokens: &'t [AttrToken], current: &PathRegistry) -> Option<&'t [AttrToken]> {
    let pairs = current.pairs();
    if pairs.len() > tokens.len() {
        return None;
    }
    for (token, (_, prop)) in tokens.iter().zip(&pairs) {
        let matched = match token {
            AttrToken::Name(name) => name == prop.key(),
            AttrToken::Attribute(attr) => attr.property() == *prop,
            AttrToken::Raw(_) => false,
        };
        if !matched {
            return None;
        }
    }
    Some(&tokens[pairs.len()..])
}

impl MapperOption for UnboundLoad {
    fn process_query(&self, query: &mut Query) -> Result<()> {
        self.process(query, true)
    }

    fn process_query_conditionally(&self, query: &mut Query) -> Result<()> {
        self.process(query, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::mapper;
    use crate::options::{joinedload, joinedload_all, joinedload_all_innerjoin, joinedload_innerjoin};
    use crate::strategy::LoaderStrategy;
    use sqlmodel_core::{ArgumentErrorKind, Entity};

    fn user_paths() -> [PathRegistry; 3] {
        let user = mapper("User");
        let order = mapper("Order");
        let item = mapper("Item");
        let orders = PathRegistry::for_entity(user).push_property(user.get_property("orders").unwrap());
        let items = orders
            .entity_path()
            .push_property(order.get_property("items").unwrap());
        let keywords = items
            .entity_path()
            .push_property(item.get_property("keywords").unwrap());
        [orders, items, keywords]
    }

    #[test]
    fn chained_keys_set_every_level() {
        let opt = joinedload_all(["orders.items.keywords"]).unwrap();
        assert_eq!(opt.pending(), 3);
        let query = Query::new([mapper("User")]).option(opt).unwrap();

        for path in user_paths() {
            assert_eq!(
                query.resolve_strategy(&path).unwrap(),
                Some(LoaderStrategy::Joined),
                "{path}"
            );
        }
        assert_eq!(query.attributes().len(), 3);
    }

    #[test]
    fn unchained_keys_set_only_the_last() {
        let opt = joinedload(["orders", "items.keywords"]).unwrap();
        assert_eq!(opt.pending(), 1);
        let query = Query::new([mapper("User")]).option(opt).unwrap();

        let [orders, items, keywords] = user_paths();
        assert!(query.attributes().loader(&orders).is_none());
        assert!(query.attributes().loader(&items).is_none());
        assert!(query.attributes().loader(&keywords).is_some());
        assert_eq!(query.attributes().len(), 1);
    }

    #[test]
    fn innerjoin_follows_chaining() {
        let [orders, items, _] = user_paths();

        let query = Query::new([mapper("User")])
            .option(joinedload_innerjoin(["orders.items"], true).unwrap())
            .unwrap();
        assert_eq!(query.attributes().eager_join_type(&orders), None);
        assert_eq!(query.attributes().eager_join_type(&items), Some(true));

        let query = Query::new([mapper("User")])
            .option(joinedload_all_innerjoin(["orders.items"], true).unwrap())
            .unwrap();
        assert_eq!(query.attributes().eager_join_type(&orders), Some(true));
        assert_eq!(query.attributes().eager_join_type(&items), Some(true));
    }

    #[test]
    fn strings_and_attributes_agree() {
        let user = mapper("User");
        let order = mapper("Order");
        let by_name = Query::new([user])
            .option(joinedload_all(["orders.items"]).unwrap())
            .unwrap();
        let by_attr = Query::new([user])
            .option(
                joinedload_all([user.attr("orders").unwrap(), order.attr("items").unwrap()])
                    .unwrap(),
            )
            .unwrap();
        assert_eq!(by_name.attributes(), by_attr.attributes());
    }

    #[test]
    fn secondary_load_chops_matching_prefix() {
        let user = mapper("User");
        let order = mapper("Order");
        let [orders, _, _] = user_paths();

        let query = Query::new([order])
            .with_current_path(orders.clone())
            .conditional_options([joinedload(["orders.items"]).unwrap()])
            .unwrap();
        let items = PathRegistry::for_entity(order).push_property(order.get_property("items").unwrap());
        assert_eq!(
            query.resolve_strategy(&items).unwrap(),
            Some(LoaderStrategy::Joined)
        );

        let miss = Query::new([order])
            .with_current_path(orders.clone())
            .conditional_options([joinedload(["addresses.user"]).unwrap()])
            .unwrap();
        assert!(miss.attributes().is_empty());

        let exhausted = Query::new([order])
            .with_current_path(orders)
            .conditional_options([joinedload([user.attr("orders").unwrap()]).unwrap()])
            .unwrap();
        assert!(exhausted.attributes().is_empty());
    }

    #[test]
    fn chop_rejects_partial_matches() {
        let [orders, items, _] = user_paths();
        let tokens: Vec<AttrToken> = ["orders", "items", "keywords"].map(AttrToken::from).to_vec();
        assert_eq!(chop_path(&tokens, &orders).map(<[_]>::len), Some(2));
        assert_eq!(chop_path(&tokens, &items.entity_path()).map(<[_]>::len), Some(1));

        let wrong: Vec<AttrToken> = ["addresses", "items"].map(AttrToken::from).to_vec();
        assert!(chop_path(&wrong, &items).is_none());
        assert!(chop_path(&tokens[..1], &items).is_none());
    }

    #[test]
    fn first_entity_wins_for_names() {
        let order = mapper("Order");
        let user = mapper("User");
        let query = Query::new([order, user]);

        let err = query
            .clone()
            .option(joinedload(["orders"]).unwrap())
            .unwrap_err();
        assert_eq!(err.argument_kind(), Some(ArgumentErrorKind::PropertyNotFound));

        let quiet = query
            .clone()
            .conditional_options([joinedload(["orders"]).unwrap()])
            .unwrap();
        assert!(quiet.attributes().is_empty());

        let bound = query
            .option(joinedload([user.attr("orders").unwrap()]).unwrap())
            .unwrap();
        let path = PathRegistry::for_entity(Entity::Mapped(user))
            .push_property(user.get_property("orders").unwrap());
        assert!(bound.attributes().loader(&path).is_some());
    }

    #[test]
    fn unmatched_attribute_raises_entity_not_found() {
        let user = mapper("User");
        let err = Query::new([mapper("Order")])
            .option(joinedload([user.attr("orders").unwrap()]).unwrap())
            .unwrap_err();
        assert_eq!(err.argument_kind(), Some(ArgumentErrorKind::EntityNotFound));
    }

    #[test]
    fn raw_leading_token_is_invalid() {
        let opt = UnboundLoad::new().joined(AttrToken::Raw("orders".into()), None);
        let query = Query::new([mapper("User")]);
        let err = query.clone().option(opt.clone()).unwrap_err();
        assert_eq!(err.argument_kind(), Some(ArgumentErrorKind::InvalidToken));
        let err = query.conditional_options([opt]).unwrap_err();
        assert_eq!(err.argument_kind(), Some(ArgumentErrorKind::InvalidToken));

        let empty: [&str; 0] = [];
        assert!(joinedload(empty).is_err());
    }

    #[test]
    fn joined_wildcard_must_be_alone() {
        for keys in [&["*", "orders"][..], &["orders", "*"], &["orders.*"]] {
            let err = joinedload(keys.iter().copied()).unwrap_err();
            assert_eq!(err.argument_kind(), Some(ArgumentErrorKind::AmbiguousWildcard), "{keys:?}");
        }
        let err = joinedload_all_innerjoin(["*.items"], true).unwrap_err();
        assert_eq!(err.argument_kind(), Some(ArgumentErrorKind::AmbiguousWildcard));
    }

    #[test]
    fn lone_joined_wildcard_defaults_lead_relationships() {
        let user = mapper("User");
        let [orders, items, _] = user_paths();
        let addresses = PathRegistry::for_entity(user).push_property(user.get_property("addresses").unwrap());
        let name = PathRegistry::for_entity(user).push_property(user.get_property("name").unwrap());

        for query in [
            Query::new([user]).option(joinedload(["*"]).unwrap()).unwrap(),
            Query::new([user])
                .conditional_options([joinedload(["*"]).unwrap()])
                .unwrap(),
        ] {
            assert_eq!(query.resolve_strategy(&orders).unwrap(), Some(LoaderStrategy::Joined));
            assert_eq!(query.resolve_strategy(&addresses).unwrap(), Some(LoaderStrategy::Joined));
            // only the lead entity's relationships
            assert_eq!(query.resolve_strategy(&items).unwrap(), Some(LoaderStrategy::Subquery));
            let column = LoaderStrategy::default_for(user.get_property("name").unwrap());
            assert_eq!(query.resolve_strategy(&name).unwrap(), Some(column));
        }
    }

    #[test]
    fn generations_keep_pending_targets_independent() {
        let base = UnboundLoad::new().joined("orders", Some(true));
        let next = base.subqueryload("items");
        assert_eq!(base.pending(), 1);
        assert_eq!(next.pending(), 2);
        assert_eq!(next.tokens().len(), 2);

        let cols = UnboundLoad::new().default("orders").undefer(["description", "isopen"]);
        assert_eq!(cols.pending(), 2);
        assert_eq!(cols.tokens().len(), 1);
        let query = Query::new([mapper("User")]).option(cols).unwrap();
        let order = mapper("Order");
        let [orders, _, _] = user_paths();
        let description = orders
            .entity_path()
            .push_property(order.get_property("description").unwrap());
        assert_eq!(
            query.resolve_strategy(&description).unwrap(),
            Some(LoaderStrategy::Column)
        );
    }
}
