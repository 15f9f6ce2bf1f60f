//! Loader strategies and their lookup.
//!
//! A [`StrategyKey`] is what an option records ("load this joined", "defer
//! this column"); a [`LoaderStrategy`] is the concrete technique the
//! loading engine runs for one property.

use serde::{Deserialize, Serialize};
use std::fmt;

use sqlmodel_core::{Error, LazyLoadStrategy, MappingErrorKind, Property, PropertyKind, Result};

/// Strategy descriptor recorded by an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKey {
    /// Relationship loading, by `lazy` tag.
    Lazy(LazyLoadStrategy),
    /// Column loading.
    Column { deferred: bool },
}

/// Concrete loading technique for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderStrategy {
    /// Load the column with the parent row.
    Column,
    /// Load the column on first access.
    DeferredColumn,
    /// Lazy SELECT on first access.
    Select,
    /// Eager LEFT/INNER JOIN in the parent query.
    Joined,
    /// Eager second query wrapping the parent query.
    Subquery,
    /// SELECT issued right after the parent loads.
    Immediate,
    /// Never load.
    NoLoad,
}

impl LoaderStrategy {
    /// Relationship strategy for a `lazy` tag.
    pub const fn for_lazy(lazy: LazyLoadStrategy) -> Self {
        match lazy {
            LazyLoadStrategy::Select => LoaderStrategy::Select,
            LazyLoadStrategy::Joined => LoaderStrategy::Joined,
            LazyLoadStrategy::Subquery => LoaderStrategy::Subquery,
            LazyLoadStrategy::Immediate => LoaderStrategy::Immediate,
            LazyLoadStrategy::NoLoad => LoaderStrategy::NoLoad,
        }
    }

    /// Column strategy for a deferral flag.
    pub const fn for_column(deferred: bool) -> Self {
        if deferred {
            LoaderStrategy::DeferredColumn
        } else {
            LoaderStrategy::Column
        }
    }

    pub const fn is_column_strategy(self) -> bool {
        matches!(self, LoaderStrategy::Column | LoaderStrategy::DeferredColumn)
    }

    /// The descriptor that selects this strategy.
    pub const fn key(self) -> StrategyKey {
        match self {
            LoaderStrategy::Column => StrategyKey::Column { deferred: false },
            LoaderStrategy::DeferredColumn => StrategyKey::Column { deferred: true },
            LoaderStrategy::Select => StrategyKey::Lazy(LazyLoadStrategy::Select),
            LoaderStrategy::Joined => StrategyKey::Lazy(LazyLoadStrategy::Joined),
            LoaderStrategy::Subquery => StrategyKey::Lazy(LazyLoadStrategy::Subquery),
            LoaderStrategy::Immediate => StrategyKey::Lazy(LazyLoadStrategy::Immediate),
            LoaderStrategy::NoLoad => StrategyKey::Lazy(LazyLoadStrategy::NoLoad),
        }
    }

    /// The strategy `prop` uses when no option says otherwise.
    pub fn default_for(prop: &Property) -> Self {
        match prop.kind() {
            PropertyKind::Column(info) => Self::for_column(info.deferred),
            PropertyKind::Relationship { info, .. } => Self::for_lazy(info.lazy_strategy),
        }
    }

    /// Resolve `key` against `prop`, failing when the descriptor doesn't
    /// apply to that kind of property.
    pub fn lookup(prop: &Property, key: StrategyKey) -> Result<Self> {
        match (prop.kind(), key) {
            (PropertyKind::Column(_), StrategyKey::Column { deferred }) => {
                Ok(Self::for_column(deferred))
            }
            (PropertyKind::Relationship { .. }, StrategyKey::Lazy(lazy)) => Ok(Self::for_lazy(lazy)),
            _ => Err(Error::mapping(
                MappingErrorKind::NoStrategy,
                format!("can't locate strategy for {prop} {key:?}"),
            )),
        }
    }
}

impl fmt::Display for LoaderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoaderStrategy::Column => "column",
            LoaderStrategy::DeferredColumn => "deferred_column",
            LoaderStrategy::Select => "select",
            LoaderStrategy::Joined => "joined",
            LoaderStrategy::Subquery => "subquery",
            LoaderStrategy::Immediate => "immediate",
            LoaderStrategy::NoLoad => "noload",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::mapper;

    #[test]
    fn defaults_follow_configuration() {
        let order = mapper("Order");
        let description = order.get_property("description").unwrap();
        let items = order.get_property("items").unwrap();
        let user = order.get_property("user").unwrap();

        assert_eq!(LoaderStrategy::default_for(description), LoaderStrategy::DeferredColumn);
        assert_eq!(LoaderStrategy::default_for(items), LoaderStrategy::Subquery);
        assert_eq!(LoaderStrategy::default_for(user), LoaderStrategy::Select);
    }

    #[test]
    fn lookup_checks_property_kind() {
        let order = mapper("Order");
        let items = order.get_property("items").unwrap();
        let isopen = order.get_property("isopen").unwrap();

        assert_eq!(
            LoaderStrategy::lookup(items, StrategyKey::Lazy(LazyLoadStrategy::Joined)).unwrap(),
            LoaderStrategy::Joined
        );
        let err = LoaderStrategy::lookup(isopen, StrategyKey::Lazy(LazyLoadStrategy::Joined))
            .unwrap_err();
        assert_eq!(err.mapping_kind(), Some(MappingErrorKind::NoStrategy));
        assert!(LoaderStrategy::lookup(items, StrategyKey::Column { deferred: true }).is_err());
    }

    #[test]
    fn key_round_trips() {
        for s in [
            LoaderStrategy::Column,
            LoaderStrategy::DeferredColumn,
            LoaderStrategy::Joined,
            LoaderStrategy::NoLoad,
        ] {
            let back = match s.key() {
                StrategyKey::Lazy(l) => LoaderStrategy::for_lazy(l),
                StrategyKey::Column { deferred } => LoaderStrategy::for_column(deferred),
            };
            assert_eq!(back, s);
        }
        assert_eq!(
            serde_json::to_string(&LoaderStrategy::DeferredColumn).unwrap(),
            "\"deferred_column\""
        );
    }
}
