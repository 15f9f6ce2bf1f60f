//! The attribute context: per-path loading directives.
//!
//! Options write into an [`AttributeContext`]; the loading engine reads it
//! back by path while it materializes rows. Each path owns one
//! [`PathAttributes`] record whose fields are independent, so an option
//! that sets the join kind never clobbers another option's strategy on the
//! same path. Within one field the last write wins.

use std::collections::{BTreeSet, HashMap};

use sqlmodel_core::{Entity, Result};

use crate::adapter::RowAdapter;
use crate::path::PathRegistry;
use crate::strategy::{LoaderStrategy, StrategyKey};

/// The option responsible for a path, as recorded by `Load`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextLoader {
    pub path: PathRegistry,
    pub strategy: Option<StrategyKey>,
}

impl ContextLoader {
    pub fn new(path: PathRegistry, strategy: Option<StrategyKey>) -> Self {
        Self { path, strategy }
    }

    /// Resolve the recorded descriptor against the property it targets.
    ///
    /// A loader on a relationship path targets the property before the
    /// trailing entity; a loader on a column path targets the tip.
    pub fn strategy_impl(&self) -> Result<Option<LoaderStrategy>> {
        let Some(key) = self.strategy else {
            return Ok(None);
        };
        let prop = if self.path.has_entity() {
            self.path.parent().prop()
        } else {
            self.path.prop()
        };
        match prop {
            Some(prop) => LoaderStrategy::lookup(prop, key).map(Some),
            None => Ok(None),
        }
    }
}

/// User-supplied row processing for an eager load (`contains_eager`).
///
/// A processor without an adapter is still a directive: it tells the engine
/// the eager rows are already present in the parent row, unaliased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EagerRowProcessor {
    pub adapter: Option<RowAdapter>,
}

impl EagerRowProcessor {
    pub fn new(adapter: Option<RowAdapter>) -> Self {
        Self { adapter }
    }
}

/// Directives recorded for one path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathAttributes {
    pub loader: Option<ContextLoader>,
    pub loader_strategy: Option<StrategyKey>,
    /// `Some(true)` for INNER JOIN, `Some(false)` for LEFT OUTER JOIN.
    pub eager_join_type: Option<bool>,
    pub path_with_polymorphic: Option<Entity>,
    pub row_processor: Option<EagerRowProcessor>,
}

impl PathAttributes {
    fn merge(&mut self, other: &PathAttributes) {
        if other.loader.is_some() {
            self.loader.clone_from(&other.loader);
        }
        if other.loader_strategy.is_some() {
            self.loader_strategy = other.loader_strategy;
        }
        if other.eager_join_type.is_some() {
            self.eager_join_type = other.eager_join_type;
        }
        if other.path_with_polymorphic.is_some() {
            self.path_with_polymorphic.clone_from(&other.path_with_polymorphic);
        }
        if other.row_processor.is_some() {
            self.row_processor.clone_from(&other.row_processor);
        }
    }
}

/// Loading directives keyed by path, plus undeferred column groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeContext {
    paths: HashMap<PathRegistry, PathAttributes>,
    undefer_groups: BTreeSet<String>,
}

impl AttributeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.undefer_groups.is_empty()
    }

    /// Number of paths carrying at least one directive.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn get(&self, path: &PathRegistry) -> Option<&PathAttributes> {
        self.paths.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = (&PathRegistry, &PathAttributes)> {
        self.paths.iter()
    }

    fn entry(&mut self, path: &PathRegistry) -> &mut PathAttributes {
        self.paths.entry(path.clone()).or_default()
    }

    pub fn set_loader(&mut self, path: &PathRegistry, loader: ContextLoader) {
        tracing::trace!(%path, strategy = ?loader.strategy, "set loader");
        self.entry(path).loader = Some(loader);
    }

    pub fn set_loader_strategy(&mut self, path: &PathRegistry, key: StrategyKey) {
        tracing::trace!(%path, ?key, "set loaderstrategy");
        self.entry(path).loader_strategy = Some(key);
    }

    pub fn set_eager_join_type(&mut self, path: &PathRegistry, innerjoin: bool) {
        tracing::trace!(%path, innerjoin, "set eager_join_type");
        self.entry(path).eager_join_type = Some(innerjoin);
    }

    pub fn set_path_with_polymorphic(&mut self, path: &PathRegistry, entity: Entity) {
        tracing::trace!(%path, %entity, "set path_with_polymorphic");
        self.entry(path).path_with_polymorphic = Some(entity);
    }

    pub fn set_row_processor(&mut self, path: &PathRegistry, processor: EagerRowProcessor) {
        tracing::trace!(%path, "set user_defined_eager_row_processor");
        self.entry(path).row_processor = Some(processor);
    }

    /// Set the row processor only if the path has none yet.
    pub fn setdefault_row_processor(&mut self, path: &PathRegistry, processor: EagerRowProcessor) {
        let attrs = self.entry(path);
        if attrs.row_processor.is_none() {
            attrs.row_processor = Some(processor);
        }
    }

    pub fn loader(&self, path: &PathRegistry) -> Option<&ContextLoader> {
        self.get(path).and_then(|a| a.loader.as_ref())
    }

    pub fn loader_strategy(&self, path: &PathRegistry) -> Option<StrategyKey> {
        self.get(path).and_then(|a| a.loader_strategy)
    }

    pub fn eager_join_type(&self, path: &PathRegistry) -> Option<bool> {
        self.get(path).and_then(|a| a.eager_join_type)
    }

    pub fn path_with_polymorphic(&self, path: &PathRegistry) -> Option<&Entity> {
        self.get(path).and_then(|a| a.path_with_polymorphic.as_ref())
    }

    pub fn row_processor(&self, path: &PathRegistry) -> Option<&EagerRowProcessor> {
        self.get(path).and_then(|a| a.row_processor.as_ref())
    }

    /// Mark every deferred column in `group` as undeferred.
    pub fn add_undefer_group(&mut self, group: impl Into<String>) {
        let group = group.into();
        tracing::trace!(%group, "undefer group");
        self.undefer_groups.insert(group);
    }

    pub fn is_group_undeferred(&self, group: &str) -> bool {
        self.undefer_groups.contains(group)
    }

    /// Merge `other` into this context, field by field.
    pub fn update(&mut self, other: &AttributeContext) {
        for (path, attrs) in &other.paths {
            self.entry(path).merge(attrs);
        }
        self.undefer_groups
            .extend(other.undefer_groups.iter().cloned());
    }
}
