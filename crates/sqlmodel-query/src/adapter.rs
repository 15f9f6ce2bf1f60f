//! Row adapters for eagerly loaded entities.
//!
//! When an eager entity's columns are pulled from a row that was joined
//! under an alias, the loading engine needs to know which labelled column
//! carries which attribute. A [`RowAdapter`] maps each column of the
//! entity to a `"{source}__{column}"` label, the same labelling the SELECT
//! list uses (`source.column AS source__column`).

use sqlmodel_core::{Entity, Mapper};

/// Column translation for one aliased source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowAdapter {
    source: String,
    columns: Vec<(String, String)>,
}

impl RowAdapter {
    fn build<'a>(source: &str, mappers: impl IntoIterator<Item = &'a Mapper>) -> Self {
        let mut columns: Vec<(String, String)> = Vec::new();
        for mapper in mappers {
            for field in mapper.columns().filter_map(|p| p.column()) {
                if columns.iter().any(|(c, _)| c == field.column_name) {
                    continue;
                }
                columns.push((
                    field.column_name.to_string(),
                    format!("{source}__{}", field.column_name),
                ));
            }
        }
        Self {
            source: source.to_string(),
            columns,
        }
    }

    /// Adapter for `mapper`'s columns selected under a named table alias.
    pub fn for_table_alias(mapper: &Mapper, alias: &str) -> Self {
        Self::build(alias, [mapper])
    }

    /// Adapter for an entity. Aliases are addressed by their name and cover
    /// every mapper they load polymorphically; plain mappers use their table.
    pub fn for_entity(entity: &Entity) -> Self {
        match entity {
            Entity::Mapped(m) => Self::build(m.table(), [*m]),
            Entity::Aliased(a) => {
                let mappers = a.with_polymorphic_mappers();
                if mappers.is_empty() {
                    Self::build(a.name(), [a.mapper()])
                } else {
                    Self::build(a.name(), mappers.iter().copied())
                }
            }
        }
    }

    /// The alias or table the columns are read from.
    pub fn source_name(&self) -> &str {
        &self.source
    }

    /// `(column, label)` pairs in mapper order.
    pub fn columns(&self) -> &[(String, String)] {
        &self.columns
    }

    /// The label carrying `column`, if the adapter covers it.
    pub fn label(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, label)| label.as_str())
    }

    /// Render the SELECT list for this adapter.
    pub fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|(c, label)| format!("{}.{c} AS {label}", self.source))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
