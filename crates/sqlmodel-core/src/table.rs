//! Tables targeted by INSERT, UPDATE and DELETE.

use std::fmt;

use crate::mapper::Mapper;

/// A table and its columns, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Table {
    name: String,
    columns: Vec<String>,
}

impl Table {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// The table a mapper persists to, with every mapped column.
    pub fn for_mapper(mapper: &Mapper) -> Self {
        Self::new(
            mapper.table(),
            mapper
                .columns()
                .filter_map(|p| p.column())
                .map(|c| c.column_name),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
