//! Statement builders for INSERT, UPDATE, DELETE operations.
//!
//! Builders are generative: every method consumes the statement and returns
//! the modified one, so a statement that was cloned before a call is never
//! affected by it. The shared surface lives on two traits:
//! [`DmlStatement`] (table, RETURNING, hints, prefixes) for all three, and
//! [`ValuesStatement`] (value sets, return-defaults) for INSERT and UPDATE.

use std::collections::BTreeMap;

use crate::clause::Where;
use crate::expr::Expr;
use sqlmodel_core::{ArgumentErrorKind, Error, InvalidRequestErrorKind, Result, Table};

/// Dialect name a hint applies to when it is not dialect specific.
pub const ALL_DIALECTS: &str = "*";

/// One row of a value set: column name to expression, in insertion order.
pub type ValueRow = Vec<(String, Expr)>;

/// A single row as passed to `values()`.
#[derive(Debug, Clone, PartialEq)]
pub enum RowArg {
    /// Column names with their values.
    Named(ValueRow),
    /// Values zipped against the table's columns in order.
    Positional(Vec<Expr>),
}

impl RowArg {
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Expr>,
    {
        RowArg::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Expr>,
    {
        RowArg::Positional(values.into_iter().map(Into::into).collect())
    }
}

/// The positional argument of `values()`: one row or a list of rows.
#[derive(Debug, Clone, PartialEq)]
pub enum ValuesArg {
    Single(RowArg),
    Multi(Vec<RowArg>),
}

impl ValuesArg {
    /// A single named row.
    pub fn row<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Expr>,
    {
        ValuesArg::Single(RowArg::named(pairs))
    }

    /// A single positional row.
    pub fn tuple<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Expr>,
    {
        ValuesArg::Single(RowArg::positional(values))
    }

    /// Several rows, for a multi-row INSERT.
    pub fn rows(rows: impl IntoIterator<Item = RowArg>) -> Self {
        ValuesArg::Multi(rows.into_iter().collect())
    }
}

impl From<RowArg> for ValuesArg {
    fn from(row: RowArg) -> Self {
        ValuesArg::Single(row)
    }
}

impl From<Vec<RowArg>> for ValuesArg {
    fn from(rows: Vec<RowArg>) -> Self {
        ValuesArg::Multi(rows)
    }
}

/// The accumulated value set of an INSERT or UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameters {
    Single(ValueRow),
    Multi(Vec<ValueRow>),
}

impl Parameters {
    pub fn is_multi(&self) -> bool {
        matches!(self, Parameters::Multi(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Parameters::Single(row) => row.is_empty(),
            Parameters::Multi(rows) => rows.is_empty(),
        }
    }

    /// Value for `column` in a single-row set.
    pub fn get(&self, column: &str) -> Option<&Expr> {
        match self {
            Parameters::Single(row) => row.iter().find(|(k, _)| k == column).map(|(_, v)| v),
            Parameters::Multi(_) => None,
        }
    }

    /// Rows of a multi-row set; a single-row set is one row.
    pub fn rows(&self) -> Vec<&ValueRow> {
        match self {
            Parameters::Single(row) => vec![row],
            Parameters::Multi(rows) => rows.iter().collect(),
        }
    }
}

/// What `return_defaults()` asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnDefaults {
    /// Every server-generated column.
    All,
    /// Only the named columns.
    Columns(Vec<String>),
}

/// State shared by INSERT, UPDATE and DELETE.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementBase {
    table: Table,
    returning: Vec<String>,
    hints: BTreeMap<(String, String), String>,
    prefixes: Vec<String>,
}

impl StatementBase {
    fn new(table: Table) -> Self {
        Self {
            table,
            returning: Vec::new(),
            hints: BTreeMap::new(),
            prefixes: Vec::new(),
        }
    }
}

/// State shared by INSERT and UPDATE.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValuesState {
    parameters: Option<Parameters>,
    return_defaults: Option<ReturnDefaults>,
    inline: bool,
}

fn upsert(row: &mut ValueRow, key: String, value: Expr) {
    match row.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => row.push((key, value)),
    }
}

/// Surface common to every DML statement.
pub trait DmlStatement: Sized {
    fn base(&self) -> &StatementBase;
    fn base_mut(&mut self) -> &mut StatementBase;

    /// The target table.
    fn table(&self) -> &Table {
        &self.base().table
    }

    /// Set the RETURNING columns, replacing any set before.
    fn returning<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_mut().returning = columns.into_iter().map(Into::into).collect();
        self
    }

    fn returning_columns(&self) -> &[String] {
        &self.base().returning
    }

    /// Add a table hint for `dialect_name` (`"*"` for every dialect).
    ///
    /// Without `selectable` the hint applies to the statement's own table.
    fn with_hint(
        mut self,
        text: impl Into<String>,
        selectable: Option<&Table>,
        dialect_name: &str,
    ) -> Self {
        let table = selectable.unwrap_or(&self.base().table).name().to_string();
        self.base_mut()
            .hints
            .insert((table, dialect_name.to_string()), text.into());
        self
    }

    /// Hints keyed by `(table, dialect)`.
    fn hints(&self) -> &BTreeMap<(String, String), String> {
        &self.base().hints
    }

    /// Add a keyword between the verb and the table, e.g. `INSERT OR REPLACE`.
    fn prefix_with(mut self, prefix: impl Into<String>) -> Self {
        self.base_mut().prefixes.push(prefix.into());
        self
    }

    fn prefixes(&self) -> &[String] {
        &self.base().prefixes
    }
}

/// Value-set handling shared by INSERT and UPDATE.
pub trait ValuesStatement: DmlStatement {
    /// Whether several parameter sets may be given at once.
    const SUPPORTS_MULTI_PARAMETERS: bool;

    fn values_state(&self) -> &ValuesState;
    fn values_state_mut(&mut self) -> &mut ValuesState;

    /// Whether the statement inserts from a SELECT.
    fn has_select(&self) -> bool {
        false
    }

    /// The accumulated value set, if any.
    fn parameters(&self) -> Option<&Parameters> {
        self.values_state().parameters.as_ref()
    }

    fn has_multi_parameters(&self) -> bool {
        self.parameters().is_some_and(Parameters::is_multi)
    }

    fn return_defaults_spec(&self) -> Option<&ReturnDefaults> {
        self.values_state().return_defaults.as_ref()
    }

    fn is_inline(&self) -> bool {
        self.values_state().inline
    }

    /// Turn one positional argument into a value set.
    fn process_colparams(&self, arg: ValuesArg) -> Result<Parameters> {
        let single = |row: RowArg| match row {
            RowArg::Named(row) => row,
            RowArg::Positional(values) => self
                .table()
                .columns()
                .iter()
                .cloned()
                .zip(values)
                .collect(),
        };
        match arg {
            ValuesArg::Multi(rows) => {
                if !Self::SUPPORTS_MULTI_PARAMETERS {
                    return Err(Error::invalid_request(
                        InvalidRequestErrorKind::MultipleParametersUnsupported,
                        "This construct does not support multiple parameter sets.",
                    ));
                }
                Ok(Parameters::Multi(rows.into_iter().map(single).collect()))
            }
            ValuesArg::Single(row) => Ok(Parameters::Single(single(row))),
        }
    }

    /// Add values from positional arguments and keyword pairs together.
    ///
    /// Single-row sets merge, later keys overriding earlier ones; multi-row
    /// sets concatenate. The two forms never mix.
    fn values_args(mut self, args: Vec<ValuesArg>, kwargs: ValueRow) -> Result<Self> {
        if self.has_select() {
            return Err(Error::invalid_request(
                InvalidRequestErrorKind::AlreadyFromSelect,
                "This construct already inserts from a SELECT",
            ));
        }
        if self.has_multi_parameters() && !kwargs.is_empty() {
            return Err(Error::invalid_request(
                InvalidRequestErrorKind::AlreadyMultipleParameters,
                "This construct already has multiple parameter sets.",
            ));
        }

        let mut args = args.into_iter();
        let v = args.next();
        if args.next().is_some() {
            return Err(Error::argument(
                ArgumentErrorKind::TooManyPositional,
                "Only a single dictionary/tuple or list of dictionaries/tuples is accepted positionally.",
            ));
        }
        let v = v.unwrap_or(ValuesArg::Single(RowArg::Named(Vec::new())));
        let incoming = self.process_colparams(v)?;

        let mixed = || {
            Error::argument(
                ArgumentErrorKind::MixedValueFormats,
                "Can't mix single-values and multiple values formats in one statement",
            )
        };
        let merged = match (self.values_state_mut().parameters.take(), incoming) {
            (None, incoming) => incoming,
            (Some(Parameters::Multi(mut rows)), Parameters::Multi(more)) => {
                rows.extend(more);
                Parameters::Multi(rows)
            }
            (Some(Parameters::Single(mut row)), Parameters::Single(more)) => {
                for (k, v) in more {
                    upsert(&mut row, k, v);
                }
                Parameters::Single(row)
            }
            (Some(_), _) => return Err(mixed()),
        };

        let merged = match merged {
            Parameters::Single(mut row) => {
                for (k, v) in kwargs {
                    upsert(&mut row, k, v);
                }
                Parameters::Single(row)
            }
            Parameters::Multi(rows) => {
                if !kwargs.is_empty() {
                    return Err(Error::argument(
                        ArgumentErrorKind::KwargsWithMultipleParameters,
                        "Can't pass kwargs and multiple parameter sets simultaneously",
                    ));
                }
                Parameters::Multi(rows)
            }
        };

        tracing::trace!(
            table = self.table().name(),
            multi = merged.is_multi(),
            "values"
        );
        self.values_state_mut().parameters = Some(merged);
        Ok(self)
    }

    /// Add one row, or a list of rows.
    fn values(self, arg: impl Into<ValuesArg>) -> Result<Self> {
        self.values_args(vec![arg.into()], Vec::new())
    }

    /// Set a single column's value.
    fn set(self, column: impl Into<String>, value: impl Into<Expr>) -> Result<Self> {
        self.values_args(Vec::new(), vec![(column.into(), value.into())])
    }

    /// Fetch server-generated values for the given columns, or for every
    /// such column when `columns` is empty.
    ///
    /// Independent of [`returning`](DmlStatement::returning).
    fn return_defaults<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        self.values_state_mut().return_defaults = Some(if columns.is_empty() {
            ReturnDefaults::All
        } else {
            ReturnDefaults::Columns(columns)
        });
        self
    }

    /// Don't pre-execute defaults or fetch implicit RETURNING values.
    fn inline(mut self, inline: bool) -> Self {
        self.values_state_mut().inline = inline;
        self
    }
}

/// INSERT statement builder.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    base: StatementBase,
    values: ValuesState,
    select: Option<Expr>,
}

impl Insert {
    /// Create a new INSERT into `table`.
    pub fn new(table: Table) -> Self {
        Self {
            base: StatementBase::new(table),
            values: ValuesState::default(),
            select: None,
        }
    }

    /// Make this an `INSERT .. FROM SELECT` into the named columns.
    pub fn from_select<I, S>(mut self, names: I, select: Expr) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.parameters().is_some_and(|p| !p.is_empty()) {
            return Err(Error::invalid_request(
                InvalidRequestErrorKind::AlreadyHasValues,
                "This construct already inserts value expressions",
            ));
        }
        self.values.parameters = Some(Parameters::Single(
            names.into_iter().map(|n| (n.into(), Expr::null())).collect(),
        ));
        self.select = Some(select);
        Ok(self)
    }

    /// The SELECT rows are inserted from.
    pub fn select(&self) -> Option<&Expr> {
        self.select.as_ref()
    }
}

impl DmlStatement for Insert {
    fn base(&self) -> &StatementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StatementBase {
        &mut self.base
    }
}

impl ValuesStatement for Insert {
    const SUPPORTS_MULTI_PARAMETERS: bool = true;

    fn values_state(&self) -> &ValuesState {
        &self.values
    }

    fn values_state_mut(&mut self) -> &mut ValuesState {
        &mut self.values
    }

    fn has_select(&self) -> bool {
        self.select.is_some()
    }
}

/// UPDATE statement builder.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    base: StatementBase,
    values: ValuesState,
    where_clause: Option<Where>,
}

impl Update {
    /// Create a new UPDATE of `table`.
    pub fn new(table: Table) -> Self {
        Self {
            base: StatementBase::new(table),
            values: ValuesState::default(),
            where_clause: None,
        }
    }

    /// Add a WHERE condition, AND-ed onto any existing one.
    pub fn where_(mut self, expr: Expr) -> Self {
        self.where_clause = Some(Where::and_opt(self.where_clause.take(), expr));
        self
    }

    pub fn where_clause(&self) -> Option<&Where> {
        self.where_clause.as_ref()
    }
}

impl DmlStatement for Update {
    fn base(&self) -> &StatementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StatementBase {
        &mut self.base
    }
}

impl ValuesStatement for Update {
    const SUPPORTS_MULTI_PARAMETERS: bool = false;

    fn values_state(&self) -> &ValuesState {
        &self.values
    }

    fn values_state_mut(&mut self) -> &mut ValuesState {
        &mut self.values
    }
}

/// DELETE statement builder.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    base: StatementBase,
    where_clause: Option<Where>,
}

impl Delete {
    /// Create a new DELETE from `table`.
    pub fn new(table: Table) -> Self {
        Self {
            base: StatementBase::new(table),
            where_clause: None,
        }
    }

    /// Add a WHERE condition, AND-ed onto any existing one.
    pub fn where_(mut self, expr: Expr) -> Self {
        self.where_clause = Some(Where::and_opt(self.where_clause.take(), expr));
        self
    }

    pub fn where_clause(&self) -> Option<&Where> {
        self.where_clause.as_ref()
    }
}

impl DmlStatement for Delete {
    fn base(&self) -> &StatementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StatementBase {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        Table::new("users", ["id", "name", "fullname"])
    }

    #[test]
    fn single_rows_merge_and_override() {
        let ins = Insert::new(users())
            .values(ValuesArg::row([("name", "ed"), ("fullname", "Ed Jones")]))
            .unwrap()
            .values(ValuesArg::row([("name", "wendy")]))
            .unwrap();

        let params = ins.parameters().unwrap();
        assert!(!params.is_multi());
        assert_eq!(params.get("name"), Some(&Expr::from("wendy")));
        assert_eq!(params.get("fullname"), Some(&Expr::from("Ed Jones")));
        assert_eq!(params.rows()[0][0].0, "name");
    }

    #[test]
    fn generative_calls_leave_original_untouched() {
        let base = Insert::new(users()).set("name", "ed").unwrap();
        let changed = base.clone().set("name", "jack").unwrap();
        assert_eq!(base.parameters().unwrap().get("name"), Some(&Expr::from("ed")));
        assert_eq!(changed.parameters().unwrap().get("name"), Some(&Expr::from("jack")));
    }

    #[test]
    fn positional_rows_zip_table_columns() {
        let ins = Insert::new(users())
            .values(ValuesArg::tuple([Expr::lit(7), Expr::lit("ed")]))
            .unwrap();
        let params = ins.parameters().unwrap();
        assert_eq!(params.get("id"), Some(&Expr::lit(7)));
        assert_eq!(params.get("name"), Some(&Expr::lit("ed")));
        assert_eq!(params.get("fullname"), None);
    }

    #[test]
    fn multi_rows_concatenate() {
        let ins = Insert::new(users())
            .values(ValuesArg::rows([RowArg::named([("name", "a")])]))
            .unwrap()
            .values(ValuesArg::rows([
                RowArg::named([("name", "b")]),
                RowArg::positional([Expr::lit(3), Expr::lit("c")]),
            ]))
            .unwrap();

        let params = ins.parameters().unwrap();
        assert!(params.is_multi());
        assert_eq!(params.rows().len(), 3);
        assert_eq!(params.rows()[2][1], ("name".to_string(), Expr::lit("c")));
    }

    #[test]
    fn mixing_formats_fails_both_ways() {
        let err = Insert::new(users())
            .set("name", "ed")
            .unwrap()
            .values(ValuesArg::rows([RowArg::named([("name", "b")])]))
            .unwrap_err();
        assert_eq!(err.argument_kind(), Some(ArgumentErrorKind::MixedValueFormats));

        let err = Insert::new(users())
            .values(ValuesArg::rows([RowArg::named([("name", "b")])]))
            .unwrap()
            .values(ValuesArg::row([("name", "c")]))
            .unwrap_err();
        assert_eq!(err.argument_kind(), Some(ArgumentErrorKind::MixedValueFormats));
    }

    #[test]
    fn argument_combination_checks() {
        let err = Insert::new(users())
            .values_args(
                vec![ValuesArg::row([("name", "a")]), ValuesArg::row([("name", "b")])],
                Vec::new(),
            )
            .unwrap_err();
        assert_eq!(err.argument_kind(), Some(ArgumentErrorKind::TooManyPositional));

        let err = Insert::new(users())
            .values_args(
                vec![ValuesArg::rows([RowArg::named([("name", "a")])])],
                vec![("fullname".to_string(), Expr::lit("x"))],
            )
            .unwrap_err();
        assert_eq!(
            err.argument_kind(),
            Some(ArgumentErrorKind::KwargsWithMultipleParameters)
        );

        let err = Insert::new(users())
            .values(ValuesArg::rows([RowArg::named([("name", "a")])]))
            .unwrap()
            .set("fullname", "x")
            .unwrap_err();
        assert_eq!(
            err.invalid_request_kind(),
            Some(InvalidRequestErrorKind::AlreadyMultipleParameters)
        );
    }

    #[test]
    fn update_rejects_multiple_parameter_sets() {
        let err = Update::new(users())
            .values(ValuesArg::rows([RowArg::named([("name", "a")])]))
            .unwrap_err();
        assert_eq!(
            err.invalid_request_kind(),
            Some(InvalidRequestErrorKind::MultipleParametersUnsupported)
        );
    }

    #[test]
    fn from_select_conflicts_with_values() {
        let ins = Insert::new(users())
            .from_select(["id", "name"], Expr::subquery("SELECT id, name FROM old_users"))
            .unwrap();
        assert_eq!(ins.parameters().unwrap().get("name"), Some(&Expr::null()));
        let err = ins.set("fullname", "x").unwrap_err();
        assert_eq!(
            err.invalid_request_kind(),
            Some(InvalidRequestErrorKind::AlreadyFromSelect)
        );

        let err = Insert::new(users())
            .set("name", "ed")
            .unwrap()
            .from_select(["name"], Expr::subquery("SELECT name FROM old_users"))
            .unwrap_err();
        assert_eq!(
            err.invalid_request_kind(),
            Some(InvalidRequestErrorKind::AlreadyHasValues)
        );
    }

    #[test]
    fn returning_and_return_defaults_are_independent() {
        let ins = Insert::new(users())
            .returning(["id"])
            .return_defaults(Vec::<String>::new());
        assert_eq!(ins.returning_columns(), &["id".to_string()]);
        assert_eq!(ins.return_defaults_spec(), Some(&ReturnDefaults::All));

        let upd = Update::new(users())
            .return_defaults(["fullname"])
            .returning(["name"])
            .returning(["id", "name"]);
        assert_eq!(upd.returning_columns().len(), 2);
        assert_eq!(
            upd.return_defaults_spec(),
            Some(&ReturnDefaults::Columns(vec!["fullname".to_string()]))
        );
    }

    #[test]
    fn where_clauses_and_together() {
        let del = Delete::new(users())
            .where_(Expr::col("id").eq(5))
            .where_(Expr::col("name").eq("ed"));
        assert_eq!(
            del.where_clause().unwrap().expr(),
            &Expr::col("id").eq(5).and(Expr::col("name").eq("ed"))
        );

        let upd = Update::new(users()).where_(Expr::col("id").eq(1));
        assert!(upd.where_clause().is_some());
    }

    #[test]
    fn hints_and_prefixes() {
        let addresses = Table::new("addresses", ["id"]);
        let upd = Update::new(users())
            .with_hint("WITH (PAGLOCK)", None, "mssql")
            .with_hint("INDEX (ix)", Some(&addresses), ALL_DIALECTS)
            .with_hint("WITH (ROWLOCK)", None, "mssql")
            .prefix_with("LOW_PRIORITY")
            .inline(true);

        let hints = upd.hints();
        assert_eq!(hints.len(), 2);
        assert_eq!(
            hints.get(&("users".to_string(), "mssql".to_string())).map(String::as_str),
            Some("WITH (ROWLOCK)")
        );
        assert!(hints.contains_key(&("addresses".to_string(), "*".to_string())));
        assert_eq!(upd.prefixes(), &["LOW_PRIORITY".to_string()]);
        assert!(upd.is_inline());
    }
}
