//! Column property definitions.

/// Metadata about a mapped column attribute.
///
/// Column properties are the scalar half of a mapper's property set. The
/// loader engine only cares about their key and their default loading
/// behavior (`deferred` and the optional deferral `group`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Attribute name on the mapped class
    pub name: &'static str,
    /// Database column name (may differ from the attribute name)
    pub column_name: &'static str,
    /// Whether this is a primary key
    pub primary_key: bool,
    /// Whether this field is nullable
    pub nullable: bool,
    /// Whether the column is loaded only on first access
    pub deferred: bool,
    /// Deferral group; `undefer_group(name)` undefers every column in it
    pub group: Option<&'static str>,
    /// Whether the server generates a value for this column
    pub server_default: bool,
}

impl FieldInfo {
    /// Create a new column property whose column name matches the attribute name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            column_name: name,
            primary_key: false,
            nullable: true,
            deferred: false,
            group: None,
            server_default: false,
        }
    }

    /// Set the database column name.
    pub const fn column(mut self, name: &'static str) -> Self {
        self.column_name = name;
        self
    }

    /// Mark as primary key.
    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        if value {
            self.nullable = false;
        }
        self
    }

    /// Set nullable flag.
    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    /// Defer loading of this column until first access.
    pub const fn deferred(mut self, value: bool) -> Self {
        self.deferred = value;
        self
    }

    /// Place this column in a deferral group (implies `deferred`).
    pub const fn group(mut self, name: &'static str) -> Self {
        self.group = Some(name);
        self.deferred = true;
        self
    }

    /// Mark the column as populated by a server-side default.
    pub const fn server_default(mut self, value: bool) -> Self {
        self.server_default = value;
        self
    }
}
