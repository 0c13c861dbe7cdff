use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The interchangeable storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendKind {
    /// Relational table with a JSON document column.
    Postgres,
    /// Partitioned key/value table store.
    Table,
    /// In-process store for tests and local development.
    Memory,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [BackendKind::Postgres, BackendKind::Table, BackendKind::Memory];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Postgres => "postgres",
            BackendKind::Table => "table",
            BackendKind::Memory => "memory",
        }
    }

    /// Field names the backend uses for its own bookkeeping.
    pub fn reserved_fields(&self) -> &'static [&'static str] {
        match self {
            BackendKind::Postgres => &["entitytype", "entityid", "metadata"],
            BackendKind::Table => &["PartitionKey", "RowKey", "Timestamp", "odata.etag"],
            BackendKind::Memory => &[],
        }
    }

    /// Whether mapped field names end up inside query text and must
    /// therefore be plain identifiers.
    pub fn requires_identifiers(&self) -> bool {
        matches!(self, BackendKind::Postgres | BackendKind::Table)
    }

    /// Whether the backend can hold an entity type in a table named `name`.
    ///
    /// Relational tables are plain identifiers; table-service names are
    /// 3 to 63 alphanumeric characters starting with a letter.
    pub fn accepts_table_name(&self, name: &str) -> bool {
        match self {
            BackendKind::Postgres => is_valid_identifier(name),
            BackendKind::Table => {
                (3..=63).contains(&name.len())
                    && name.starts_with(|c: char| c.is_ascii_alphabetic())
                    && name.chars().all(|c| c.is_ascii_alphanumeric())
            }
            BackendKind::Memory => !name.is_empty(),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a backend name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBackend(pub String);

impl fmt::Display for UnknownBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown storage backend '{}' (expected postgres, table or memory)",
            self.0
        )
    }
}

impl std::error::Error for UnknownBackend {}

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            "table" | "tables" | "azuretable" => Ok(BackendKind::Table),
            "memory" | "inmemory" => Ok(BackendKind::Memory),
            _ => Err(UnknownBackend(s.to_string())),
        }
    }
}

/// Rule deriving a backend field name from a property name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldTransform {
    #[default]
    Lowercase,
    Identity,
}

impl FieldTransform {
    pub fn apply(&self, property: &str) -> String {
        match self {
            FieldTransform::Lowercase => property.to_lowercase(),
            FieldTransform::Identity => property.to_string(),
        }
    }
}

/// Property name → backend field name for one entity type on one backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    entries: BTreeMap<String, String>,
}

impl FieldMapping {
    /// Apply `transform` to every property.
    pub fn derive<'a>(properties: impl IntoIterator<Item = &'a str>, transform: FieldTransform) -> Self {
        let entries = properties
            .into_iter()
            .map(|property| (property.to_string(), transform.apply(property)))
            .collect();
        Self { entries }
    }

    pub fn set(&mut self, property: impl Into<String>, field: impl Into<String>) {
        self.entries.insert(property.into(), field.into());
    }

    pub fn remove(&mut self, property: &str) -> Option<String> {
        self.entries.remove(property)
    }

    pub fn field(&self, property: &str) -> Option<&str> {
        self.entries.get(property).map(String::as_str)
    }

    /// Reverse lookup.
    pub fn property_for(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, f)| f.as_str() == field)
            .map(|(p, _)| p.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, f)| (p.as_str(), f.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether `ident` is a plain identifier (`[A-Za-z_][A-Za-z0-9_]*`) that
/// may be embedded in query text.
pub fn is_valid_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
