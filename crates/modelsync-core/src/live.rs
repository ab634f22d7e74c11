//! Live table descriptions, as reported by `DESCRIBE`.

/// Key classification of a live column (the `Key` column of `DESCRIBE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// `PRI`
    Primary,
    /// `UNI`
    Unique,
    /// `MUL`: the first column of a non-unique index. Foreign key columns
    /// usually report it, but so does any plain index, and a foreign key on a
    /// primary or unique column reports `PRI` or `UNI` instead.
    Multiple,
}

impl KeyKind {
    /// Parses the `Key` column of `DESCRIBE`. Empty or unknown values have no
    /// key.
    #[must_use]
    pub fn from_describe(key: &str) -> Option<Self> {
        match key.trim().to_ascii_uppercase().as_str() {
            "PRI" => Some(Self::Primary),
            "UNI" => Some(Self::Unique),
            "MUL" => Some(Self::Multiple),
            _ => None,
        }
    }
}

/// One column of an existing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveColumn {
    pub name: String,
    /// Reported type, e.g. `int(10) unsigned`.
    pub column_type: String,
    pub nullable: bool,
    pub key: Option<KeyKind>,
    /// Whether the column carries a foreign key constraint.
    pub foreign_key: bool,
    /// Unquoted default, or `None` when the column has no default.
    pub default: Option<String>,
    /// The `Extra` column, e.g. `auto_increment`.
    pub extra: String,
}

impl LiveColumn {
    /// Creates a nullable column with no key, default or extra attributes.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable: true,
            key: None,
            foreign_key: false,
            default: None,
            extra: String::new(),
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the key classification.
    #[must_use]
    pub fn key(mut self, key: KeyKind) -> Self {
        self.key = Some(key);
        self
    }

    /// Marks the column as carrying a foreign key constraint.
    #[must_use]
    pub fn foreign_key(mut self) -> Self {
        self.foreign_key = true;
        self
    }

    /// Sets the default.
    #[must_use]
    pub fn default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Marks the column auto-incrementing.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.extra = "auto_increment".to_string();
        self
    }

    /// Returns `true` if the column auto-increments.
    #[must_use]
    pub fn is_auto_increment(&self) -> bool {
        self.extra.to_ascii_lowercase().contains("auto_increment")
    }
}

/// Normalizes a default as reported by `DESCRIBE` or
/// `information_schema.COLUMNS`: the literal `NULL` becomes `None` and
/// surrounding single quotes are stripped.
#[must_use]
pub fn normalize_default(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if raw.eq_ignore_ascii_case("NULL") {
        return None;
    }
    let unquoted = raw
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .map_or_else(|| raw.to_string(), |s| s.replace("''", "'"));
    Some(unquoted)
}
