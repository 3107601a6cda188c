//! Availability index schema.
//!
//! Declares the engine field names and the `FT.CREATE` schema for the
//! availability index. Documents are stored as JSON under the
//! [`DOC_PREFIX`] key prefix; the index covers that prefix.

/// Engine field names for the availability index.
pub const FIELD_ID: &str = "id";
pub const FIELD_TABLE_NUMBER: &str = "table_number";
pub const FIELD_CAPACITY: &str = "capacity";
pub const FIELD_MEAL_TYPE: &str = "meal_type";
pub const FIELD_DATE: &str = "date";
pub const FIELD_DATE_TS: &str = "date_ts";
pub const FIELD_IS_AVAILABLE: &str = "is_available";
pub const FIELD_RESERVATION_ID: &str = "reservation_id";
pub const FIELD_CREATED_AT: &str = "created_at";
pub const FIELD_UPDATED_AT: &str = "updated_at";

/// Index name (already carries the conventional `idx:` namespace).
pub const INDEX_NAME: &str = "idx:availability";

/// Key prefix for availability documents.
pub const DOC_PREFIX: &str = "availability:";

/// Search index definition: name, covered key prefix, and schema fields.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    pub name: String,
    pub prefix: String,
    pub fields: Vec<SearchField>,
}

impl SearchIndex {
    pub fn new(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            fields: Vec::new(),
        }
    }

    /// Add a text field
    pub fn text(self, name: impl Into<String>) -> Self {
        self.field(name, SearchFieldType::Text, false)
    }

    /// Add a sortable text field
    pub fn text_sortable(self, name: impl Into<String>) -> Self {
        self.field(name, SearchFieldType::Text, true)
    }

    /// Add a numeric field
    pub fn numeric(self, name: impl Into<String>) -> Self {
        self.field(name, SearchFieldType::Numeric, false)
    }

    /// Add a sortable numeric field
    pub fn numeric_sortable(self, name: impl Into<String>) -> Self {
        self.field(name, SearchFieldType::Numeric, true)
    }

    /// Add a tag field
    pub fn tag(self, name: impl Into<String>) -> Self {
        self.field(name, SearchFieldType::Tag, false)
    }

    /// Add a sortable tag field
    pub fn tag_sortable(self, name: impl Into<String>) -> Self {
        self.field(name, SearchFieldType::Tag, true)
    }

    fn field(mut self, name: impl Into<String>, field_type: SearchFieldType, sortable: bool) -> Self {
        self.fields.push(SearchField {
            name: name.into(),
            field_type,
            sortable,
        });
        self
    }

    /// Generate the FT.CREATE command arguments, with an optional global
    /// Redis key prefix prepended to both the index name and the key prefix.
    pub fn to_ft_create_args(&self, redis_prefix: &str) -> Vec<String> {
        let mut args = vec![
            format!("{}{}", redis_prefix, self.name),
            "ON".to_string(),
            "JSON".to_string(),
            "PREFIX".to_string(),
            "1".to_string(),
            format!("{}{}", redis_prefix, self.prefix),
            "SCHEMA".to_string(),
        ];
        for field in &self.fields {
            args.extend(field.to_schema_args());
        }
        args
    }
}

/// One schema field: documents are flat JSON, so the path is `$.{name}`.
#[derive(Debug, Clone)]
pub struct SearchField {
    pub name: String,
    pub field_type: SearchFieldType,
    pub sortable: bool,
}

impl SearchField {
    fn to_schema_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("$.{}", self.name),
            "AS".to_string(),
            self.name.clone(),
            self.field_type.to_string(),
        ];
        if self.sortable {
            args.push("SORTABLE".to_string());
        }
        args
    }
}

/// Field types used by the availability index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFieldType {
    /// Full-text searchable field
    Text,
    /// Numeric field (supports range queries)
    Numeric,
    /// Tag field (exact match)
    Tag,
}

impl std::fmt::Display for SearchFieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchFieldType::Text => write!(f, "TEXT"),
            SearchFieldType::Numeric => write!(f, "NUMERIC"),
            SearchFieldType::Tag => write!(f, "TAG"),
        }
    }
}

/// The availability index schema.
pub fn availability_index() -> SearchIndex {
    SearchIndex::new(INDEX_NAME, DOC_PREFIX)
        .text(FIELD_ID)
        .text(FIELD_RESERVATION_ID)
        .tag_sortable(FIELD_MEAL_TYPE)
        .tag_sortable(FIELD_DATE)
        .numeric_sortable(FIELD_DATE_TS)
        .numeric_sortable(FIELD_TABLE_NUMBER)
        .numeric_sortable(FIELD_CAPACITY)
        .tag(FIELD_IS_AVAILABLE)
        .text_sortable(FIELD_CREATED_AT)
        .text_sortable(FIELD_UPDATED_AT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ft_create_args_structure() {
        let args = availability_index().to_ft_create_args("");
        assert_eq!(args[0], "idx:availability");
        assert_eq!(args[1], "ON");
        assert_eq!(args[2], "JSON");
        assert_eq!(args[3], "PREFIX");
        assert_eq!(args[4], "1");
        assert_eq!(args[5], "availability:");
        assert_eq!(args[6], "SCHEMA");

        let cmd = args.join(" ");
        assert!(cmd.contains("$.id AS id TEXT"));
        assert!(cmd.contains("$.meal_type AS meal_type TAG SORTABLE"));
        assert!(cmd.contains("$.date_ts AS date_ts NUMERIC SORTABLE"));
        assert!(cmd.contains("$.capacity AS capacity NUMERIC SORTABLE"));
        assert!(cmd.contains("$.is_available AS is_available TAG"));
    }

    #[test]
    fn test_ft_create_args_with_redis_prefix() {
        let args = availability_index().to_ft_create_args("staging:");
        assert_eq!(args[0], "staging:idx:availability");
        assert_eq!(args[5], "staging:availability:");
    }

    #[test]
    fn test_every_schema_field_is_declared_once() {
        let index = availability_index();
        let mut names: Vec<&str> = index.fields.iter().map(|f| f.name.as_str()).collect();
        let before = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), before);
        assert_eq!(before, 10);
    }
}
