use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kinds of data change the server reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataEvent {
    #[serde(rename = "created")]
    Created,
    #[serde(rename = "updated")]
    Updated,
    #[serde(rename = "deleted")]
    Deleted,
    #[serde(rename = "bulk-created")]
    BulkCreated,
    #[serde(rename = "bulk-updated")]
    BulkUpdated,
    #[serde(rename = "bulk-deleted")]
    BulkDeleted,
}

impl DataEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::BulkCreated => "bulk-created",
            Self::BulkUpdated => "bulk-updated",
            Self::BulkDeleted => "bulk-deleted",
        }
    }
}

impl std::fmt::Display for DataEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single changed object, as stored in the table
pub type DataObject = Map<String, Value>;

/// Payload of `bulk-updated` and `bulk-deleted`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    pub count: u64,
}

/// Subscription options for one table event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectsChangesOptions {
    pub table_name: String,
    pub event: DataEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
}

impl ObjectsChangesOptions {
    pub fn new(table_name: impl Into<String>, event: DataEvent) -> Self {
        Self {
            table_name: table_name.into(),
            event,
            where_clause: None,
        }
    }

    pub fn where_clause(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = Some(where_clause.into());
        self
    }

    /// Whether stored subscription options belong to this table and event,
    /// and to `where_clause` when one is given
    pub fn matches(options: &Value, table: &str, event: DataEvent, where_clause: Option<&str>) -> bool {
        let Ok(stored) = serde_json::from_value::<ObjectsChangesOptions>(options.clone()) else {
            return false;
        };

        stored.table_name == table
            && stored.event == event
            && where_clause.is_none_or(|clause| stored.where_clause.as_deref() == Some(clause))
    }
}
