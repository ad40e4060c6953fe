//! Operation payloads
//!
//! Operations are the only way a caller invokes backend behavior; there is
//! no adapter-specific method surface. Each family is a closed enum, so
//! dispatch inside an adapter is an exhaustive `match` rather than a
//! string-keyed lookup.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::AdapterKind;

/// One operation submitted to [`crate::Adapter::execute`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum AdapterOperation {
    /// Data-store verb
    Database(DatabaseOperation),
    /// File-store verb
    FileSystem(FsOperation),
    /// REST verb
    Http(HttpOperation),
}

impl AdapterOperation {
    /// Backend family this operation targets.
    pub fn family(&self) -> AdapterKind {
        match self {
            AdapterOperation::Database(_) => AdapterKind::Database,
            AdapterOperation::FileSystem(_) => AdapterKind::FileSystem,
            AdapterOperation::Http(_) => AdapterKind::HttpApi,
        }
    }

    /// Verb name used in result metadata, metrics labels, and logs.
    pub fn name(&self) -> &'static str {
        match self {
            AdapterOperation::Database(op) => op.name(),
            AdapterOperation::FileSystem(op) => op.name(),
            AdapterOperation::Http(op) => op.name(),
        }
    }
}

/// Data-store verbs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DatabaseOperation {
    /// Run a statement and return matching rows
    Query {
        /// Statement text
        statement: String,
        /// Positional parameters
        #[serde(default)]
        params: Vec<Value>,
    },
    /// Insert one row
    Insert {
        /// Target table
        table: String,
        /// Column/value pairs
        values: Map<String, Value>,
    },
    /// Update rows matching a filter
    Update {
        /// Target table
        table: String,
        /// Column/value pairs to set
        values: Map<String, Value>,
        /// Equality filter selecting the rows
        filter: Map<String, Value>,
    },
    /// Delete rows matching a filter
    Delete {
        /// Target table
        table: String,
        /// Equality filter selecting the rows
        filter: Map<String, Value>,
    },
    /// All-or-nothing ordered batch
    Transaction {
        /// Member operations, executed in order
        operations: Vec<DatabaseOperation>,
    },
    /// Describe one table, or list all tables
    Schema {
        /// Table to describe; `None` lists all tables
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table: Option<String>,
    },
}

impl DatabaseOperation {
    /// Verb name.
    pub fn name(&self) -> &'static str {
        match self {
            DatabaseOperation::Query { .. } => "query",
            DatabaseOperation::Insert { .. } => "insert",
            DatabaseOperation::Update { .. } => "update",
            DatabaseOperation::Delete { .. } => "delete",
            DatabaseOperation::Transaction { .. } => "transaction",
            DatabaseOperation::Schema { .. } => "schema",
        }
    }
}

/// File-store verbs
///
/// All paths are relative to the configured base path and pass the
/// containment guard before any I/O.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FsOperation {
    /// Read a file's contents
    Read {
        /// File path
        path: String,
    },
    /// Write a file
    Write {
        /// File path
        path: String,
        /// Contents to write
        contents: Bytes,
        /// Allow replacing an existing file
        #[serde(default)]
        overwrite: bool,
    },
    /// List a directory
    List {
        /// Directory path
        path: String,
    },
    /// Delete a file or empty directory
    Delete {
        /// Target path
        path: String,
    },
    /// Copy a file
    Copy {
        /// Source path
        from: String,
        /// Destination path
        to: String,
    },
    /// Move/rename a file
    Move {
        /// Source path
        from: String,
        /// Destination path
        to: String,
    },
    /// Create a directory (and missing parents)
    Mkdir {
        /// Directory path
        path: String,
    },
    /// Return file metadata
    Stat {
        /// Target path
        path: String,
    },
    /// Register a path for caller-driven change polling
    Watch {
        /// Target path
        path: String,
    },
}

impl FsOperation {
    /// Verb name.
    pub fn name(&self) -> &'static str {
        match self {
            FsOperation::Read { .. } => "read",
            FsOperation::Write { .. } => "write",
            FsOperation::List { .. } => "list",
            FsOperation::Delete { .. } => "delete",
            FsOperation::Copy { .. } => "copy",
            FsOperation::Move { .. } => "move",
            FsOperation::Mkdir { .. } => "mkdir",
            FsOperation::Stat { .. } => "stat",
            FsOperation::Watch { .. } => "watch",
        }
    }
}

/// REST verbs
///
/// `path` is joined onto the configured base URL; `headers` override both
/// default and credential-derived headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HttpOperation {
    /// GET request
    Get {
        /// Request path
        path: String,
        /// Query parameters
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        query: HashMap<String, String>,
        /// Extra headers
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        headers: HashMap<String, String>,
    },
    /// POST request with a JSON body
    Post {
        /// Request path
        path: String,
        /// JSON body
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<Value>,
        /// Extra headers
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        headers: HashMap<String, String>,
    },
    /// PUT request with a JSON body
    Put {
        /// Request path
        path: String,
        /// JSON body
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<Value>,
        /// Extra headers
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        headers: HashMap<String, String>,
    },
    /// PATCH request with a JSON body
    Patch {
        /// Request path
        path: String,
        /// JSON body
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<Value>,
        /// Extra headers
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        headers: HashMap<String, String>,
    },
    /// DELETE request
    Delete {
        /// Request path
        path: String,
        /// Extra headers
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        headers: HashMap<String, String>,
    },
    /// Raw byte upload
    Upload {
        /// Request path
        path: String,
        /// File name forwarded in `X-File-Name`
        file_name: String,
        /// MIME type for the payload
        content_type: String,
        /// Payload
        contents: Bytes,
    },
    /// Raw byte download
    Download {
        /// Request path
        path: String,
        /// Extra headers
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        headers: HashMap<String, String>,
    },
}

impl HttpOperation {
    /// Verb name.
    pub fn name(&self) -> &'static str {
        match self {
            HttpOperation::Get { .. } => "get",
            HttpOperation::Post { .. } => "post",
            HttpOperation::Put { .. } => "put",
            HttpOperation::Patch { .. } => "patch",
            HttpOperation::Delete { .. } => "delete",
            HttpOperation::Upload { .. } => "upload",
            HttpOperation::Download { .. } => "download",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_family_and_name() {
        let op = AdapterOperation::FileSystem(FsOperation::Read {
            path: "programs/part42.gcode".to_string(),
        });
        assert_eq!(op.family(), AdapterKind::FileSystem);
        assert_eq!(op.name(), "read");
    }

    #[test]
    fn database_operation_serde_tags() {
        let op = DatabaseOperation::Query {
            statement: "SELECT * FROM jobs".to_string(),
            params: vec![],
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "query");

        let wrapped = AdapterOperation::Database(op);
        let json = serde_json::to_value(&wrapped).unwrap();
        assert_eq!(json["family"], "database");
        assert_eq!(json["type"], "query");
    }

    #[test]
    fn transaction_nests_member_operations() {
        let json = serde_json::json!({
            "type": "transaction",
            "operations": [
                {"type": "insert", "table": "jobs", "values": {"id": 1}},
                {"type": "delete", "table": "queue", "filter": {"id": 1}}
            ]
        });
        let op: DatabaseOperation = serde_json::from_value(json).unwrap();
        match op {
            DatabaseOperation::Transaction { operations } => assert_eq!(operations.len(), 2),
            other => panic!("expected transaction, got {:?}", other),
        }
    }
}
