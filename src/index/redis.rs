//! RediSearch document store.
//!
//! Availability documents are stored as JSON (`JSON.SET`) under the
//! `availability:` key prefix and queried through `FT.SEARCH` against the
//! declared index. Every command is wrapped in the query retry policy;
//! connection establishment uses the startup policy so a bad Redis URL
//! fails service startup quickly.

use redis::aio::ConnectionManager;
use redis::{cmd, Client, Value};
use tracing::{debug, info};

use async_trait::async_trait;

use crate::domain::TableAvailability;
use crate::metrics;
use crate::query::NormalizedQuery;
use crate::resilience::retry::{retry, RetryConfig};

use super::decode::decode_document;
use super::schema::{availability_index, DOC_PREFIX, INDEX_NAME};
use super::{AvailabilityStore, IndexError, SearchResult};

pub struct RediSearchStore {
    connection: ConnectionManager,
    /// Optional global key prefix for namespacing (e.g. "staging:").
    prefix: String,
}

impl RediSearchStore {
    /// Connect to Redis. Fails after the startup retry ceiling.
    pub async fn connect(url: &str, prefix: &str) -> Result<Self, IndexError> {
        let client = Client::open(url).map_err(|e| IndexError::Backend(e.to_string()))?;

        let connection = retry("index_connect", &RetryConfig::startup(), || async {
            ConnectionManager::new(client.clone()).await
        })
        .await
        .map_err(|e: redis::RedisError| IndexError::Backend(e.to_string()))?;

        Ok(Self {
            connection,
            prefix: prefix.to_string(),
        })
    }

    /// Build from an existing connection (shared with other Redis users).
    pub fn with_connection(connection: ConnectionManager, prefix: &str) -> Self {
        Self {
            connection,
            prefix: prefix.to_string(),
        }
    }

    /// Create the availability index if it does not exist yet.
    pub async fn ensure_index(&self) -> Result<(), IndexError> {
        let args = availability_index().to_ft_create_args(&self.prefix);
        let conn = self.connection.clone();

        let result: Result<(), redis::RedisError> = retry("ft_create", &RetryConfig::query(), || {
            let mut conn = conn.clone();
            let args = args.clone();
            async move {
                let mut command = cmd("FT.CREATE");
                for arg in &args {
                    command.arg(arg);
                }
                let _: () = command.query_async(&mut conn).await?;
                Ok(())
            }
        })
        .await;

        match result {
            Ok(()) => {
                info!(index = %args[0], "Search index created");
                Ok(())
            }
            Err(e) if e.to_string().contains("Index already exists") => {
                debug!(index = %args[0], "Search index already exists");
                Ok(())
            }
            Err(e) => Err(IndexError::Backend(e.to_string())),
        }
    }

    fn doc_key(&self, id: &str) -> String {
        format!("{}{}{}", self.prefix, DOC_PREFIX, id)
    }

    fn index_name(&self) -> String {
        format!("{}{}", self.prefix, INDEX_NAME)
    }

    async fn put(&self, doc: &TableAvailability) -> Result<(), IndexError> {
        let json = serde_json::to_string(doc).map_err(|e| IndexError::Backend(e.to_string()))?;
        let key = self.doc_key(&doc.id);
        let conn = self.connection.clone();

        retry("json_set", &RetryConfig::query(), || {
            let mut conn = conn.clone();
            let key = key.clone();
            let json = json.clone();
            async move {
                let _: () = cmd("JSON.SET")
                    .arg(&key)
                    .arg("$")
                    .arg(&json)
                    .query_async(&mut conn)
                    .await?;
                Ok(())
            }
        })
        .await
        .map_err(|e: redis::RedisError| IndexError::Backend(e.to_string()))
    }

    async fn ft_search(&self, query: &str, offset: usize, limit: usize, sort: Option<(&str, &str)>) -> Result<Value, IndexError> {
        let index = self.index_name();
        let conn = self.connection.clone();
        let sort = sort.map(|(f, o)| (f.to_string(), o.to_string()));

        retry("ft_search", &RetryConfig::query(), || {
            let mut conn = conn.clone();
            let index = index.clone();
            let query = query.to_string();
            let sort = sort.clone();
            async move {
                let mut command = cmd("FT.SEARCH");
                command.arg(&index).arg(&query);
                if let Some((field, order)) = &sort {
                    command.arg("SORTBY").arg(field).arg(order);
                }
                command.arg("LIMIT").arg(offset).arg(limit);
                command.arg("DIALECT").arg(2);
                command.query_async(&mut conn).await
            }
        })
        .await
        .map_err(|e: redis::RedisError| IndexError::Backend(e.to_string()))
    }
}

#[async_trait]
impl AvailabilityStore for RediSearchStore {
    async fn index(&self, doc: &TableAvailability) -> Result<(), IndexError> {
        let result = self.put(doc).await;
        metrics::record_index_operation("index", result.is_ok());
        result
    }

    async fn update(&self, doc: &TableAvailability) -> Result<(), IndexError> {
        let result = self.put(doc).await;
        metrics::record_index_operation("update", result.is_ok());
        result
    }

    async fn delete(&self, id: &str) -> Result<(), IndexError> {
        let key = self.doc_key(id);
        let conn = self.connection.clone();

        let result = retry("doc_delete", &RetryConfig::query(), || {
            let mut conn = conn.clone();
            let key = key.clone();
            async move {
                let _: () = cmd("DEL").arg(&key).query_async(&mut conn).await?;
                Ok(())
            }
        })
        .await
        .map_err(|e: redis::RedisError| IndexError::Backend(e.to_string()));
        metrics::record_index_operation("delete", result.is_ok());
        result
    }

    async fn search(&self, query: &NormalizedQuery) -> Result<SearchResult, IndexError> {
        let engine_query = query.engine_query();
        let offset = query.page.saturating_sub(1) * query.size;
        let sort = query
            .sort
            .as_ref()
            .map(|s| (s.field.as_str(), s.order.as_str()));
        debug!(query = %engine_query, page = query.page, size = query.size, "FT.SEARCH");

        let reply = self.ft_search(&engine_query, offset, query.size, sort).await?;
        let (total, docs) = parse_search_reply(&reply)?;

        let results = docs
            .iter()
            .map(decode_document)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SearchResult::paged(results, total, query.page, query.size))
    }

    async fn get_by_id(&self, id: &str) -> Result<TableAvailability, IndexError> {
        let key = self.doc_key(id);
        let conn = self.connection.clone();

        let json: Option<String> = retry("json_get", &RetryConfig::query(), || {
            let mut conn = conn.clone();
            let key = key.clone();
            async move {
                let data: Option<String> = cmd("JSON.GET")
                    .arg(&key)
                    .arg("$")
                    .query_async(&mut conn)
                    .await?;
                Ok(data)
            }
        })
        .await
        .map_err(|e: redis::RedisError| IndexError::Backend(e.to_string()))?;

        let json = json.ok_or(IndexError::NotFound)?;
        let value: serde_json::Value =
            serde_json::from_str(&json).map_err(|e| IndexError::Decode(e.to_string()))?;
        decode_document(&value)
    }

    async fn count(&self) -> Result<usize, IndexError> {
        let reply = self.ft_search("*", 0, 0, None).await?;
        let (total, _) = parse_search_reply(&reply)?;
        Ok(total)
    }
}

/// Parse an FT.SEARCH reply: `[total, key, fields, key, fields, ...]` where
/// each fields array is `["$", "<json>"]` for a JSON index.
fn parse_search_reply(reply: &Value) -> Result<(usize, Vec<serde_json::Value>), IndexError> {
    let items = match reply {
        Value::Array(items) => items,
        other => {
            return Err(IndexError::Decode(format!(
                "unexpected search reply: {other:?}"
            )))
        }
    };

    let total = items
        .first()
        .and_then(as_int)
        .ok_or_else(|| IndexError::Decode("search reply missing total".into()))?
        as usize;

    let mut docs = Vec::new();
    let mut rest = items[1..].iter();
    while let Some(entry) = rest.next() {
        // Document key, then its field list.
        if as_text(entry).is_none() {
            continue;
        }
        let Some(Value::Array(fields)) = rest.next() else {
            continue;
        };
        // Field list alternates name/value; a JSON index returns ("$", doc).
        for pair in fields.chunks(2) {
            let [name, value] = pair else { continue };
            if as_text(name).as_deref() == Some("$") {
                if let Some(json) = as_text(value) {
                    let doc = serde_json::from_str(&json)
                        .map_err(|e| IndexError::Decode(e.to_string()))?;
                    docs.push(doc);
                }
            }
        }
    }

    Ok((total, docs))
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n),
        Value::Double(d) => Some(*d as i64),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> Value {
        Value::BulkString(s.as_bytes().to_vec())
    }

    #[test]
    fn test_parse_search_reply() {
        let doc = r#"{"id":"table-dinner-3-2025-03-01","table_number":3,"capacity":4,"meal_type":"dinner","date":"2025-03-01","date_ts":1740787200,"is_available":false,"reservation_id":"R1","created_at":"2025-02-20T10:00:00Z","updated_at":"2025-02-20T10:00:00Z"}"#;
        let reply = Value::Array(vec![
            Value::Int(42),
            bulk("availability:table-dinner-3-2025-03-01"),
            Value::Array(vec![bulk("$"), bulk(doc)]),
        ]);

        let (total, docs) = parse_search_reply(&reply).unwrap();
        assert_eq!(total, 42);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["id"], "table-dinner-3-2025-03-01");
    }

    #[test]
    fn test_parse_search_reply_empty() {
        let reply = Value::Array(vec![Value::Int(0)]);
        let (total, docs) = parse_search_reply(&reply).unwrap();
        assert_eq!(total, 0);
        assert!(docs.is_empty());
    }

    #[test]
    fn test_parse_search_reply_rejects_garbage() {
        assert!(parse_search_reply(&Value::Nil).is_err());
        assert!(parse_search_reply(&Value::Array(vec![])).is_err());
    }
}
