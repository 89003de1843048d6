//! In-memory key-value storage tools.
//!
//! The backing store lives only in process memory and is shared by the four
//! `storage_*` tools. It is owned by a single long-lived [`Storage`] value
//! handed to the handlers at registration, so tests can run against isolated
//! instances instead of process-wide globals.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::ToolError;
use crate::mcp::server::{McpServer, Tool};

/// A process-memory key-value store.
///
/// Reads take a shared lock and writes an exclusive one, so any number of
/// concurrent `storage_get`/`storage_list` calls may overlap but never with a
/// mutation.
#[derive(Debug, Default)]
pub struct Storage {
    entries: RwLock<HashMap<String, String>>,
}

impl Storage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value under `key`, replacing any previous value.
    pub fn set(&self, key: String, value: String) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
    }

    /// Returns the value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Removes `key`, returning whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    /// Returns all stored keys, sorted for stable output.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[derive(Debug, Deserialize)]
struct SetInput {
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct KeyInput {
    #[serde(default)]
    key: String,
}

fn key_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "key": {
                "type": "string",
                "description": description
            }
        },
        "required": ["key"]
    })
}

fn set_definition() -> Tool {
    Tool {
        name: "storage_set".to_string(),
        description: "Store a key-value pair in memory".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "key": {
                    "type": "string",
                    "description": "The key to store the value under"
                },
                "value": {
                    "type": "string",
                    "description": "The value to store"
                }
            },
            "required": ["key", "value"]
        }),
    }
}

fn get_definition() -> Tool {
    Tool {
        name: "storage_get".to_string(),
        description: "Retrieve a value by key from memory".to_string(),
        input_schema: key_schema("The key to retrieve"),
    }
}

fn delete_definition() -> Tool {
    Tool {
        name: "storage_delete".to_string(),
        description: "Delete a key-value pair from memory".to_string(),
        input_schema: key_schema("The key to delete"),
    }
}

fn list_definition() -> Tool {
    Tool {
        name: "storage_list".to_string(),
        description: "List all stored keys".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

/// Returns the descriptors of the four storage tools.
#[must_use]
pub fn definitions() -> Vec<Tool> {
    vec![
        set_definition(),
        get_definition(),
        delete_definition(),
        list_definition(),
    ]
}

/// Registers the storage tools on the server, bound to `storage`.
pub fn register(server: &mut McpServer, storage: &Arc<Storage>) {
    let store = Arc::clone(storage);
    server.register_tool(
        set_definition(),
        Box::new(move |args| handle_set(&store, args)),
    );

    let store = Arc::clone(storage);
    server.register_tool(
        get_definition(),
        Box::new(move |args| handle_get(&store, args)),
    );

    let store = Arc::clone(storage);
    server.register_tool(
        delete_definition(),
        Box::new(move |args| handle_delete(&store, args)),
    );

    let store = Arc::clone(storage);
    server.register_tool(
        list_definition(),
        Box::new(move |args| handle_list(&store, args)),
    );
}

fn parse_key(args: &Map<String, Value>) -> Result<String, ToolError> {
    let input: KeyInput = serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| ToolError::bad_arguments(&e))?;

    if input.key.is_empty() {
        return Err(ToolError::Execution("key is required".to_string()));
    }

    Ok(input.key)
}

fn handle_set(storage: &Storage, args: &Map<String, Value>) -> Result<Value, ToolError> {
    let input: SetInput = serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| ToolError::bad_arguments(&e))?;

    if input.key.is_empty() {
        return Err(ToolError::Execution("key is required".to_string()));
    }

    let message = format!("Stored value for key '{}'", input.key);
    storage.set(input.key, input.value);

    Ok(json!({
        "success": true,
        "message": message,
    }))
}

fn handle_get(storage: &Storage, args: &Map<String, Value>) -> Result<Value, ToolError> {
    let key = parse_key(args)?;

    Ok(storage.get(&key).map_or_else(
        || json!({"found": false, "key": key}),
        |value| json!({"found": true, "key": key, "value": value}),
    ))
}

fn handle_delete(storage: &Storage, args: &Map<String, Value>) -> Result<Value, ToolError> {
    let key = parse_key(args)?;

    if storage.delete(&key) {
        Ok(json!({
            "success": true,
            "message": format!("Deleted key '{key}'"),
        }))
    } else {
        Ok(json!({
            "success": false,
            "message": format!("Key '{key}' not found"),
        }))
    }
}

fn handle_list(storage: &Storage, _args: &Map<String, Value>) -> Result<Value, ToolError> {
    let keys = storage.keys();

    Ok(json!({
        "count": keys.len(),
        "keys": keys,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(json: Value) -> Map<String, Value> {
        json.as_object().unwrap().clone()
    }

    #[test]
    fn set_then_get_round_trip() {
        let storage = Storage::new();

        let set = handle_set(&storage, &args(json!({"key": "k", "value": "v"}))).unwrap();
        assert_eq!(set["success"], true);

        let get = handle_get(&storage, &args(json!({"key": "k"}))).unwrap();
        assert_eq!(get["found"], true);
        assert_eq!(get["key"], "k");
        assert_eq!(get["value"], "v");
    }

    #[test]
    fn get_missing_key() {
        let storage = Storage::new();
        let get = handle_get(&storage, &args(json!({"key": "nope"}))).unwrap();
        assert_eq!(get["found"], false);
        assert_eq!(get["key"], "nope");
        assert!(get.get("value").is_none());
    }

    #[test]
    fn delete_then_get() {
        let storage = Storage::new();
        storage.set("k".to_string(), "v".to_string());

        let deleted = handle_delete(&storage, &args(json!({"key": "k"}))).unwrap();
        assert_eq!(deleted["success"], true);

        let get = handle_get(&storage, &args(json!({"key": "k"}))).unwrap();
        assert_eq!(get["found"], false);
    }

    #[test]
    fn delete_missing_key_reports_failure() {
        let storage = Storage::new();
        let deleted = handle_delete(&storage, &args(json!({"key": "ghost"}))).unwrap();
        assert_eq!(deleted["success"], false);
        assert!(deleted["message"].as_str().unwrap().contains("ghost"));
    }

    #[test]
    fn list_returns_sorted_keys() {
        let storage = Storage::new();
        storage.set("b".to_string(), "2".to_string());
        storage.set("a".to_string(), "1".to_string());

        let listed = handle_list(&storage, &Map::new()).unwrap();
        assert_eq!(listed["count"], 2);
        assert_eq!(listed["keys"], json!(["a", "b"]));
    }

    #[test]
    fn empty_key_is_execution_error() {
        let storage = Storage::new();
        let err = handle_set(&storage, &args(json!({"key": "", "value": "v"}))).unwrap_err();
        assert!(matches!(err, ToolError::Execution(_)));
        assert!(err.to_string().contains("key is required"));
    }

    #[test]
    fn set_overwrites_existing_value() {
        let storage = Storage::new();
        storage.set("k".to_string(), "old".to_string());
        storage.set("k".to_string(), "new".to_string());
        assert_eq!(storage.get("k"), Some("new".to_string()));
    }
}
