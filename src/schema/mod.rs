//! The schema cache: loads the literal `schema/requests/*.json` documents
//! once at startup. These double as the external interface reference for
//! every dispatchable request and as the contract the dispatcher validates
//! outgoing responses against before a single byte reaches the wire.
//! Structural validation of requests themselves happens through the typed
//! [`crate::wire`] structs at deserialize time; this cache's `result` field
//! is the second half, checked against what the dispatcher is about to send
//! back.
//!
//! The documents are an informal, string-typed shape description rather
//! than JSON Schema, so validation here is declared-key presence, not full
//! type checking: every key named in a `result` object must be present in
//! the response unless its description marks it optional (contains
//! "optional", "default", "or null" or "present only").

use std::collections::HashMap;
use std::path::Path;

pub struct SchemaCache {
    documents: HashMap<String, serde_json::Value>,
}

impl SchemaCache {
    pub fn load(schema_dir: &Path) -> anyhow::Result<Self> {
        let mut documents = HashMap::new();
        let requests_dir = schema_dir.join("requests");
        if requests_dir.is_dir() {
            for entry in std::fs::read_dir(&requests_dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .ok_or_else(|| anyhow::anyhow!("non UTF-8 schema file name: {path:?}"))?
                    .to_string();
                let contents = std::fs::read_to_string(&path)?;
                let value: serde_json::Value = serde_json::from_str(&contents)?;
                documents.insert(name, value);
            }
        } else {
            log::warn!("schema directory {:?} not found; describe requests will list nothing", requests_dir);
        }
        Ok(Self { documents })
    }

    pub fn get(&self, method: &str) -> Option<&serde_json::Value> {
        self.documents.get(method)
    }

    pub fn methods(&self) -> Vec<&str> {
        self.documents.keys().map(String::as_str).collect()
    }

    /// Checks `response` against `method`'s declared `result` shape. A
    /// method with no loaded document, or whose `result` isn't an object of
    /// key descriptions (e.g. `echo`'s free-form passthrough), is left
    /// unchecked rather than rejected — the cache only validates what it
    /// can actually describe.
    pub fn validate_response(&self, method: &str, response: &serde_json::Value) -> Result<(), String> {
        let Some(document) = self.documents.get(method) else {
            return Ok(());
        };
        let Some(result_shape) = document.get("result").and_then(|r| r.as_object()) else {
            return Ok(());
        };
        let Some(response_obj) = response.as_object() else {
            return Err(format!("{method} response must be an object, got {response}"));
        };
        for (key, description) in result_shape {
            if response_obj.contains_key(key) {
                continue;
            }
            let description = description.as_str().unwrap_or("");
            if is_optional_field(description) {
                continue;
            }
            return Err(format!("{method} response missing required field {key:?}"));
        }
        Ok(())
    }
}

fn is_optional_field(description: &str) -> bool {
    let lower = description.to_ascii_lowercase();
    ["optional", "default", "or null", "present only"]
        .iter()
        .any(|keyword| lower.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_loads_empty_cache() {
        let cache = SchemaCache::load(Path::new("/nonexistent/schema/path")).unwrap();
        assert!(cache.methods().is_empty());
    }

    #[test]
    fn accepts_a_response_with_every_required_field() {
        let cache = SchemaCache::load(Path::new(env!("CARGO_MANIFEST_DIR")).join("schema").as_path()).unwrap();
        let response = serde_json::json!({ "actions": [] });
        cache.validate_response("generate_actions", &response).unwrap();
    }

    #[test]
    fn rejects_a_response_missing_a_required_field() {
        let cache = SchemaCache::load(Path::new(env!("CARGO_MANIFEST_DIR")).join("schema").as_path()).unwrap();
        let response = serde_json::json!({});
        assert!(cache.validate_response("generate_actions", &response).is_err());
    }

    #[test]
    fn a_field_marked_present_only_when_finished_is_not_required() {
        let cache = SchemaCache::load(Path::new(env!("CARGO_MANIFEST_DIR")).join("schema").as_path()).unwrap();
        let response = serde_json::json!({ "finished": false, "state": {}, "nextPlayer": 0u8 });
        cache.validate_response("take_action", &response).unwrap();
    }
}
