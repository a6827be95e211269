//! Type definitions for tool definitions.

use crate::error::{PackagingError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Declared contract of a tool: identity, search metadata and the
/// JSON-Schema shapes of its configuration, parameters and result.
///
/// Fields the pipeline does not interpret are kept in `extra` so they
/// round-trip unchanged into the packaged artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Stable unique identifier.
    pub id: String,
    pub name: String,
    pub description: String,
    pub author: String,
    /// Search keywords. Order is kept but carries no meaning.
    pub keywords: Vec<String>,
    pub configurations: Value,
    pub parameters: Value,
    pub result: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolDefinition {
    /// Build a definition from a parsed value, validating its structure.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(PackagingError::DefinitionLoad(
                "definition must be an object".to_string(),
            ));
        }
        let definition: ToolDefinition = serde_json::from_value(value)
            .map_err(|e| PackagingError::DefinitionLoad(e.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Check the invariants serde cannot express: non-empty identity
    /// fields and well-formed object schemas.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("id", &self.id),
            ("name", &self.name),
            ("description", &self.description),
            ("author", &self.author),
        ] {
            if value.trim().is_empty() {
                return Err(PackagingError::DefinitionLoad(format!(
                    "field '{}' must be a non-empty string",
                    field
                )));
            }
        }

        for (field, schema) in [
            ("configurations", &self.configurations),
            ("parameters", &self.parameters),
            ("result", &self.result),
        ] {
            validate_object_schema(schema, field).map_err(|reason| {
                PackagingError::DefinitionLoad(format!("tool '{}': {}", self.id, reason))
            })?;
        }
        Ok(())
    }
}

/// Validate an `{ type: "object", properties: {...}, required: [...] }` node.
///
/// Nested object properties that declare `properties` are validated the same way.
pub fn validate_object_schema(schema: &Value, path: &str) -> std::result::Result<(), String> {
    let obj = schema
        .as_object()
        .ok_or_else(|| format!("{} must be an object schema", path))?;

    match obj.get("type") {
        Some(Value::String(t)) if t == "object" => {}
        other => {
            return Err(format!(
                "{}.type must be \"object\", found {}",
                path,
                other.map(Value::to_string).unwrap_or_else(|| "nothing".to_string())
            ))
        }
    }

    let properties = obj
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| format!("{}.properties must be an object", path))?;

    for (name, prop) in properties {
        let prop_path = format!("{}.properties.{}", path, name);
        validate_property(prop, &prop_path)?;
    }

    if let Some(required) = obj.get("required") {
        let required = required
            .as_array()
            .ok_or_else(|| format!("{}.required must be an array", path))?;
        let mut seen = HashSet::new();
        for key in required {
            let key = key
                .as_str()
                .ok_or_else(|| format!("{}.required must only contain strings", path))?;
            if !properties.contains_key(key) {
                return Err(format!(
                    "{}.required lists '{}' which is not in properties",
                    path, key
                ));
            }
            if !seen.insert(key) {
                return Err(format!("{}.required lists '{}' twice", path, key));
            }
        }
    }

    Ok(())
}

fn validate_property(prop: &Value, path: &str) -> std::result::Result<(), String> {
    let obj = prop
        .as_object()
        .ok_or_else(|| format!("{} must be an object", path))?;

    match obj.get("type") {
        None | Some(Value::String(_)) => {}
        Some(Value::Array(types)) if types.iter().all(Value::is_string) => {}
        Some(_) => return Err(format!("{}.type must be a string or list of strings", path)),
    }

    if let Some(nullable) = obj.get("nullable") {
        if !nullable.is_boolean() {
            return Err(format!("{}.nullable must be a boolean", path));
        }
    }

    if obj.get("type").and_then(Value::as_str) == Some("object") && obj.contains_key("properties") {
        validate_object_schema(prop, path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_definition() -> Value {
        json!({
            "id": "shinkai-tool-echo",
            "name": "Echo",
            "description": "Echoes its input",
            "author": "Shinkai",
            "keywords": ["echo"],
            "configurations": { "type": "object", "properties": {}, "required": [] },
            "parameters": {
                "type": "object",
                "properties": { "message": { "type": "string" } },
                "required": ["message"]
            },
            "result": {
                "type": "object",
                "properties": { "message": { "type": "string", "nullable": true } },
                "required": []
            }
        })
    }

    #[test]
    fn test_valid_definition() {
        let def = ToolDefinition::from_value(valid_definition()).unwrap();
        assert_eq!(def.id, "shinkai-tool-echo");
        assert_eq!(def.keywords, vec!["echo"]);
        assert!(def.extra.is_empty());
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let mut value = valid_definition();
        value["version"] = json!("1.0.0");
        let def = ToolDefinition::from_value(value.clone()).unwrap();
        assert_eq!(def.extra["version"], "1.0.0");
        assert_eq!(serde_json::to_value(&def).unwrap(), value);
    }

    #[test]
    fn test_missing_author_rejected() {
        let mut value = valid_definition();
        value.as_object_mut().unwrap().remove("author");
        let err = ToolDefinition::from_value(value).unwrap_err();
        assert!(err.to_string().contains("author"));
    }

    #[test]
    fn test_empty_id_rejected() {
        let mut value = valid_definition();
        value["id"] = json!("");
        assert!(ToolDefinition::from_value(value).is_err());
    }

    #[test]
    fn test_keywords_must_be_strings() {
        let mut value = valid_definition();
        value["keywords"] = json!(["ok", 3]);
        assert!(ToolDefinition::from_value(value).is_err());
    }

    #[test]
    fn test_empty_keywords_allowed() {
        let mut value = valid_definition();
        value["keywords"] = json!([]);
        assert!(ToolDefinition::from_value(value).is_ok());
    }

    #[test]
    fn test_required_must_reference_properties() {
        let schema = json!({
            "type": "object",
            "properties": { "a": { "type": "string" } },
            "required": ["a", "b"]
        });
        let err = validate_object_schema(&schema, "parameters").unwrap_err();
        assert!(err.contains("'b'"));
    }

    #[test]
    fn test_non_object_schema_type_rejected() {
        let schema = json!({ "type": "string", "properties": {} });
        assert!(validate_object_schema(&schema, "result").is_err());
    }

    #[test]
    fn test_nested_object_schema_validated() {
        let schema = json!({
            "type": "object",
            "properties": {
                "inner": {
                    "type": "object",
                    "properties": { "x": { "type": "number" } },
                    "required": ["y"]
                }
            }
        });
        let err = validate_object_schema(&schema, "result").unwrap_err();
        assert!(err.contains("result.properties.inner.required"));
    }

    #[test]
    fn test_nullable_must_be_bool() {
        let schema = json!({
            "type": "object",
            "properties": { "a": { "type": "string", "nullable": "yes" } }
        });
        assert!(validate_object_schema(&schema, "parameters").is_err());
    }
}
