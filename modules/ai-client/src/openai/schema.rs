use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A record the model must answer with, described by a JSON schema.
///
/// Blanket-implemented for every `JsonSchema + DeserializeOwned` type. The
/// generated schema is rewritten for strict structured-output mode:
/// every object closes `additionalProperties`, lists all of its properties
/// as required (nullable fields stay nullable through their type), and
/// `$ref`s are inlined because strict mode rejects `definitions`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn strict_schema() -> Value {
        let mut value = serde_json::to_value(schema_for!(Self)).unwrap_or_default();

        let definitions = match &mut value {
            Value::Object(map) => {
                map.remove("$schema");
                map.remove("definitions")
            }
            _ => None,
        };
        let definitions = definitions.unwrap_or(Value::Null);

        normalize(&mut value, &definitions);
        value
    }

    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn normalize(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            let replacement = resolve_ref(map, definitions).or_else(|| single_all_of(map));
            if let Some(replacement) = replacement {
                *value = replacement;
                normalize(value, definitions);
                return;
            }

            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                if let Some(Value::Object(props)) = map.get("properties") {
                    let required = props.keys().cloned().map(Value::String).collect();
                    map.insert("required".to_string(), Value::Array(required));
                }
            }

            for child in map.values_mut() {
                normalize(child, definitions);
            }
        }
        Value::Array(items) => {
            for item in items {
                normalize(item, definitions);
            }
        }
        _ => {}
    }
}

fn resolve_ref(map: &Map<String, Value>, definitions: &Value) -> Option<Value> {
    let path = map.get("$ref")?.as_str()?;
    let name = path.strip_prefix("#/definitions/")?;
    definitions.get(name).cloned()
}

fn single_all_of(map: &Map<String, Value>) -> Option<Value> {
    match map.get("allOf")?.as_array()?.as_slice() {
        [single] => Some(single.clone()),
        _ => None,
    }
}
