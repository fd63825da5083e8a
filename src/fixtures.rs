use serde_json::{Map, Value};

use crate::schema::ResourceSchema;

const MAX_REF_DEPTH: usize = 8;

/// Produces a representative payload for a resource type.
pub trait FixtureFactory: Send + Sync {
    fn fixture(&self, resource_type: &str) -> Value;
}

impl<F> FixtureFactory for F
where
    F: Fn(&str) -> Value + Send + Sync,
{
    fn fixture(&self, resource_type: &str) -> Value {
        self(resource_type)
    }
}

/// Builds fixtures from the `properties` of each schema definition, preferring
/// `example` and `default` values over type placeholders.
#[derive(Debug, Clone)]
pub struct SchemaFixtures {
    schema: ResourceSchema,
}

impl SchemaFixtures {
    pub fn new(schema: ResourceSchema) -> Self {
        Self { schema }
    }

    fn object_from(&self, properties: &Map<String, Value>, depth: usize) -> Value {
        let object = properties
            .iter()
            .map(|(name, property)| (name.clone(), self.value_for(property, depth)))
            .collect::<Map<String, Value>>();
        Value::Object(object)
    }

    fn value_for(&self, property: &Value, depth: usize) -> Value {
        if let Some(example) = property.get("example") {
            return example.clone();
        }
        if let Some(default) = property.get("default") {
            return default.clone();
        }
        if let Some(reference) = property.get("$ref").and_then(Value::as_str) {
            if depth >= MAX_REF_DEPTH {
                return Value::Null;
            }
            return match self.schema.resolve_ref(reference) {
                Some(target) => self.value_for(target, depth + 1),
                None => Value::Null,
            };
        }
        if let Some(properties) = property.get("properties").and_then(Value::as_object) {
            return self.object_from(properties, depth);
        }

        match primary_type(property) {
            Some("string") => Value::String(String::new()),
            Some("integer") | Some("number") => Value::from(0),
            Some("boolean") => Value::Bool(false),
            Some("array") => Value::Array(vec![]),
            Some("object") => Value::Object(Map::new()),
            _ => Value::Null,
        }
    }
}

impl FixtureFactory for SchemaFixtures {
    fn fixture(&self, resource_type: &str) -> Value {
        match self.schema.definition(resource_type) {
            Some(definition) => self.object_from(&definition.properties, 0),
            None => Value::Object(Map::new()),
        }
    }
}

// `"type": ["string", "null"]` picks the first non-null entry.
fn primary_type(property: &Value) -> Option<&str> {
    match property.get("type")? {
        Value::String(name) => Some(name.as_str()),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .find(|name| *name != "null")
            .or(Some("null")),
        _ => None,
    }
}
