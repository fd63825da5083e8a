use std::collections::BTreeMap;

use serde_derive::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// A hyper-schema style API description: resource types and the links that
/// reach them.
#[derive(Debug, Clone, Default)]
pub struct ResourceSchema {
    definitions: BTreeMap<String, Definition>,
    raw: Value,
}

#[derive(Deserialize, Debug, Clone, Default)]
struct SchemaDocument {
    #[serde(default)]
    definitions: BTreeMap<String, Definition>,
}

impl ResourceSchema {
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let raw = serde_json::from_str::<Value>(json).map_err(SchemaError::InvalidJson)?;
        Self::from_value(raw)
    }

    pub fn from_value(raw: Value) -> Result<Self, SchemaError> {
        if !raw.is_object() {
            return Err(SchemaError::NotAnObject);
        }
        let document = serde_json::from_value::<SchemaDocument>(raw.clone())
            .map_err(SchemaError::InvalidDefinitions)?;
        Ok(Self {
            definitions: document.definitions,
            raw,
        })
    }

    pub fn definitions(&self) -> impl Iterator<Item = (&str, &Definition)> {
        self.definitions
            .iter()
            .map(|(name, definition)| (name.as_str(), definition))
    }

    pub fn definition(&self, resource_type: &str) -> Option<&Definition> {
        self.definitions.get(resource_type)
    }

    /// Resolves a local `$ref` such as `#/definitions/app/definitions/id`.
    pub fn resolve_ref(&self, reference: &str) -> Option<&Value> {
        let pointer = reference.strip_prefix('#')?;
        if pointer.is_empty() {
            return Some(&self.raw);
        }
        self.raw.pointer(pointer)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Definition {
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Link {
    #[serde(default)]
    pub rel: LinkRel,
    pub href: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "String")]
pub enum LinkRel {
    Instances,
    SelfRel,
    Create,
    Update,
    Destroy,
    Other(String),
}

// A link without a relation is kept and skipped during route derivation.
impl Default for LinkRel {
    fn default() -> Self {
        LinkRel::Other(String::new())
    }
}

impl From<String> for LinkRel {
    fn from(rel: String) -> Self {
        match rel.as_str() {
            "instances" => LinkRel::Instances,
            "self" => LinkRel::SelfRel,
            "create" => LinkRel::Create,
            "update" => LinkRel::Update,
            "destroy" => LinkRel::Destroy,
            _ => LinkRel::Other(rel),
        }
    }
}

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("Schema must be a JSON object")]
    NotAnObject,
    #[error("Schema definitions are malformed: {0}")]
    InvalidDefinitions(#[source] serde_json::Error),
}
