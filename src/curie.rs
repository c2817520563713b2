//! CURIE namespace table
//!
//! Built from a representation's `_links.curies` entry and used in both
//! directions: `prefix:suffix` → full URI, and full URI → every
//! `prefix:suffix` that expands to it.

use crate::error::{json_pointer, HalError, InvalidRepresentation, Result};
use crate::link::{Curie, RelationEntry};
use crate::uri_template::{TemplateParams, UriTemplate};
use serde_json::Value;
use std::collections::BTreeMap;

const REL_VAR: &str = "rel";

#[derive(Debug, Clone, Default)]
pub struct NamespaceResolver {
    namespaces: BTreeMap<String, UriTemplate>,
}

impl NamespaceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the raw `_links.curies` value. Duplicate prefixes: last one wins.
    pub fn from_curies(value: &Value) -> std::result::Result<Self, InvalidRepresentation> {
        let pointer = json_pointer(["_links", "curies"]);
        let entry = RelationEntry::classify(value);
        let is_array = matches!(entry, RelationEntry::Array(_));

        let mut resolver = Self::new();
        for (idx, object) in entry.into_objects(&pointer)?.into_iter().enumerate() {
            let member = if is_array {
                let index = idx.to_string();
                json_pointer(["_links", "curies", index.as_str()])
            } else {
                pointer.clone()
            };
            let curie: Curie = serde_json::from_value(Value::Object(object.clone()))
                .map_err(|e| InvalidRepresentation::new(&member, format!("malformed curie: {e}")))?;
            resolver.register(curie).map_err(|e| {
                InvalidRepresentation::new(format!("{member}/href"), e.to_string())
            })?;
        }
        Ok(resolver)
    }

    pub fn register(&mut self, curie: Curie) -> std::result::Result<(), crate::TemplateError> {
        let template = UriTemplate::parse(&curie.href)?;
        if self.namespaces.insert(curie.name.clone(), template).is_some() {
            tracing::debug!(prefix = %curie.name, "curie prefix redefined, keeping the later one");
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    pub fn template(&self, prefix: &str) -> Option<&UriTemplate> {
        self.namespaces.get(prefix)
    }

    pub fn expand(&self, prefix: &str, suffix: &str) -> Result<String> {
        let template = self
            .namespaces
            .get(prefix)
            .ok_or_else(|| HalError::NotFound(format!("curie prefix '{prefix}'")))?;
        let mut params = TemplateParams::new();
        params.insert(REL_VAR.to_string(), Value::String(suffix.to_string()));
        Ok(template.expand(&params))
    }

    /// Expand `prefix:suffix` when the prefix is registered.
    pub fn expand_curie(&self, curie: &str) -> Option<String> {
        let (prefix, suffix) = curie.split_once(':')?;
        if suffix.is_empty() {
            return None;
        }
        self.expand(prefix, suffix).ok()
    }

    /// The `rel` value under which `prefix` expands to `full_uri`.
    pub fn suffix_for(&self, prefix: &str, full_uri: &str) -> Option<String> {
        let vars = self.namespaces.get(prefix)?.extract(full_uri)?;
        vars.get(REL_VAR).filter(|rel| !rel.is_empty()).cloned()
    }

    pub fn matches(&self, prefix: &str, full_uri: &str) -> bool {
        self.suffix_for(prefix, full_uri).is_some()
    }

    /// Every `prefix:suffix` form that expands to `full_uri`.
    pub fn abbreviate(&self, full_uri: &str) -> Vec<String> {
        self.namespaces
            .keys()
            .filter_map(|prefix| {
                self.suffix_for(prefix, full_uri)
                    .map(|suffix| format!("{prefix}:{suffix}"))
            })
            .collect()
    }
}
