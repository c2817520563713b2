//! Link objects and the shape classification of `_links` / `_embedded` entries.

use crate::error::{json_pointer, InvalidRepresentation};
use crate::uri_template::{TemplateError, TemplateParams, UriTemplate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A HAL Link Object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub templated: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hreflang: Option<String>,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            templated: false,
            media_type: None,
            name: None,
            title: None,
            profile: None,
            deprecation: None,
            hreflang: None,
        }
    }

    pub fn templated(href: impl Into<String>) -> Self {
        Self {
            templated: true,
            ..Self::new(href)
        }
    }

    /// The target URI. Non-templated hrefs are returned verbatim.
    pub fn expand(&self, params: &TemplateParams) -> Result<String, TemplateError> {
        if !self.templated {
            return Ok(self.href.clone());
        }
        Ok(UriTemplate::parse(&self.href)?.expand(params))
    }

    pub(crate) fn from_object(
        object: &Map<String, Value>,
        pointer: &str,
    ) -> Result<Self, InvalidRepresentation> {
        let link: Self = serde_json::from_value(Value::Object(object.clone())).map_err(|e| {
            InvalidRepresentation::new(pointer, format!("malformed link object: {e}"))
        })?;
        if link.templated {
            UriTemplate::parse(&link.href).map_err(|e| {
                InvalidRepresentation::new(pointer, format!("malformed href template: {e}"))
            })?;
        }
        Ok(link)
    }
}

/// A compact URI prefix declared under `_links.curies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Curie {
    pub name: String,
    /// URI Template with a single `rel` variable.
    pub href: String,
    #[serde(default)]
    pub templated: bool,
}

/// Shape of the value stored under a relation key.
#[derive(Debug)]
pub(crate) enum RelationEntry<'a> {
    Single(&'a Map<String, Value>),
    Array(Vec<&'a Map<String, Value>>),
    Invalid(String),
}

impl<'a> RelationEntry<'a> {
    pub(crate) fn classify(value: &'a Value) -> Self {
        match value {
            Value::Object(object) => Self::Single(object),
            Value::Array(items) => {
                let mut objects = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    match item {
                        Value::Object(object) => objects.push(object),
                        other => {
                            return Self::Invalid(format!(
                                "entry {idx} is {}, expected an object",
                                json_kind(other)
                            ))
                        }
                    }
                }
                Self::Array(objects)
            }
            other => Self::Invalid(format!(
                "found {}, expected an object or an array of objects",
                json_kind(other)
            )),
        }
    }

    /// The member objects in declaration order; `Invalid` becomes an error at `pointer`.
    pub(crate) fn into_objects(
        self,
        pointer: &str,
    ) -> Result<Vec<&'a Map<String, Value>>, InvalidRepresentation> {
        match self {
            Self::Single(object) => Ok(vec![object]),
            Self::Array(objects) => Ok(objects),
            Self::Invalid(reason) => Err(InvalidRepresentation::new(pointer, reason)),
        }
    }
}

/// Parse every link stored under `_links/<key>`.
pub(crate) fn parse_links(key: &str, value: &Value) -> Result<Vec<Link>, InvalidRepresentation> {
    let pointer = json_pointer(["_links", key]);
    let entry = RelationEntry::classify(value);
    let is_array = matches!(entry, RelationEntry::Array(_));

    entry
        .into_objects(&pointer)?
        .into_iter()
        .enumerate()
        .map(|(idx, object)| {
            let member = if is_array {
                let index = idx.to_string();
                json_pointer(["_links", key, index.as_str()])
            } else {
                pointer.clone()
            };
            Link::from_object(object, &member)
        })
        .collect()
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
