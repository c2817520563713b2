//! Representation: one HAL document and the relation resolution engine.
//!
//! Relation names are looked up in a single namespace that merges
//! `_embedded` and `_links`:
//!
//! ```text
//! name ──► candidate keys (name, CURIE expansion, CURIE abbreviations)
//!            │
//!            ├─► _embedded/<key>  wrap each object eagerly, no I/O
//!            │
//!            └─► _links/<key>     expand templated hrefs, fetch each target
//! ```
//!
//! Embedded entries always win over links. Shape violations are reported
//! lazily, when the offending entry is first looked up.

use crate::curie::NamespaceResolver;
use crate::error::{json_pointer, HalError, InvalidRepresentation, Result};
use crate::link::{json_kind, parse_links, Link, RelationEntry};
use crate::representation_set::RepresentationSet;
use crate::transport::{with_hal_content_type, HalTransport, Headers, PostResponse};
use crate::uri_template::TemplateParams;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, trace, warn};

const LINKS: &str = "_links";
const EMBEDDED: &str = "_embedded";
const SELF_REL: &str = "self";
const CURIES_REL: &str = "curies";

#[derive(Clone)]
pub struct Representation {
    href: Option<String>,
    /// `None` for a link target that could not be fetched (no transport).
    body: Option<Map<String, Value>>,
    transport: Option<Arc<dyn HalTransport>>,
    namespaces: OnceLock<std::result::Result<NamespaceResolver, InvalidRepresentation>>,
}

/// Result of [`Representation::fetch`].
#[derive(Debug, Clone)]
pub enum Fetched {
    Property(Value),
    Related(RepresentationSet),
    /// The caller-supplied fallback.
    Default(Value),
}

impl Fetched {
    /// The JSON value for `Property` and `Default`.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Property(value) | Self::Default(value) => Some(value),
            Self::Related(_) => None,
        }
    }

    pub fn as_related(&self) -> Option<&RepresentationSet> {
        match self {
            Self::Related(set) => Some(set),
            _ => None,
        }
    }

    pub fn into_related(self) -> Option<RepresentationSet> {
        match self {
            Self::Related(set) => Some(set),
            _ => None,
        }
    }
}

enum Relation<'a> {
    Embedded {
        key: &'a str,
        objects: Vec<&'a Map<String, Value>>,
    },
    Linked {
        key: &'a str,
        links: Vec<Link>,
    },
}

impl Representation {
    /// Wrap a parsed document. Only a JSON object is a valid HAL body.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(body) => Ok(Self::from_object(body, None)),
            other => Err(InvalidRepresentation::new(
                "",
                format!("top level is {}, expected an object", json_kind(&other)),
            )
            .into()),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        Self::from_json(serde_json::from_str(text)?)
    }

    /// A link target known only by its href; its body cannot be read.
    pub fn unfetched(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            body: None,
            transport: None,
            namespaces: OnceLock::new(),
        }
    }

    /// Attach the transport used to follow links and POST. Embedded
    /// children inherit it.
    pub fn with_transport(mut self, transport: Arc<dyn HalTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    fn from_object(body: Map<String, Value>, transport: Option<Arc<dyn HalTransport>>) -> Self {
        Self {
            href: self_href(&body).map(str::to_string),
            body: Some(body),
            transport,
            namespaces: OnceLock::new(),
        }
    }

    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    pub fn is_fetched(&self) -> bool {
        self.body.is_some()
    }

    pub fn transport(&self) -> Option<&Arc<dyn HalTransport>> {
        self.transport.as_ref()
    }

    fn body(&self) -> Result<&Map<String, Value>> {
        self.body
            .as_ref()
            .ok_or_else(|| HalError::NoTransport(self.href.clone().unwrap_or_default()))
    }

    /// The whole document as received.
    pub fn to_json(&self) -> Result<Value> {
        Ok(Value::Object(self.body()?.clone()))
    }

    // ── Properties ───────────────────────────────────────────────

    pub fn property(&self, name: &str) -> Result<&Value> {
        let body = self.body()?;
        if is_reserved(name) {
            return Err(HalError::NotFound(format!("property '{name}'")));
        }
        body.get(name)
            .ok_or_else(|| HalError::NotFound(format!("property '{name}'")))
    }

    pub fn properties(&self) -> Result<impl Iterator<Item = (&str, &Value)>> {
        Ok(self
            .body()?
            .iter()
            .filter(|(key, _)| !is_reserved(key))
            .map(|(key, value)| (key.as_str(), value)))
    }

    /// Property if present, else the related resources, else `NotFound`.
    pub async fn fetch(&self, name: &str) -> Result<Fetched> {
        self.lookup(name)
            .await?
            .ok_or_else(|| HalError::NotFound(format!("property or relation '{name}'")))
    }

    /// Like [`fetch`](Self::fetch) but a missing name yields `default`.
    pub async fn fetch_or(&self, name: &str, default: impl Into<Value>) -> Result<Fetched> {
        let default = default.into();
        Ok(self
            .lookup(name)
            .await?
            .unwrap_or(Fetched::Default(default)))
    }

    /// Like [`fetch`](Self::fetch) but a missing name yields `fallback(name)`.
    pub async fn fetch_or_else<F>(&self, name: &str, fallback: F) -> Result<Fetched>
    where
        F: FnOnce(&str) -> Value,
    {
        match self.lookup(name).await? {
            Some(found) => Ok(found),
            None => Ok(Fetched::Default(fallback(name))),
        }
    }

    async fn lookup(&self, name: &str) -> Result<Option<Fetched>> {
        if !is_reserved(name) {
            if let Some(value) = self.body()?.get(name) {
                return Ok(Some(Fetched::Property(value.clone())));
            }
        }
        if self.resolve(name)?.is_none() {
            return Ok(None);
        }
        Ok(Some(Fetched::Related(self.related(name).await?)))
    }

    // ── Relations ────────────────────────────────────────────────

    pub fn namespaces(&self) -> Result<&NamespaceResolver> {
        let body = self.body()?;
        self.namespaces
            .get_or_init(|| match body.get(LINKS).and_then(|links| links.get(CURIES_REL)) {
                Some(curies) => NamespaceResolver::from_curies(curies),
                None => Ok(NamespaceResolver::new()),
            })
            .as_ref()
            .map_err(|e| e.clone().into())
    }

    /// Resolve `name` with no template variables.
    pub async fn related(&self, name: &str) -> Result<RepresentationSet> {
        self.related_with(name, &TemplateParams::new()).await
    }

    /// Resolve `name`, expanding templated links against `params`.
    pub async fn related_with(
        &self,
        name: &str,
        params: &TemplateParams,
    ) -> Result<RepresentationSet> {
        match self.resolve(name)? {
            Some(Relation::Embedded { objects, .. }) => Ok(objects
                .into_iter()
                .map(|object| Self::from_object(object.clone(), self.transport.clone()))
                .collect()),
            Some(Relation::Linked { key, links }) => {
                let mut members = Vec::with_capacity(links.len());
                for (idx, link) in links.iter().enumerate() {
                    let uri = self.absolute(link_target(key, idx, link, params)?);
                    members.push(self.follow(uri).await?);
                }
                Ok(members.into())
            }
            None => Err(HalError::NotFound(format!("relation '{name}'"))),
        }
    }

    /// Target hrefs of `name` without fetching anything.
    pub fn related_hrefs(&self, name: &str) -> Result<Vec<String>> {
        match self.resolve(name)? {
            Some(Relation::Embedded { key, objects }) => objects
                .iter()
                .enumerate()
                .map(|(idx, object)| {
                    self_href(object).map(str::to_string).ok_or_else(|| {
                        InvalidRepresentation::new(
                            json_pointer([EMBEDDED, key]),
                            format!("embedded entry {idx} has no usable self link"),
                        )
                        .into()
                    })
                })
                .collect(),
            Some(Relation::Linked { key, links }) => links
                .iter()
                .enumerate()
                .map(|(idx, link)| {
                    link_target(key, idx, link, &TemplateParams::new()).map(|uri| self.absolute(uri))
                })
                .collect(),
            None => Err(HalError::NotFound(format!("relation '{name}'"))),
        }
    }

    /// Whether `name` resolves to a well-formed relation. Never fails.
    pub fn has_related(&self, name: &str) -> bool {
        matches!(self.resolve(name), Ok(Some(_)))
    }

    /// Indexed access: the related resources, or `None` for properties,
    /// unknown names and failures.
    pub async fn get(&self, name: &str) -> Option<RepresentationSet> {
        match self.related(name).await {
            Ok(set) => Some(set),
            Err(HalError::NotFound(_)) => None,
            Err(e) => {
                warn!(relation = %name, error = %e, "relation lookup failed");
                None
            }
        }
    }

    /// The Link objects declared under `name` in `_links`.
    pub fn links(&self, name: &str) -> Result<Vec<Link>> {
        match self.resolve(name)? {
            Some(Relation::Linked { links, .. }) => Ok(links),
            _ => Err(HalError::NotFound(format!("link '{name}'"))),
        }
    }

    /// Relation keys as written in the document, embedded first.
    pub fn relation_names(&self) -> Result<Vec<&str>> {
        let mut names: Vec<&str> = Vec::new();
        for section in [EMBEDDED, LINKS] {
            if let Some(map) = self.section(section)? {
                for key in map.keys() {
                    if key != CURIES_REL && !names.contains(&key.as_str()) {
                        names.push(key);
                    }
                }
            }
        }
        Ok(names)
    }

    // ── Writes ───────────────────────────────────────────────────

    /// POST `body` to this resource's `self` href as `application/hal+json`
    /// unless `headers` already names a content type.
    pub async fn post(&self, body: impl Into<String>, headers: &Headers) -> Result<PostResponse> {
        let body = body.into();
        let href = self.href.as_deref().ok_or(HalError::MissingSelf)?;
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| HalError::NoTransport(href.to_string()))?;

        let headers = with_hal_content_type(headers);
        debug!(%href, "posting to representation");
        transport.post(href, body, &headers).await
    }

    // ── Internals ────────────────────────────────────────────────

    fn section(&self, key: &str) -> Result<Option<&Map<String, Value>>> {
        match self.body()?.get(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(InvalidRepresentation::new(
                json_pointer([key]),
                format!("found {}, expected an object", json_kind(other)),
            )
            .into()),
        }
    }

    fn candidate_keys(&self, name: &str) -> Result<Vec<String>> {
        let mut keys = vec![name.to_string()];
        let namespaces = self.namespaces()?;
        if namespaces.is_empty() {
            return Ok(keys);
        }

        let expanded = namespaces.expand_curie(name);
        for key in expanded.into_iter().chain(namespaces.abbreviate(name)) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn resolve(&self, name: &str) -> Result<Option<Relation<'_>>> {
        let keys = self.candidate_keys(name)?;
        trace!(relation = %name, ?keys, "resolving relation");

        if let Some(embedded) = self.section(EMBEDDED)? {
            if let Some((key, value)) = keys.iter().find_map(|k| embedded.get_key_value(k)) {
                let pointer = json_pointer([EMBEDDED, key.as_str()]);
                let objects = RelationEntry::classify(value).into_objects(&pointer)?;
                return Ok(Some(Relation::Embedded { key, objects }));
            }
        }

        if let Some(links) = self.section(LINKS)? {
            let found = keys
                .iter()
                .filter(|k| k.as_str() != CURIES_REL)
                .find_map(|k| links.get_key_value(k));
            if let Some((key, value)) = found {
                let links = parse_links(key, value)?;
                return Ok(Some(Relation::Linked { key, links }));
            }
        }

        Ok(None)
    }

    /// Relative hrefs are resolved against this representation's own href.
    fn absolute(&self, href: String) -> String {
        if !matches!(url::Url::parse(&href), Err(url::ParseError::RelativeUrlWithoutBase)) {
            return href;
        }
        let joined = self
            .href
            .as_deref()
            .and_then(|base| url::Url::parse(base).ok())
            .and_then(|base| base.join(&href).ok());
        match joined {
            Some(url) => url.into(),
            None => href,
        }
    }

    async fn follow(&self, uri: String) -> Result<Representation> {
        let Some(transport) = &self.transport else {
            trace!(%uri, "no transport, link target left unfetched");
            return Ok(Self::unfetched(uri));
        };

        debug!(%uri, "fetching link target");
        let body = transport.get(&uri).await?;
        Self::fetched(body, uri, Arc::clone(transport))
    }

    /// Wrap a body fetched from `uri`. A document without its own self
    /// link takes `uri` as its identity.
    pub(crate) fn fetched(body: Value, uri: String, transport: Arc<dyn HalTransport>) -> Result<Self> {
        let mut fetched = Self::from_json(body)?.with_transport(transport);
        if fetched.href.is_none() {
            fetched.href = Some(uri);
        }
        Ok(fetched)
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Representation(<{}>)", self.href().unwrap_or("anonymous"))
    }
}

impl fmt::Debug for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Representation")
            .field("href", &self.href)
            .field("fetched", &self.is_fetched())
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

fn is_reserved(key: &str) -> bool {
    key == LINKS || key == EMBEDDED
}

/// `_links.self.href`, when the self link is a well-formed link object.
fn self_href(body: &Map<String, Value>) -> Option<&str> {
    body.get(LINKS)?.get(SELF_REL)?.get("href")?.as_str()
}

fn link_target(key: &str, idx: usize, link: &Link, params: &TemplateParams) -> Result<String> {
    link.expand(params).map_err(|e| {
        InvalidRepresentation::new(
            json_pointer([LINKS, key]),
            format!("entry {idx} has a malformed href template: {e}"),
        )
        .into()
    })
}
