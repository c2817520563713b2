//! hal-client - HAL+JSON hypermedia client.
//!
//! Wraps HAL documents as [`Representation`]s and resolves their relations:
//! - `Representation` - properties, links and embedded resources behind one
//!   relation-keyed API
//! - `RepresentationSet` - ordered result of every relation lookup
//! - `NamespaceResolver` - CURIE prefixes, in both directions
//! - `UriTemplate` - RFC 6570 expansion for templated links
//! - `HalTransport` - the async seam every link fetch and POST goes through
//!
//! # Architecture
//!
//! ```text
//! HalClient ──get(url)──► HalTransport ──► Representation
//!                                            ├── properties
//!                                            ├── _embedded ──► child Representations (no I/O)
//!                                            └── _links ─────► HalTransport::get ──► Representation
//! ```
//!
//! # Example
//!
//! ```
//! use hal_client::Representation;
//!
//! let repr = Representation::parse(r#"{
//!     "total": 2,
//!     "_links": {
//!         "self": { "href": "http://example.com/orders" },
//!         "next": { "href": "http://example.com/orders?page=2" }
//!     }
//! }"#).unwrap();
//!
//! assert_eq!(repr.href(), Some("http://example.com/orders"));
//! assert_eq!(repr.property("total").unwrap(), 2);
//! assert_eq!(repr.related_hrefs("next").unwrap(), ["http://example.com/orders?page=2"]);
//! ```

pub mod client;
pub mod curie;
mod error;
pub mod link;
pub mod representation;
mod representation_set;
pub mod transport;
pub mod uri_template;

// Re-exports
pub use client::HalClient;
pub use curie::NamespaceResolver;
pub use error::{json_pointer, HalError, InvalidRepresentation, Result};
pub use link::{Curie, Link};
pub use representation::{Fetched, Representation};
pub use representation_set::RepresentationSet;
pub use transport::{
    HalTransport, Headers, HttpTransport, HttpTransportConfig, PostResponse, HAL_JSON,
};
pub use uri_template::{TemplateError, TemplateParams, UriTemplate};
