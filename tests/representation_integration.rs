//! Relation resolution against an in-memory transport.

mod common;

use common::{identity, sample_document, MockTransport};
use hal_client::{Fetched, HalClient, HalError, Headers, Representation, TemplateParams, HAL_JSON};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

fn with_transport(doc: Value) -> (Representation, Arc<MockTransport>) {
    let transport = MockTransport::new();
    let repr = Representation::from_json(doc)
        .unwrap()
        .with_transport(transport.clone());
    (repr, transport)
}

fn params(value: Value) -> TemplateParams {
    value.as_object().cloned().unwrap()
}

// ── related ──────────────────────────────────────────────────────

#[tokio::test]
async fn related_singleton_link() {
    let (repr, transport) = with_transport(sample_document());

    let set = repr.related("link1").await.unwrap();
    assert_eq!(set.len(), 1);
    assert!(set.contains_href("http://example.com/bar"));
    assert!(set[0].is_fetched());
    assert_eq!(transport.gets(), ["http://example.com/bar"]);
}

#[tokio::test]
async fn related_compound_link_keeps_order() {
    let (repr, transport) = with_transport(sample_document());

    let set = repr.related("link3").await.unwrap();
    assert_eq!(
        set.hrefs(),
        ["http://example.com/link3-a", "http://example.com/link3-b"]
    );
    assert_eq!(
        transport.gets(),
        ["http://example.com/link3-a", "http://example.com/link3-b"]
    );
}

#[tokio::test]
async fn related_templated_link_expands_params() {
    let (repr, transport) = with_transport(sample_document());

    let set = repr
        .related_with("link2", &params(json!({ "name": "bob" })))
        .await
        .unwrap();
    assert_eq!(set.len(), 1);
    assert!(set.contains_href("http://example.com/people?name=bob"));
    assert_eq!(transport.gets(), ["http://example.com/people?name=bob"]);
}

#[tokio::test]
async fn related_templated_link_elides_missing_params() {
    let (repr, transport) = with_transport(sample_document());

    repr.related("link2").await.unwrap();
    assert_eq!(transport.gets(), ["http://example.com/people"]);
}

#[tokio::test]
async fn related_embedded_needs_no_transport_call() {
    let (repr, transport) = with_transport(sample_document());

    let set = repr.related("embed1").await.unwrap();
    assert_eq!(set.hrefs(), ["http://example.com/baz"]);
    assert!(transport.gets().is_empty());
}

#[tokio::test]
async fn related_embedded_array_keeps_document_order() {
    let (repr, transport) = with_transport(json!({
        "_embedded": {
            "items": [
                { "_links": { "self": { "href": "http://example.com/items/1" } } },
                { "_links": { "self": { "href": "http://example.com/items/2" } } },
                { "_links": { "self": { "href": "http://example.com/items/3" } } }
            ]
        }
    }));

    let expected = [
        "http://example.com/items/1",
        "http://example.com/items/2",
        "http://example.com/items/3",
    ];
    let set = repr.related("items").await.unwrap();
    assert_eq!(set.hrefs(), expected);
    assert_eq!(repr.related_hrefs("items").unwrap(), expected);
    assert!(set.iter().all(Representation::is_fetched));
    assert!(transport.gets().is_empty());
}

#[tokio::test]
async fn relative_link_is_fetched_against_self() {
    let (repr, transport) = with_transport(json!({
        "_links": {
            "self": { "href": "http://example.com/orders/1" },
            "next": { "href": "/orders/2" }
        }
    }));

    let next = repr.related("next").await.unwrap();
    assert_eq!(next.hrefs(), ["http://example.com/orders/2"]);
    assert_eq!(transport.gets(), ["http://example.com/orders/2"]);
}

#[tokio::test]
async fn embedded_children_inherit_transport() {
    let (repr, transport) = with_transport(json!({
        "_embedded": {
            "order": {
                "_links": {
                    "self": { "href": "http://example.com/orders/1" },
                    "customer": { "href": "http://example.com/customers/7" }
                }
            }
        }
    }));

    let order = repr.related("order").await.unwrap();
    let customer = order[0].related("customer").await.unwrap();
    assert_eq!(customer.hrefs(), ["http://example.com/customers/7"]);
    assert_eq!(transport.gets(), ["http://example.com/customers/7"]);
}

#[tokio::test]
async fn related_unknown_is_not_found() {
    let (repr, transport) = with_transport(sample_document());

    let err = repr.related("wat").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(transport.gets().is_empty());
}

#[tokio::test]
async fn each_related_call_fetches_again() {
    let (repr, transport) = with_transport(sample_document());

    repr.related("link1").await.unwrap();
    repr.related("link1").await.unwrap();
    assert_eq!(transport.gets().len(), 2);
}

#[tokio::test]
async fn fetched_targets_expose_their_body() {
    let (repr, transport) = with_transport(sample_document());
    transport.stub(
        "http://example.com/bar",
        json!({ "name": "Bar", "_links": { "self": { "href": "http://example.com/bar" } } }),
    );

    let set = repr.related("link1").await.unwrap();
    assert_eq!(set[0].property("name").unwrap(), "Bar");
}

#[tokio::test]
async fn fetched_target_without_self_takes_fetched_uri() {
    let (repr, transport) = with_transport(sample_document());
    transport.stub("http://example.com/bar", json!({ "name": "Bar" }));

    let set = repr.related("link1").await.unwrap();
    assert_eq!(set[0].href(), Some("http://example.com/bar"));
}

#[tokio::test]
async fn fetched_non_object_is_invalid() {
    let (repr, transport) = with_transport(sample_document());
    transport.stub("http://example.com/bar", json!(["not", "hal"]));

    let err = repr.related("link1").await.unwrap_err();
    assert_eq!(err.pointer(), Some(""));
}

#[tokio::test]
async fn transport_errors_propagate() {
    let (repr, transport) = with_transport(sample_document());
    transport.fail("http://example.com/link3-b");

    let err = repr.related("link3").await.unwrap_err();
    assert!(matches!(err, HalError::Transport(_)));
    assert_eq!(
        transport.gets(),
        ["http://example.com/link3-a", "http://example.com/link3-b"]
    );
}

// ── malformed shapes ─────────────────────────────────────────────

fn malformed_document() -> Value {
    json!({
        "_links": {
            "self": { "href": "http://example.com/foo" },
            "bare_url": "http://example.com/bar"
        },
        "_embedded": {
            "atom": "hello",
            "array-of-atoms": [1, 2, 3]
        }
    })
}

#[tokio::test]
async fn bare_url_link_is_invalid() {
    let (repr, transport) = with_transport(malformed_document());

    let err = repr.related("bare_url").await.unwrap_err();
    assert_eq!(err.pointer(), Some("/_links/bare_url"));
    assert!(err.to_string().contains("/_links/bare_url"));
    assert!(transport.gets().is_empty());
}

#[tokio::test]
async fn atom_embedded_is_invalid() {
    let (repr, _) = with_transport(malformed_document());

    let err = repr.related("atom").await.unwrap_err();
    assert_eq!(err.pointer(), Some("/_embedded/atom"));
}

#[tokio::test]
async fn array_of_atoms_embedded_is_invalid() {
    let (repr, _) = with_transport(malformed_document());

    let err = repr.related("array-of-atoms").await.unwrap_err();
    assert_eq!(err.pointer(), Some("/_embedded/array-of-atoms"));
}

// ── fetch ────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_property() {
    let (repr, _) = with_transport(sample_document());

    let found = repr.fetch("prop1").await.unwrap();
    assert_eq!(found.as_value(), Some(&json!(1)));
}

#[tokio::test]
async fn fetch_link() {
    let (repr, _) = with_transport(sample_document());

    let set = repr.fetch("link1").await.unwrap().into_related().unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set[0].href(), Some("http://example.com/bar"));
}

#[tokio::test]
async fn fetch_embedded() {
    let (repr, _) = with_transport(sample_document());

    let set = repr.fetch("embed1").await.unwrap().into_related().unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set[0].href(), Some("http://example.com/baz"));
}

#[tokio::test]
async fn fetch_missing_without_default() {
    let (repr, _) = with_transport(sample_document());

    assert!(repr.fetch("wat").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn fetch_missing_with_default_value() {
    let (repr, _) = with_transport(sample_document());

    let found = repr.fetch_or("wat", "whatevs").await.unwrap();
    assert!(matches!(&found, Fetched::Default(_)));
    assert_eq!(found.as_value(), Some(&json!("whatevs")));
}

#[tokio::test]
async fn fetch_missing_with_generator() {
    let (repr, _) = with_transport(sample_document());

    let found = repr
        .fetch_or_else("wat", |key| json!(format!("{key}gen")))
        .await
        .unwrap();
    assert_eq!(found.as_value(), Some(&json!("watgen")));
}

#[tokio::test]
async fn fetch_default_does_not_mask_invalid_shapes() {
    let (repr, _) = with_transport(malformed_document());

    let err = repr.fetch_or("bare_url", "fallback").await.unwrap_err();
    assert_eq!(err.pointer(), Some("/_links/bare_url"));
}

#[tokio::test]
async fn fetch_default_does_not_mask_transport_errors() {
    let (repr, transport) = with_transport(sample_document());
    transport.fail("http://example.com/bar");

    let err = repr.fetch_or_else("link1", |_| json!(null)).await.unwrap_err();
    assert!(matches!(err, HalError::Transport(_)));
}

// ── indexed get ──────────────────────────────────────────────────

#[tokio::test]
async fn get_link_and_embedded() {
    let (repr, _) = with_transport(sample_document());

    let link = repr.get("link1").await.unwrap();
    assert!(link.contains_href("http://example.com/bar"));

    let embedded = repr.get("embed1").await.unwrap();
    assert!(embedded.contains_href("http://example.com/baz"));
}

#[tokio::test]
async fn get_never_fails() {
    let (repr, _) = with_transport(sample_document());
    assert!(repr.get("wat").await.is_none());
    assert!(repr.get("prop1").await.is_none());

    let (bad, _) = with_transport(malformed_document());
    assert!(bad.get("bare_url").await.is_none());
    assert!(bad.get("atom").await.is_none());
}

// ── CURIEs ───────────────────────────────────────────────────────

#[tokio::test]
async fn curie_link_by_full_uri() {
    let (repr, transport) = with_transport(json!({
        "_links": {
            "self": { "href": "http://example.com/foo" },
            "ex:bar": { "href": "http://example.com/bar" },
            "curies": [{ "name": "ex", "href": "http://example.com/rels/{rel}", "templated": true }]
        }
    }));

    let by_uri = repr.related("http://example.com/rels/bar").await.unwrap();
    let by_curie = repr.related("ex:bar").await.unwrap();
    assert_eq!(by_uri.hrefs(), by_curie.hrefs());
    assert!(by_uri.contains_href("http://example.com/bar"));

    let indexed = repr.get("http://example.com/rels/bar").await.unwrap();
    assert!(indexed.contains_href("http://example.com/bar"));

    assert_eq!(
        repr.related_hrefs("http://example.com/rels/bar").unwrap(),
        ["http://example.com/bar"]
    );
    assert_eq!(transport.gets().len(), 3);
}

#[tokio::test]
async fn curie_embedded_by_full_uri() {
    let (repr, transport) = with_transport(json!({
        "_links": {
            "self": { "href": "http://example.com/foo" },
            "curies": { "name": "ex", "href": "http://example.com/rels/{rel}", "templated": true }
        },
        "_embedded": {
            "ex:embed1": { "_links": { "self": { "href": "http://example.com/embed1" } } }
        }
    }));

    let related = repr.related("http://example.com/rels/embed1").await.unwrap();
    assert!(related.contains_href("http://example.com/embed1"));

    let indexed = repr.get("http://example.com/rels/embed1").await.unwrap();
    assert!(indexed.contains_href("http://example.com/embed1"));

    assert_eq!(
        repr.related_hrefs("http://example.com/rels/embed1").unwrap(),
        ["http://example.com/embed1"]
    );
    assert!(transport.gets().is_empty());
}

#[tokio::test]
async fn curies_are_not_a_relation() {
    let (repr, _) = with_transport(json!({
        "_links": {
            "curies": [{ "name": "ex", "href": "http://example.com/rels/{rel}", "templated": true }]
        }
    }));

    assert!(repr.related("curies").await.unwrap_err().is_not_found());
    assert!(!repr.has_related("curies"));
}

// ── post ─────────────────────────────────────────────────────────

#[tokio::test]
async fn post_to_related_resource() {
    let (repr, transport) = with_transport(sample_document());

    let bar = repr.related("link1").await.unwrap();
    let response = bar[0].post("abc", &Headers::new()).await.unwrap();
    assert_eq!(response.status, 201);

    let posts = transport.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].uri, "http://example.com/bar");
    assert_eq!(posts[0].body, "abc");
    assert_eq!(
        posts[0].headers.get("Content-Type").map(String::as_str),
        Some(HAL_JSON)
    );
}

#[tokio::test]
async fn post_on_single_valued_relation() {
    let (repr, transport) = with_transport(sample_document());

    repr.related("link1")
        .await
        .unwrap()
        .post("abc", &Headers::new())
        .await
        .unwrap();

    let posts = transport.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].uri, "http://example.com/bar");
    assert_eq!(posts[0].body, "abc");
}

#[tokio::test]
async fn post_on_multi_valued_relation_is_refused() {
    let (repr, transport) = with_transport(sample_document());

    let set = repr.related("link3").await.unwrap();
    assert!(matches!(
        set.post("abc", &Headers::new()).await,
        Err(HalError::NotSingular(2))
    ));
    assert!(transport.posts().is_empty());
}

#[tokio::test]
async fn post_keeps_caller_headers() {
    let (repr, transport) = with_transport(sample_document());

    let mut headers = Headers::new();
    headers.insert("content-type".into(), "application/json".into());
    headers.insert("X-Request-Id".into(), "42".into());
    repr.post(r#"{"a":1}"#, &headers).await.unwrap();

    let posts = transport.posts();
    assert_eq!(posts[0].uri, "http://example.com/foo");
    assert_eq!(posts[0].headers, headers);
}

#[tokio::test]
async fn post_without_self_link() {
    let (repr, transport) = with_transport(json!({ "a": 1 }));

    assert!(matches!(
        repr.post("abc", &Headers::new()).await,
        Err(HalError::MissingSelf)
    ));
    assert!(transport.posts().is_empty());
}

// ── without transport ────────────────────────────────────────────

fn without_transport() -> Representation {
    Representation::from_json(json!({
        "prop1": 1,
        "_links": {
            "self": { "href": "http://example.com/foo" },
            "link1": { "href": "http://example.com/bar" }
        },
        "_embedded": {
            "embed1": { "_links": { "self": { "href": "http://example.com/baz" } } }
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn no_transport_href_and_related_hrefs() {
    let repr = without_transport();
    assert_eq!(repr.href(), Some("http://example.com/foo"));
    assert_eq!(repr.related_hrefs("link1").unwrap(), ["http://example.com/bar"]);
}

#[tokio::test]
async fn no_transport_link_targets_are_unfetched() {
    let repr = without_transport();

    let set = repr.related("link1").await.unwrap();
    assert_eq!(set[0].href(), Some("http://example.com/bar"));
    assert!(!set[0].is_fetched());
    assert!(matches!(
        set[0].property("anything"),
        Err(HalError::NoTransport(_))
    ));
}

#[tokio::test]
async fn no_transport_embedded_still_resolves() {
    let repr = without_transport();

    let set = repr.related("embed1").await.unwrap();
    assert_eq!(set[0].href(), Some("http://example.com/baz"));
    assert!(set[0].is_fetched());
}

#[tokio::test]
async fn no_transport_post_fails() {
    let repr = without_transport();
    assert!(matches!(
        repr.post("abc", &Headers::new()).await,
        Err(HalError::NoTransport(_))
    ));
}

// ── HalClient ────────────────────────────────────────────────────

#[tokio::test]
async fn client_get_wraps_entry_point() {
    let transport = MockTransport::new();
    transport.stub("http://example.com/foo", sample_document());
    let client = HalClient::from_arc(transport.clone());

    let root = client.get("http://example.com/foo").await.unwrap();
    assert_eq!(root.href(), Some("http://example.com/foo"));

    let bar = root.related("link1").await.unwrap();
    assert_eq!(bar[0].href(), Some("http://example.com/bar"));
    assert_eq!(
        transport.gets(),
        ["http://example.com/foo", "http://example.com/bar"]
    );
}

#[tokio::test]
async fn client_post_sets_hal_content_type() {
    let transport = MockTransport::new();
    let client = HalClient::from_arc(transport.clone());

    client
        .post("http://example.com/orders", "{}", &Headers::new())
        .await
        .unwrap();

    let posts = transport.posts();
    assert_eq!(posts[0].uri, "http://example.com/orders");
    assert_eq!(
        posts[0].headers.get("Content-Type").map(String::as_str),
        Some(HAL_JSON)
    );
}

#[tokio::test]
async fn client_rejects_relative_url() {
    let client = HalClient::from_arc(MockTransport::new());
    assert!(client.get("/relative").await.is_err());
}

#[test]
fn identity_document_shape() {
    let repr = Representation::from_json(identity("http://example.com/x")).unwrap();
    assert_eq!(repr.to_string(), "Representation(<http://example.com/x>)");
}
