//! NetBox client tests
//!
//! The client runs against an in-process axum server that mimics NetBox's
//! paginated REST envelopes.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use netbox_exporter::config::NetboxConfig;
use netbox_exporter::error::ExporterError;
use netbox_exporter::netbox::{InventorySource, NetboxClient};
use secrecy::SecretString;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct FakeNetbox {
    base: String,
    /// (path, authorization header, query) of every request received
    requests: Arc<Mutex<Vec<(String, String, HashMap<String, String>)>>>,
}

impl FakeNetbox {
    fn record(&self, path: &str, headers: &HeaderMap, query: &HashMap<String, String>) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.requests
            .lock()
            .unwrap()
            .push((path.to_string(), auth, query.clone()));
    }

    fn requests(&self) -> Vec<(String, String, HashMap<String, String>)> {
        self.requests.lock().unwrap().clone()
    }
}

async fn tenants(
    State(fake): State<FakeNetbox>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    fake.record("tenants", &headers, &query);

    // Two pages: the second is reached only through the `next` link
    if query.get("offset").map(String::as_str) == Some("1") {
        Json(json!({
            "count": 2,
            "next": null,
            "previous": format!("{}/api/tenancy/tenants/?limit=1", fake.base),
            "results": [{"id": 2, "name": "Globex", "slug": "globex"}]
        }))
        .into_response()
    } else {
        Json(json!({
            "count": 2,
            "next": format!("{}/api/tenancy/tenants/?limit=1&offset=1", fake.base),
            "previous": null,
            "results": [{"id": 1, "name": "Acme Corp", "slug": "acme"}]
        }))
        .into_response()
    }
}

async fn devices(
    State(fake): State<FakeNetbox>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    fake.record("devices", &headers, &query);

    Json(json!({
        "count": 1,
        "next": null,
        "results": [{
            "id": 7,
            "name": "srv-01",
            "site": {"name": "fra1"},
            "tenant": {"name": "Acme Corp", "slug": query.get("tenant").cloned().unwrap_or_default()},
            "role": {"name": "Server"},
            "device_type": {"model": "ProLiant DL380 Gen10"}
        }]
    }))
    .into_response()
}

async fn inventory_items(
    State(fake): State<FakeNetbox>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    fake.record("inventory", &headers, &query);

    Json(json!({
        "results": [
            {"name": "RAM Module", "description": "32GB DDR4"},
            {"name": "SSD", "description": null}
        ]
    }))
    .into_response()
}

async fn spawn(router: impl FnOnce(FakeNetbox) -> Router) -> (FakeNetbox, NetboxConfig) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local addr");

    let fake = FakeNetbox {
        base: format!("http://{}", addr),
        ..FakeNetbox::default()
    };
    let app = router(fake.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let config = NetboxConfig {
        address: addr.to_string(),
        token: Some(SecretString::from("test-token")),
        token_path: None,
        use_tls: false,
        verify_ssl: true,
        request_timeout_seconds: 5,
        device_role: "server".to_string(),
        tenant_page_size: 1,
        device_page_size: 50,
        inventory_page_size: 25,
        max_pages: 10,
        ignore_tenants: vec![],
    };

    (fake, config)
}

fn netbox_router(fake: FakeNetbox) -> Router {
    Router::new()
        .route("/api/tenancy/tenants/", get(tenants))
        .route("/api/dcim/devices/", get(devices))
        .route("/api/dcim/inventory-items/", get(inventory_items))
        .with_state(fake)
}

#[tokio::test]
async fn test_list_tenants_follows_next_links() {
    // Given: A NetBox serving tenants one per page
    let (fake, config) = spawn(netbox_router).await;
    let client = NetboxClient::new(&config).expect("Failed to build client");

    // When: Listing tenants
    let tenants = client.list_tenants().await.expect("list_tenants failed");

    // Then: Both pages are concatenated in order
    let slugs: Vec<&str> = tenants.iter().map(|t| t.slug.as_str()).collect();
    assert_eq!(slugs, vec!["acme", "globex"]);

    // And: Every request carried the token and the first one the page size
    let requests = fake.requests();
    assert_eq!(requests.len(), 2);
    for (_, auth, _) in &requests {
        assert_eq!(auth, "Token test-token");
    }
    assert_eq!(requests[0].2.get("limit").map(String::as_str), Some("1"));
    assert_eq!(requests[1].2.get("offset").map(String::as_str), Some("1"));
}

#[tokio::test]
async fn test_next_links_stay_on_configured_origin() {
    // Given: A second server that must never see a request
    let (other, _) = spawn(netbox_router).await;

    // And: A NetBox whose next link advertises that server over another scheme
    let other_base = other.base.clone();
    let (fake, config) = spawn(move |fake| {
        let foreign = other_base.replace("http://", "https://");
        Router::new()
            .route(
                "/api/tenancy/tenants/",
                get(
                    move |State(fake): State<FakeNetbox>,
                          headers: HeaderMap,
                          Query(query): Query<HashMap<String, String>>| {
                        let foreign = foreign.clone();
                        async move {
                            fake.record("tenants", &headers, &query);
                            let next = if query.contains_key("offset") {
                                None
                            } else {
                                Some(format!("{}/api/tenancy/tenants/?limit=1&offset=1", foreign))
                            };
                            Json(json!({
                                "count": 2,
                                "next": next,
                                "results": [{"name": "Acme Corp", "slug": "acme"}]
                            }))
                        }
                    },
                ),
            )
            .with_state(fake)
    })
    .await;
    let client = NetboxClient::new(&config).expect("Failed to build client");

    // When: Listing tenants
    let tenants = client.list_tenants().await.expect("list_tenants failed");

    // Then: The second page came from the configured NetBox with the token
    assert_eq!(tenants.len(), 2);
    let requests = fake.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].1, "Token test-token");
    assert_eq!(requests[1].2.get("offset").map(String::as_str), Some("1"));

    // And: The advertised host received nothing
    assert!(other.requests().is_empty());
}

#[tokio::test]
async fn test_list_devices_sends_filters() {
    let (fake, config) = spawn(netbox_router).await;
    let client = NetboxClient::new(&config).expect("Failed to build client");

    let devices = client
        .list_devices_for_tenant("acme & co")
        .await
        .expect("list_devices_for_tenant failed");

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, 7);
    assert_eq!(devices[0].site_name, "fra1");
    assert_eq!(devices[0].role, "Server");
    assert_eq!(devices[0].model, "ProLiant DL380 Gen10");

    // The slug reaches NetBox intact, so it was URL-encoded on the way
    let (_, _, query) = &fake.requests()[0];
    assert_eq!(query.get("tenant").map(String::as_str), Some("acme & co"));
    assert_eq!(query.get("role").map(String::as_str), Some("server"));
    assert_eq!(query.get("limit").map(String::as_str), Some("50"));
    assert_eq!(query.get("expand").map(String::as_str), Some("device_type"));
    assert_eq!(devices[0].tenant_slug, "acme & co");
}

#[tokio::test]
async fn test_list_inventory_items_by_device() {
    let (fake, config) = spawn(netbox_router).await;
    let client = NetboxClient::new(&config).expect("Failed to build client");

    let items = client
        .list_inventory_items(7)
        .await
        .expect("list_inventory_items failed");

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].description, "32GB DDR4");
    assert_eq!(items[1].description, "");

    let (_, _, query) = &fake.requests()[0];
    assert_eq!(query.get("device_id").map(String::as_str), Some("7"));
    assert_eq!(query.get("limit").map(String::as_str), Some("25"));
}

#[tokio::test]
async fn test_non_2xx_surfaces_status_and_body() {
    // Given: A NetBox rejecting the token
    let (_fake, config) = spawn(|fake| {
        Router::new()
            .route(
                "/api/tenancy/tenants/",
                get(|| async { (StatusCode::FORBIDDEN, r#"{"detail":"Invalid token"}"#) }),
            )
            .with_state(fake)
    })
    .await;
    let client = NetboxClient::new(&config).expect("Failed to build client");

    // When: Listing tenants
    let err = client.list_tenants().await.expect_err("403 should fail");

    // Then: The error carries status, endpoint and raw body
    match &err {
        ExporterError::Status {
            endpoint,
            status,
            body,
        } => {
            assert_eq!(*status, 403);
            assert!(endpoint.contains("/tenancy/tenants/"));
            assert!(body.contains("Invalid token"));
        }
        other => panic!("Expected status error, got {:?}", other),
    }
    assert!(err.is_fetch());
}

#[tokio::test]
async fn test_undecodable_body_is_decode_error() {
    let (_fake, config) = spawn(|fake| {
        Router::new()
            .route(
                "/api/dcim/inventory-items/",
                get(|| async { "<html>maintenance</html>" }),
            )
            .with_state(fake)
    })
    .await;
    let client = NetboxClient::new(&config).expect("Failed to build client");

    let err = client
        .list_inventory_items(1)
        .await
        .expect_err("HTML should fail to decode");

    match err {
        ExporterError::Decode { body, .. } => assert!(body.contains("maintenance")),
        other => panic!("Expected decode error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_endless_pagination_is_capped() {
    // Given: A NetBox whose `next` link always points back at itself
    let (_fake, mut config) = spawn(|fake| {
        Router::new()
            .route(
                "/api/tenancy/tenants/",
                get(|State(fake): State<FakeNetbox>| async move {
                    Json(json!({
                        "next": format!("{}/api/tenancy/tenants/?offset=1", fake.base),
                        "results": [{"name": "Loop", "slug": "loop"}]
                    }))
                }),
            )
            .with_state(fake)
    })
    .await;
    config.max_pages = 3;
    let client = NetboxClient::new(&config).expect("Failed to build client");

    // When: Listing tenants
    let err = client.list_tenants().await.expect_err("Loop should be capped");

    // Then: The call fails instead of returning a truncated list
    match err {
        ExporterError::Pagination { pages, .. } => assert_eq!(pages, 3),
        other => panic!("Expected pagination error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    // Given: A port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().expect("No local addr");
    drop(listener);

    let (_fake, mut config) = spawn(netbox_router).await;
    config.address = addr.to_string();
    let client = NetboxClient::new(&config).expect("Failed to build client");

    let err = client.list_tenants().await.expect_err("Connection should fail");

    assert!(matches!(err, ExporterError::Transport { .. }), "{:?}", err);
}

#[test]
fn test_base_url_follows_tls_setting() {
    let mut config = NetboxConfig {
        address: "netbox.example.com/".to_string(),
        token: Some(SecretString::from("t")),
        token_path: None,
        use_tls: true,
        verify_ssl: false,
        request_timeout_seconds: 5,
        device_role: "server".to_string(),
        tenant_page_size: 1,
        device_page_size: 1,
        inventory_page_size: 1,
        max_pages: 1,
        ignore_tenants: vec![],
    };

    let client = NetboxClient::new(&config).expect("Failed to build client");
    assert_eq!(client.base_url(), "https://netbox.example.com/api");

    config.use_tls = false;
    let client = NetboxClient::new(&config).expect("Failed to build client");
    assert_eq!(client.base_url(), "http://netbox.example.com/api");
}
