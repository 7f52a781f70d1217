//! Integration tests for book reconciliation against mock catalogs.
//!
//! Each test starts its own mock server standing in for both catalogs: the
//! primary catalog lives under `/books/v1`, the secondary at the root.

use pretty_assertions::assert_eq;
use serde_json::json;
use shelfwise::catalog::{GoogleBooks, OpenLibrary};
use shelfwise::reconcile::{
    BookReconciler, BookRequest, FetchStrategy, NormalizedBookMetadata, RawSourceRecord,
    SourceTier,
};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COVERS: &str = "https://covers.example.org";

fn reconciler(
    server: &MockServer,
    strategy: FetchStrategy,
) -> BookReconciler<GoogleBooks, OpenLibrary> {
    let client = reqwest::Client::new();
    let timeout = Duration::from_secs(2);
    BookReconciler::new(
        GoogleBooks::new(
            client.clone(),
            format!("{}/books/v1", server.uri()),
            None,
            timeout,
        ),
        OpenLibrary::new(client, server.uri(), COVERS, timeout),
        COVERS,
    )
    .with_strategy(strategy)
}

async fn mount_primary(server: &MockServer, body: serde_json::Value, delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/books/v1/volumes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay))
        .mount(server)
        .await;
}

async fn mount_secondary(server: &MockServer, body: serde_json::Value, delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay))
        .mount(server)
        .await;
}

fn volume(info: serde_json::Value) -> serde_json::Value {
    json!({ "totalItems": 1, "items": [{ "volumeInfo": info }] })
}

fn docs(doc: serde_json::Value) -> serde_json::Value {
    json!({ "numFound": 1, "docs": [doc] })
}

// ============================================================================
// Field-level merge
// ============================================================================

#[tokio::test]
async fn test_fields_merge_independently_across_catalogs() {
    let server = MockServer::start().await;
    mount_primary(
        &server,
        volume(json!({ "title": "X", "description": "", "authors": ["A"] })),
        Duration::ZERO,
    )
    .await;
    mount_secondary(
        &server,
        docs(json!({ "title": "Y", "description": "Z", "author_name": ["B"] })),
        Duration::ZERO,
    )
    .await;

    let book = reconciler(&server, FetchStrategy::Sequential)
        .lookup(&BookRequest::new("some free text"))
        .await;
    assert_eq!(book.title, "X");
    assert_eq!(book.description, "Z");
    assert_eq!(book.authors, vec!["A"]);
}

#[tokio::test]
async fn test_isbn_query_uses_identifier_keyed_secondary_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/books/v1/volumes"))
        .and(query_param("q", "isbn:9780140445688"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "totalItems": 0 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .and(query_param("isbn", "9780140445688"))
        .respond_with(ResponseTemplate::new(200).set_body_json(docs(json!({
            "title": "Capital",
            "description": "Volume one.",
            "author_name": ["Karl Marx"]
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let book = reconciler(&server, FetchStrategy::Sequential)
        .lookup(&BookRequest::new("978-0-14-044568-8"))
        .await;
    assert_eq!(book.title, "Capital");
    assert_eq!(book.isbn13.as_deref(), Some("9780140445688"));
}

#[tokio::test]
async fn test_complete_primary_skips_secondary() {
    let server = MockServer::start().await;
    mount_primary(
        &server,
        volume(json!({ "title": "T", "description": "D", "authors": ["A"] })),
        Duration::ZERO,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(docs(json!({ "title": "Y" }))))
        .expect(0)
        .mount(&server)
        .await;

    let book = reconciler(&server, FetchStrategy::Sequential)
        .lookup(&BookRequest::new("t"))
        .await;
    assert_eq!(book.title, "T");
}

// ============================================================================
// Thumbnails
// ============================================================================

#[tokio::test]
async fn test_primary_low_res_thumbnail_beats_secondary_cover() {
    let server = MockServer::start().await;
    mount_primary(
        &server,
        volume(json!({
            "title": "T",
            "imageLinks": { "smallThumbnail": "http://books.example.com/tiny.jpg" }
        })),
        Duration::ZERO,
    )
    .await;
    mount_secondary(
        &server,
        docs(json!({ "title": "T", "description": "D", "cover_i": 12345 })),
        Duration::ZERO,
    )
    .await;

    let book = reconciler(&server, FetchStrategy::Sequential)
        .lookup(&BookRequest::new("t"))
        .await;
    assert_eq!(
        book.thumbnail_url.as_deref(),
        Some("https://books.example.com/tiny.jpg")
    );
}

#[tokio::test]
async fn test_secondary_cover_id_used_without_primary_image() {
    let server = MockServer::start().await;
    mount_primary(&server, json!({ "totalItems": 0 }), Duration::ZERO).await;
    mount_secondary(
        &server,
        docs(json!({ "title": "T", "cover_i": 12345 })),
        Duration::ZERO,
    )
    .await;

    let book = reconciler(&server, FetchStrategy::Sequential)
        .lookup(&BookRequest::new("t"))
        .await;
    assert_eq!(
        book.thumbnail_url.as_deref(),
        Some("https://covers.example.org/b/id/12345-L.jpg")
    );
}

// ============================================================================
// Degraded sources
// ============================================================================

#[tokio::test]
async fn test_all_sources_down_keeps_manual_fields_and_query_isbn() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut manual = RawSourceRecord::new(SourceTier::Manual);
    manual.title = Some("My Copy".into());
    manual.authors = vec!["Someone".into()];

    let book = reconciler(&server, FetchStrategy::Concurrent)
        .lookup(&BookRequest::new("9780140445688").with_manual(manual))
        .await;

    assert_eq!(
        book,
        NormalizedBookMetadata {
            title: "My Copy".into(),
            authors: vec!["Someone".into()],
            isbn13: Some("9780140445688".into()),
            thumbnail_url: Some("https://covers.example.org/b/isbn/9780140445688-L.jpg".into()),
            ..NormalizedBookMetadata::default()
        }
    );
}

#[tokio::test]
async fn test_slow_primary_times_out_and_secondary_still_counts() {
    let server = MockServer::start().await;
    mount_primary(
        &server,
        volume(json!({ "title": "Too late" })),
        Duration::from_secs(5),
    )
    .await;
    mount_secondary(
        &server,
        docs(json!({ "title": "On time", "description": "D" })),
        Duration::ZERO,
    )
    .await;

    let book = reconciler(&server, FetchStrategy::Concurrent)
        .lookup(&BookRequest::new("t"))
        .await;
    assert_eq!(book.title, "On time");
}

// ============================================================================
// Nested description fallback
// ============================================================================

#[tokio::test]
async fn test_editions_searched_in_order_until_description_found() {
    let server = MockServer::start().await;
    mount_primary(&server, json!({ "totalItems": 0 }), Duration::ZERO).await;
    mount_secondary(
        &server,
        docs(json!({
            "key": "/works/OL1W",
            "title": "Grundrisse",
            "edition_key": ["OL1M", "OL2M", "OL3M", "OL4M"]
        })),
        Duration::ZERO,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/books/OL1M.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Grundrisse",
            "number_of_pages": 900
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/books/OL2M.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "description": { "type": "/type/text", "value": "Notebooks of 1857-58." },
            "number_of_pages": 400,
            "publishers": ["Vintage"]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/books/OL3M.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/works/OL1W.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let book = reconciler(&server, FetchStrategy::Sequential)
        .lookup(&BookRequest::new("grundrisse"))
        .await;
    assert_eq!(book.description, "Notebooks of 1857-58.");
    // First edition to offer a page count wins
    assert_eq!(book.page_count, Some(900));
    assert_eq!(book.publisher.as_deref(), Some("Vintage"));
}

#[tokio::test]
async fn test_work_record_is_last_resort() {
    let server = MockServer::start().await;
    mount_primary(&server, json!({ "totalItems": 0 }), Duration::ZERO).await;
    mount_secondary(
        &server,
        docs(json!({
            "key": "/works/OL9W",
            "title": "Wage Labour and Capital",
            "edition_key": ["OL5M"]
        })),
        Duration::ZERO,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/books/OL5M.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/works/OL9W.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "description": "Lectures to German workers.",
            "subjects": ["Economics", "Labor", "Capital", "Wages", "Marxism", "Socialism"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let book = reconciler(&server, FetchStrategy::Sequential)
        .lookup(&BookRequest::new("wage labour"))
        .await;
    assert_eq!(book.description, "Lectures to German workers.");
    assert_eq!(book.categories.len(), 5);
}

#[tokio::test]
async fn test_edition_identity_fields_never_reach_output() {
    let server = MockServer::start().await;
    mount_primary(&server, json!({ "totalItems": 0 }), Duration::ZERO).await;
    mount_secondary(
        &server,
        docs(json!({ "key": "/works/OL7W", "edition_key": ["OL1M"] })),
        Duration::ZERO,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/books/OL1M.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Edition Title",
            "isbn_13": ["9780140445688"]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/works/OL7W.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "title": "Work Title" })))
        .mount(&server)
        .await;

    let book = reconciler(&server, FetchStrategy::Sequential)
        .lookup(&BookRequest::new("some title"))
        .await;
    assert_eq!(book.title, "");
    assert_eq!(book.isbn13, None);
    assert_eq!(book.thumbnail_url, None);
}

// ============================================================================
// Strategy equivalence
// ============================================================================

#[tokio::test]
async fn test_concurrent_matches_sequential_under_varied_latency() {
    let latencies = [
        (Duration::ZERO, Duration::ZERO),
        (Duration::from_millis(150), Duration::ZERO),
        (Duration::ZERO, Duration::from_millis(150)),
        (Duration::from_millis(60), Duration::from_millis(30)),
    ];
    let primaries = [
        // Complete: secondary must not leak in
        volume(json!({ "title": "P", "description": "PD", "authors": ["PA"] })),
        // Incomplete: secondary fills the gaps
        volume(json!({ "title": "P", "authors": ["PA"] })),
    ];

    for primary in &primaries {
        for (primary_delay, secondary_delay) in latencies {
            let server = MockServer::start().await;
            mount_primary(&server, primary.clone(), primary_delay).await;
            mount_secondary(
                &server,
                docs(json!({
                    "title": "S",
                    "description": "SD",
                    "author_name": ["SA"],
                    "publisher": ["SP"],
                    "cover_i": 7
                })),
                secondary_delay,
            )
            .await;

            let request = BookRequest::new("9780140445688");
            let sequential = reconciler(&server, FetchStrategy::Sequential)
                .lookup(&request)
                .await;
            let concurrent = reconciler(&server, FetchStrategy::Concurrent)
                .lookup(&request)
                .await;
            assert_eq!(sequential, concurrent);
        }
    }
}
