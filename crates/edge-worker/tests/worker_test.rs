use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use http::header::{HeaderValue, SET_COOKIE};
use http::{Method, StatusCode};

use edge_cache::{CacheStore, InMemoryStore, KeyNormalizer};
use edge_core::{EdgeCacheConfig, EdgeRequest, EdgeResponse};
use edge_data::{FetchError, OriginFetch, PurgeProvider, ZoneId};
use edge_worker::EdgeWorker;

const ZONE: &str = "deadbeefdeadbeefdeadbeefdeadbeef";

#[derive(Default)]
struct CountingOrigin {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl OriginFetch for CountingOrigin {
    async fn fetch(&self, request: &EdgeRequest) -> Result<EdgeResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FetchError::Connection("10.0.0.5:443 refused".to_string()));
        }
        Ok(EdgeResponse::html(StatusCode::OK, format!("<p>{}</p>", request.url.path()))
            .with_header(SET_COOKIE, HeaderValue::from_static("session=abc")))
    }
}

#[derive(Default)]
struct RecordingProvider {
    calls: Mutex<Vec<(String, Option<String>)>>,
    status: Option<StatusCode>,
    fail: bool,
}

#[async_trait]
impl PurgeProvider for RecordingProvider {
    async fn purge_everything(
        &self,
        zone: &ZoneId,
        credential: Option<&str>,
    ) -> Result<EdgeResponse, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((zone.to_string(), credential.map(str::to_string)));
        if self.fail {
            return Err(FetchError::Timeout("api.provider.test:443 timed out".to_string()));
        }
        let status = self.status.unwrap_or(StatusCode::OK);
        Ok(EdgeResponse::new(status)
            .with_header(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )
            .with_body(r#"{"success":true}"#))
    }
}

struct Harness {
    worker: EdgeWorker,
    store: Arc<InMemoryStore>,
    origin: Arc<CountingOrigin>,
    provider: Arc<RecordingProvider>,
}

fn harness_with(config: EdgeCacheConfig, origin: CountingOrigin, provider: RecordingProvider) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let origin = Arc::new(origin);
    let provider = Arc::new(provider);
    let worker = EdgeWorker::new(
        Arc::new(config),
        store.clone(),
        origin.clone(),
        provider.clone(),
    )
    .unwrap();
    Harness {
        worker,
        store,
        origin,
        provider,
    }
}

fn harness() -> Harness {
    harness_with(
        EdgeCacheConfig::default(),
        CountingOrigin::default(),
        RecordingProvider::default(),
    )
}

fn request(method: Method, url: &str) -> EdgeRequest {
    EdgeRequest::parse(method, url).unwrap()
}

#[tokio::test]
async fn test_purge_makes_exactly_one_call() {
    let h = harness();
    let req = request(
        Method::POST,
        &format!("https://shop.test/anything?__purge_cache={}", ZONE),
    )
    .with_header("Authorization", "secret-token")
    .unwrap();

    let resp = h.worker.handle(req).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body_text(), r#"{"success":true}"#);
    assert_eq!(resp.header("x-edge-cache"), Some("PURGE"));

    let calls = h.provider.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![(ZONE.to_string(), Some("secret-token".to_string()))]
    );
    assert_eq!(h.origin.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_zone_makes_no_call() {
    let h = harness();
    let req = request(Method::POST, "https://shop.test/anything?__purge_cache=short");

    let resp = h.worker.handle(req).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body_text(), "Invalid Zone ID");
    assert!(h.provider.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_zone_legacy_status() {
    let mut config = EdgeCacheConfig::default();
    config.response.legacy_error_status = true;
    let h = harness_with(config, CountingOrigin::default(), RecordingProvider::default());

    let resp = h
        .worker
        .handle(request(Method::POST, "https://shop.test/?__purge_cache=short"))
        .await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.body_text(), "Invalid Zone ID");
}

#[tokio::test]
async fn test_successful_purge_clears_store() {
    let h = harness();
    h.worker
        .handle(request(Method::GET, "https://shop.test/product"))
        .await;
    h.worker.tasks().drain().await;
    assert_eq!(h.store.len().await, 1);

    h.worker
        .handle(request(
            Method::POST,
            &format!("https://shop.test/?__purge_cache={}", ZONE),
        ))
        .await;
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn test_rejected_purge_is_relayed_and_keeps_store() {
    let provider = RecordingProvider {
        status: Some(StatusCode::FORBIDDEN),
        ..RecordingProvider::default()
    };
    let h = harness_with(EdgeCacheConfig::default(), CountingOrigin::default(), provider);
    h.worker
        .handle(request(Method::GET, "https://shop.test/product"))
        .await;
    h.worker.tasks().drain().await;

    let resp = h
        .worker
        .handle(request(
            Method::POST,
            &format!("https://shop.test/?__purge_cache={}", ZONE),
        ))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test]
async fn test_purge_transport_failure_is_generic() {
    let provider = RecordingProvider {
        fail: true,
        ..RecordingProvider::default()
    };
    let h = harness_with(EdgeCacheConfig::default(), CountingOrigin::default(), provider);
    h.worker
        .handle(request(Method::GET, "https://shop.test/product"))
        .await;
    h.worker.tasks().drain().await;

    let resp = h
        .worker
        .handle(request(
            Method::POST,
            &format!("https://shop.test/?__purge_cache={}", ZONE),
        ))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_GATEWAY);
    assert_eq!(resp.body_text(), "Origin unavailable");
    assert!(!resp.body_text().contains("api.provider.test"));
    assert_eq!(resp.header("x-edge-cache"), Some("ERROR"));
    assert_eq!(h.provider.calls.lock().unwrap().len(), 1);
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test]
async fn test_purge_transport_failure_legacy_status() {
    let mut config = EdgeCacheConfig::default();
    config.response.legacy_error_status = true;
    let provider = RecordingProvider {
        fail: true,
        ..RecordingProvider::default()
    };
    let h = harness_with(config, CountingOrigin::default(), provider);

    let resp = h
        .worker
        .handle(request(
            Method::POST,
            &format!("https://shop.test/?__purge_cache={}", ZONE),
        ))
        .await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.body_text(), "Origin unavailable");
}

#[tokio::test]
async fn test_nuxt_assets_never_cached() {
    let h = harness();
    let resp = h
        .worker
        .handle(request(Method::GET, "https://shop.test/_nuxt/entry.js"))
        .await;
    assert_eq!(resp.header("x-edge-cache"), Some("BYPASS"));
    // Bypassed responses are passed through untouched.
    assert_eq!(resp.header("set-cookie"), Some("session=abc"));

    h.worker.tasks().drain().await;
    assert!(h.store.is_empty().await);
    assert_eq!(h.worker.metrics().snapshot().bypasses, 1);
}

#[tokio::test]
async fn test_post_bypasses_cache() {
    let h = harness();
    let req = request(Method::POST, "https://shop.test/cart").with_body("item=1");
    let resp = h.worker.handle(req).await;
    assert_eq!(resp.header("x-edge-cache"), Some("BYPASS"));
    h.worker.tasks().drain().await;
    assert!(h.store.is_empty().await);
    assert_eq!(h.origin.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_bypass_cookie_among_others() {
    let h = harness();
    let req = request(Method::GET, "https://shop.test/account")
        .with_header("Cookie", "theme=dark; no_worker_cache=true; lang=en")
        .unwrap();
    let resp = h.worker.handle(req).await;
    assert_eq!(resp.header("x-edge-cache"), Some("BYPASS"));
}

#[tokio::test]
async fn test_stored_copy_has_directives_and_no_cookie() {
    let h = harness();
    let req = request(Method::GET, "https://shop.test/product?color=red");
    let resp = h.worker.handle(req.clone()).await;
    assert_eq!(resp.header("x-edge-cache"), Some("MISS"));
    // The client copy is decorated too.
    assert!(resp.header("set-cookie").is_none());

    h.worker.tasks().drain().await;
    let key = h.worker.orchestrator().normalizer().normalize(&req);
    let entry = h.store.peek(&key).await.unwrap();
    assert!(entry.response.header("set-cookie").is_none());
    assert_eq!(
        entry.response.header("cache-control"),
        Some("max-age=300, stale-while-revalidate=45, stale-if-error=3600")
    );
}

#[tokio::test]
async fn test_tracking_params_hit_same_entry() {
    let h = harness();
    let ua = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148";
    let plain = request(Method::GET, "https://shop.test/product?color=red")
        .with_header("User-Agent", ua)
        .unwrap();
    let tracked = request(
        Method::GET,
        "https://shop.test/product?gclid=abc&utm_source=x&color=red",
    )
    .with_header("User-Agent", ua)
    .unwrap();

    let normalizer = KeyNormalizer::new(&h.worker.config().key).unwrap();
    assert_eq!(normalizer.normalize(&plain), normalizer.normalize(&tracked));

    h.worker.handle(plain).await;
    h.worker.tasks().drain().await;
    let resp = h.worker.handle(tracked).await;
    assert_eq!(resp.header("x-edge-cache"), Some("HIT"));
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test]
async fn test_every_request_revalidates() {
    let h = harness();
    for _ in 0..3 {
        h.worker
            .handle(request(Method::GET, "https://shop.test/"))
            .await;
    }
    h.worker.tasks().drain().await;
    assert_eq!(h.origin.calls.load(Ordering::SeqCst), 3);
    let snap = h.worker.metrics().snapshot();
    assert_eq!(snap.requests, 3);
    assert_eq!(snap.misses + snap.hits, 3);
}

#[tokio::test]
async fn test_origin_failure_is_generic() {
    let origin = CountingOrigin {
        fail: true,
        ..CountingOrigin::default()
    };
    let h = harness_with(EdgeCacheConfig::default(), origin, RecordingProvider::default());

    let resp = h
        .worker
        .handle(request(Method::GET, "https://shop.test/"))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_GATEWAY);
    assert_eq!(resp.body_text(), "Origin unavailable");
    assert!(!resp.body_text().contains("10.0.0.5"));
    assert_eq!(resp.header("x-edge-cache"), Some("ERROR"));
}

#[tokio::test]
async fn test_shutdown_drains_refreshes() {
    let h = harness();
    h.worker
        .handle(request(Method::GET, "https://shop.test/a"))
        .await;
    assert!(h.worker.shutdown(Duration::from_secs(1)).await);
    assert!(h.worker.tasks().is_empty());
    let key = h
        .worker
        .orchestrator()
        .normalizer()
        .normalize(&request(Method::GET, "https://shop.test/a"));
    assert!(h.store.lookup(&key).await.unwrap().is_some());
}
