//! End-to-end session lifecycle through the Salvo middleware

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Utc;
use salvo::http::cookie::time::Duration;
use salvo::http::cookie::Cookie;
use salvo::prelude::*;
use salvo::test::{ResponseExt, TestClient};
use salvo_kv_session::codec;
use salvo_kv_session::{
    MemoryStore, SessionConfig, SessionData, SessionDepotExt, SessionError, SessionHandler,
    SessionStore,
};

const URL: &str = "http://127.0.0.1:5800";

/// Memory store that counts writes
#[derive(Clone, Default)]
struct CountingStore {
    inner: MemoryStore,
    sets: Arc<AtomicUsize>,
}

impl CountingStore {
    fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl_secs: Option<u64>) -> Result<(), SessionError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value, ttl_secs).await
    }

    async fn delete(&self, key: &str) -> Result<(), SessionError> {
        self.inner.delete(key).await
    }
}

struct BrokenStore;

/// Reads and deletes work, writes fail
#[derive(Clone, Default)]
struct ReadOnlyStore {
    inner: MemoryStore,
}

#[async_trait]
impl SessionStore for ReadOnlyStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        self.inner.get(key).await
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Option<u64>) -> Result<(), SessionError> {
        Err(SessionError::StoreError("read only".to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), SessionError> {
        self.inner.delete(key).await
    }
}

#[async_trait]
impl SessionStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        Err(SessionError::StoreError("backend down".to_string()))
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Option<u64>) -> Result<(), SessionError> {
        Err(SessionError::StoreError("backend down".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), SessionError> {
        Err(SessionError::StoreError("backend down".to_string()))
    }
}

#[handler]
async fn set_foo(depot: &mut Depot) -> Result<&'static str, SessionError> {
    let session = depot.session().expect("session installed");
    session.set("foo", "bar")?;
    Ok("ok")
}

#[handler]
async fn read_only(depot: &mut Depot) -> String {
    let session = depot.session().expect("session installed");
    session.get::<String>("foo").unwrap_or_default()
}

#[handler]
async fn touch(depot: &mut Depot) -> &'static str {
    depot.session().expect("session installed").touch();
    "touched"
}

#[handler]
async fn destroy_then_set(depot: &mut Depot) -> Result<&'static str, SessionError> {
    let session = depot.session().expect("session installed");
    session.destroy().await?;
    session.set("after", true)?;
    Ok("destroyed")
}

#[handler]
async fn regenerate(depot: &mut Depot) -> Result<String, SessionError> {
    let session = depot.session().expect("session installed");
    session.regenerate().await?;
    Ok(session.id())
}

#[handler]
async fn is_new(depot: &mut Depot) -> String {
    depot.session().expect("session installed").is_new().to_string()
}

fn service(store: CountingStore, config: SessionConfig) -> Service {
    let router = Router::new()
        .hoop(SessionHandler::new(store, config))
        .push(Router::with_path("set").get(set_foo))
        .push(Router::with_path("read").get(read_only))
        .push(Router::with_path("touch").get(touch))
        .push(Router::with_path("destroy").get(destroy_then_set))
        .push(Router::with_path("regenerate").get(regenerate))
        .push(Router::with_path("is-new").get(is_new));
    Service::new(router)
}

async fn seed(store: &CountingStore, age_secs: i64) -> SessionData {
    let mut data = SessionData::create(64, Default::default());
    data.created_at = Utc::now() - chrono::Duration::seconds(age_secs);
    data.set("foo", "stored").unwrap();
    store
        .inner
        .set(&format!("sessions:{}", data.id), &codec::encode(&data).unwrap(), None)
        .await
        .unwrap();
    data
}

async fn stored(store: &CountingStore, sid: &str) -> Option<SessionData> {
    store
        .get(&format!("sessions:{}", sid))
        .await
        .unwrap()
        .map(|bytes| codec::decode(&bytes).unwrap())
}

async fn get(service: &Service, path: &str, sid: Option<&str>) -> Response {
    let mut req = TestClient::get(format!("{}/{}", URL, path));
    if let Some(sid) = sid {
        req = req.add_header("cookie", format!("sessionId={}", sid), true);
    }
    req.send(service).await
}

/// `sessionId` cookie added while handling the request. The response jar also
/// holds the request's cookies, so only the delta says what goes out.
fn sent_cookie(res: &Response) -> Option<Cookie<'static>> {
    res.cookies()
        .delta()
        .find(|c| c.name() == "sessionId")
        .map(|c| c.clone().into_owned())
}

fn session_cookie(res: &Response) -> Option<String> {
    sent_cookie(res)
        .filter(|c| c.max_age() != Some(Duration::ZERO))
        .map(|c| c.value().to_string())
}

fn cookie_cleared(res: &Response) -> bool {
    sent_cookie(res)
        .map(|c| c.max_age() == Some(Duration::ZERO))
        .unwrap_or(false)
}

#[tokio::test]
async fn new_session_is_created_on_mutation() {
    let store = CountingStore::default();
    let service = service(store.clone(), SessionConfig::default());

    let res = get(&service, "set", None).await;
    let cookie = sent_cookie(&res).expect("cookie issued");
    let sid = cookie.value().to_string();
    assert_eq!(sid.len(), 64);

    let expected = Utc::now().timestamp() + 600;
    let expires = cookie.expires_datetime().expect("expires set").unix_timestamp();
    assert!((expires - expected).abs() <= 2);

    let saved = stored(&store, &sid).await.expect("record saved");
    assert_eq!(saved.get::<String>("foo").as_deref(), Some("bar"));
    assert_eq!(store.sets(), 1);
}

#[tokio::test]
async fn untouched_new_request_leaves_no_trace() {
    let store = CountingStore::default();
    let service = service(store.clone(), SessionConfig::default());

    let res = get(&service, "read", None).await;
    assert!(sent_cookie(&res).is_none());
    assert_eq!(store.sets(), 0);
    assert_eq!(store.inner.length().await.unwrap(), 0);
}

#[tokio::test]
async fn resolve_after_create_sees_payload() {
    let store = CountingStore::default();
    let service = service(store.clone(), SessionConfig::default());

    let res = get(&service, "set", None).await;
    let sid = session_cookie(&res).expect("cookie issued");

    let mut res = get(&service, "read", Some(&sid)).await;
    assert!(sent_cookie(&res).is_none());
    assert_eq!(res.take_string().await.unwrap(), "bar");
    // only the creating request wrote
    assert_eq!(store.sets(), 1);
}

#[tokio::test]
async fn unchanged_active_session_is_not_rewritten() {
    let store = CountingStore::default();
    let data = seed(&store, 10).await;
    let service = service(store.clone(), SessionConfig::default());

    let mut res = get(&service, "read", Some(&data.id)).await;
    assert!(sent_cookie(&res).is_none());
    assert_eq!(res.take_string().await.unwrap(), "stored");
    assert_eq!(store.sets(), 0);
}

#[tokio::test]
async fn rolling_session_reissues_cookie() {
    let store = CountingStore::default();
    let data = seed(&store, 100).await;
    let service = service(store.clone(), SessionConfig::default().with_rolling(true));

    let res = get(&service, "read", Some(&data.id)).await;
    let cookie = sent_cookie(&res).expect("cookie reissued");
    assert_eq!(cookie.value(), data.id);

    let expected = Utc::now().timestamp() + 600;
    let expires = cookie.expires_datetime().expect("expires set").unix_timestamp();
    assert!((expires - expected).abs() <= 2);

    let saved = stored(&store, &data.id).await.unwrap();
    assert!(saved.created_at > data.created_at);
}

#[tokio::test]
async fn touch_forces_cookie_and_write() {
    let store = CountingStore::default();
    let data = seed(&store, 100).await;
    let service = service(store.clone(), SessionConfig::default());

    let res = get(&service, "touch", Some(&data.id)).await;
    assert_eq!(session_cookie(&res).as_deref(), Some(data.id.as_str()));
    assert_eq!(store.sets(), 1);

    let saved = stored(&store, &data.id).await.unwrap();
    assert_eq!(saved.get::<String>("foo").as_deref(), Some("stored"));
}

#[tokio::test]
async fn destroy_ignores_later_mutation() {
    let store = CountingStore::default();
    let data = seed(&store, 10).await;
    let service = service(store.clone(), SessionConfig::default());

    let res = get(&service, "destroy", Some(&data.id)).await;
    assert!(session_cookie(&res).is_none());
    assert!(cookie_cleared(&res));
    assert_eq!(store.sets(), 0);
    assert!(stored(&store, &data.id).await.is_none());

    // the old cookie no longer resolves
    let mut res = get(&service, "is-new", Some(&data.id)).await;
    assert_eq!(res.take_string().await.unwrap(), "true");
}

#[tokio::test]
async fn regenerate_moves_payload_to_new_id() {
    let store = CountingStore::default();
    let data = seed(&store, 10).await;
    let service = service(store.clone(), SessionConfig::default());

    let mut res = get(&service, "regenerate", Some(&data.id)).await;
    let new_id = session_cookie(&res).expect("cookie issued");
    assert_ne!(new_id, data.id);
    assert_eq!(res.take_string().await.unwrap(), new_id);

    assert!(stored(&store, &data.id).await.is_none());
    let saved = stored(&store, &new_id).await.expect("new record");
    assert_eq!(saved.get::<String>("foo").as_deref(), Some("stored"));
    assert_eq!(store.sets(), 1);
}

#[tokio::test]
async fn expired_session_is_purged() {
    let store = CountingStore::default();
    let data = seed(&store, 601).await;
    let service = service(store.clone(), SessionConfig::default());

    let mut res = get(&service, "is-new", Some(&data.id)).await;
    assert!(cookie_cleared(&res));
    assert_eq!(res.take_string().await.unwrap(), "true");
    assert!(store.inner.get(&format!("sessions:{}", data.id)).await.unwrap().is_none());
}

#[tokio::test]
async fn store_failure_is_fatal() {
    let router = Router::new()
        .hoop(SessionHandler::new(BrokenStore, SessionConfig::default()))
        .push(Router::with_path("read").get(read_only));
    let service = Service::new(router);

    let res = get(&service, "read", Some("abc")).await;
    assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));
}

#[tokio::test]
async fn failed_write_sends_no_cookie() {
    let router = Router::new()
        .hoop(SessionHandler::new(ReadOnlyStore::default(), SessionConfig::default()))
        .push(Router::with_path("set").get(set_foo));
    let service = Service::new(router);

    let res = get(&service, "set", None).await;
    assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(sent_cookie(&res).is_none());
}

#[tokio::test]
async fn background_persist_writes_after_response() {
    let store = CountingStore::default();
    let service = service(store.clone(), SessionConfig::default().with_background_persist(true));

    let res = get(&service, "set", None).await;
    let sid = session_cookie(&res).expect("cookie issued");

    let mut saved = None;
    for _ in 0..50 {
        saved = stored(&store, &sid).await;
        if saved.is_some() {
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    let saved = saved.expect("record saved in background");
    assert_eq!(saved.get::<String>("foo").as_deref(), Some("bar"));
    assert_eq!(store.sets(), 1);
}

#[tokio::test]
async fn background_persist_failure_is_not_fatal() {
    let router = Router::new()
        .hoop(SessionHandler::new(
            ReadOnlyStore::default(),
            SessionConfig::default().with_background_persist(true),
        ))
        .push(Router::with_path("set").get(set_foo));
    let service = Service::new(router);

    let res = get(&service, "set", None).await;
    assert_eq!(res.status_code.unwrap_or(StatusCode::OK), StatusCode::OK);
    assert!(session_cookie(&res).is_some());
}
