//! Redis session store example
//!
//! The backend is chosen through configuration, the way a deployed service would
//! load it. Set `SESSION_CONFIG` to a JSON document to override the defaults, e.g.
//! `{"expiry": "infinite", "store": {"type": "redis", "url": "redis://127.0.0.1/"}}`.

use salvo::prelude::*;
use salvo_kv_session::{SessionConfig, SessionDepotExt, SessionError, SessionHandler, StoreBackend};

#[handler]
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[handler]
async fn session_info(depot: &mut Depot) -> Json<serde_json::Value> {
    let session = depot.session().expect("Session not found");

    Json(serde_json::json!({
        "sessionId": session.id(),
        "createdAt": session.created_at(),
        "isNew": session.is_new(),
        "data": session.data().data
    }))
}

#[handler]
async fn set_data(req: &mut Request, depot: &mut Depot) -> Result<Json<serde_json::Value>, SessionError> {
    let key = req.query::<String>("key").unwrap_or_else(|| "testKey".to_string());
    let value = req.query::<String>("value").unwrap_or_else(|| "testValue".to_string());

    let session = depot.session().expect("Session not found");
    session.set(&key, &value)?;
    session.set("lastModifiedAt", chrono::Utc::now().to_rfc3339())?;

    Ok(Json(serde_json::json!({
        "action": "set",
        "key": key,
        "value": value,
        "sessionId": session.id()
    })))
}

#[handler]
async fn counter(depot: &mut Depot) -> Result<Json<serde_json::Value>, SessionError> {
    let session = depot.session().expect("Session not found");

    let count: i32 = session.get("counter").unwrap_or(0);
    session.set("counter", count + 1)?;

    Ok(Json(serde_json::json!({
        "counter": count + 1,
        "sessionId": session.id()
    })))
}

#[handler]
async fn clear_session(depot: &mut Depot) -> Result<Json<serde_json::Value>, SessionError> {
    let session = depot.session().expect("Session not found");
    let session_id = session.id();

    session.destroy().await?;

    Ok(Json(serde_json::json!({
        "action": "clear",
        "previousSessionId": session_id
    })))
}

#[tokio::main]
async fn main() {
    // Set up logging
    tracing_subscriber::fmt::init();

    let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());

    let config = match std::env::var("SESSION_CONFIG") {
        Ok(json) => serde_json::from_str(&json).expect("Invalid SESSION_CONFIG"),
        Err(_) => SessionConfig::new()
            .with_expiry(86400) // 1 day in seconds
            .with_secure(false)
            .with_store(StoreBackend::Redis { url: redis_url }),
    };

    println!("Using session store {:?}", config.store);

    let session_handler = SessionHandler::connect(config)
        .await
        .expect("Failed to connect session store");

    // Build router
    let router = Router::new()
        .push(Router::with_path("health").get(health))
        .push(
            Router::new()
                .hoop(session_handler)
                .get(session_info)
                .push(Router::with_path("set").get(set_data))
                .push(Router::with_path("counter").get(counter))
                .push(Router::with_path("clear").get(clear_session)),
        );

    let port = std::env::var("PORT").unwrap_or_else(|_| "5800".to_string());
    let addr = format!("127.0.0.1:{}", port);

    // Start server
    let acceptor = TcpListener::new(addr.clone()).bind().await;
    println!("Server running at http://{}", addr);
    println!();
    println!("Endpoints:");
    println!("  GET /health     - Health check (no session)");
    println!("  GET /           - Session info");
    println!("  GET /set        - Set data (key=x&value=y)");
    println!("  GET /counter    - Increment counter");
    println!("  GET /clear      - Destroy session");

    Server::new(acceptor).serve(router).await;
}
