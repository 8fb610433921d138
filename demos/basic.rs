//! Basic example using in-memory session store

use salvo::prelude::*;
use salvo_kv_session::{MemoryStore, SessionConfig, SessionDepotExt, SessionError, SessionHandler};

#[handler]
async fn index(depot: &mut Depot) -> Result<String, SessionError> {
    let session = depot.session().expect("Session not found");

    // Get current view count
    let views: i32 = session.get("views").unwrap_or(0);

    // Increment view count
    session.set("views", views + 1)?;

    Ok(format!(
        "Hello! You have viewed this page {} time(s).\nSession ID: {}",
        views + 1,
        session.id()
    ))
}

#[handler]
async fn get_user(depot: &mut Depot) -> String {
    let session = depot.session().expect("Session not found");

    match session.get::<String>("user") {
        Some(user) => format!("Logged in as: {}", user),
        None => "Not logged in".to_string(),
    }
}

#[handler]
async fn login(req: &mut Request, depot: &mut Depot) -> Result<String, SessionError> {
    let username = req.query::<String>("name").unwrap_or_else(|| "anonymous".to_string());
    let session = depot.session().expect("Session not found");

    // New identity, new ID
    session.regenerate().await?;
    session.set("user", &username)?;

    Ok(format!("User set to: {}", username))
}

#[handler]
async fn keep_alive(depot: &mut Depot) -> &'static str {
    depot.session().expect("Session not found").touch();
    "Session refreshed"
}

#[handler]
async fn logout(depot: &mut Depot) -> Result<&'static str, SessionError> {
    depot.session().expect("Session not found").destroy().await?;
    Ok("Logged out successfully")
}

#[tokio::main]
async fn main() {
    // Set up logging
    tracing_subscriber::fmt::init();

    // Configure session
    let config = SessionConfig::new()
        .with_expiry(3600) // 1 hour
        .with_secure(false) // plain http on localhost
        .with_rolling(true); // Reset expiry on each request

    let session_handler = SessionHandler::new(MemoryStore::new(), config);

    // Build router
    let router = Router::new()
        .hoop(session_handler)
        .get(index)
        .push(Router::with_path("user").get(get_user))
        .push(Router::with_path("login").get(login))
        .push(Router::with_path("touch").get(keep_alive))
        .push(Router::with_path("logout").get(logout));

    // Start server
    let acceptor = TcpListener::new("127.0.0.1:5800").bind().await;
    println!("Server running at http://127.0.0.1:5800");
    println!("Try these endpoints:");
    println!("  GET /           - View counter");
    println!("  GET /user       - Get current user");
    println!("  GET /login?name=alice - Log in (regenerates the session ID)");
    println!("  GET /touch      - Refresh the session without changing it");
    println!("  GET /logout     - Destroy session");

    Server::new(acceptor).serve(router).await;
}
