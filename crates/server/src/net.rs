//! HTTP and WebSocket transport.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        ConnectInfo, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use protocol::ConnId;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{RwLock, mpsc};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::clock::SystemClock;
use crate::config::Config;
use crate::server::{Server, catch_panic, run_game_loop};

#[derive(Clone)]
pub struct AppState {
    pub server: Arc<RwLock<Server>>,
}

#[derive(Debug, Default, Deserialize)]
struct ConnectParams {
    token: Option<String>,
}

/// `/ws` for the game, `/health` for probes, JSON 404 for everything else.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

/// Run the game server: bind, spawn the game loop, serve until error.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    let tick_interval = config.server.tick_interval_ms;

    let server = Arc::new(RwLock::new(Server::new(
        config,
        Arc::new(SystemClock::new()),
        StdRng::from_os_rng(),
    )));

    let game_loop_state = Arc::clone(&server);
    tokio::spawn(async move {
        run_game_loop(game_loop_state, tick_interval).await;
    });

    info!("Server running on http://{}", addr);
    info!("Game WebSocket endpoint: ws://{}/ws", addr);
    serve(listener, AppState { server }).await
}

/// Serve the router on an already bound listener.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let server = state.server.read().await;
    Json(json!({
        "status": "ok",
        "rooms": server.rooms().len(),
        "connections": server.connection_count(),
        "uptimeMs": server.uptime_ms(),
    }))
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, addr, params.token, state))
}

/// Disconnects the session however the socket task ends, unwinding included.
struct ConnectionGuard {
    server: Arc<RwLock<Server>>,
    conn: ConnId,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let conn = self.conn;
        if let Ok(mut server) = self.server.try_write() {
            server.disconnect(conn);
            return;
        }
        let server = Arc::clone(&self.server);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    server.write().await.disconnect(conn);
                });
            }
            Err(_) => warn!("No runtime to disconnect client {}", conn),
        }
    }
}

/// One task per socket: inbound frames take the server lock in arrival
/// order, outbound messages drain from this connection's channel.
async fn handle_socket(socket: WebSocket, addr: SocketAddr, token: Option<String>, state: AppState) {
    let (mut write, mut read) = socket.split();

    let (conn, mut rx) = {
        let mut server = state.server.write().await;
        let (tx, rx) = mpsc::channel(server.config.server.outbound_queue.max(1));
        (server.connect(token, Some(addr), tx), rx)
    };
    let _guard = ConnectionGuard {
        server: Arc::clone(&state.server),
        conn,
    };

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let mut server = state.server.write().await;
                        let handled = catch_panic(format_args!("handler for client {conn}"), || {
                            server.handle_text(conn, text.as_str())
                        });
                        if handled.is_none() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} ({}) closed the socket", conn, addr);
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }
            out = rx.recv() => {
                let Some(msg) = out else {
                    break;
                };
                let json = match msg.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to encode {} for {}: {}", msg.event(), conn, e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(json.into())).await {
                    warn!("Failed to send to {}: {}", addr, e);
                    break;
                }
            }
        }
    }
}
