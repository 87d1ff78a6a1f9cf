//! HTTP Server
//!
//! Routes operator requests to the node.

use crate::methods::{
    handle_add_peer, handle_list_chain, handle_list_peers, handle_mine_block, AddPeerRequest,
    MineBlockRequest, RpcError,
};
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_chain::{Block, Chain};
use ledger_consensus::Node;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// HTTP control server
pub struct HttpServer {
    node: Arc<Node>,
}

impl HttpServer {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }

    /// Create the Axum router
    pub fn router(self) -> Router {
        // CORS layer to allow browser clients
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

        Router::new()
            .route("/blocks", get(list_blocks))
            .route("/mineBlock", post(mine_block))
            .route("/peers", get(list_peers))
            .route("/addPeer", post(add_peer))
            .layer(cors)
            .with_state(self.node)
    }

    /// Run the server
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = match self {
            RpcError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            RpcError::AppendRejected(_) => StatusCode::CONFLICT,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn list_blocks(State(node): State<Arc<Node>>) -> Json<Chain> {
    Json(handle_list_chain(&node))
}

async fn mine_block(
    State(node): State<Arc<Node>>,
    Json(request): Json<MineBlockRequest>,
) -> Result<Json<Block>, RpcError> {
    handle_mine_block(&node, request).map(Json)
}

async fn list_peers(State(node): State<Arc<Node>>) -> Json<Vec<String>> {
    Json(handle_list_peers(&node))
}

async fn add_peer(
    State(node): State<Arc<Node>>,
    Json(request): Json<AddPeerRequest>,
) -> Result<StatusCode, RpcError> {
    handle_add_peer(&node, request)?;
    Ok(StatusCode::OK)
}
