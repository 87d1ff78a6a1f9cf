//! RPC Server - HTTP control API for a ledger node
//!
//! Lets an operator drive the node:
//! - GET /blocks, POST /mineBlock
//! - GET /peers, POST /addPeer

pub mod http_server;
pub mod methods;

pub use http_server::HttpServer;
pub use methods::RpcError;

/// RPC Server configuration
#[derive(Clone, Debug)]
pub struct RpcServerConfig {
    /// HTTP bind address
    pub http_addr: String,
}
