//! HTTP surface for the raffle service
//!
//! Entry, automation, oracle-callback, and read-only endpoints plus the SSE
//! event feed and Prometheus metrics.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use handlers::AppState;
pub use server::ApiServer;
