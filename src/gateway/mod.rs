//! HTTP hosting for the client-certificate gate

pub mod auth;
mod router;
mod server;

pub use auth::{GateDenial, RequestGate, client_cert_middleware};
pub use router::{create_router, create_router_with};
pub use server::Gateway;
