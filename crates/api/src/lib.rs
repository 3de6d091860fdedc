//! HTTP API: access-control middleware, session layer and demo routes.

pub mod app;
pub mod client;
pub mod context;
pub mod middleware;
pub mod routes;
pub mod session;

pub use context::{AccessContext, DenialResponder, DenialResponders};
pub use routes::{RouteResolver, RouteTable};
pub use session::{SessionState, SharedSession};
