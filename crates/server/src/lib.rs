//! WebSocket and HTTP composition root for the real-time speech
//! translation relay.

pub mod backends;
pub mod error;
pub mod http;
pub mod metrics;
pub mod protocol;
pub mod state;
pub mod websocket;

pub use error::ServerError;
pub use http::create_router;
pub use metrics::init_metrics;
pub use state::AppState;
pub use websocket::WebSocketHandler;
