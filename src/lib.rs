//! Authenticated WebSocket relay for streaming text-to-speech.
//!
//! Accepts a WebSocket upgrade carrying a signed session token in the
//! `Sec-WebSocket-Protocol` header, opens a companion connection to the
//! provider's speak endpoint, and forwards messages in both directions until
//! either side disconnects.

pub mod auth;
pub mod config;
pub mod params;
pub mod proxy;
pub mod session;
pub mod upstream;

// Re-export commonly used types and functions
pub use auth::{SessionClaims, TOKEN_PROTOCOL_PREFIX, TOKEN_TTL, authenticate, issue_token};
pub use config::{AuthConfig, Config, ListenConfig, UpstreamConfig, load_config};
pub use params::ProxyParams;
pub use proxy::{SPEAK_PATH, handle_connection};
pub use session::{ClientStream, UpstreamStream, sanitize_close_code};
