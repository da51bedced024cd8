//! Transport implementations of [`Provider`](crate::provider::Provider)

pub mod replay;
pub mod websocket;

pub use replay::ReplayProvider;
pub use websocket::WebSocketProvider;
