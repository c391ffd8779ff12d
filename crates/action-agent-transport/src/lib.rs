//! Transport side of the action request agent.
//!
//! Provides:
//! - Wire protocol (message types and reply payloads)
//! - `ChannelConnector` - in-process `Connector` over a tokio channel

pub mod channel;
pub mod protocol;

pub use channel::ChannelConnector;
pub use protocol::{
    BlockingResponse, CoreError, Envelope, NonBlockingResponse, OutboundMessage,
    ProvisionalResponse, RpcError, wrap_debug,
};
