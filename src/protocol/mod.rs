//! JSON-RPC wire protocol shared by every transport.
//!
//! Envelopes and responses live in [`envelope`], newline framing for
//! subprocess stdio in [`framing`], Server-Sent-Events payload extraction in
//! [`sse`], and REST body normalization in [`normalize`].

pub mod envelope;
pub mod framing;
pub mod normalize;
pub mod sse;

pub use envelope::{
    IncomingMessage, PROTOCOL_VERSION, RequestId, RpcEnvelope, RpcErrorObject, RpcNotification,
    RpcOutcome, RpcResponse, methods,
};
pub use framing::{FramingError, LineBuffer};
