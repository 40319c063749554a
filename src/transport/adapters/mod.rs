//! Transport driver implementations.

mod http_stream;
mod http_support;
mod process;
mod rest;

pub use http_stream::HttpStreamDriver;
pub use http_support::{DEFAULT_BODY_EXCERPT_CHARS, build_http_client};
pub use process::ProcessDriver;
pub use rest::RestDriver;
