//! In-memory adapters for tool registry ports.

mod catalog;

pub use catalog::InMemoryToolServerCatalog;
