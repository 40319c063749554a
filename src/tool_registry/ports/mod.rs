//! Port contracts for tool server configuration storage.

mod catalog;

pub use catalog::{ToolServerCatalog, ToolServerCatalogError, ToolServerCatalogResult};
