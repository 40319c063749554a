//! Cache of discovered tool schemas with TTL expiry and a deny-list.

mod cache;
mod deny_list;

pub use cache::ToolSchemaCache;
pub use deny_list::ToolDenyList;
