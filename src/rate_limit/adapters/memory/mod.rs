//! In-memory rate window store.

mod store;

pub use store::InMemoryRateWindowStore;
