//! Port contracts for rate window storage.

mod store;

pub use store::{RateWindowStore, RateWindowStoreError, RateWindowStoreResult};
