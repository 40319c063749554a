//! Rate window domain model.

mod window;

pub use window::{RateWindow, window_start};
