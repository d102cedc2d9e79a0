//! Shared primitives used by the provider layer.

mod streaming;

pub use streaming::{SseDecoder, SseFrame};
