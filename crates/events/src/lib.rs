//! Outbound delivery to the external reward network.
//!
//! - [`PostbackNotifier`] -- HTTP postback with bounded timeout and optional
//!   exponential-backoff retry.
//! - [`NoopNotifier`] -- stand-in used when no postback endpoint is configured.

pub mod noop;
pub mod postback;

pub use noop::NoopNotifier;
pub use postback::{PostbackConfig, PostbackError, PostbackNotifier};
