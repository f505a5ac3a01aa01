//! Domain core of the verification token service.
//!
//! - [`token`] -- token records, kinds, task payloads, token generation.
//! - [`gate`] -- shared-secret access gate for privileged operations.
//! - [`store`] -- the [`TokenStore`](store::TokenStore) persistence seam.
//! - [`notify`] -- the [`Notifier`](notify::Notifier) postback seam.
//! - [`lifecycle`] -- the token lifecycle manager tying the above together.
//!
//! This crate has no internal dependencies so storage backends, delivery
//! channels and the HTTP layer can all build on it.

pub mod error;
pub mod gate;
pub mod lifecycle;
pub mod notify;
pub mod store;
pub mod token;
pub mod types;
