//! Token storage backends.
//!
//! Only the in-memory [`MemoryTokenStore`] ships today. Any other backend
//! plugs in behind [`adverify_core::store::TokenStore`].

pub mod memory;

pub use memory::MemoryTokenStore;
