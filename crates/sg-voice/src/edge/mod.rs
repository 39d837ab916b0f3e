//! Microsoft Edge read-aloud backend
//!
//! The free neural voices behind Edge's "Read aloud" feature, reached with
//! the same trusted client token the browser uses.

pub mod client;
pub mod protocol;

pub use client::{EdgeTtsClient, EdgeTtsConfig};
