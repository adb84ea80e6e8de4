//! Technology fingerprinting
//!
//! The first pipeline stage: look up a domain with BuiltWith (or a saved
//! response) and turn the document into a [`FingerprintResult`].

mod client;
mod error;
mod parse;
mod saved;
pub mod timestamp;
mod types;

pub use client::{BuiltWithClient, FingerprintSource};
pub use error::FingerprintError;
pub use parse::{parse_body, parse_document};
pub use saved::SavedResponse;
pub use types::{CategoryEntry, DetectedItem, FingerprintResult, ItemStatus, Timestamp};
