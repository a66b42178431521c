//! Seed and citing paper extraction from citation alert emails.

pub mod citation;
pub mod normalize;

pub use citation::{SeedPattern, extract_citation};
pub use normalize::normalize_title;
