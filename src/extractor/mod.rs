//! Fact extraction from raw page markup.
//!
//! Every extractor is a pure function over a string; none of them can fail.
//! A field whose pattern does not match takes its absent value.

pub mod page_extractor;
pub mod patterns;
pub mod performance;
pub mod sitemap;
pub mod technical;

pub use page_extractor::{classify_link, ExtractOptions, LinkKind, PageExtractor, UnparsableLinkPolicy};
