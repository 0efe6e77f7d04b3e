//! # snatcher-fetch
//!
//! **Content-addressed downloads for the acquisition pipeline.**
//!
//! A [`ContentFetcher`] pulls one URL into one folder. Files are named
//! either explicitly (`ULTRA.webm`) or after the MD5 of their own bytes
//! (`9e107d9d372bb6826bd81d3542a419d6.png`), so identical content fetched
//! from different URLs collapses into a single file.
//!
//! - **Idempotent**: an explicit name that already exists is returned
//!   untouched; a URL already fetched into a folder is not transferred again.
//! - **No partial files**: bytes land in a private `.part` file that is only
//!   renamed into place once complete, and removed on failure.
//! - **Retries**: failed attempts are retried with a linear backoff.
//!
//! ```no_run
//! use snatcher_core::FetchConfig;
//! use snatcher_fetch::ContentFetcher;
//! use std::path::Path;
//!
//! #[async_std::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = ContentFetcher::new(FetchConfig::default());
//!     let name = fetcher
//!         .fetch("https://cdn.example/covers/cover.png", Path::new("maps/Song/Cover"), None)
//!         .await?;
//!     println!("stored as {}", name);
//!     Ok(())
//! }
//! ```

/// Single-resource downloads with retries and content-addressed naming.
pub mod fetcher;

pub use fetcher::{extension_from_url, ContentFetcher, FetchOptions};
