//! # snatcher-processors
//!
//! The acquisition scenarios plugged into [`snatcher_engine::AcquisitionEngine`]:
//!
//! - [`JdNextDownloader`]: first full download of every catalog entry.
//! - [`ServerVideoUpgrader`]: two-step upgrade of preview and main videos
//!   for maps already on disk.
//! - [`UbiArtVideoUpgrader`]: single replacement coach video for maps found
//!   in game bundles.
//!
//! Each scenario also owns the initialization scan that builds its queue.

pub mod batch;
pub mod catalog;
pub mod jdnext;
pub mod server_upgrade;
pub mod sidecar;
pub mod ubiart;
pub mod urls;

pub use catalog::{load_catalog, CatalogAssets, CatalogItem, JdNextEntry};
pub use jdnext::{plan_downloads, JdNextDownloader, JdNextPlan};
pub use server_upgrade::{scan_maps, ServerMap, ServerVideoUpgrader};
pub use sidecar::{inspect, write_sidecar, Sidecar, SONG_INFO};
pub use ubiart::{scan_bundles, UbiArtPlan, UbiArtVideoUpgrader};
