use crate::batch::{fetch_all, require, PlannedFetch};
use crate::catalog::{Catalog, CatalogItem, JdNextEntry};
use crate::sidecar::{inspect, write_sidecar, Sidecar};
use crate::urls::{AssetUrls, CONTENT_FIELDS, IMAGE_FIELDS, PREVIEW_FIELDS};
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{info, warn};
use snatcher_core::{Reply, ReplyShape, SnatchError};
use snatcher_engine::{parse_unit, Interpretation, ItemProcessor, RequestQueue};
use snatcher_fetch::ContentFetcher;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const SONGPACK_PREFIX: &str = "songpack";

/// Result of comparing the catalog against what is already on disk.
#[derive(Debug)]
pub struct JdNextPlan {
    pub queue: RequestQueue<CatalogItem>,
    /// Songpack tag to restore per map, carried over from a deleted
    /// custom download.
    pub bundle_tags: HashMap<String, String>,
    pub up_to_date: usize,
}

/// Decides which catalog entries need downloading.
///
/// A map folder counts as done only when its sidecar parses and it has not
/// gone from custom to official since; otherwise the folder is removed and
/// the entry queued again.
pub fn plan_downloads(catalog: Catalog, output: &Path) -> Result<JdNextPlan> {
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output folder {}", output.display()))?;

    let mut items = Vec::new();
    let mut bundle_tags = HashMap::new();
    let mut up_to_date = 0;

    for (song_id, entry) in catalog {
        let map_dir = output.join(&entry.parent_map_name);
        if !map_dir.is_dir() {
            items.push(CatalogItem { song_id, entry });
            continue;
        }

        let redownload = match inspect(&map_dir) {
            Sidecar::Missing => {
                info!("{} has no sidecar, redownloading", entry.parent_map_name);
                true
            }
            Sidecar::Corrupt(reason) => {
                warn!(
                    "Unreadable sidecar for {} ({}), redownloading",
                    entry.parent_map_name, reason
                );
                true
            }
            Sidecar::Valid(existing) if existing.is_custom() && !entry.is_custom() => {
                info!(
                    "{} was custom and is now official, redownloading",
                    entry.parent_map_name
                );
                if let Some(tag) = existing
                    .tags
                    .iter()
                    .filter(|t| t.starts_with(SONGPACK_PREFIX))
                    .last()
                {
                    bundle_tags.insert(entry.parent_map_name.clone(), tag.clone());
                }
                true
            }
            Sidecar::Valid(_) => false,
        };

        if redownload {
            if let Err(e) = fs::remove_dir_all(&map_dir) {
                warn!("Could not remove {}: {}", map_dir.display(), e);
            }
            items.push(CatalogItem { song_id, entry });
        } else {
            up_to_date += 1;
        }
    }

    items.sort_by_key(|item| item.entry.parent_map_name.to_lowercase());
    let mut queue = RequestQueue::new();
    for item in items {
        queue.enqueue_unique(item);
    }

    info!(
        "{} map(s) to download, {} already up to date",
        queue.count(),
        up_to_date
    );
    Ok(JdNextPlan {
        queue,
        bundle_tags,
        up_to_date,
    })
}

/// Full first download of a JD Next map: previews, images, content and
/// the map package, followed by the sidecar.
pub struct JdNextDownloader {
    fetcher: ContentFetcher,
    output: PathBuf,
    bundle_tags: HashMap<String, String>,
}

impl JdNextDownloader {
    pub fn new(
        fetcher: ContentFetcher,
        output: impl Into<PathBuf>,
        bundle_tags: HashMap<String, String>,
    ) -> Self {
        Self {
            fetcher,
            output: output.into(),
            bundle_tags,
        }
    }

    fn plan(&self, urls: &AssetUrls, entry: &JdNextEntry) -> Result<Vec<PlannedFetch>, SnatchError> {
        let content = &urls.content;
        let images = &urls.images;
        require(&[
            ("Audio:", content.audio.as_ref()),
            ("mapPackage:", content.map_package.as_ref()),
            ("Ultra HD:", content.ultra_hd.as_ref()),
            ("High VP9:", content.high_vp9.as_ref()),
            ("Cover:", images.cover.as_ref()),
            ("coachesLarge:", images.coaches_large.as_ref()),
            ("coachesSmall:", images.coaches_small.as_ref()),
        ])?;
        let assets = entry
            .assets
            .as_ref()
            .ok_or_else(|| SnatchError::field_missing(["assets"]))?;

        let map_dir = self.output.join(&entry.parent_map_name);
        let dir = |name: &str| map_dir.join(name);
        let mut plans = Vec::new();

        if let Some(url) = &assets.audio_preview {
            plans.push(PlannedFetch::hashed(url, dir("AudioPreview_opus")));
        }
        for (tier, url) in [
            ("ULTRA", &assets.preview_ultra_vp9),
            ("HIGH", &assets.preview_high_vp9),
            ("MID", &assets.preview_mid_vp9),
            ("LOW", &assets.preview_low_vp9),
        ] {
            if let Some(url) = url {
                plans.push(PlannedFetch::named(url, dir("videoPreview"), tier));
            }
        }

        // checked by require above
        for (folder, url) in [
            ("Cover", &images.cover),
            ("CoachesLarge", &images.coaches_large),
            ("CoachesSmall", &images.coaches_small),
        ] {
            if let Some(url) = url {
                plans.push(PlannedFetch::hashed(url, dir(folder)));
            }
        }

        if entry.has_song_title_in_cover {
            if let Some(url) = &assets.song_title_logo {
                plans.push(PlannedFetch::hashed(url, dir("songTitleLogo")));
            }
        }

        if let Some(url) = &content.audio {
            plans.push(PlannedFetch::hashed(url, dir("Audio_opus")));
        }
        for (tier, url) in [
            ("ULTRA", &content.ultra_hd),
            ("HIGH", &content.high_vp9),
            ("MID", &content.mid_vp9),
            ("LOW", &content.low_vp9),
        ] {
            if let Some(url) = url {
                plans.push(PlannedFetch::named(url, dir("video"), tier));
            }
        }
        if let Some(url) = &content.map_package {
            plans.push(PlannedFetch::hashed(url, dir("MapPackage")));
        }

        Ok(plans)
    }
}

#[async_trait]
impl ItemProcessor for JdNextDownloader {
    type Item = CatalogItem;
    type Data = AssetUrls;

    fn name(&self) -> &str {
        "jdnext"
    }

    fn encode_request(&self, item: &CatalogItem) -> String {
        format!("/assets server:jdnext codename:{}", item.map_name())
    }

    fn expected_shape(&self, _item: &CatalogItem) -> ReplyShape {
        ReplyShape::Exactly(3)
    }

    fn interpret_reply(&mut self, _item: &CatalogItem, reply: &Reply) -> Interpretation<AssetUrls> {
        let mut urls = AssetUrls::default();
        let parsed = parse_unit(&mut urls.images, reply, 0, IMAGE_FIELDS)
            .and_then(|_| parse_unit(&mut urls.previews, reply, 1, PREVIEW_FIELDS))
            .and_then(|_| parse_unit(&mut urls.content, reply, 2, CONTENT_FIELDS));
        match parsed {
            Ok(_) => Interpretation::Complete(urls),
            Err(e) => Interpretation::Unparseable(e.to_string()),
        }
    }

    async fn process(&self, urls: AssetUrls, item: &CatalogItem) -> Result<(), SnatchError> {
        let plans = self.plan(&urls, &item.entry)?;
        let map_dir = self.output.join(item.map_name());
        async_std::fs::create_dir_all(&map_dir).await?;

        info!("Downloading {} file(s) for {}", plans.len(), item);
        fetch_all(&self.fetcher, &plans).await?;

        let mut entry = item.entry.clone();
        entry.song_id = item.song_id.clone();
        if let Some(tag) = self.bundle_tags.get(item.map_name()) {
            if !entry.has_tag(tag) {
                entry.tags.push(tag.clone());
            }
        }
        write_sidecar(&map_dir, &entry).await
    }
}
