use crate::batch::{fetch_all, require, PlannedFetch};
use crate::sidecar::{inspect, Sidecar};
use crate::urls::{AssetUrls, SERVER_MAIN_FIELDS, SERVER_PREVIEW_FIELDS};
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use snatcher_core::{Reply, ReplyShape, SnatchError};
use snatcher_engine::{parse_unit, Interpretation, ItemProcessor, RequestQueue, StepCursor};
use snatcher_fetch::ContentFetcher;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const PREVIEW_STEP: usize = 0;
const LEGACY_VIDEOS: &[(&str, &str)] = &[
    ("video", "UNKNOWN.webm"),
    ("videoPreview", "UNKNOWN.webm"),
    ("videoPreview", "LOW.webm"),
];

/// A downloaded map whose videos are due for an upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerMap {
    pub codename: String,
    pub folder: PathBuf,
}

impl fmt::Display for ServerMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.codename)
    }
}

/// Walks `maps_dir` for map folders with a readable sidecar, renames
/// folders to their codename where possible, and queues the ones whose
/// `video/` or `videoPreview/` holds at most one file.
pub fn scan_maps(maps_dir: &Path) -> Result<RequestQueue<ServerMap>> {
    let mut folders: Vec<PathBuf> = fs::read_dir(maps_dir)
        .with_context(|| format!("Failed to read maps folder {}", maps_dir.display()))?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    folders.sort();

    let mut queue = RequestQueue::new();
    for folder in folders {
        let entry = match inspect(&folder) {
            Sidecar::Valid(entry) => entry,
            Sidecar::Missing => continue,
            Sidecar::Corrupt(reason) => {
                warn!("Skipping {}: {}", folder.display(), reason);
                continue;
            }
        };

        let folder = align_folder_name(folder, &entry.parent_map_name);
        if needs_upgrade(&folder) {
            info!("Queueing {} for a video upgrade", entry.parent_map_name);
            queue.enqueue_unique(ServerMap {
                codename: entry.parent_map_name,
                folder,
            });
        }
    }
    Ok(queue)
}

fn align_folder_name(folder: PathBuf, codename: &str) -> PathBuf {
    let current = folder
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if current.eq_ignore_ascii_case(codename) {
        return folder;
    }

    let target = folder.with_file_name(codename);
    if target.exists() {
        warn!(
            "Cannot rename {} to {}: target exists, keeping the original",
            current, codename
        );
        return folder;
    }
    match fs::rename(&folder, &target) {
        Ok(()) => {
            info!("Renamed {} to {}", current, codename);
            target
        }
        Err(e) => {
            warn!("Cannot rename {} to {}: {}", current, codename, e);
            folder
        }
    }
}

fn needs_upgrade(folder: &Path) -> bool {
    ["video", "videoPreview"].iter().any(|sub| {
        let dir = folder.join(sub);
        dir.is_dir() && file_count(&dir) <= 1
    })
}

fn file_count(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|entries| entries.flatten().filter(|e| e.path().is_file()).count())
        .unwrap_or_default()
}

/// Replaces preview and main videos of an existing map. Needs two replies
/// per map: the preview listing first, then the no-HUD listing.
pub struct ServerVideoUpgrader {
    fetcher: ContentFetcher,
    cursor: StepCursor,
    collected: AssetUrls,
}

impl ServerVideoUpgrader {
    pub fn new(fetcher: ContentFetcher) -> Self {
        Self {
            fetcher,
            cursor: StepCursor::new(2),
            collected: AssetUrls::default(),
        }
    }

    pub fn step(&self) -> usize {
        self.cursor.current()
    }
}

#[async_trait]
impl ItemProcessor for ServerVideoUpgrader {
    type Item = ServerMap;
    type Data = AssetUrls;

    fn name(&self) -> &str {
        "server-upgrade"
    }

    fn encode_request(&self, item: &ServerMap) -> String {
        if self.cursor.current() == PREVIEW_STEP {
            format!("/assets server:jdu codename:{}", item.codename)
        } else {
            format!("/nohud codename:{}", item.codename)
        }
    }

    fn expected_shape(&self, _item: &ServerMap) -> ReplyShape {
        if self.cursor.current() == PREVIEW_STEP {
            ReplyShape::AtLeast(3)
        } else {
            ReplyShape::AtLeast(1)
        }
    }

    fn interpret_reply(&mut self, item: &ServerMap, reply: &Reply) -> Interpretation<AssetUrls> {
        if self.cursor.current() == PREVIEW_STEP {
            if let Err(e) = parse_unit(&mut self.collected.previews, reply, 1, SERVER_PREVIEW_FIELDS) {
                return Interpretation::Unparseable(e.to_string());
            }
            self.cursor.advance();
            debug!("Preview URLs collected for {}", item);
            return Interpretation::Pending;
        }

        if let Err(e) = parse_unit(&mut self.collected.content, reply, 0, SERVER_MAIN_FIELDS) {
            return Interpretation::Unparseable(e.to_string());
        }
        Interpretation::Complete(std::mem::take(&mut self.collected))
    }

    async fn process(&self, urls: AssetUrls, item: &ServerMap) -> Result<(), SnatchError> {
        let previews = &urls.previews;
        let content = &urls.content;
        require(&[
            ("Audio:", previews.audio_preview.as_ref()),
            ("ULTRA (vp9)", previews.ultra_vp9.as_ref()),
            ("HIGH (vp9)", previews.high_vp9.as_ref()),
            ("MID (vp9)", previews.mid_vp9.as_ref()),
            ("LOW (vp9)", previews.low_vp9.as_ref()),
            ("Ultra HD:", content.ultra_hd.as_ref()),
            ("High HD:", content.high_hd.as_ref()),
            ("Mid HD:", content.mid_hd.as_ref()),
            ("Low HD:", content.low_hd.as_ref()),
        ])?;

        let video = item.folder.join("video");
        let preview = item.folder.join("videoPreview");
        let audio_preview = item.folder.join("AudioPreview_opus");
        for dir in [&video, &preview, &audio_preview] {
            async_std::fs::create_dir_all(dir).await?;
        }

        for (sub, name) in LEGACY_VIDEOS {
            let path = item.folder.join(sub).join(name);
            if path.exists() {
                async_std::fs::remove_file(&path).await?;
                debug!("Removed legacy {}", path.display());
            }
        }

        let mut plans: Vec<PlannedFetch> = [
            (&previews.low_vp9, &preview),
            (&previews.mid_vp9, &preview),
            (&previews.high_vp9, &preview),
            (&previews.ultra_vp9, &preview),
            (&content.ultra_hd, &video),
            (&content.high_hd, &video),
            (&content.mid_hd, &video),
            (&content.low_hd, &video),
        ]
        .into_iter()
        .filter_map(|(url, dest)| url.as_ref().map(|u| PlannedFetch::hashed(u, dest)))
        .collect();

        if file_count(&audio_preview) == 0 {
            if let Some(url) = &previews.audio_preview {
                plans.push(PlannedFetch::hashed(url, &audio_preview));
            }
        }

        info!("Upgrading {} video(s) for {}", plans.len(), item);
        fetch_all(&self.fetcher, &plans).await?;
        Ok(())
    }

    fn reset(&mut self) {
        self.cursor.reset();
        self.collected = AssetUrls::default();
    }
}
