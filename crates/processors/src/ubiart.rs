use crate::batch::require;
use crate::urls::{NoHudUrls, NOHUD_FIELDS};
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Deserialize;
use snatcher_core::{Reply, ReplyShape, SnatchError};
use snatcher_engine::{parse_unit, Interpretation, ItemProcessor, RequestQueue};
use snatcher_fetch::ContentFetcher;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

const MAPS_FOLDERS: &[&str] = &["maps", "jd2015", "jd5"];
const SONG_DESC: &str = "songdesc.tpl.ckd";
const COACH_VIDEOS: &str = "videoscoach";

#[derive(Debug, Deserialize)]
struct SongDesc {
    #[serde(rename = "COMPONENTS", default)]
    components: Vec<SongDescComponent>,
}

#[derive(Debug, Deserialize)]
struct SongDescComponent {
    #[serde(rename = "MapName", default)]
    map_name: String,
}

/// Maps found in the game bundles that have no upgraded copy yet.
#[derive(Debug, Default)]
pub struct UbiArtPlan {
    pub queue: RequestQueue<String>,
    /// Original coach video per map, used to name the replacement.
    pub videos: HashMap<String, PathBuf>,
    pub platform: Option<String>,
}

/// Bundle layout: `<bundle>/cache/itf_cooked/<platform>/world/<maps>/<map>/`.
struct BundleLayout {
    bundles: Vec<PathBuf>,
    platform: String,
    maps_folder: String,
}

impl BundleLayout {
    fn discover(bundles_dir: &Path) -> Result<Option<Self>> {
        let all = sorted_dirs(bundles_dir)
            .with_context(|| format!("Failed to read bundles folder {}", bundles_dir.display()))?;

        let Some(platform) = all.iter().find_map(|b| {
            sorted_dirs(&b.join("cache").join("itf_cooked"))
                .ok()
                .and_then(|dirs| dirs.into_iter().next())
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        }) else {
            return Ok(None);
        };

        let patch = format!("patch_{}", platform.to_lowercase());
        let bundles: Vec<PathBuf> = all
            .into_iter()
            .filter(|b| {
                !b.file_name()
                    .map(|n| n.to_string_lossy().to_lowercase().contains(&patch))
                    .unwrap_or(false)
            })
            .collect();

        let world = |b: &Path| b.join("cache").join("itf_cooked").join(&platform).join("world");
        let Some(maps_folder) = bundles.iter().find_map(|b| {
            MAPS_FOLDERS
                .iter()
                .find(|f| world(b).join(f).is_dir())
                .map(|f| f.to_string())
        }) else {
            return Ok(None);
        };

        Ok(Some(Self {
            bundles,
            platform,
            maps_folder,
        }))
    }

    fn maps_root(&self, bundle: &Path) -> PathBuf {
        bundle
            .join("cache")
            .join("itf_cooked")
            .join(&self.platform)
            .join("world")
            .join(&self.maps_folder)
    }

    /// First `.webm` coach video for `map` across all bundles.
    fn coach_video(&self, map: &str) -> Option<PathBuf> {
        self.bundles.iter().find_map(|bundle| {
            let dir = self.maps_root(bundle).join(map).join(COACH_VIDEOS);
            let mut videos: Vec<PathBuf> = fs::read_dir(dir)
                .ok()?
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.extension().map(|e| e == "webm").unwrap_or(false))
                .collect();
            videos.sort();
            videos.into_iter().next()
        })
    }
}

fn sorted_dirs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn read_map_name(song_desc: &Path) -> Result<Option<String>> {
    let raw = fs::read_to_string(song_desc)?;
    let desc: SongDesc = serde_json::from_str(raw.trim_matches('\0'))?;
    Ok(desc
        .components
        .into_iter()
        .next()
        .map(|c| c.map_name.trim().to_string())
        .filter(|name| !name.is_empty()))
}

/// Finds bundle maps with a coach video and no folder in `cache_dir`
/// (compared case-insensitively). The queue is sorted by map name.
pub fn scan_bundles(bundles_dir: &Path, cache_dir: &Path) -> Result<UbiArtPlan> {
    let Some(layout) = BundleLayout::discover(bundles_dir)? else {
        warn!(
            "Could not determine platform or maps folder under {}",
            bundles_dir.display()
        );
        return Ok(UbiArtPlan::default());
    };
    info!(
        "Bundles are for {} with maps under world/{}",
        layout.platform, layout.maps_folder
    );

    let cached: HashSet<String> = sorted_dirs(cache_dir)
        .unwrap_or_default()
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_lowercase())
        .collect();

    let mut maps = Vec::new();
    let mut videos = HashMap::new();
    for bundle in &layout.bundles {
        let Ok(map_dirs) = sorted_dirs(&layout.maps_root(bundle)) else {
            continue;
        };
        for map_dir in map_dirs {
            let song_desc = map_dir.join(SONG_DESC);
            if !song_desc.is_file() {
                continue;
            }
            let map = match read_map_name(&song_desc) {
                Ok(Some(map)) => map,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Unreadable {}: {}", song_desc.display(), e);
                    continue;
                }
            };
            if videos.contains_key(&map) || cached.contains(&map.to_lowercase()) {
                continue;
            }
            match layout.coach_video(&map) {
                Some(video) => {
                    videos.insert(map.clone(), video);
                    maps.push(map);
                }
                None => debug!("{} has no coach video in the bundles", map),
            }
        }
    }

    maps.sort();
    info!("{} UbiArt map(s) to upgrade", maps.len());
    Ok(UbiArtPlan {
        queue: maps.into_iter().collect(),
        videos,
        platform: Some(layout.platform),
    })
}

/// Downloads the HD no-HUD video for a bundle map into the cache, named
/// like the video it replaces.
pub struct UbiArtVideoUpgrader {
    fetcher: ContentFetcher,
    cache_dir: PathBuf,
    videos: HashMap<String, PathBuf>,
}

impl UbiArtVideoUpgrader {
    pub fn new(
        fetcher: ContentFetcher,
        cache_dir: impl Into<PathBuf>,
        videos: HashMap<String, PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            cache_dir: cache_dir.into(),
            videos,
        }
    }
}

#[async_trait]
impl ItemProcessor for UbiArtVideoUpgrader {
    type Item = String;
    type Data = NoHudUrls;

    fn name(&self) -> &str {
        "ubiart-upgrade"
    }

    fn encode_request(&self, map: &String) -> String {
        format!("/nohud codename:{}", map)
    }

    fn expected_shape(&self, _map: &String) -> ReplyShape {
        ReplyShape::Exactly(1)
    }

    fn interpret_reply(&mut self, _map: &String, reply: &Reply) -> Interpretation<NoHudUrls> {
        let mut urls = NoHudUrls::default();
        match parse_unit(&mut urls, reply, 0, NOHUD_FIELDS) {
            Ok(_) => Interpretation::Complete(urls),
            Err(e) => Interpretation::Unparseable(e.to_string()),
        }
    }

    async fn process(&self, urls: NoHudUrls, map: &String) -> Result<(), SnatchError> {
        require(&[("Ultra HD:", urls.ultra_hd.as_ref())])?;
        let url = urls.ultra_hd.unwrap_or_default();

        let dest = self.cache_dir.join(map).join(COACH_VIDEOS);
        async_std::fs::create_dir_all(&dest).await?;
        let downloaded = self.fetcher.fetch(&url, &dest, None).await?;

        let Some(original) = self.videos.get(map).and_then(|p| p.file_name()) else {
            info!("Stored new video for {} as {}", map, downloaded);
            return Ok(());
        };
        let target = dest.join(original);
        let current = dest.join(&downloaded);
        if target != current {
            if target.exists() {
                async_std::fs::remove_file(&target).await?;
            }
            async_std::fs::rename(&current, &target).await?;
        }
        info!("Replaced video for {} at {}", map, target.display());
        Ok(())
    }

    fn supports_redo(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snatcher_core::FetchConfig;

    fn add_map(bundles: &Path, bundle: &str, folder: &str, map: &str, video: Option<&str>) {
        let dir = bundles
            .join(bundle)
            .join("cache/itf_cooked/nx/world/maps")
            .join(folder);
        fs::create_dir_all(&dir).unwrap();
        let desc = format!(r#"{{"COMPONENTS":[{{"MapName":"{}"}}]}}"#, map);
        fs::write(dir.join(SONG_DESC), format!("{}\0", desc)).unwrap();
        if let Some(video) = video {
            let videos = bundles
                .join(bundle)
                .join("cache/itf_cooked/nx/world/maps")
                .join(map)
                .join(COACH_VIDEOS);
            fs::create_dir_all(&videos).unwrap();
            fs::write(videos.join(video), b"old video").unwrap();
        }
    }

    #[test]
    fn test_scan_bundles() {
        let bundles = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        add_map(bundles.path(), "bundle_nx", "rasputin", "Rasputin", Some("rasputin.webm"));
        add_map(bundles.path(), "bundle_nx", "koi", "Koi", Some("koi_ULTRA.webm"));
        add_map(bundles.path(), "bundle_nx", "novideo", "NoVideo", None);
        add_map(bundles.path(), "bundle_nx", "cached", "Cached", Some("c.webm"));
        add_map(bundles.path(), "patch_nx", "patched", "Patched", Some("p.webm"));
        fs::create_dir_all(cache.path().join("CACHED")).unwrap();

        let plan = scan_bundles(bundles.path(), cache.path()).unwrap();
        assert_eq!(plan.platform.as_deref(), Some("nx"));
        assert_eq!(
            plan.queue.iter().cloned().collect::<Vec<_>>(),
            vec!["Koi".to_string(), "Rasputin".to_string()]
        );
        assert_eq!(
            plan.videos["Koi"].file_name().unwrap().to_string_lossy(),
            "koi_ULTRA.webm"
        );
    }

    #[test]
    fn test_scan_without_platform_is_empty() {
        let bundles = tempfile::tempdir().unwrap();
        fs::create_dir_all(bundles.path().join("not_a_bundle")).unwrap();
        let plan = scan_bundles(bundles.path(), bundles.path()).unwrap();
        assert!(plan.queue.is_empty());
        assert!(plan.platform.is_none());
    }

    #[test]
    fn test_command_shape_and_redo() {
        let upgrader = UbiArtVideoUpgrader::new(
            ContentFetcher::new(FetchConfig::default()),
            "/cache",
            HashMap::new(),
        );
        let map = "Koi".to_string();
        assert_eq!(upgrader.encode_request(&map), "/nohud codename:Koi");
        assert_eq!(upgrader.expected_shape(&map), ReplyShape::Exactly(1));
        assert!(upgrader.supports_redo());
    }

    #[async_std::test]
    async fn test_missing_ultra_hd_is_field_missing() {
        let upgrader = UbiArtVideoUpgrader::new(
            ContentFetcher::new(FetchConfig::default()),
            "/cache",
            HashMap::new(),
        );
        let urls = NoHudUrls {
            ultra: Some("http://x/u.webm".into()),
            ..NoHudUrls::default()
        };
        let err = upgrader.process(urls, &"Koi".to_string()).await.unwrap_err();
        assert_eq!(err.to_string(), "missing required fields: Ultra HD:");
    }
}
