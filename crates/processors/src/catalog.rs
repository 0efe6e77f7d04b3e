use anyhow::{anyhow, Context, Result};
use log::info;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub const CUSTOM_TAG: &str = "Custom";

/// One song of the JD Next catalog. Only the fields the downloader reads
/// are typed; everything else is carried through untouched so the sidecar
/// stays a faithful copy of the catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JdNextEntry {
    #[serde(rename = "songID", default)]
    pub song_id: String,
    #[serde(rename = "parentMapName")]
    pub parent_map_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(rename = "hasSongTitleInCover", default)]
    pub has_song_title_in_cover: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<CatalogAssets>,
    #[serde(
        rename = "assetsMetadata",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub assets_metadata: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JdNextEntry {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_custom(&self) -> bool {
        self.has_tag(CUSTOM_TAG)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogAssets {
    #[serde(rename = "audioPreview.opus", default, skip_serializing_if = "Option::is_none")]
    pub audio_preview: Option<String>,
    #[serde(rename = "videoPreview_HIGH.vp8.webm", default, skip_serializing_if = "Option::is_none")]
    pub preview_high_vp8: Option<String>,
    #[serde(rename = "videoPreview_HIGH.vp9.webm", default, skip_serializing_if = "Option::is_none")]
    pub preview_high_vp9: Option<String>,
    #[serde(rename = "videoPreview_LOW.vp8.webm", default, skip_serializing_if = "Option::is_none")]
    pub preview_low_vp8: Option<String>,
    #[serde(rename = "videoPreview_LOW.vp9.webm", default, skip_serializing_if = "Option::is_none")]
    pub preview_low_vp9: Option<String>,
    #[serde(rename = "videoPreview_MID.vp8.webm", default, skip_serializing_if = "Option::is_none")]
    pub preview_mid_vp8: Option<String>,
    #[serde(rename = "videoPreview_MID.vp9.webm", default, skip_serializing_if = "Option::is_none")]
    pub preview_mid_vp9: Option<String>,
    #[serde(rename = "videoPreview_ULTRA.vp8.webm", default, skip_serializing_if = "Option::is_none")]
    pub preview_ultra_vp8: Option<String>,
    #[serde(rename = "videoPreview_ULTRA.vp9.webm", default, skip_serializing_if = "Option::is_none")]
    pub preview_ultra_vp9: Option<String>,
    #[serde(rename = "coachesLarge", default, skip_serializing_if = "Option::is_none")]
    pub coaches_large: Option<String>,
    #[serde(rename = "coachesSmall", default, skip_serializing_if = "Option::is_none")]
    pub coaches_small: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover1024: Option<String>,
    #[serde(rename = "coverSmall", default, skip_serializing_if = "Option::is_none")]
    pub cover_small: Option<String>,
    #[serde(rename = "songTitleLogo", default, skip_serializing_if = "Option::is_none")]
    pub song_title_logo: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A queued catalog entry together with its catalog key.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub song_id: String,
    pub entry: JdNextEntry,
}

impl CatalogItem {
    pub fn map_name(&self) -> &str {
        &self.entry.parent_map_name
    }
}

impl fmt::Display for CatalogItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.map_name())
    }
}

pub type Catalog = BTreeMap<String, JdNextEntry>;

/// Loads the catalog (`songId -> entry`) from a local file or an http(s)
/// URL.
pub async fn load_catalog(source: &str) -> Result<Catalog> {
    let content = if is_remote(source) {
        info!("Fetching catalog from {}", source);
        surf::get(source)
            .recv_string()
            .await
            .map_err(|e| anyhow!("Failed to fetch catalog from {}: {}", source, e))?
    } else {
        async_std::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read catalog {}", source))?
    };
    parse_catalog(&content).with_context(|| format!("Invalid catalog in {}", source))
}

pub fn parse_catalog(content: &str) -> Result<Catalog> {
    Ok(serde_json::from_str(content)?)
}

fn is_remote(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
