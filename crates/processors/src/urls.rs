//! URL records filled from reply units, and the field tables that fill
//! them. Field names are the responder's labels, verbatim.

use snatcher_engine::{FieldMap, Slot};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageUrls {
    pub coaches_small: Option<String>,
    pub coaches_large: Option<String>,
    pub cover: Option<String>,
    pub cover1024: Option<String>,
    pub cover_small: Option<String>,
    pub song_title_logo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewUrls {
    pub audio_preview: Option<String>,
    pub high_vp8: Option<String>,
    pub high_vp9: Option<String>,
    pub low_vp8: Option<String>,
    pub low_vp9: Option<String>,
    pub mid_vp8: Option<String>,
    pub mid_vp9: Option<String>,
    pub ultra_vp8: Option<String>,
    pub ultra_vp9: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentUrls {
    pub ultra_hd: Option<String>,
    pub ultra_vp9: Option<String>,
    pub high_hd: Option<String>,
    pub high_vp9: Option<String>,
    pub mid_hd: Option<String>,
    pub mid_vp9: Option<String>,
    pub low_hd: Option<String>,
    pub low_vp9: Option<String>,
    pub audio: Option<String>,
    pub map_package: Option<String>,
}

/// Everything one `/assets` reply describes: images, previews, content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetUrls {
    pub images: ImageUrls,
    pub previews: PreviewUrls,
    pub content: ContentUrls,
}

/// The single unit of a `/nohud` reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoHudUrls {
    pub ultra: Option<String>,
    pub ultra_hd: Option<String>,
    pub high: Option<String>,
    pub high_hd: Option<String>,
    pub mid: Option<String>,
    pub mid_hd: Option<String>,
    pub low: Option<String>,
    pub low_hd: Option<String>,
    pub audio: Option<String>,
}

pub const IMAGE_FIELDS: &FieldMap<ImageUrls> = &[
    ("coachesSmall:", Slot::Text(|u| &mut u.coaches_small)),
    ("coachesLarge:", Slot::Text(|u| &mut u.coaches_large)),
    ("Cover:", Slot::Text(|u| &mut u.cover)),
    ("Cover1024:", Slot::Text(|u| &mut u.cover1024)),
    ("CoverSmall:", Slot::Text(|u| &mut u.cover_small)),
    ("Song Title Logo:", Slot::Text(|u| &mut u.song_title_logo)),
];

pub const PREVIEW_FIELDS: &FieldMap<PreviewUrls> = &[
    ("audioPreview.opus:", Slot::Text(|u| &mut u.audio_preview)),
    ("HIGH.vp8.webm:", Slot::Text(|u| &mut u.high_vp8)),
    ("HIGH.vp9.webm:", Slot::Text(|u| &mut u.high_vp9)),
    ("LOW.vp8.webm:", Slot::Text(|u| &mut u.low_vp8)),
    ("LOW.vp9.webm:", Slot::Text(|u| &mut u.low_vp9)),
    ("MID.vp8.webm:", Slot::Text(|u| &mut u.mid_vp8)),
    ("MID.vp9.webm:", Slot::Text(|u| &mut u.mid_vp9)),
    ("ULTRA.vp8.webm:", Slot::Text(|u| &mut u.ultra_vp8)),
    ("ULTRA.vp9.webm:", Slot::Text(|u| &mut u.ultra_vp9)),
];

pub const CONTENT_FIELDS: &FieldMap<ContentUrls> = &[
    ("Ultra HD:", Slot::Text(|u| &mut u.ultra_hd)),
    ("Ultra VP9:", Slot::Text(|u| &mut u.ultra_vp9)),
    ("High HD:", Slot::Text(|u| &mut u.high_hd)),
    ("High VP9:", Slot::Text(|u| &mut u.high_vp9)),
    ("Mid HD:", Slot::Text(|u| &mut u.mid_hd)),
    ("Mid VP9:", Slot::Text(|u| &mut u.mid_vp9)),
    ("Low HD:", Slot::Text(|u| &mut u.low_hd)),
    ("Low VP9:", Slot::Text(|u| &mut u.low_vp9)),
    ("Audio:", Slot::Text(|u| &mut u.audio)),
    ("mapPackage:", Slot::Text(|u| &mut u.map_package)),
];

/// Preview unit of the `server:jdu` variant of `/assets`.
pub const SERVER_PREVIEW_FIELDS: &FieldMap<PreviewUrls> = &[
    ("Audio:", Slot::Text(|u| &mut u.audio_preview)),
    ("HIGH (vp9)", Slot::Text(|u| &mut u.high_vp9)),
    ("LOW (vp9)", Slot::Text(|u| &mut u.low_vp9)),
    ("MID (vp9)", Slot::Text(|u| &mut u.mid_vp9)),
    ("ULTRA (vp9)", Slot::Text(|u| &mut u.ultra_vp9)),
];

/// `/nohud` unit read into the HD content slots.
pub const SERVER_MAIN_FIELDS: &FieldMap<ContentUrls> = &[
    ("Ultra HD:", Slot::Text(|u| &mut u.ultra_hd)),
    ("High HD:", Slot::Text(|u| &mut u.high_hd)),
    ("Mid HD:", Slot::Text(|u| &mut u.mid_hd)),
    ("Low HD:", Slot::Text(|u| &mut u.low_hd)),
];

pub const NOHUD_FIELDS: &FieldMap<NoHudUrls> = &[
    ("Ultra:", Slot::Text(|u| &mut u.ultra)),
    ("Ultra HD:", Slot::Text(|u| &mut u.ultra_hd)),
    ("High:", Slot::Text(|u| &mut u.high)),
    ("High HD:", Slot::Text(|u| &mut u.high_hd)),
    ("Mid:", Slot::Text(|u| &mut u.mid)),
    ("Mid HD:", Slot::Text(|u| &mut u.mid_hd)),
    ("Low:", Slot::Text(|u| &mut u.low)),
    ("Low HD:", Slot::Text(|u| &mut u.low_hd)),
    ("Audio:", Slot::Text(|u| &mut u.audio)),
];
