use futures::future::join_all;
use log::{debug, warn};
use snatcher_core::SnatchError;
use snatcher_fetch::ContentFetcher;
use std::path::PathBuf;

/// One download of an item's batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFetch {
    pub url: String,
    pub dest: PathBuf,
    pub name: Option<String>,
}

impl PlannedFetch {
    pub fn hashed(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            name: None,
        }
    }

    pub fn named(url: impl Into<String>, dest: impl Into<PathBuf>, name: &str) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            name: Some(name.to_string()),
        }
    }
}

/// Runs every fetch concurrently and waits for all of them. Returns the
/// stored file names in plan order, or the first failure once the whole
/// batch has settled.
pub async fn fetch_all(
    fetcher: &ContentFetcher,
    plans: &[PlannedFetch],
) -> Result<Vec<String>, SnatchError> {
    debug!("Fetching batch of {} file(s)", plans.len());
    let results = join_all(
        plans
            .iter()
            .map(|plan| fetcher.fetch(&plan.url, &plan.dest, plan.name.as_deref())),
    )
    .await;

    let mut names = Vec::with_capacity(results.len());
    let mut first_error = None;
    for (plan, result) in plans.iter().zip(results) {
        match result {
            Ok(name) => names.push(name),
            Err(e) => {
                warn!("{} -> {}: {}", plan.url, plan.dest.display(), e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(names),
    }
}

/// Fails with `FieldMissing` naming every absent value.
pub fn require(fields: &[(&str, Option<&String>)]) -> Result<(), SnatchError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SnatchError::field_missing(missing))
    }
}
