//! Represents an animal record and the image it points at.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::time::Duration;

/// A single animal row.
///
/// The image is tracked through two separate fields: `image_key` is the
/// object-store key the image was uploaded under, while `image_url` caches the
/// last URL handed out for it. A row without a key but with a URL carries an
/// external link that is never re-signed.
#[derive(Serialize, Clone, FromRow, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Animal {
    /// Generated row identifier, immutable once assigned.
    pub id: i64,

    pub name: String,

    pub species: String,

    /// Object-store key (`<uuid><ext>`), if an image was uploaded.
    pub image_key: Option<String>,

    /// Last resolved URL, or an external URL when `image_key` is absent.
    pub image_url: Option<String>,

    /// When `image_url` stops being valid. `None` for external URLs.
    pub image_url_expires_at: Option<DateTime<Utc>>,
}

/// Payload accepted when creating an animal.
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NewAnimal {
    pub name: String,
    pub species: String,

    /// Either an object-store key or an `http(s)` URL.
    #[serde(default)]
    pub image: Option<String>,
}

/// Where a client-supplied image reference points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageRef {
    /// A bare key inside the configured bucket.
    Key(String),
    /// An already usable URL.
    External(String),
}

impl ImageRef {
    /// Classify a raw reference: anything starting with `http` is treated as
    /// a resolved URL, everything else as an object key.
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http") {
            ImageRef::External(raw.to_string())
        } else {
            ImageRef::Key(raw.to_string())
        }
    }
}

impl Animal {
    /// True if the cached URL is still valid `margin` past `now`. A margin
    /// too large to add to `now` is never fresh.
    pub fn has_fresh_url(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        let (Some(_), Some(expires_at)) = (&self.image_url, self.image_url_expires_at) else {
            return false;
        };
        TimeDelta::from_std(margin)
            .ok()
            .and_then(|margin| now.checked_add_signed(margin))
            .is_some_and(|deadline| expires_at > deadline)
    }
}
