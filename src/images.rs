//! Game image bundles and the cache specialised for them

use crate::cache::{CacheConfig, LookupCache};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Image references found for one game.
///
/// `cover` is the primary reference: a bundle without one is a failed search
/// and is never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameImages {
    /// Box art / cover URL
    #[serde(default)]
    pub cover: Option<String>,

    /// Hero or background artwork
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub screenshots: Vec<String>,

    /// Provider that produced the cover
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl GameImages {
    /// Bundle with only a cover
    pub fn with_cover(cover: impl Into<String>) -> Self {
        Self {
            cover: Some(cover.into()),
            ..Default::default()
        }
    }

    /// Whether the bundle carries a non-blank cover reference
    pub fn has_cover(&self) -> bool {
        self.cover.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

/// Cache of image bundles keyed by game name and provider
pub type GameImageCache = LookupCache<GameImages>;

impl LookupCache<GameImages> {
    /// Cache that only stores bundles with a cover
    pub async fn for_game_images(config: CacheConfig) -> Result<Self> {
        Ok(Self::new(config).await?.with_validator(GameImages::has_cover))
    }
}
