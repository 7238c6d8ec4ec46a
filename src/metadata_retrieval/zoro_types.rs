/// Zoro metadata API response types for deserialization.
///
/// These structures mirror the JSON returned by the Consumet-style
/// `anime/zoro` endpoints.
use serde::Deserialize;
use serde_json::Value;

/// The response of the `info` endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct ZoroInfo {
    /// The show's display title
    pub title: String,
    /// MyAnimeList id; returned as a number or a string depending on the backend
    #[serde(rename = "malID", default)]
    pub mal_id: Option<Value>,
    /// Episode list, absent for unreleased shows
    #[serde(default)]
    pub episodes: Vec<ZoroEpisode>,
}

impl ZoroInfo {
    /// The MyAnimeList id as a number, if the API provided a usable one.
    pub fn mal_id(&self) -> Option<u64> {
        let id = match self.mal_id.as_ref()? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        id.filter(|id| *id > 0)
    }
}

/// A single episode entry of the `info` endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ZoroEpisode {
    /// Raw id in the form `{watchId}$episode${episodeId}...`
    pub id: String,
    /// Episode title (may be null)
    #[serde(default)]
    pub title: Option<String>,
    /// Watch page URL carrying the `?ep=` parameter
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub is_subbed: bool,
    #[serde(default)]
    pub is_dubbed: bool,
}

/// The response of the `watch` endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct ZoroWatch {
    #[serde(default)]
    pub sources: Vec<ZoroSource>,
    #[serde(default)]
    pub subtitles: Vec<ZoroSubtitle>,
}

/// A playable source.
#[derive(Debug, Deserialize)]
pub(super) struct ZoroSource {
    pub url: String,
}

/// A subtitle (or thumbnail sprite) track.
#[derive(Debug, Deserialize)]
pub(super) struct ZoroSubtitle {
    pub url: String,
    pub lang: String,
}
