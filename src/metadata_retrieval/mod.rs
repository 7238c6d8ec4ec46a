/// Data structures and traits for show metadata retrieval.
///
/// This module provides structures to represent a show, its episodes and the
/// playable sources of a single episode variant, as well as the trait
/// implemented by metadata providers.
mod cached;
mod zoro;
mod zoro_types;

pub(crate) use cached::CachedMetadataProvider;
pub(crate) use zoro::ZoroProvider;

use crate::stream_selection::StreamHandle;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during metadata retrieval operations.
#[derive(Debug, Error)]
pub enum MetadataRetrievalError {
    /// Request to the metadata API failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Failed to parse the API's JSON response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The requested show was not found
    #[error("Show not found: {0}")]
    ShowNotFound(String),

    /// The API returned invalid or unexpected data
    #[error("API returned invalid data: {0}")]
    InvalidData(String),

    /// The show resolved, but without a single episode
    #[error("No episodes listed for show {0}")]
    NoEpisodes(String),

    /// The source URL does not contain a show identifier
    #[error("Could not extract a show identifier from '{0}'")]
    InvalidShowUrl(String),
}

/// Opaque identifier of a show, as used by the metadata API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShowIdentifier(String);

impl ShowIdentifier {
    /// Extracts the show identifier from a watch or detail page URL.
    ///
    /// The identifier is the last non-empty path segment, so both
    /// `https://hianime.to/watch/spy-x-family-17977?ep=89506` and
    /// `https://hianime.to/spy-x-family-17977` yield `spy-x-family-17977`.
    /// Input that is not a URL is taken as a bare identifier.
    pub fn from_url(input: &str) -> Result<Self, MetadataRetrievalError> {
        let trimmed = input.trim();

        let candidate = match reqwest::Url::parse(trimmed) {
            Ok(url) => url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string),
            Err(_) => {
                // Bare identifiers may still carry an episode query
                let without_query = trimmed.split('?').next().unwrap_or_default();
                Some(without_query.trim_matches('/').to_string())
            }
        };

        match candidate {
            Some(id) if !id.is_empty() && !id.contains('/') => Ok(Self(id)),
            _ => Err(MetadataRetrievalError::InvalidShowUrl(input.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric id trailing the slug (`spy-x-family-17977` -> `17977`)
    pub(crate) fn numeric_suffix(&self) -> Option<u64> {
        self.0.rsplit('-').next().and_then(|tail| tail.parse().ok())
    }
}

impl fmt::Display for ShowIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Audio variants an episode is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Sub,
    Dub,
    Both,
}

impl Availability {
    /// Classifies an episode from the API's subbed/dubbed flags.
    ///
    /// Episodes flagged as neither are listed by the site as subbed, so they
    /// fall back to `Sub`.
    pub(crate) fn from_flags(is_subbed: bool, is_dubbed: bool) -> Self {
        match (is_subbed, is_dubbed) {
            (true, true) => Availability::Both,
            (false, true) => Availability::Dub,
            _ => Availability::Sub,
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Availability::Sub => "sub",
            Availability::Dub => "dub",
            Availability::Both => "both",
        };
        f.write_str(label)
    }
}

/// Represents a single episode of a show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// 1-based position of the episode in the show's episode list
    pub number: usize,
    /// The episode title
    pub title: String,
    /// Raw episode identifier as returned by the API (`{watchId}$episode${episodeId}...`)
    pub raw_id: String,
    /// The site's numeric episode id (the `?ep=` parameter)
    pub episode_id: String,
    /// The watch id prefix shared by all episodes of the show
    pub watch_id: String,
    /// Audio variants this episode is available in
    pub availability: Availability,
}

impl EpisodeRecord {
    /// Builds an episode record from the raw API identifiers.
    ///
    /// The episode id is taken from the `?ep=` parameter of the episode URL
    /// when present, otherwise from the segment following `$episode$` in the
    /// raw id.
    pub(crate) fn from_raw(
        number: usize,
        title: String,
        raw_id: &str,
        url: Option<&str>,
        availability: Availability,
    ) -> Result<Self, MetadataRetrievalError> {
        let watch_id = raw_id
            .split("$episode")
            .next()
            .unwrap_or_default()
            .to_string();

        let from_url = url
            .and_then(|u| u.split("?ep=").nth(1))
            .map(|ep| ep.split('&').next().unwrap_or_default());
        let from_raw_id = raw_id
            .split("$episode$")
            .nth(1)
            .map(|rest| rest.split('$').next().unwrap_or_default());

        let episode_id = from_url
            .filter(|ep| !ep.is_empty())
            .or(from_raw_id.filter(|ep| !ep.is_empty()))
            .ok_or_else(|| {
                MetadataRetrievalError::InvalidData(format!(
                    "Episode {} has no episode id (raw id '{}')",
                    number, raw_id
                ))
            })?
            .to_string();

        if watch_id.is_empty() {
            return Err(MetadataRetrievalError::InvalidData(format!(
                "Episode {} has an empty watch id (raw id '{}')",
                number, raw_id
            )));
        }

        Ok(Self {
            number,
            title,
            raw_id: raw_id.to_string(),
            episode_id,
            watch_id,
            availability,
        })
    }
}

/// Represents a show with all of its episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    /// The identifier the show was resolved from
    pub id: ShowIdentifier,
    /// The display title of the show
    pub title: String,
    /// Numeric id used to name downloaded files (the MyAnimeList id when known)
    pub numeric_id: u64,
    /// All episodes, ordered by position
    pub episodes: Vec<EpisodeRecord>,
}

impl Show {
    /// Looks up an episode by its 1-based position.
    pub fn episode(&self, number: usize) -> Option<&EpisodeRecord> {
        number
            .checked_sub(1)
            .and_then(|index| self.episodes.get(index))
    }
}

/// A single subtitle track as listed by the watch endpoint.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SubtitleEntry {
    /// Human readable label, e.g. `English` or `Portuguese - Portuguese(Brazil)`
    pub label: String,
    pub url: String,
}

/// Playable sources of one episode variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct WatchInfo {
    /// Source URLs in the order the API lists them
    pub sources: Vec<String>,
    pub subtitles: Vec<SubtitleEntry>,
}

/// Trait for metadata providers that can fetch show and stream information.
///
/// Providers are shared between the two fetch workers of an episode, so they
/// must be `Sync`.
pub(crate) trait MetadataProvider: Sync {
    /// Fetches the show with its complete episode list.
    ///
    /// # Arguments
    ///
    /// * `id` - The show to fetch
    ///
    /// # Returns
    ///
    /// A Result containing the Show, or a MetadataRetrievalError
    fn fetch_show(&self, id: &ShowIdentifier) -> Result<Show, MetadataRetrievalError>;

    /// Fetches the playable sources and subtitle tracks for a stream handle.
    fn fetch_watch_info(&self, handle: &StreamHandle) -> Result<WatchInfo, MetadataRetrievalError>;
}

/// Resolves a show and rejects results without any episode.
pub(crate) fn resolve_show<P>(
    provider: &P,
    id: &ShowIdentifier,
) -> Result<Show, MetadataRetrievalError>
where
    P: MetadataProvider + ?Sized,
{
    let show = provider.fetch_show(id)?;

    if show.episodes.is_empty() {
        return Err(MetadataRetrievalError::NoEpisodes(id.to_string()));
    }

    tracing::info!(
        show = %id,
        title = %show.title,
        episodes = show.episodes.len(),
        "resolved show metadata"
    );

    Ok(show)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_identifier_from_watch_url() {
        let id = ShowIdentifier::from_url("https://hianime.to/watch/spy-x-family-17977?ep=89506")
            .unwrap();
        assert_eq!(id.as_str(), "spy-x-family-17977");
        assert_eq!(id.numeric_suffix(), Some(17977));
    }

    #[test]
    fn test_show_identifier_from_detail_url_with_trailing_slash() {
        let id = ShowIdentifier::from_url("https://zoro.to/one-piece-100/").unwrap();
        assert_eq!(id.as_str(), "one-piece-100");
    }

    #[test]
    fn test_show_identifier_bare() {
        let id = ShowIdentifier::from_url("  frieren-18542?ep=1 ").unwrap();
        assert_eq!(id.as_str(), "frieren-18542");

        let no_number = ShowIdentifier::from_url("some-show").unwrap();
        assert_eq!(no_number.numeric_suffix(), None);
    }

    #[test]
    fn test_show_identifier_rejects_empty() {
        assert!(ShowIdentifier::from_url("https://hianime.to/").is_err());
        assert!(ShowIdentifier::from_url("   ").is_err());
    }

    #[test]
    fn test_availability_from_flags() {
        assert_eq!(Availability::from_flags(true, true), Availability::Both);
        assert_eq!(Availability::from_flags(true, false), Availability::Sub);
        assert_eq!(Availability::from_flags(false, true), Availability::Dub);
        assert_eq!(Availability::from_flags(false, false), Availability::Sub);
    }

    #[test]
    fn test_episode_record_from_url() {
        let episode = EpisodeRecord::from_raw(
            3,
            "The Third".to_string(),
            "spy-x-family-17977$episode$89508$both",
            Some("https://hianime.to/watch/spy-x-family-17977?ep=89508"),
            Availability::Both,
        )
        .unwrap();

        assert_eq!(episode.watch_id, "spy-x-family-17977");
        assert_eq!(episode.episode_id, "89508");
        assert_eq!(episode.number, 3);
    }

    #[test]
    fn test_episode_record_falls_back_to_raw_id() {
        let episode = EpisodeRecord::from_raw(
            1,
            "Pilot".to_string(),
            "show-1$episode$42$sub",
            None,
            Availability::Sub,
        )
        .unwrap();

        assert_eq!(episode.episode_id, "42");
        assert_eq!(episode.watch_id, "show-1");
    }

    #[test]
    fn test_episode_record_without_episode_id() {
        let result = EpisodeRecord::from_raw(1, "x".into(), "show-1", None, Availability::Sub);
        assert!(matches!(result, Err(MetadataRetrievalError::InvalidData(_))));
    }

    #[test]
    fn test_show_episode_lookup_is_bounds_checked() {
        let show = Show {
            id: ShowIdentifier::from_url("show-1").unwrap(),
            title: "Show".to_string(),
            numeric_id: 1,
            episodes: vec![
                EpisodeRecord::from_raw(1, "A".into(), "show-1$episode$1", None, Availability::Sub)
                    .unwrap(),
            ],
        };

        assert!(show.episode(0).is_none());
        assert_eq!(show.episode(1).map(|e| e.title.as_str()), Some("A"));
        assert!(show.episode(2).is_none());
    }
}
