/// Zoro metadata provider implementation.
use super::zoro_types::{ZoroInfo, ZoroWatch};
use super::{
    Availability, EpisodeRecord, MetadataProvider, MetadataRetrievalError, Show, ShowIdentifier,
    SubtitleEntry, WatchInfo,
};
use crate::stream_selection::StreamHandle;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Metadata provider for a Consumet-compatible Zoro API.
///
/// This provider fetches show information from `{base_url}/anime/zoro/info`
/// and stream sources from `{base_url}/anime/zoro/watch`.
pub(crate) struct ZoroProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    /// Preferred streaming server, passed through to the watch endpoint
    server: Option<String>,
}

impl ZoroProvider {
    /// Creates a new Zoro provider talking to the given API instance.
    pub fn new(
        base_url: &str,
        server: Option<String>,
        timeout: Duration,
    ) -> Result<Self, MetadataRetrievalError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            server,
        })
    }

    /// Performs a GET request and decodes the JSON body.
    ///
    /// A 404 is reported as `ShowNotFound` with the given subject.
    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        subject: &str,
    ) -> Result<T, MetadataRetrievalError> {
        tracing::debug!(url, ?query, "requesting metadata");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))?;

        if response.status() == 404 {
            return Err(MetadataRetrievalError::ShowNotFound(subject.to_string()));
        }

        if !response.status().is_success() {
            return Err(MetadataRetrievalError::RequestError(format!(
                "HTTP {} {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json()
            .map_err(|e| MetadataRetrievalError::ParseError(e.to_string()))
    }

    /// Converts the info response to our internal Show structure.
    fn convert_show(id: &ShowIdentifier, info: ZoroInfo) -> Result<Show, MetadataRetrievalError> {
        let numeric_id = info.mal_id().or_else(|| id.numeric_suffix()).ok_or_else(|| {
            MetadataRetrievalError::InvalidData(format!(
                "No numeric id available for show '{}'",
                id
            ))
        })?;

        let episodes = info
            .episodes
            .into_iter()
            .enumerate()
            .map(|(index, episode)| {
                let number = index + 1;
                EpisodeRecord::from_raw(
                    number,
                    episode
                        .title
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| format!("Episode {}", number)),
                    &episode.id,
                    episode.url.as_deref(),
                    Availability::from_flags(episode.is_subbed, episode.is_dubbed),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Show {
            id: id.clone(),
            title: info.title.trim().to_string(),
            numeric_id,
            episodes,
        })
    }

    /// Converts the watch response to our internal WatchInfo structure.
    fn convert_watch(watch: ZoroWatch) -> WatchInfo {
        WatchInfo {
            sources: watch.sources.into_iter().map(|s| s.url).collect(),
            subtitles: watch
                .subtitles
                .into_iter()
                .map(|s| SubtitleEntry {
                    label: s.lang,
                    url: s.url,
                })
                .collect(),
        }
    }
}

impl MetadataProvider for ZoroProvider {
    fn fetch_show(&self, id: &ShowIdentifier) -> Result<Show, MetadataRetrievalError> {
        let url = format!("{}/anime/zoro/info", self.base_url);
        let info: ZoroInfo = self.get_json(&url, &[("id", id.as_str())], id.as_str())?;

        Self::convert_show(id, info)
    }

    fn fetch_watch_info(&self, handle: &StreamHandle) -> Result<WatchInfo, MetadataRetrievalError> {
        let url = format!("{}/anime/zoro/watch", self.base_url);
        let episode_id = handle.to_string();

        let mut query = vec![("episodeId", episode_id.as_str())];
        if let Some(server) = self.server.as_deref() {
            query.push(("server", server));
        }

        let watch: ZoroWatch = self.get_json(&url, &query, &episode_id)?;

        Ok(Self::convert_watch(watch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO_JSON: &str = r#"{
        "id": "spy-x-family-17977",
        "title": "Spy x Family ",
        "malID": 50265,
        "episodes": [
            {"id": "spy-x-family-17977$episode$89506$both", "number": 1, "title": "Operation Strix",
             "url": "https://hianime.to/watch/spy-x-family-17977?ep=89506", "isSubbed": true, "isDubbed": true},
            {"id": "spy-x-family-17977$episode$89507$sub", "number": 2, "title": null,
             "url": "https://hianime.to/watch/spy-x-family-17977?ep=89507", "isSubbed": true}
        ]
    }"#;

    #[test]
    fn test_convert_show() {
        let id = ShowIdentifier::from_url("spy-x-family-17977").unwrap();
        let info: ZoroInfo = serde_json::from_str(INFO_JSON).unwrap();

        let show = ZoroProvider::convert_show(&id, info).unwrap();

        assert_eq!(show.title, "Spy x Family");
        assert_eq!(show.numeric_id, 50265);
        assert_eq!(show.episodes.len(), 2);
        assert_eq!(show.episodes[0].availability, Availability::Both);
        assert_eq!(show.episodes[0].episode_id, "89506");
        assert_eq!(show.episodes[1].availability, Availability::Sub);
        assert_eq!(show.episodes[1].title, "Episode 2");
        assert_eq!(show.episodes[1].number, 2);
    }

    #[test]
    fn test_convert_show_falls_back_to_slug_number() {
        let id = ShowIdentifier::from_url("spy-x-family-17977").unwrap();
        let info: ZoroInfo =
            serde_json::from_str(r#"{"title": "Spy x Family", "malID": "0", "episodes": []}"#)
                .unwrap();

        let show = ZoroProvider::convert_show(&id, info).unwrap();
        assert_eq!(show.numeric_id, 17977);
        assert!(show.episodes.is_empty());
    }

    #[test]
    fn test_convert_show_without_any_numeric_id() {
        let id = ShowIdentifier::from_url("untitled").unwrap();
        let info: ZoroInfo = serde_json::from_str(r#"{"title": "Untitled"}"#).unwrap();

        assert!(matches!(
            ZoroProvider::convert_show(&id, info),
            Err(MetadataRetrievalError::InvalidData(_))
        ));
    }

    #[test]
    fn test_convert_watch_keeps_upstream_order() {
        let watch: ZoroWatch = serde_json::from_str(
            r#"{
                "sources": [{"url": "https://cdn/master.m3u8", "isM3U8": true}],
                "subtitles": [
                    {"url": "https://cdn/eng.vtt", "lang": "English"},
                    {"url": "https://cdn/thumbs.vtt", "lang": "Thumbnails"},
                    {"url": "https://cdn/spa.vtt", "lang": "Spanish"}
                ]
            }"#,
        )
        .unwrap();

        let info = ZoroProvider::convert_watch(watch);
        assert_eq!(info.sources, vec!["https://cdn/master.m3u8".to_string()]);
        let labels: Vec<_> = info.subtitles.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["English", "Thumbnails", "Spanish"]);
    }
}
