use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{info, warn};
use reqwest::Client;
use serde_json::Value;
use tokio::sync::OnceCell;
use url::Url;

use crate::models::SourceVideo;
use crate::services::source::VideoSource;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const PAGE_SIZE: usize = 50;

/// YouTube Data API v3 backed source for a single channel.
pub struct YouTubeSource {
    client: Client,
    api_base: String,
    api_key: String,
    channel_id: String,
    // a channel's uploads playlist never changes
    uploads_playlist: OnceCell<String>,
}

impl YouTubeSource {
    pub fn new(api_key: impl Into<String>, channel_id: impl Into<String>) -> Self {
        YouTubeSource {
            client: Client::new(),
            api_base: API_BASE.to_string(),
            api_key: api_key.into(),
            channel_id: channel_id.into(),
            uploads_playlist: OnceCell::new(),
        }
    }

    #[cfg(test)]
    fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn get_json(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value> {
        let mut url = Url::parse_with_params(&format!("{}/{endpoint}", self.api_base), params)?;
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {endpoint} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "YouTube API {endpoint} returned {status}: {body}"
            ));
        }

        Ok(response.json::<Value>().await?)
    }

    async fn uploads_playlist_id(&self) -> Result<&str> {
        self.uploads_playlist
            .get_or_try_init(|| self.get_uploads_playlist_id())
            .await
            .map(String::as_str)
    }

    // returns the complete video-library-playlist (as list-id) of the channel
    async fn get_uploads_playlist_id(&self) -> Result<String> {
        let response = self
            .get_json(
                "channels",
                &[("part", "contentDetails"), ("id", self.channel_id.as_str())],
            )
            .await?;

        let uploads_playlist_id = response["items"][0]["contentDetails"]["relatedPlaylists"]
            ["uploads"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("No uploads playlist found"))?;

        Ok(uploads_playlist_id.to_string())
    }

    async fn fetch_playlist_video_ids(
        &self,
        playlist_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<String>> {
        let mut video_ids = Vec::new();
        let mut next_page_token: Option<String> = None;
        let page_size = limit.unwrap_or(PAGE_SIZE).min(PAGE_SIZE).to_string();

        loop {
            let mut params = vec![
                ("part", "snippet"),
                ("playlistId", playlist_id),
                ("maxResults", page_size.as_str()),
            ];
            if let Some(token) = &next_page_token {
                params.push(("pageToken", token.as_str()));
            }

            let response = self.get_json("playlistItems", &params).await?;

            if let Some(items) = response["items"].as_array() {
                for item in items {
                    if let Some(video_id) = item["snippet"]["resourceId"]["videoId"].as_str() {
                        video_ids.push(video_id.to_string());
                    }
                }
            }

            if let Some(limit) = limit {
                if video_ids.len() >= limit {
                    video_ids.truncate(limit);
                    break;
                }
            }

            match response["nextPageToken"].as_str() {
                Some(token) => next_page_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(video_ids)
    }

    async fn fetch_video_details(&self, video_ids: &[String]) -> Result<Vec<SourceVideo>> {
        let mut videos = Vec::with_capacity(video_ids.len());

        for chunk in video_ids.chunks(PAGE_SIZE) {
            let ids = chunk.join(",");
            let response = self
                .get_json("videos", &[("part", "snippet,contentDetails"), ("id", ids.as_str())])
                .await?;

            if let Some(items) = response["items"].as_array() {
                videos.extend(items.iter().filter_map(parse_video_item));
            }
        }

        Ok(videos)
    }
}

fn parse_video_item(item: &Value) -> Option<SourceVideo> {
    let id = item["id"].as_str()?;
    let published = item["snippet"]["publishedAt"].as_str().unwrap_or("");
    let published_at = match DateTime::parse_from_rfc3339(published) {
        Ok(date) => date.with_timezone(&Utc),
        Err(e) => {
            warn!("Skipping video {id}: invalid publishedAt {published:?} ({e})");
            return None;
        }
    };

    Some(SourceVideo {
        id: id.to_string(),
        title: item["snippet"]["title"].as_str().unwrap_or("").to_string(),
        published_at,
        raw_duration: item["contentDetails"]["duration"]
            .as_str()
            .unwrap_or("")
            .to_string(),
    })
}

#[async_trait]
impl VideoSource for YouTubeSource {
    async fn fetch_all_videos(&self) -> Result<Vec<SourceVideo>> {
        let playlist_id = self.uploads_playlist_id().await?;
        let video_ids = self.fetch_playlist_video_ids(playlist_id, None).await?;
        info!(
            "Found {} videos in uploads playlist of {}",
            video_ids.len(),
            self.channel_id
        );
        self.fetch_video_details(&video_ids).await
    }

    async fn fetch_latest_video(&self) -> Result<Option<SourceVideo>> {
        let playlist_id = self.uploads_playlist_id().await?;
        let video_ids = self.fetch_playlist_video_ids(playlist_id, Some(1)).await?;
        if video_ids.is_empty() {
            return Ok(None);
        }
        Ok(self.fetch_video_details(&video_ids).await?.into_iter().next())
    }
}
