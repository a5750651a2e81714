use reqwest::{header, Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::auth::Credentials;
use crate::config::ApiConfig;
use crate::error::PhotosError;
use crate::models::AlbumPage;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListAlbumsQuery<'a> {
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoveAlbumRequest<'a> {
    album_id: &'a str,
}

/// Thin client over the Photos Library albums resources.
#[derive(Debug, Clone)]
pub struct PhotosClient {
    client: Client,
    base_url: String,
    page_size: u32,
}

impl PhotosClient {
    pub fn new(config: &ApiConfig, credentials: &Credentials) -> Result<Self, PhotosError> {
        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", credentials.bearer()))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Fetch one page of albums
    pub async fn list_page(&self, page_token: Option<&str>) -> Result<AlbumPage, PhotosError> {
        let url = format!("{}/v1/albums", self.base_url);
        tracing::debug!("GET {} pageSize={} pageToken={:?}", url, self.page_size, page_token);

        let response = self
            .client
            .get(&url)
            .query(&ListAlbumsQuery {
                page_size: self.page_size,
                page_token,
            })
            .send()
            .await?;

        Self::handle_json(response).await
    }

    /// Remove an album (requires the full library scope)
    pub async fn remove_album(&self, album_id: &str) -> Result<(), PhotosError> {
        let url = format!("{}/v1/albums:remove", self.base_url);
        tracing::debug!("POST {} albumId={}", url, album_id);

        let response = self
            .client
            .post(&url)
            .json(&RemoveAlbumRequest { album_id })
            .send()
            .await?;

        Self::check_status(response).await?;
        tracing::debug!("POST success: albumId={}", album_id);
        Ok(())
    }

    async fn handle_json<T: DeserializeOwned>(response: Response) -> Result<T, PhotosError> {
        let body = Self::check_status(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn check_status(response: Response) -> Result<String, PhotosError> {
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("Response status: {}", status);

        if status.is_success() {
            Ok(body)
        } else {
            Err(PhotosError::Status { status, body })
        }
    }
}
