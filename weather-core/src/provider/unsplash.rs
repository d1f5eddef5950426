use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::{
    model::BackgroundImage,
    provider::{ImageError, UPSTREAM_TIMEOUT, http_client, truncate_body},
};

use super::ImageProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.unsplash.com";

#[derive(Debug, Clone)]
pub struct UnsplashProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl UnsplashProvider {
    pub fn new(api_key: String) -> reqwest::Result<Self> {
        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: http_client(UPSTREAM_TIMEOUT)?,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> reqwest::Result<Self> {
        self.http = http_client(timeout)?;
        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
struct UsUrls {
    regular: String,
}

#[derive(Debug, Deserialize)]
struct UsUser {
    name: String,
}

#[derive(Debug, Deserialize)]
struct UsPhoto {
    urls: UsUrls,
    user: UsUser,
}

#[derive(Debug, Deserialize)]
struct UsSearchResponse {
    #[serde(default)]
    results: Vec<UsPhoto>,
}

/// Search query for a city under the given weather description.
pub fn search_query(city: &str, description: &str) -> String {
    format!("{} {}", city.trim(), description.trim()).trim().to_string()
}

#[async_trait]
impl ImageProvider for UnsplashProvider {
    async fn fetch_background(
        &self,
        city: &str,
        description: &str,
    ) -> Result<BackgroundImage, ImageError> {
        let url = format!("{}/search/photos", self.base_url);
        let query = search_query(city, description);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("query", query.as_str()),
                ("client_id", self.api_key.as_str()),
                ("per_page", "1"),
                ("orientation", "landscape"),
            ])
            .send()
            .await
            .inspect_err(|e| tracing::warn!(query = %query, error = %e, "Unsplash request failed"))?;

        let status = res.status();
        if status != StatusCode::OK {
            let body = res.text().await.unwrap_or_default();
            tracing::warn!(
                query = %query,
                status = %status,
                body = %truncate_body(&body),
                "Unsplash returned an unexpected status"
            );
            return Err(ImageError::UpstreamError(status));
        }

        let body = res.text().await?;

        let parsed: UsSearchResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, body = %truncate_body(&body), "Failed to parse Unsplash JSON");
            ImageError::InternalError("Failed to parse Unsplash search JSON".to_string())
        })?;

        let photo = parsed
            .results
            .into_iter()
            .next()
            .ok_or(ImageError::NoImagesFound)?;

        Ok(BackgroundImage {
            image_url: photo.urls.regular,
            photographer: photo.user.name,
        })
    }
}
