use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::common::{ChatMessage, CourseRecord, UnreadMessage, UserProfile, VolumeSearch};
use crate::error::{AppError, Result};

/// Upper bound for one request; a hung backend surfaces as `FetchFailed`.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Typed access to the marketplace backend and the Google Books API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    books_api_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, books_api_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, books_api_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, books_api_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|err| AppError::Config(format!("invalid server url `{base_url}`: {err}")))?;
        // Relative joins below must keep any path prefix.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let books_api_url = Url::parse(books_api_url).map_err(|err| {
            AppError::Config(format!("invalid books api url `{books_api_url}`: {err}"))
        })?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            base_url,
            books_api_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /past_messages/{id}`, newest first. The server answers `null`
    /// when there is no history.
    pub async fn past_messages(&self, receiver_id: i64) -> Result<Option<Vec<ChatMessage>>> {
        self.get_json(&format!("past_messages/{receiver_id}")).await
    }

    pub async fn user_profile(&self, user_id: i64) -> Result<UserProfile> {
        self.get_json(&format!("users/{user_id}/json")).await
    }

    pub async fn messages(&self) -> Result<Vec<UnreadMessage>> {
        self.get_json("messages").await
    }

    pub async fn unread_messages(&self) -> Result<Vec<UnreadMessage>> {
        self.get_json("unread_messages").await
    }

    /// `path_and_query` is a relative `course_search.json?...` reference.
    pub async fn course_search(&self, path_and_query: &str) -> Result<Vec<CourseRecord>> {
        self.get_json(path_and_query).await
    }

    pub async fn course_details(&self, course_id: &str) -> Result<CourseRecord> {
        self.get_json(&format!("courses/{}/json", urlencoding::encode(course_id)))
            .await
    }

    pub async fn lookup_volumes(&self, isbn: &str) -> Result<VolumeSearch> {
        let response = self
            .http
            .get(self.books_api_url.clone())
            .query(&[("q", format!("isbn:{isbn}"))])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| AppError::FetchFailed(format!("bad path `{path}`: {err}")))?;
        log::debug!("GET {url}");

        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}
