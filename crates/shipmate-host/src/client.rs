//! Host API HTTP client

use serde::de::DeserializeOwned;
use shipmate_core::{EndpointKind, ResponseClass, Settings, classify};
use std::time::Duration;

use crate::credentials::Token;
use crate::error::{HostError, Result};

/// Media type selecting the versioned JSON API
pub const ACCEPT: &str = "application/vnd.github.v3+json";

const USER_AGENT: &str = concat!("shipmate/", env!("CARGO_PKG_VERSION"));

/// A classified response
#[derive(Debug)]
pub struct Reply {
    pub url: String,
    pub status: u16,
    pub class: ResponseClass,
    body: String,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        self.class == ResponseClass::Success
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| HostError::malformed(&self.url, e))
    }
}

/// Client for the repository host API
///
/// Every request carries the versioned `Accept` header; requests are
/// authenticated only when a token is configured.
#[derive(Debug, Clone)]
pub struct HostClient {
    http: reqwest::Client,
    api_url: String,
    organization: String,
    token: Option<Token>,
}

impl HostClient {
    pub fn new(
        api_url: impl Into<String>,
        organization: impl Into<String>,
        token: Option<Token>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            organization: organization.into(),
            token,
        })
    }

    pub fn from_settings(settings: &Settings, token: Option<Token>) -> Result<Self> {
        Self::new(&settings.api_url, &settings.organization, token)
    }

    /// API url of a repository under the configured organization
    pub fn repo_url(&self, name: &str) -> String {
        format!("{}/repos/{}/{}", self.api_url, self.organization, name)
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// GET `url` and classify the status for `kind`
    pub async fn get(&self, url: &str, kind: EndpointKind) -> Result<Reply> {
        let request = self.authorize(self.http.get(url));
        self.send(request, url, kind).await
    }

    /// POST a JSON body to `url` and classify the status for `kind`
    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        kind: EndpointKind,
    ) -> Result<Reply> {
        let request = self.authorize(self.http.post(url)).json(body);
        self.send(request, url, kind).await
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header(reqwest::header::ACCEPT, ACCEPT);
        match &self.token {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, token.header_value()),
            None => request,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        kind: EndpointKind,
    ) -> Result<Reply> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        let class = classify(kind, status);
        tracing::debug!(%url, status, ?class, endpoint = %kind, "host request");

        Ok(Reply {
            url: url.to_string(),
            status,
            class,
            body,
        })
    }
}
