use crate::{
    auth::Credentials,
    error::{
        ApiError,
        Result,
        StatusBody,
    },
    Document,
};
use reqwest::{
    Method,
    StatusCode,
};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Settings used to build the HTTP client of one scrape.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub skip_verify: bool,
    pub user_agent: String,
}

impl ClientConfig {
    /// The client keeps cookies so that the session established by the login call is replayed on every later
    /// request instead of sending basic auth each time.
    pub fn build(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.skip_verify)
            .cookie_store(true)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(ApiError::Build)
    }
}

/// A successful answer: either 200 with its body, or 204 without one.
#[derive(Debug)]
pub(crate) struct Reply {
    pub(crate) url: String,
    pub(crate) status: StatusCode,
    pub(crate) body: String,
}

/// Access to the bastion REST API rooted at a base URI.
///
/// Cloning is cheap and clones share the same connection pool and cookie jar.
#[derive(Clone, Debug)]
pub struct BastionClient {
    http: reqwest::Client,
    base_url: String,
}

impl BastionClient {
    pub fn new(config: &ClientConfig, base_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self::with_http_client(config.build()?, base_url))
    }

    pub fn with_http_client(http: reqwest::Client, base_url: impl AsRef<str>) -> Self {
        Self {
            http,
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        credentials: Option<&Credentials>,
    ) -> Result<Reply> {
        let url = self.url_for(path);
        debug!(%method, %url, "requesting bastion api");

        let mut request = self.http.request(method, &url);
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(credentials) = credentials {
            request = request.basic_auth(credentials.username(), Some(credentials.password()));
        }

        let response = request.send().await.map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;

        match status {
            StatusCode::NO_CONTENT => Ok(Reply {
                url,
                status,
                body: String::new(),
            }),
            StatusCode::OK => Ok(Reply { url, status, body }),
            _ => Err(ApiError::Status {
                url,
                status,
                body: StatusBody::parse(&body),
            }),
        }
    }

    async fn query<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        expected: &'static str,
    ) -> Result<T> {
        let reply = self.send(Method::GET, path, params, None).await?;
        serde_json::from_str(&reply.body).map_err(|source| ApiError::Decode {
            url: reply.url,
            expected,
            body: reply.body,
            source,
        })
    }

    /// GET an endpoint that answers with a JSON array of objects.
    pub async fn query_list(&self, path: &str, params: &[(&str, String)]) -> Result<Vec<Document>> {
        self.query(path, params, "list").await
    }

    /// GET an endpoint that answers with a single JSON object.
    pub async fn query_object(&self, path: &str, params: &[(&str, String)]) -> Result<Document> {
        self.query(path, params, "object").await
    }
}
