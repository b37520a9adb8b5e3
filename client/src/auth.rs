use crate::{
    error::{
        ApiError,
        Result,
    },
    BastionClient,
};
use reqwest::{
    Method,
    StatusCode,
};
use std::fmt;

/// Username and password of the API account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl BastionClient {
    /// Log in with basic auth.
    ///
    /// This is the only POST and the only request carrying credentials. The API answers `204 No Content` and sets the
    /// session cookie, which the client's cookie store then replays on every later request.
    #[instrument(level = "debug", skip_all, fields(base_url = %self.base_url(), username = credentials.username()))]
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<()> {
        let reply = self.send(Method::POST, "", &[], Some(credentials)).await?;
        if reply.status != StatusCode::NO_CONTENT {
            return Err(ApiError::Unauthenticated {
                url: reply.url,
                status: reply.status,
            });
        }
        debug!("authenticated to bastion api");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientConfig;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn client_for(server: &MockServer) -> BastionClient {
        let config = ClientConfig {
            timeout: Duration::from_secs(5),
            skip_verify: false,
            user_agent: "test-agent".to_string(),
        };
        BastionClient::new(&config, server.url("/api")).unwrap()
    }

    #[test]
    fn password_is_not_printed() {
        let credentials = Credentials::new("admin", "s3cret");
        let printed = format!("{credentials:?}");
        assert!(printed.contains("admin"));
        assert!(!printed.contains("s3cret"));
    }

    #[tokio::test]
    async fn no_content_means_authenticated() {
        let server = MockServer::start_async().await;
        let login = server
            .mock_async(|when, then| {
                // admin:s3cret
                when.method(POST)
                    .path("/api")
                    .header("authorization", "Basic YWRtaW46czNjcmV0");
                then.status(204);
            })
            .await;

        client_for(&server)
            .authenticate(&Credentials::new("admin", "s3cret"))
            .await
            .unwrap();
        login.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_credentials() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api");
                then.status(401)
                    .json_body(json!({"error": "Unauthorized", "description": "bad credentials"}));
            })
            .await;

        let err = client_for(&server)
            .authenticate(&Credentials::new("admin", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert!(matches!(err, ApiError::Status { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn ok_is_not_a_login() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api");
                then.status(200).body("{}");
            })
            .await;

        let err = client_for(&server)
            .authenticate(&Credentials::new("admin", "s3cret"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn session_cookie_is_replayed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api");
                then.status(204).header("set-cookie", "session=abc123; Path=/");
            })
            .await;
        let users = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/users").header("cookie", "session=abc123");
                then.status(200).json_body(json!([{"user_name": "admin"}]));
            })
            .await;

        let client = client_for(&server);
        client
            .authenticate(&Credentials::new("admin", "s3cret"))
            .await
            .unwrap();
        let listed = client.query_list("users", &[]).await.unwrap();

        users.assert_async().await;
        assert_eq!(listed.len(), 1);
    }
}
