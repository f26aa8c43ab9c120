//! HTTP client for the FitShare backend

use crate::{
    backend::{FeedBackend, KeyDirectory},
    session::SessionStorage,
    types::*,
    ClientError, Config, Result,
};
use async_trait::async_trait;
use reqwest::{header, Client, Method, Response};
use serde::Serialize;
use tracing::{debug, instrument};

/// Header carrying the current device id
pub const DEVICE_ID_HEADER: &str = "device-id";

/// Header carrying the logged-in user id
pub const FS_USER_ID_HEADER: &str = "fs-user-id";

/// FitShare backend client
pub struct FitShareClient {
    config: Config,
    http: Client,
    session: SessionStorage,
}

impl FitShareClient {
    /// Create a new client with its own session
    pub fn new(config: Config) -> Result<Self> {
        Self::with_session(config, SessionStorage::new())
    }

    /// Create a client sharing an existing session
    pub fn with_session(config: Config, session: SessionStorage) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            config
                .user_agent
                .parse()
                .map_err(|_| ClientError::Config(format!("invalid user agent: {}", config.user_agent)))?,
        );

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            config,
            http,
            session,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the session this client reads its identity headers from
    pub fn session(&self) -> &SessionStorage {
        &self.session
    }

    // ==================== Helper Methods ====================

    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.config.base_url(), path);
        let mut req = self.http.request(method.clone(), &url);

        if let Some(token) = &self.config.access_token {
            req = req.bearer_auth(token);
        }

        if let Some(fs_user_id) = self.session.fs_user_id() {
            req = req.header(FS_USER_ID_HEADER, fs_user_id);
        }

        if let Some(device_id) = self.session.device_id() {
            req = req.header(DEVICE_ID_HEADER, device_id);
        }

        if let Some(body) = body {
            req = req.json(body);
        }

        debug!("Sending {} request to {}", method, url);
        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::from_response(status.as_u16(), &text));
        }

        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request::<()>(Method::GET, path, None).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl KeyDirectory for FitShareClient {
    #[instrument(skip(self, request), fields(device_id = %request.device_id))]
    async fn register_public_key(&self, request: &RegisterKeyRequest) -> Result<()> {
        match self.request(Method::POST, "/keys", Some(request)).await {
            Ok(_) => Ok(()),
            Err(ClientError::Api { status, message }) => {
                Err(ClientError::RegistrationRejected { status, message })
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn my_public_key(&self) -> Result<String> {
        let key: MyPublicKey = self.get_json("/keys/my").await?;
        Ok(key.public_key)
    }

    #[instrument(skip(self))]
    async fn friend_keys(&self) -> Result<Vec<RecipientKey>> {
        self.get_json("/relationships/friends").await
    }
}

#[async_trait]
impl FeedBackend for FitShareClient {
    #[instrument(skip(self, data))]
    async fn submit_reference(&self, data: &str) -> Result<String> {
        let body = ReferenceNewsSubmission {
            data: data.to_string(),
        };
        let response = self
            .request(Method::POST, "/news/reference", Some(&body))
            .await?;
        let created: ReferenceNewsCreated = serde_json::from_str(&response.text().await?)?;
        Ok(created.id)
    }

    #[instrument(skip(self, submission), fields(receiver = %submission.receiver_fs_user_id))]
    async fn submit_news(&self, submission: &NewsSubmission) -> Result<()> {
        self.request(Method::POST, "/news", Some(submission)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn received_news(&self) -> Result<Vec<ReceivedFeedItem>> {
        self.get_json("/news/received").await
    }

    #[instrument(skip(self))]
    async fn published_news(&self) -> Result<Vec<ReceivedFeedItem>> {
        self.get_json("/news/published").await
    }
}
