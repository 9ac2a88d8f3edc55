//! Authenticated HTTP calls to the device registry

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use thiserror::Error;

const REGISTER_PATH: &str = "/api/1/register";
const UNREGISTER_PATH: &str = "/api/1/unregister";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(String),
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("authentication pending user approval")]
    AuthPending,
    #[error("{0}")]
    Other(String),
}

/// Registry endpoint for a push registration id
pub fn register_url(base: &str, reg_id: &str, device_name: &str) -> Result<Url> {
    let endpoint = format!("{}{}", base.trim_end_matches('/'), REGISTER_PATH);
    Ok(Url::parse_with_params(
        &endpoint,
        &[("regid", reg_id), ("name", device_name)],
    )?)
}

/// Registry endpoint removing a push registration id
pub fn unregister_url(base: &str, reg_id: &str) -> Result<Url> {
    let endpoint = format!("{}{}", base.trim_end_matches('/'), UNREGISTER_PATH);
    Ok(Url::parse_with_params(&endpoint, &[("regid", reg_id)])?)
}

/// Account-authenticated GET returning the HTTP status
#[async_trait]
pub trait DeviceBackend: Send + Sync {
    async fn get(&self, account: &str, url: &Url) -> Result<u16, BackendError>;
}

/// Produces a bearer token for an account
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn token(&self, account: &str) -> Result<String, BackendError>;
}

/// Token handed over on the command line; none means the user has not
/// granted one yet
pub struct StaticTokenAuthenticator {
    token: Option<String>,
}

impl StaticTokenAuthenticator {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn token(&self, _account: &str) -> Result<String, BackendError> {
        self.token.clone().ok_or(BackendError::AuthPending)
    }
}

/// `reqwest` implementation of [`DeviceBackend`]
pub struct HttpBackend<A> {
    client: reqwest::Client,
    auth: A,
}

impl<A: Authenticator> HttpBackend<A> {
    pub fn new(user_agent: &str, timeout: Duration, auth: A) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, auth })
    }
}

#[async_trait]
impl<A: Authenticator> DeviceBackend for HttpBackend<A> {
    async fn get(&self, account: &str, url: &Url) -> Result<u16, BackendError> {
        let token = self.auth.token(account).await?;

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() || e.is_request() {
                    BackendError::Network(e.to_string())
                } else {
                    BackendError::Other(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(BackendError::AuthFailed(format!(
                "{} rejected by {}",
                account,
                url.host_str().unwrap_or_default()
            ))),
            status => Ok(status.as_u16()),
        }
    }
}
