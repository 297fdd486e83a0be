use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::status::VehicleStatus;
use crate::error::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://emea.bff.cariad.digital/vehicle/v1";

/// One vehicle as listed by the account.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct VehicleSummary {
    pub vin: String,
    pub model: Option<String>,
    pub nickname: Option<String>,
}

/// The We Connect account collaborator.
///
/// The daemon only ever talks to the account through this interface: login
/// once at startup, then periodic status fetches per VIN. Authentication
/// failure at login is fatal; later fetch errors are transient.
#[async_trait]
pub trait VehicleApi: Send + Sync {
    async fn login(&mut self) -> Result<()>;

    async fn vehicles(&self) -> Result<Vec<VehicleSummary>>;

    async fn vehicle_status(&self, vin: &str) -> Result<VehicleStatus>;

    /// Fetch the vehicle's picture as PNG bytes.
    async fn vehicle_image(&self, vin: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct VehiclesResponse {
    data: Vec<VehicleSummary>,
}

/// HTTP implementation of [`VehicleApi`].
pub struct WeConnectClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    token: Option<String>,
}

impl WeConnectClient {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::with_base_url(username, password, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        username: impl Into<String>,
        password: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            token: None,
        }
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| Error::Auth("not logged in".to_string()))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(self.token()?)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::Auth("access token rejected".to_string()));
        }

        Ok(response.error_for_status()?.json().await?)
    }
}

#[async_trait]
impl VehicleApi for WeConnectClient {
    async fn login(&mut self) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(&serde_json::json!({
                "email": self.username,
                "password": self.password,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Auth(format!(
                "login rejected with status {}",
                response.status()
            )));
        }

        let token: TokenResponse = response.json().await?;
        self.token = Some(token.access_token);
        Ok(())
    }

    async fn vehicles(&self) -> Result<Vec<VehicleSummary>> {
        let response: VehiclesResponse = self.get_json("/vehicles").await?;
        Ok(response.data)
    }

    async fn vehicle_status(&self, vin: &str) -> Result<VehicleStatus> {
        self.get_json(&format!("/vehicles/{vin}/status")).await
    }

    async fn vehicle_image(&self, vin: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(format!("{}/vehicles/{vin}/images/car", self.base_url))
            .bearer_auth(self.token()?)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_before_login_fail_with_auth_error() {
        let client = WeConnectClient::new("user@example.com", "hunter2");
        let err = client.vehicles().await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn test_vehicle_summary_deserialization() {
        let json = r#"{"vin": "WVWZZZE1ZMP000001", "model": "ID.3", "nickname": "My ID.3"}"#;
        let summary: VehicleSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.vin, "WVWZZZE1ZMP000001");
        assert_eq!(summary.model.as_deref(), Some("ID.3"));
    }
}
