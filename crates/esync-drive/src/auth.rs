use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DriveError;

/// Abstraction over Drive API token acquisition — enables test injection.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, DriveError>;
}

/// Production token provider backed by Application Default Credentials.
pub struct AdcTokenProvider {
    inner: Arc<dyn gcp_auth::TokenProvider>,
}

impl AdcTokenProvider {
    pub async fn new() -> Result<Self, DriveError> {
        let inner = gcp_auth::provider()
            .await
            .map_err(|e| DriveError::Auth(format!("failed to initialize GCP ADC: {e}")))?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl TokenProvider for AdcTokenProvider {
    async fn token(&self) -> Result<String, DriveError> {
        let token = self
            .inner
            .token(&["https://www.googleapis.com/auth/drive.readonly"])
            .await
            .map_err(|e| DriveError::Auth(e.to_string()))?;
        Ok(token.as_str().to_string())
    }
}

/// Test token provider — returns a fixed string without any network call.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, DriveError> {
        Ok(self.0.clone())
    }
}
