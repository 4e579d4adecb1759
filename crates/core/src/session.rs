//! Per-process transfer context
//!
//! A [`Session`] is built once at startup and passed by reference into every
//! orchestrator call. It owns the transport, the resolved endpoints and the
//! load-once credential.

use crate::config::Endpoints;
use crate::credential::CachedCredential;
use crate::error::{Error, Result};
use crate::traits::{JsonRequest, RawResponse, Transport};

pub struct Session {
    transport: Box<dyn Transport>,
    endpoints: Endpoints,
    credential: CachedCredential,
}

impl Session {
    pub fn new(
        transport: impl Transport + 'static,
        endpoints: Endpoints,
        credential: CachedCredential,
    ) -> Self {
        Self {
            transport: Box::new(transport),
            endpoints,
            credential,
        }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// The secret API key, loaded on first use
    pub fn secret(&self) -> Result<&str> {
        self.credential.get()
    }

    /// Authenticated JSON call to an API operation
    ///
    /// Anything but 200 is an error; 401 becomes `Error::CredentialInvalid`.
    pub async fn call_api(&self, operation: &str, body: serde_json::Value) -> Result<RawResponse> {
        let api_key = self.secret()?.to_string();
        let url = self.endpoints.api(operation);
        tracing::debug!(%url, "calling API");

        let response = self
            .transport
            .post_json(JsonRequest {
                url,
                api_key: Some(api_key),
                body,
            })
            .await?;

        if response.status != 200 {
            tracing::debug!(status = response.status, operation, "API call rejected");
            return Err(Error::from_status(response.status, response.text()));
        }

        Ok(response)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoints", &self.endpoints)
            .field("credential", &self.credential)
            .finish()
    }
}
