//! Minimal Kubernetes REST client for the two reads the validator needs.

use crate::error::{ValidatorError, ValidatorResult};
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::{Certificate, Client};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct Secret {
    #[serde(default)]
    data: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct NodeList {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

/// Reads secrets and lists nodes through the API server.
#[derive(Debug, Clone)]
pub struct KubeClient {
    base_url: String,
    client: Client,
    token: Option<String>,
    token_file: Option<PathBuf>,
}

impl KubeClient {
    /// Configures the client from the pod's service account.
    ///
    /// The bearer token is re-read on every request so rotated tokens are
    /// picked up.
    pub fn in_cluster() -> ValidatorResult<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| ValidatorError::InCluster("KUBERNETES_SERVICE_HOST not set".into()))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".into());

        let sa_dir = Path::new(SERVICE_ACCOUNT_DIR);
        let ca_path = sa_dir.join("ca.crt");
        let ca = std::fs::read(&ca_path).map_err(|source| ValidatorError::Io {
            path: ca_path,
            source,
        })?;
        let ca = Certificate::from_pem(&ca)
            .map_err(|e| ValidatorError::InCluster(format!("invalid cluster CA: {e}")))?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .add_root_certificate(ca)
            .build()
            .map_err(|e| ValidatorError::InCluster(format!("failed to build HTTP client: {e}")))?;

        let host = if host.contains(':') { format!("[{host}]") } else { host };
        Ok(Self {
            base_url: format!("https://{host}:{port}"),
            client,
            token: None,
            token_file: Some(sa_dir.join("token")),
        })
    }

    /// Client for an API server at `base_url` without authentication.
    pub fn with_base_url(base_url: impl Into<String>) -> ValidatorResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ValidatorError::InCluster(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            token: None,
            token_file: None,
        })
    }

    /// Uses a fixed bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self.token_file = None;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the decoded value of `data[key]` in secret `namespace/name`.
    pub async fn secret_value(&self, namespace: &str, name: &str, key: &str) -> ValidatorResult<Vec<u8>> {
        let url = format!("{}/api/v1/namespaces/{namespace}/secrets/{name}", self.base_url);
        let secret: Secret = self.get_json(&url, &[]).await?;

        let encoded = secret.data.get(key).ok_or_else(|| ValidatorError::SecretKeyMissing {
            namespace: namespace.to_string(),
            name: name.to_string(),
            key: key.to_string(),
        })?;

        STANDARD
            .decode(encoded.trim())
            .map_err(|e| ValidatorError::Decode(format!("secret data '{key}' is not base64: {e}")))
    }

    /// Counts nodes matching `label_selector` (`key=value`).
    pub async fn count_nodes(&self, label_selector: &str) -> ValidatorResult<u32> {
        let url = format!("{}/api/v1/nodes", self.base_url);
        let nodes: NodeList = self
            .get_json(&url, &[("labelSelector", label_selector)])
            .await?;
        Ok(u32::try_from(nodes.items.len()).unwrap_or(u32::MAX))
    }

    async fn bearer(&self) -> ValidatorResult<Option<String>> {
        if let Some(token) = &self.token {
            return Ok(Some(token.clone()));
        }
        match &self.token_file {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .map(|t| Some(t.trim().to_string()))
                .map_err(|source| ValidatorError::Io {
                    path: path.clone(),
                    source,
                }),
            None => Ok(None),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> ValidatorResult<T> {
        let mut request = self.client.get(url).query(query);
        if let Some(token) = self.bearer().await? {
            request = request.bearer_auth(token);
        }

        debug!(url, "Kubernetes API request");
        let response = request
            .send()
            .await
            .map_err(|e| ValidatorError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ValidatorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ValidatorError::Decode(e.to_string()))
    }
}
