//! Where the license token and the node count come from.

use crate::error::{ValidatorError, ValidatorResult};
use crate::kube::KubeClient;
use async_trait::async_trait;
use std::path::PathBuf;

/// Supplies the raw license token.
#[async_trait]
pub trait LicenseSource: Send + Sync {
    /// Fetches the current token.
    async fn fetch(&self) -> ValidatorResult<String>;

    /// Where the token comes from, for logs.
    fn describe(&self) -> String;
}

/// Counts the nodes the license is charged for.
#[async_trait]
pub trait NodeCounter: Send + Sync {
    async fn count(&self) -> ValidatorResult<u32>;
}

fn token_from_bytes(bytes: Vec<u8>) -> ValidatorResult<String> {
    let token = String::from_utf8(bytes)
        .map_err(|e| ValidatorError::Decode(format!("license token is not UTF-8: {e}")))?;
    let token = token.trim();
    if token.is_empty() {
        return Err(ValidatorError::EmptyToken);
    }
    Ok(token.to_string())
}

/// Reads the token from a Kubernetes secret.
#[derive(Debug, Clone)]
pub struct SecretLicenseSource {
    client: KubeClient,
    namespace: String,
    name: String,
    key: String,
}

impl SecretLicenseSource {
    pub fn new(
        client: KubeClient,
        namespace: impl Into<String>,
        name: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            name: name.into(),
            key: key.into(),
        }
    }
}

#[async_trait]
impl LicenseSource for SecretLicenseSource {
    async fn fetch(&self) -> ValidatorResult<String> {
        let bytes = self
            .client
            .secret_value(&self.namespace, &self.name, &self.key)
            .await?;
        token_from_bytes(bytes)
    }

    fn describe(&self) -> String {
        format!("secret {}/{} key {}", self.namespace, self.name, self.key)
    }
}

/// Reads the token from a file, typically a mounted secret volume.
#[derive(Debug, Clone)]
pub struct FileLicenseSource {
    path: PathBuf,
}

impl FileLicenseSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LicenseSource for FileLicenseSource {
    async fn fetch(&self) -> ValidatorResult<String> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| ValidatorError::Io {
                path: self.path.clone(),
                source,
            })?;
        token_from_bytes(bytes)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Counts nodes carrying a label.
#[derive(Debug, Clone)]
pub struct LabelNodeCounter {
    client: KubeClient,
    selector: String,
}

impl LabelNodeCounter {
    /// `selector` is a `key=value` label selector.
    pub fn new(client: KubeClient, selector: impl Into<String>) -> Self {
        Self {
            client,
            selector: selector.into(),
        }
    }
}

#[async_trait]
impl NodeCounter for LabelNodeCounter {
    async fn count(&self) -> ValidatorResult<u32> {
        self.client.count_nodes(&self.selector).await
    }
}
