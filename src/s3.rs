//! Amazon S3 object store.
//!
//! Downloads single objects with a SigV4-signed `GetObject` request. Standard
//! AWS endpoints use virtual-hosted addressing
//! (`https://<bucket>.s3.<region>.amazonaws.com/<key>`); a custom
//! `endpoint_url` (MinIO, LocalStack) switches to path-style addressing
//! (`<endpoint>/<bucket>/<key>`) and keeps the endpoint's scheme.
//!
//! Unless fixed credentials are supplied, they are read from the environment
//! on every request, so a server can start without them and pick them up
//! later.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;

use crate::aws::{self, AwsCredentials, SignableRequest};
use crate::config::ArchiveConfig;
use crate::traits::ObjectStore;

pub struct S3ObjectStore {
    region: String,
    endpoint_url: Option<String>,
    credentials: Option<AwsCredentials>,
    client: reqwest::Client,
}

impl S3ObjectStore {
    pub fn new(config: &ArchiveConfig) -> Self {
        Self {
            region: config.region.clone(),
            endpoint_url: config.endpoint_url.clone(),
            credentials: None,
            client: reqwest::Client::new(),
        }
    }

    /// Sign every request with `credentials` instead of the environment's.
    pub fn with_credentials(config: &ArchiveConfig, credentials: AwsCredentials) -> Self {
        Self {
            credentials: Some(credentials),
            ..Self::new(config)
        }
    }

    /// Resolve `(url, host, path)` for an object.
    fn locate(&self, bucket: &str, key: &str) -> (String, String, String) {
        let encoded_key = aws::encode_path(key);
        match self.endpoint_url {
            Some(ref endpoint) => {
                let endpoint = endpoint.trim_end_matches('/');
                let host = aws::endpoint_host(endpoint).to_string();
                let path = format!("/{}/{}", aws::uri_encode(bucket), encoded_key);
                (format!("{}{}", endpoint, path), host, path)
            }
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", bucket, self.region);
                let path = format!("/{}", encoded_key);
                (format!("https://{}{}", host, path), host, path)
            }
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let creds = AwsCredentials::resolve(self.credentials.as_ref())?;
        let (url, host, path) = self.locate(bucket, key);

        let headers = aws::sign(
            &creds,
            &SignableRequest {
                method: "GET",
                host: &host,
                path: &path,
                query: "",
                payload: b"",
                region: &self.region,
                service: "s3",
            },
            Utc::now(),
        );

        let mut req_builder = self.client.get(&url);
        for (name, value) in &headers {
            req_builder = req_builder.header(name.as_str(), value.as_str());
        }

        let resp = req_builder
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get s3://{}/{}: {}", bucket, key, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            bail!("S3 GetObject failed (HTTP {}) for key '{}'", status, key);
        }

        Ok(resp.bytes().await?.to_vec())
    }
}
