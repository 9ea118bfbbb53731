//! MinIO/S3-compatible storage backend
//!
//! Objects live under a public or private prefix inside one bucket. The
//! public prefix gets an anonymous read policy at startup so plain URLs work;
//! private objects are only reachable through presigned GET URLs.
//!
//! Resized renditions are requested with `width`/`height` query parameters,
//! which an image proxy in front of the bucket is expected to honour.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::request::ResponseData;
use s3::{Bucket, BucketConfiguration, Region};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::backend::{unique_filename, Resize, StorageBackend};
use super::error::StorageError;
use super::PROVIDER_MINIO;
use crate::core::config::MinIOConfig;
use crate::shared::mime::content_type_from_filename;

type HmacSha256 = Hmac<Sha256>;

/// S3 refuses presigned URLs that live longer than seven days
const MAX_PRESIGN_EXPIRY_SECS: u32 = 604_800;

/// Upload result serialized into a file record's `data`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MinioFileData {
    bucket: String,
    key: String,
    is_private: bool,
    size: usize,
    content_type: String,
}

/// MinIO/S3-compatible storage client
pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    endpoint: String,
    public_endpoint: String,
    public_prefix: String,
    private_prefix: String,
    access_key: String,
    secret_key: String,
    region_name: String,
    http_client: Client,
}

impl MinIOClient {
    /// Create a client, making sure the bucket and its public-read policy exist
    pub async fn new(config: MinIOConfig) -> Result<Self, StorageError> {
        let client = Self::from_config(config)?;

        client.ensure_bucket_exists().await;
        client.set_public_read_policy().await;

        info!(
            "MinIO client initialized for endpoint: {}, bucket: {}, public_prefix: {}, private_prefix: {}",
            client.endpoint,
            client.bucket.name(),
            client.public_prefix,
            client.private_prefix
        );

        Ok(client)
    }

    /// Build the client without touching the network
    fn from_config(config: MinIOConfig) -> Result<Self, StorageError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::provider(PROVIDER_MINIO, format!("Invalid credentials: {}", e)))?;

        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| StorageError::provider(PROVIDER_MINIO, format!("Invalid bucket: {}", e)))?;

        // http://endpoint/bucket instead of http://bucket.endpoint
        bucket.set_path_style();

        let http_client = Client::builder()
            .build()
            .map_err(|e| StorageError::provider(PROVIDER_MINIO, e.to_string()))?;

        Ok(Self {
            bucket,
            region,
            credentials,
            endpoint,
            public_endpoint: config.public_endpoint.trim_end_matches('/').to_string(),
            public_prefix: config.public_prefix,
            private_prefix: config.private_prefix,
            access_key: config.access_key,
            secret_key: config.secret_key,
            region_name: config.region,
            http_client,
        })
    }

    /// Create the bucket if missing; an existing bucket is not an error
    async fn ensure_bucket_exists(&self) {
        let result = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match result {
            Ok(response) if (200..300).contains(&response.response_code) => {
                info!("Bucket '{}' created", self.bucket.name());
            }
            Ok(response) => {
                debug!(
                    "Bucket '{}' not created (HTTP {}), assuming it exists",
                    self.bucket.name(),
                    response.response_code
                );
            }
            Err(e) => {
                let message = e.to_string();
                if message.contains("BucketAlreadyOwnedByYou")
                    || message.contains("BucketAlreadyExists")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
            }
        }
    }

    /// Allow anonymous reads below the public prefix
    async fn set_public_read_policy(&self) {
        let bucket_name = self.bucket.name();
        let policy = json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": {"AWS": "*"},
                "Action": ["s3:GetObject"],
                "Resource": [format!("arn:aws:s3:::{}/{}/*", bucket_name, self.public_prefix)]
            }]
        })
        .to_string();

        match self.put_bucket_policy(&bucket_name, &policy).await {
            Ok(()) => info!(
                "Set public read policy for {}/{}/*",
                bucket_name, self.public_prefix
            ),
            Err(e) => warn!(
                "Failed to set bucket policy for '{}': {}. Public URLs may not resolve until \
                 the policy is set manually (mc anonymous set download minio/{}/{})",
                bucket_name, e, bucket_name, self.public_prefix
            ),
        }
    }

    /// PUT ?policy signed with AWS Signature v4 (rust-s3 has no policy API)
    async fn put_bucket_policy(&self, bucket_name: &str, policy: &str) -> Result<(), StorageError> {
        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let endpoint_url = Url::parse(&self.endpoint)
            .map_err(|e| StorageError::provider(PROVIDER_MINIO, format!("Invalid endpoint: {}", e)))?;
        let host = endpoint_url
            .host_str()
            .ok_or_else(|| StorageError::provider(PROVIDER_MINIO, "Endpoint URL has no host"))?;
        let host_header = match endpoint_url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let payload_hash = hex::encode(Sha256::digest(policy.as_bytes()));
        let signed_headers = "host;x-amz-content-sha256;x-amz-date";
        let canonical_request = format!(
            "PUT\n/{}\npolicy=\nhost:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n\n{}\n{}",
            bucket_name, host_header, payload_hash, amz_date, signed_headers, payload_hash
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.region_name);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );
        let signature = self.sign_v4(&date_stamp, &string_to_sign)?;

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.access_key, credential_scope, signed_headers, signature
        );

        let response = self
            .http_client
            .put(format!("{}/{}?policy", self.endpoint, bucket_name))
            .header("Host", &host_header)
            .header("x-amz-date", &amz_date)
            .header("x-amz-content-sha256", &payload_hash)
            .header("Authorization", authorization)
            .header("Content-Type", "application/json")
            .body(policy.to_string())
            .send()
            .await
            .map_err(|e| StorageError::provider(PROVIDER_MINIO, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::from_status(PROVIDER_MINIO, status.as_u16(), &body))
    }

    fn sign_v4(&self, date_stamp: &str, string_to_sign: &str) -> Result<String, StorageError> {
        let secret = format!("AWS4{}", self.secret_key);
        let k_date = hmac_sha256(secret.as_bytes(), date_stamp.as_bytes())?;
        let k_region = hmac_sha256(&k_date, self.region_name.as_bytes())?;
        let k_service = hmac_sha256(&k_region, b"s3")?;
        let k_signing = hmac_sha256(&k_service, b"aws4_request")?;
        Ok(hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes())?))
    }

    /// Full object key: `{prefix}/{folder}/{filename}`
    pub fn generate_key(&self, is_private: bool, folder: &str, filename: &str) -> String {
        let prefix = if is_private {
            &self.private_prefix
        } else {
            &self.public_prefix
        };
        let folder = folder.trim_matches('/');
        if folder.is_empty() {
            format!("{}/{}", prefix, filename)
        } else {
            format!("{}/{}/{}", prefix, folder, filename)
        }
    }

    async fn object_exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.bucket.head_object(key).await {
            Ok((_, status)) => presence_from_status(key, status),
            Err(S3Error::HttpFailWithBody(status, _)) => presence_from_status(key, status),
            Err(e) => Err(StorageError::provider(
                PROVIDER_MINIO,
                format!("Failed to look up '{}': {}", key, e),
            )),
        }
    }

    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }

    fn decode(&self, data: &str) -> Result<MinioFileData, StorageError> {
        serde_json::from_str(data)
            .map_err(|e| StorageError::malformed_data(PROVIDER_MINIO, e.to_string()))
    }

    fn object_url(&self, file_data: &MinioFileData) -> String {
        let endpoint = if file_data.is_private {
            &self.endpoint
        } else {
            &self.public_endpoint
        };
        let encoded_key = file_data
            .key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}/{}", endpoint, file_data.bucket, encoded_key)
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, StorageError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| StorageError::provider(PROVIDER_MINIO, format!("HMAC key error: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// HEAD answers 404 for a missing key; anything else non-2xx is a failure
fn presence_from_status(key: &str, status: u16) -> Result<bool, StorageError> {
    match status {
        200..=299 => Ok(true),
        404 => Ok(false),
        _ => Err(StorageError::from_status(
            PROVIDER_MINIO,
            status,
            &format!("HEAD '{}' failed", key),
        )),
    }
}

/// With `fail-on-err` disabled rust-s3 hands back error responses as data
fn ensure_success(response: &ResponseData) -> Result<(), StorageError> {
    let status = response.status_code();
    if (200..300).contains(&status) {
        Ok(())
    } else {
        let body = String::from_utf8_lossy(response.as_slice());
        Err(StorageError::from_status(PROVIDER_MINIO, status, &body))
    }
}

#[async_trait]
impl StorageBackend for MinIOClient {
    fn provider_name(&self) -> &str {
        PROVIDER_MINIO
    }

    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        folder: &str,
        is_private: bool,
    ) -> Result<String, StorageError> {
        if filename.trim().is_empty() {
            return Err(StorageError::bad_request(
                PROVIDER_MINIO,
                "filename must not be empty",
            ));
        }

        let mut key = self.generate_key(is_private, folder, filename);
        if self.object_exists(&key).await? {
            key = self.generate_key(is_private, folder, &unique_filename(filename));
        }
        let content_type = content_type_from_filename(filename);

        let response = self
            .bucket
            .put_object_with_content_type(&key, &bytes, content_type)
            .await
            .map_err(|e| {
                StorageError::provider(PROVIDER_MINIO, format!("Failed to upload '{}': {}", key, e))
            })?;
        ensure_success(&response)?;

        debug!("Uploaded '{}' to bucket '{}'", key, self.bucket.name());

        let file_data = MinioFileData {
            bucket: self.bucket.name(),
            key,
            is_private,
            size: bytes.len(),
            content_type: content_type.to_string(),
        };
        serde_json::to_string(&file_data)
            .map_err(|e| StorageError::provider(PROVIDER_MINIO, e.to_string()))
    }

    fn file_url(
        &self,
        data: &str,
        width: Option<&str>,
        height: Option<&str>,
    ) -> Result<String, StorageError> {
        let file_data = self.decode(data)?;
        let url = self.object_url(&file_data);
        Ok(match Resize::from_dimensions(width, height) {
            Some(r) => format!(
                "{}?width={}&height={}",
                url,
                urlencoding::encode(r.width),
                urlencoding::encode(r.height)
            ),
            None => url,
        })
    }

    async fn signed_url(
        &self,
        data: &str,
        expire_in_seconds: u32,
        width: Option<&str>,
        height: Option<&str>,
    ) -> Result<String, StorageError> {
        if expire_in_seconds == 0 || expire_in_seconds > MAX_PRESIGN_EXPIRY_SECS {
            return Err(StorageError::bad_request(
                PROVIDER_MINIO,
                format!(
                    "expiry must be between 1 and {} seconds, got {}",
                    MAX_PRESIGN_EXPIRY_SECS, expire_in_seconds
                ),
            ));
        }

        let file_data = self.decode(data)?;
        let custom_queries = Resize::from_dimensions(width, height).map(|r| {
            HashMap::from([
                ("width".to_string(), r.width.to_string()),
                ("height".to_string(), r.height.to_string()),
            ])
        });

        self.bucket
            .presign_get(&file_data.key, expire_in_seconds, custom_queries)
            .await
            .map_err(|e| {
                StorageError::provider(
                    PROVIDER_MINIO,
                    format!("Failed to presign '{}': {}", file_data.key, e),
                )
            })
    }

    async fn delete(&self, data: &str) -> Result<bool, StorageError> {
        let file_data = self.decode(data)?;

        // DeleteObject answers 204 for missing keys too
        if !self.object_exists(&file_data.key).await? {
            debug!(
                "Object '{}' not in bucket '{}', nothing to delete",
                file_data.key,
                self.bucket.name()
            );
            return Ok(false);
        }

        let response = self
            .bucket
            .delete_object(&file_data.key)
            .await
            .map_err(|e| {
                StorageError::provider(
                    PROVIDER_MINIO,
                    format!("Failed to delete '{}': {}", file_data.key, e),
                )
            })?;
        ensure_success(&response)?;

        debug!(
            "Deleted '{}' from bucket '{}'",
            file_data.key,
            self.bucket.name()
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::storage::StorageErrorKind;

    fn client() -> MinIOClient {
        MinIOClient::from_config(MinIOConfig {
            endpoint: "http://minio:9000/".to_string(),
            public_endpoint: "https://cdn.example.com".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            bucket: "images".to_string(),
            region: "us-east-1".to_string(),
            public_prefix: "public".to_string(),
            private_prefix: "private".to_string(),
        })
        .unwrap()
    }

    fn data(key: &str, is_private: bool) -> String {
        serde_json::to_string(&MinioFileData {
            bucket: "images".to_string(),
            key: key.to_string(),
            is_private,
            size: 3,
            content_type: "image/png".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_generate_key_uses_visibility_prefix() {
        let client = client();
        assert_eq!(
            client.generate_key(false, "/images/profile/", "a.png"),
            "public/images/profile/a.png"
        );
        assert_eq!(client.generate_key(true, "", "a.png"), "private/a.png");
    }

    #[test]
    fn test_file_url_for_public_object() {
        let client = client();
        let url = client
            .file_url(&data("public/tests/my photo.png", false), None, None)
            .unwrap();
        assert_eq!(url, "https://cdn.example.com/images/public/tests/my%20photo.png");
    }

    #[test]
    fn test_file_url_resizes_only_with_both_dimensions() {
        let client = client();
        let payload = data("private/a.png", true);

        let resized = client.file_url(&payload, Some("100"), Some("50")).unwrap();
        assert_eq!(
            resized,
            "http://minio:9000/images/private/a.png?width=100&height=50"
        );
        let original = client.file_url(&payload, Some("100"), None).unwrap();
        assert_eq!(original, "http://minio:9000/images/private/a.png");
    }

    #[test]
    fn test_presence_from_head_status() {
        assert!(presence_from_status("k", 200).unwrap());
        assert!(!presence_from_status("k", 404).unwrap());

        let forbidden = presence_from_status("k", 403).unwrap_err();
        assert_eq!(forbidden.kind, StorageErrorKind::Forbidden);
        let failure = presence_from_status("k", 500).unwrap_err();
        assert_eq!(failure.kind, StorageErrorKind::Provider);
    }

    #[tokio::test]
    async fn test_delete_rejects_malformed_data_before_network() {
        let err = client().delete("{}").await.unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::MalformedData);
    }

    #[test]
    fn test_malformed_data_is_reported() {
        let err = client().file_url("not json", None, None).unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::MalformedData);
        assert_eq!(err.provider, PROVIDER_MINIO);
    }

    #[tokio::test]
    async fn test_signed_url_rejects_bad_expiry() {
        let client = client();
        let payload = data("private/a.png", true);

        for expiry in [0, MAX_PRESIGN_EXPIRY_SECS + 1] {
            let err = client
                .signed_url(&payload, expiry, None, None)
                .await
                .unwrap_err();
            assert_eq!(err.kind, StorageErrorKind::BadRequest);
        }
    }

    #[tokio::test]
    async fn test_signed_url_is_presigned_locally() {
        let url = client()
            .signed_url(&data("private/a.png", true), 60, Some("100"), Some("100"))
            .await
            .unwrap();

        assert!(url.starts_with("http://minio:9000/images/private/a.png?"));
        assert!(url.contains("X-Amz-Expires=60"));
        assert!(url.contains("X-Amz-Signature="));
        assert!(url.contains("width=100"));
    }
}
