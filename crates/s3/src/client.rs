//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from xfer-core.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, Error as DeleteError, ObjectIdentifier};
use tokio::io::AsyncWriteExt;

use xfer_core::{
    DeleteFailure, DeleteReport, Error, ListOptions, ListResult, ObjectInfo, ObjectStore,
    RemotePath, Result, StoreConfig,
};

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a client from the `[store]` configuration.
    ///
    /// Unset fields fall back to the AWS default chain (environment,
    /// shared profile, instance metadata). The SDK makes a single attempt per
    /// request; retries are driven by the transfer engine.
    pub async fn new(store: &StoreConfig) -> Result<Self> {
        let timeouts = aws_config::timeout::TimeoutConfig::builder()
            .connect_timeout(Duration::from_secs(store.connect_timeout_secs))
            .read_timeout(Duration::from_secs(store.read_timeout_secs))
            .build();

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .timeout_config(timeouts)
            .retry_config(aws_config::retry::RetryConfig::standard().with_max_attempts(1));

        if let Some(region) = &store.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }

        if let Some(endpoint) = &store.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        if let (Some(access_key), Some(secret_key)) = (&store.access_key, &store.secret_key) {
            let credentials = aws_credential_types::Credentials::new(
                access_key,
                secret_key,
                None, // session token
                None, // expiry
                "xfer-static-credentials",
            );
            loader = loader.credentials_provider(credentials);
        }

        let config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(store.force_path_style)
            .build();

        tracing::debug!(
            endpoint = store.endpoint.as_deref().unwrap_or("default"),
            region = config.region().map(|r| r.as_ref()).unwrap_or("unset"),
            force_path_style = store.force_path_style,
            "Created S3 client"
        );

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    /// Check that the configured credentials are accepted by the store
    pub async fn validate_credentials(&self) -> Result<()> {
        self.inner
            .list_buckets()
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, "credential check"))?;
        tracing::debug!("Credentials accepted");
        Ok(())
    }

    /// Format AWS SDK error into a detailed error message
    fn format_sdk_error<E: std::fmt::Display>(error: &SdkError<E>) -> String {
        match error {
            SdkError::ServiceError(service_err) => {
                let err = service_err.err();
                let meta = service_err.raw();
                let mut msg = format!("Service error: {err}");
                if let Some(code) = meta.headers().get("x-amz-error-code")
                    && let Ok(code_str) = std::str::from_utf8(code.as_bytes())
                {
                    msg.push_str(&format!(" (code: {code_str})"));
                }
                msg.push_str(&format!(" (status: {})", meta.status().as_u16()));
                msg
            }
            SdkError::ConstructionFailure(err) => {
                format!("Request construction failed: {err:?}")
            }
            SdkError::TimeoutError(_) => "Request timeout".to_string(),
            SdkError::DispatchFailure(err) => {
                format!("Network dispatch error: {err:?}")
            }
            SdkError::ResponseError(err) => {
                format!("Response error: {err:?}")
            }
            _ => error.to_string(),
        }
    }

    /// Classify an SDK error for the engine's retry and reporting logic
    fn map_sdk_error<E: std::fmt::Display>(error: &SdkError<E>, what: &str) -> Error {
        let message = Self::format_sdk_error(error);
        let lower = message.to_lowercase();

        if [
            "invalidaccesskeyid",
            "signaturedoesnotmatch",
            "accessdenied",
            "expiredtoken",
            "no credentials",
            "credentialsnotloaded",
        ]
        .iter()
        .any(|pattern| lower.contains(pattern))
        {
            Error::Auth(format!("{what}: {message}"))
        } else if ["nosuchkey", "nosuchbucket", "notfound", "status: 404"]
            .iter()
            .any(|pattern| lower.contains(pattern))
        {
            Error::NotFound(format!("{what}: {message}"))
        } else {
            Error::Network(format!("{what}: {message}"))
        }
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult> {
        let mut request = self.inner.list_objects_v2().bucket(&path.bucket);

        if !path.key.is_empty() {
            request = request.prefix(&path.key);
        }

        // Set delimiter (for non-recursive listing)
        if !options.recursive {
            request = request.delimiter(options.delimiter.as_deref().unwrap_or("/"));
        }

        if let Some(max) = options.max_keys {
            request = request.max_keys(max);
        }

        if let Some(token) = &options.continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, &format!("list {path}")))?;

        let mut items = Vec::new();

        // Add common prefixes (directories)
        for prefix in response.common_prefixes() {
            if let Some(p) = prefix.prefix() {
                items.push(ObjectInfo::dir(p));
            }
        }

        for object in response.contents() {
            let key = object.key().unwrap_or_default();
            let size = object.size().unwrap_or(0).max(0) as u64;
            let mut info = ObjectInfo::file(key, size);

            if let Some(modified) = object.last_modified() {
                info.last_modified = jiff::Timestamp::from_second(modified.secs()).ok();
            }

            if let Some(etag) = object.e_tag() {
                info.etag = Some(etag.trim_matches('"').to_string());
            }

            items.push(info);
        }

        Ok(ListResult {
            items,
            truncated: response.is_truncated().unwrap_or(false),
            continuation_token: response.next_continuation_token().map(|s| s.to_string()),
        })
    }

    async fn get_object(&self, path: &RemotePath) -> Result<Vec<u8>> {
        let response = self
            .inner
            .get_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, &format!("get {path}")))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Network(format!("get {path}: {e}")))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn put_object(
        &self,
        path: &RemotePath,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<ObjectInfo> {
        let size = data.len() as u64;

        let response = self
            .inner
            .put_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .body(ByteStream::from(data))
            .set_content_type(content_type)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, &format!("put {path}")))?;

        let mut info = ObjectInfo::file(&path.key, size);
        if let Some(etag) = response.e_tag() {
            info.etag = Some(etag.trim_matches('"').to_string());
        }
        info.last_modified = Some(jiff::Timestamp::now());

        Ok(info)
    }

    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<DeleteReport> {
        if keys.is_empty() {
            return Ok(DeleteReport::default());
        }

        let objects = keys
            .iter()
            .map(|k| {
                ObjectIdentifier::builder()
                    .key(k)
                    .build()
                    .map_err(|e| Error::General(format!("delete request for {k}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| Error::General(e.to_string()))?;

        let response = self
            .inner
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, &format!("bulk delete in {bucket}")))?;

        let failures = delete_failures(bucket, response.errors())?;

        if !failures.is_empty() {
            tracing::debug!(bucket, refused = failures.len(), "Store refused some deletes");
        }

        Ok(DeleteReport { failures })
    }

    /// Stream a local file as the request body
    async fn upload_file(
        &self,
        path: &RemotePath,
        source: &Path,
        content_type: Option<String>,
    ) -> Result<u64> {
        let size = tokio::fs::metadata(source).await?.len();
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;
        let content_type = content_type.or_else(|| {
            mime_guess::from_path(source)
                .first()
                .map(|mime| mime.essence_str().to_string())
        });

        self.inner
            .put_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .body(body)
            .content_length(size as i64)
            .set_content_type(content_type)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, &format!("put {path}")))?;

        Ok(size)
    }

    /// Stream the response body into `destination` chunk by chunk
    async fn download_file(&self, path: &RemotePath, destination: &Path) -> Result<u64> {
        let response = self
            .inner
            .get_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, &format!("get {path}")))?;

        let mut body = response.body;
        let mut file = tokio::fs::File::create(destination).await?;
        let mut written = 0u64;

        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| Error::Network(format!("get {path}: {e}")))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}

/// Per-key failures of a bulk delete.
///
/// An error entry without a key cannot be attributed, so it fails the whole
/// request and every key of the batch is reported as not deleted.
fn delete_failures(bucket: &str, errors: &[DeleteError]) -> Result<Vec<DeleteFailure>> {
    errors
        .iter()
        .map(|e| {
            let code = e.code().unwrap_or("Unknown");
            let message = e.message().unwrap_or_default();
            match e.key() {
                Some(key) => Ok(DeleteFailure {
                    key: key.to_string(),
                    code: code.to_string(),
                    message: message.to_string(),
                }),
                None => {
                    tracing::warn!(bucket, code, message, "Bulk delete error without a key");
                    Err(Error::General(format!(
                        "bulk delete in {bucket} reported {code} without a key: {message}"
                    )))
                }
            }
        })
        .collect()
}
