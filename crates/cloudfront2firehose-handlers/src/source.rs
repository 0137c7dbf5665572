// Object sources
//
// Where compressed log objects come from:
// - S3 through the AWS SDK (Lambda, `s3://` locations in the CLI)
// - Any OpenDAL operator (local directories in the CLI, memory in tests)

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use bytes::Bytes;
use opendal::Operator;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("object not found: {location}")]
    NotFound { location: String },

    #[error("failed to read {location}: {message}")]
    Store { location: String, message: String },
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Read-only access to stored log objects by key.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<Bytes, FetchError>;

    /// Human-readable location of `key`, for logs and errors.
    fn locate(&self, key: &str) -> String;
}

/// One S3 bucket read through `aws-sdk-s3`.
///
/// Cheap to build: the client is shared, so a source can be created per
/// event record.
#[derive(Debug, Clone)]
pub struct S3ObjectSource {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectSource {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectSource for S3ObjectSource {
    async fn fetch(&self, key: &str) -> Result<Bytes, FetchError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let location = self.locate(key);
                match e.as_service_error() {
                    Some(service) if service.is_no_such_key() => FetchError::NotFound { location },
                    _ => FetchError::Store {
                        location,
                        message: DisplayErrorContext(&e).to_string(),
                    },
                }
            })?;

        let body = output.body.collect().await.map_err(|e| FetchError::Store {
            location: self.locate(key),
            message: e.to_string(),
        })?;
        Ok(body.into_bytes())
    }

    fn locate(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

/// Any OpenDAL operator as an object source.
#[derive(Debug, Clone)]
pub struct OpenDalSource {
    operator: Operator,
}

impl OpenDalSource {
    pub fn new(operator: Operator) -> Self {
        Self { operator }
    }

    /// Source rooted at a local directory
    #[cfg(feature = "services-fs")]
    pub fn new_fs(root: &str) -> Result<Self, FetchError> {
        let builder = opendal::services::Fs::default().root(root);
        let operator = Operator::new(builder)
            .map_err(|e| FetchError::Store {
                location: root.to_string(),
                message: e.to_string(),
            })?
            .finish();
        Ok(Self { operator })
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }
}

#[async_trait]
impl ObjectSource for OpenDalSource {
    async fn fetch(&self, key: &str) -> Result<Bytes, FetchError> {
        match self.operator.read(key).await {
            Ok(buffer) => Ok(buffer.to_bytes()),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Err(FetchError::NotFound {
                location: self.locate(key),
            }),
            Err(e) => Err(FetchError::Store {
                location: self.locate(key),
                message: e.to_string(),
            }),
        }
    }

    fn locate(&self, key: &str) -> String {
        let info = self.operator.info();
        format!("{}://{}{}", info.scheme(), info.root(), key)
    }
}
