use secrecy::{ExposeSecret as _, SecretString};

use crate::error::{Error, Result};

/// Default for [`Options::part_size`].
pub const DEFAULT_PART_SIZE: usize = 25 * 1024 * 1024; // 25 MiB

/// Static credentials used to sign every request.
#[derive(Debug)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: SecretString,
    pub region: String,
}

impl Credentials {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: SecretString::new(secret_key.into()),
            region: region.into(),
        }
    }

    /// Errors with [`Error::EmptyCredential`] on the first empty field.
    pub fn validate(&self) -> Result<()> {
        if self.access_key.is_empty() {
            return Err(Error::EmptyCredential("access key"));
        }
        if self.secret_key.expose_secret().is_empty() {
            return Err(Error::EmptyCredential("secret key"));
        }
        if self.region.is_empty() {
            return Err(Error::EmptyCredential("region"));
        }

        Ok(())
    }
}

/// Optional settings for [`SimpleS3`](crate::SimpleS3).
#[derive(Debug, Clone, bon::Builder)]
pub struct Options {
    /// Used by every operation that isn't given an explicit bucket.
    #[builder(into)]
    pub default_bucket: Option<String>,
    /// Talk to an s3 compatible service (minio, localstack, ...) instead of aws.
    #[builder(into)]
    pub endpoint_url: Option<String>,
    #[builder(default)]
    pub force_path_style: bool,
    /// Upper bound on how much of a remote url body is held in memory before
    /// switching to a multipart upload. Also the size of each part.
    ///
    /// Note that s3 rejects parts smaller than 5 MiB, except for the last one.
    #[builder(default = DEFAULT_PART_SIZE)]
    pub part_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Options {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.part_size == 0 {
            return Err(Error::InvalidPartSize);
        }

        Ok(())
    }
}
