use aws_sdk_s3::{
    operation::{
        complete_multipart_upload::CompleteMultipartUploadOutput,
        put_object::PutObjectOutput,
    },
    primitives::ByteStream,
    types::Object,
};
use camino::Utf8Path;
use futures::TryStreamExt as _;
use tracing::{debug, info};

use crate::{
    config::{Credentials, Options},
    error::{Error, Result},
    put_stream::put_stream,
    stage, ObjectStorage,
};

/// What the object store acknowledged after an upload.
#[derive(Debug, Clone)]
pub enum UploadAck {
    /// The body was sent with a single `put_object`.
    Put(PutObjectOutput),
    /// The body was too large for one part and went through a multipart upload.
    Multipart(CompleteMultipartUploadOutput),
}

impl UploadAck {
    pub fn e_tag(&self) -> Option<&str> {
        match self {
            UploadAck::Put(output) => output.e_tag(),
            UploadAck::Multipart(output) => output.e_tag(),
        }
    }

    pub fn version_id(&self) -> Option<&str> {
        match self {
            UploadAck::Put(output) => output.version_id(),
            UploadAck::Multipart(output) => output.version_id(),
        }
    }
}

/// Uploads, downloads and lists objects with as little ceremony as possible.
///
/// Holds one storage client and one http client for its whole lifetime. Both are
/// only read after construction, so a `SimpleS3` can be shared freely between
/// concurrent tasks.
///
/// ```no_run
/// # async fn demo() -> simple_s3::Result<()> {
/// use camino::Utf8Path;
/// use simple_s3::{Credentials, Options, SimpleS3};
///
/// let s3 = SimpleS3::new(
///     Credentials::new("AKIA...", "secret", "eu-central-1"),
///     Options::builder().default_bucket("my-bucket").build(),
/// )?;
/// s3.upload_from_path()
///     .path(Utf8Path::new("report.csv"))
///     .key("reports/report.csv")
///     .call()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SimpleS3<S = aws_sdk_s3::Client> {
    storage: S,
    http: reqwest::Client,
    default_bucket: Option<String>,
    part_size: usize,
}

impl SimpleS3 {
    /// Validates `credentials` and builds an [`aws_sdk_s3::Client`] for them.
    pub fn new(credentials: Credentials, options: Options) -> Result<Self> {
        credentials.validate()?;
        options.validate()?;
        let storage = crate::client(&credentials, &options);

        Self::with_storage(storage, options)
    }
}

#[bon::bon]
impl<S: ObjectStorage> SimpleS3<S> {
    /// Uses an already configured object store instead of building one.
    pub fn with_storage(storage: S, options: Options) -> Result<Self> {
        options.validate()?;

        Ok(Self {
            storage,
            http: reqwest::Client::new(),
            default_bucket: options.default_bucket.filter(|b| !b.is_empty()),
            part_size: options.part_size,
        })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn default_bucket(&self) -> Option<&str> {
        self.default_bucket.as_deref()
    }

    /// Picks `bucket` if given, else the default bucket.
    pub fn resolve_bucket<'a>(&'a self, bucket: Option<&'a str>) -> Result<&'a str> {
        bucket
            .filter(|b| !b.is_empty())
            .or(self.default_bucket.as_deref())
            .ok_or(Error::NoBucket)
    }

    /// Streams the file at `path` into `key`.
    #[builder]
    pub async fn upload_from_path(
        &self,
        path: &Utf8Path,
        key: &str,
        bucket: Option<&str>,
    ) -> Result<UploadAck> {
        let bucket = self.resolve_bucket(bucket)?;
        self.put_file(path, bucket, key).await
    }

    /// Fetches `url` and stores the response body under `key`.
    ///
    /// With `local_path` the body is first written to that file, and the file is
    /// uploaded once it is complete. Without it, the body is uploaded while it
    /// downloads, holding at most one part of it in memory.
    #[builder]
    pub async fn upload_from_url(
        &self,
        url: &str,
        key: &str,
        local_path: Option<&Utf8Path>,
        bucket: Option<&str>,
    ) -> Result<UploadAck> {
        let bucket = self.resolve_bucket(bucket)?;

        debug!(url, "fetching");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|err| Error::fetch(url, err))?;
        let body = response
            .bytes_stream()
            .map_err(|err| Error::fetch(url, err));

        let Some(local_path) = local_path else {
            let ack = put_stream(&self.storage, bucket, key, body, self.part_size)
                .await?;
            info!(url, bucket, key, "uploaded");
            return Ok(ack);
        };

        let len = stage::write_stream(body, local_path).await?;
        debug!(url, %local_path, len, "staged");

        self.put_file(local_path, bucket, key).await
    }

    /// Downloads `key` into the file at `path`, replacing it if it exists.
    ///
    /// Returns the number of bytes written. On error `path` is left untouched.
    #[builder]
    pub async fn download_to(
        &self,
        key: &str,
        path: &Utf8Path,
        bucket: Option<&str>,
    ) -> Result<u64> {
        let bucket = self.resolve_bucket(bucket)?;

        debug!(bucket, key, "get_object");
        let output = self
            .storage
            .get_object(bucket, key)
            .await
            .map_err(|err| Error::storage("get_object", err))?;
        let len =
            stage::write_stream(stage::body_chunks(output.body, "get_object"), path)
                .await?;
        info!(bucket, key, %path, len, "downloaded");

        Ok(len)
    }

    /// Lists the objects of a bucket, in the order the store returned them.
    ///
    /// Only the first page is returned, which is at most 1000 objects on aws.
    pub async fn list_files(&self, bucket: Option<&str>) -> Result<Vec<Object>> {
        let bucket = self.resolve_bucket(bucket)?;

        debug!(bucket, "list_objects");
        let output = self
            .storage
            .list_objects(bucket)
            .await
            .map_err(|err| Error::storage("list_objects", err))?;

        Ok(output.contents.unwrap_or_default())
    }

    async fn put_file(
        &self,
        path: &Utf8Path,
        bucket: &str,
        key: &str,
    ) -> Result<UploadAck> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|err| Error::io(path, err))?;
        let body = ByteStream::read_from()
            .file(file)
            .build()
            .await
            .map_err(|err| Error::io(path, std::io::Error::other(err)))?;

        debug!(bucket, key, %path, "put_object");
        let output = self
            .storage
            .put_object(bucket, key, body)
            .await
            .map_err(|err| Error::storage("put_object", err))?;
        info!(bucket, key, %path, "uploaded");

        Ok(UploadAck::Put(output))
    }
}
