use std::future::Future;

use aws_config::{retry::RetryConfig, BehaviorVersion, Region};
use aws_sdk_s3::{
    operation::{
        complete_multipart_upload::CompleteMultipartUploadOutput,
        get_object::GetObjectOutput, list_objects::ListObjectsOutput,
        put_object::PutObjectOutput,
    },
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart},
};
use bytes::Bytes;
use secrecy::ExposeSecret as _;
use tracing::info;

use crate::{config::Credentials, error::BoxError, Options};

/// Builds an s3 client from static credentials. Does not touch the network.
pub fn client(credentials: &Credentials, options: &Options) -> aws_sdk_s3::Client {
    info!("using aws region: {}", credentials.region);
    let creds = aws_sdk_s3::config::Credentials::new(
        &credentials.access_key,
        credentials.secret_key.expose_secret(),
        None,
        None,
        "simple-s3",
    );

    let mut builder = aws_sdk_s3::config::Builder::default()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(credentials.region.clone()))
        .credentials_provider(creds)
        .retry_config(RetryConfig::standard())
        .force_path_style(options.force_path_style);
    if let Some(endpoint_url) = &options.endpoint_url {
        builder = builder.endpoint_url(endpoint_url);
    }

    aws_sdk_s3::Client::from_conf(builder.build())
}

/// The requests [`SimpleS3`](crate::SimpleS3) needs from an object store.
///
/// Implementations own authentication, retries and routing. Errors are passed
/// through to the caller untouched.
pub trait ObjectStorage: Send + Sync {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
    ) -> impl Future<Output = Result<PutObjectOutput, BoxError>> + Send;

    fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<GetObjectOutput, BoxError>> + Send;

    /// Only the first page of results.
    fn list_objects(
        &self,
        bucket: &str,
    ) -> impl Future<Output = Result<ListObjectsOutput, BoxError>> + Send;

    /// Returns the upload id.
    fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<String, BoxError>> + Send;

    /// Returns the etag of the part.
    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> impl Future<Output = Result<String, BoxError>> + Send;

    fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> impl Future<Output = Result<CompleteMultipartUploadOutput, BoxError>> + Send;

    fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

impl ObjectStorage for aws_sdk_s3::Client {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
    ) -> Result<PutObjectOutput, BoxError> {
        let output = self
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await?;

        Ok(output)
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<GetObjectOutput, BoxError> {
        let output = self.get_object().bucket(bucket).key(key).send().await?;

        Ok(output)
    }

    async fn list_objects(&self, bucket: &str) -> Result<ListObjectsOutput, BoxError> {
        let output = self.list_objects().bucket(bucket).send().await?;

        Ok(output)
    }

    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<String, BoxError> {
        let upload_id = self
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await?
            .upload_id()
            .ok_or("upload id missing")?
            .to_owned();

        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String, BoxError> {
        let etag = self
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(body.into())
            .send()
            .await?
            .e_tag()
            .ok_or("etag missing in upload_part response")?
            .to_owned();

        Ok(etag)
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<CompleteMultipartUploadOutput, BoxError> {
        let output = self
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await?;

        Ok(output)
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), BoxError> {
        self.abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await?;

        Ok(())
    }
}
