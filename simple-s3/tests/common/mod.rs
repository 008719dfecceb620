//! Helpers for tests.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use aws_sdk_s3::{
    operation::{
        complete_multipart_upload::CompleteMultipartUploadOutput,
        get_object::GetObjectOutput, list_objects::ListObjectsOutput,
        put_object::PutObjectOutput,
    },
    primitives::ByteStream,
    types::{CompletedPart, Object},
};
use bytes::Bytes;
use color_eyre::{
    eyre::{bail, ensure, Context as _},
    Result,
};
use simple_s3::{BoxError, Credentials, Options, SimpleS3};
use testcontainers::{runners::AsyncRunner as _, ContainerAsync};
use testcontainers_modules::minio::MinIO;
use tokio::{
    io::{AsyncRead, AsyncReadExt as _},
    net::ToSocketAddrs,
};

/// Every request [`MemoryStorage`] received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Put { bucket: String, key: String, body: Bytes },
    Get { bucket: String, key: String },
    List { bucket: String },
    CreateMultipart { bucket: String, key: String },
    UploadPart { part_number: i32, len: usize },
    CompleteMultipart { parts: usize },
    AbortMultipart,
}

type PutHook = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// An in-memory object store that remembers what it was asked to do.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Inner>>,
    put_hook: Option<PutHook>,
}

#[derive(Default)]
struct Inner {
    /// Buckets in creation order, objects in insertion order.
    buckets: Vec<(String, Vec<(String, Bytes)>)>,
    uploads: HashMap<String, PendingUpload>,
    next_upload_id: u32,
    calls: Vec<Call>,
    fail_part: Option<i32>,
}

struct PendingUpload {
    bucket: String,
    key: String,
    parts: HashMap<i32, Bytes>,
}

impl Inner {
    fn bucket_mut(
        &mut self,
        bucket: &str,
    ) -> Result<&mut Vec<(String, Bytes)>, BoxError> {
        self.buckets
            .iter_mut()
            .find(|(name, _)| name == bucket)
            .map(|(_, objects)| objects)
            .ok_or_else(|| format!("NoSuchBucket: {bucket}").into())
    }

    fn insert(&mut self, bucket: &str, key: &str, body: Bytes) -> Result<(), BoxError> {
        let objects = self.bucket_mut(bucket)?;
        match objects.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = body,
            None => objects.push((key.to_owned(), body)),
        }
        Ok(())
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `hook(bucket, key)` at the start of every `put_object`, before the
    /// body is read.
    pub fn with_put_hook(self, hook: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        Self {
            put_hook: Some(Arc::new(hook)),
            ..self
        }
    }

    pub fn mk_bucket(&self, name: &str) {
        self.inner
            .lock()
            .unwrap()
            .buckets
            .push((name.to_owned(), Vec::new()));
    }

    pub fn mk_object(&self, bucket: &str, key: &str, contents: &[u8]) {
        self.inner
            .lock()
            .unwrap()
            .insert(bucket, key, Bytes::copy_from_slice(contents))
            .expect("bucket should exist");
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        let mut inner = self.inner.lock().unwrap();
        let objects = inner.bucket_mut(bucket).ok()?;
        objects
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, body)| body.clone())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Makes `upload_part` fail for this part number.
    pub fn fail_part(&self, part_number: i32) {
        self.inner.lock().unwrap().fail_part = Some(part_number);
    }

    fn record(&self, call: Call) {
        self.inner.lock().unwrap().calls.push(call);
    }

    pub fn facade(&self, default_bucket: Option<&str>) -> SimpleS3<MemoryStorage> {
        SimpleS3::with_storage(
            self.clone(),
            Options::builder().maybe_default_bucket(default_bucket).build(),
        )
        .expect("valid options")
    }

    pub fn facade_with_part_size(
        &self,
        default_bucket: &str,
        part_size: usize,
    ) -> SimpleS3<MemoryStorage> {
        SimpleS3::with_storage(
            self.clone(),
            Options::builder()
                .default_bucket(default_bucket)
                .part_size(part_size)
                .build(),
        )
        .expect("valid options")
    }
}

impl simple_s3::ObjectStorage for MemoryStorage {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
    ) -> Result<PutObjectOutput, BoxError> {
        if let Some(hook) = &self.put_hook {
            hook(bucket, key);
        }
        let body = body.collect().await?.into_bytes();
        self.record(Call::Put {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            body: body.clone(),
        });
        self.inner.lock().unwrap().insert(bucket, key, body)?;

        Ok(PutObjectOutput::builder().e_tag("\"memory\"").build())
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<GetObjectOutput, BoxError> {
        self.record(Call::Get {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
        });
        let mut inner = self.inner.lock().unwrap();
        let body = inner
            .bucket_mut(bucket)?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, body)| body.clone())
            .ok_or_else(|| format!("NoSuchKey: {key}"))?;

        Ok(GetObjectOutput::builder()
            .body(ByteStream::from(body))
            .build())
    }

    async fn list_objects(&self, bucket: &str) -> Result<ListObjectsOutput, BoxError> {
        self.record(Call::List {
            bucket: bucket.to_owned(),
        });
        let mut inner = self.inner.lock().unwrap();
        let contents = inner
            .bucket_mut(bucket)?
            .iter()
            .map(|(key, body)| {
                Object::builder()
                    .key(key)
                    .size(i64::try_from(body.len()).unwrap())
                    .build()
            })
            .collect::<Vec<_>>();
        let contents = (!contents.is_empty()).then_some(contents);

        Ok(ListObjectsOutput::builder()
            .name(bucket)
            .set_contents(contents)
            .build())
    }

    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<String, BoxError> {
        self.record(Call::CreateMultipart {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
        });
        let mut inner = self.inner.lock().unwrap();
        inner.bucket_mut(bucket)?;
        inner.next_upload_id += 1;
        let upload_id = format!("upload-{}", inner.next_upload_id);
        inner.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
                parts: HashMap::new(),
            },
        );

        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String, BoxError> {
        self.record(Call::UploadPart {
            part_number,
            len: body.len(),
        });
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_part == Some(part_number) {
            return Err(format!("InternalError: part {part_number}").into());
        }
        let upload = inner
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| format!("NoSuchUpload: {upload_id}"))?;
        upload.parts.insert(part_number, body);

        Ok(format!("\"etag-{part_number}\""))
    }

    async fn complete_multipart_upload(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<CompleteMultipartUploadOutput, BoxError> {
        self.record(Call::CompleteMultipart { parts: parts.len() });
        let mut inner = self.inner.lock().unwrap();
        let mut upload = inner
            .uploads
            .remove(upload_id)
            .ok_or_else(|| format!("NoSuchUpload: {upload_id}"))?;
        let mut body = Vec::new();
        for part in &parts {
            let number = part.part_number().ok_or("part number missing")?;
            let expected_etag = format!("\"etag-{number}\"");
            if part.e_tag() != Some(expected_etag.as_str()) {
                return Err(format!("InvalidPart: {number}").into());
            }
            let data = upload
                .parts
                .remove(&number)
                .ok_or_else(|| format!("InvalidPart: {number}"))?;
            body.extend_from_slice(&data);
        }
        inner.insert(&upload.bucket, &upload.key, body.into())?;

        Ok(CompleteMultipartUploadOutput::builder()
            .bucket(upload.bucket)
            .key(upload.key)
            .e_tag(format!("\"memory-{}\"", parts.len()))
            .build())
    }

    async fn abort_multipart_upload(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
    ) -> Result<(), BoxError> {
        self.record(Call::AbortMultipart);
        self.inner.lock().unwrap().uploads.remove(upload_id);

        Ok(())
    }
}

/// A minio container plus a [`SimpleS3`] pointed at it.
///
/// A lot of this was adapted from
/// <https://github.com/testcontainers/testcontainers-rs-modules-community/blob/0b83d15d052f274e84fffaba4f49b5530c550169/examples/localstack.rs>
pub struct TestCtx {
    s3: SimpleS3,
    _minio: ContainerAsync<MinIO>,
}

impl TestCtx {
    pub async fn new(default_bucket: Option<&str>) -> Result<Self> {
        let container = MinIO::default().start().await?;

        let host_port = container.get_host_port_ipv4(9000).await?;
        let host_ip = container.get_host().await?;

        let addr = format!("{host_ip}:{host_port}");
        let s3 = SimpleS3::new(
            Credentials::new("minioadmin", "minioadmin", "us-east-1"),
            Options::builder()
                .maybe_default_bucket(default_bucket)
                .endpoint_url(format!("http://{addr}"))
                .force_path_style(true)
                .build(),
        )?;

        // avoids race condition where the tcp connection might be
        // refused
        wait_for_tcp(Duration::from_millis(1000), addr)
            .await
            .wrap_err("timed out waiting for tcp")?;

        s3.storage()
            .list_buckets()
            .max_buckets(1)
            .send()
            .await
            .wrap_err("failed to list buckets as sanity check that minio is running")?;

        Ok(Self { s3, _minio: container })
    }

    pub fn s3(&self) -> &SimpleS3 {
        &self.s3
    }

    pub async fn mk_bucket(&self, name: &str) -> Result<()> {
        self.s3
            .storage()
            .create_bucket()
            .bucket(name)
            .send()
            .await
            .wrap_err_with(|| format!("failed to create bucket {name}"))?;

        Ok(())
    }
}

pub async fn compare_file_to_buf(
    mut file: impl AsyncRead + Unpin,
    compare_to: &[u8],
) -> Result<()> {
    let mut buf = vec![0u8; 8 * 1024]; // 8KiB chunks
    let mut pos = 0;
    loop {
        let n = file.read(&mut buf).await.wrap_err("failed to read file")?;
        if n == 0 {
            ensure!(
                pos == compare_to.len(),
                "file length mismatch: got {pos}, expected {}",
                compare_to.len()
            );
            break;
        }
        let Some(region) = compare_to.get(pos..pos + n) else {
            bail!(
                "file longer than expected: got {}, expected {}",
                pos + n,
                compare_to.len()
            )
        };
        ensure!(buf[..n] == *region, "content mismatch at position {pos}");
        pos += n;
    }

    Ok(())
}

async fn wait_for_tcp(timeout: Duration, addr: impl ToSocketAddrs) -> Result<()> {
    tokio::time::timeout(timeout, async {
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        loop {
            interval.tick().await;
            if tokio::net::TcpStream::connect(&addr).await.is_ok() {
                break;
            }
        }
    })
    .await
    .wrap_err("timed out")
}
