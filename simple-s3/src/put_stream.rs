use aws_sdk_s3::types::CompletedPart;
use bytes::{Bytes, BytesMut};
use futures::{TryStream, TryStreamExt as _};
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    ObjectStorage, UploadAck,
};

/// Uploads a body of unknown length while holding at most about `part_size`
/// bytes of it in memory.
///
/// Bodies that fit in a single part are sent with one `put_object`. Anything
/// larger becomes a multipart upload whose parts are sent one after another as
/// the data arrives.
pub(crate) async fn put_stream<S, B>(
    storage: &S,
    bucket: &str,
    key: &str,
    body: B,
    part_size: usize,
) -> Result<UploadAck>
where
    S: ObjectStorage,
    B: TryStream<Ok = Bytes, Error = Error>,
{
    let mut body = std::pin::pin!(body.into_stream());
    let mut buf = BytesMut::new();

    // Fill the first part. If the body ends before overflowing it, this is a
    // plain put.
    while buf.len() <= part_size {
        match body.try_next().await? {
            Some(chunk) => buf.extend_from_slice(&chunk),
            None => {
                debug!(bucket, key, len = buf.len(), "single part upload");
                let output = storage
                    .put_object(bucket, key, buf.freeze().into())
                    .await
                    .map_err(|err| Error::storage("put_object", err))?;
                return Ok(UploadAck::Put(output));
            }
        }
    }

    let upload_id = storage
        .create_multipart_upload(bucket, key)
        .await
        .map_err(|err| Error::storage("create_multipart_upload", err))?;
    debug!(bucket, key, upload_id = %upload_id, "started multipart upload");

    match upload_parts(storage, bucket, key, &upload_id, body, buf, part_size).await {
        Ok(parts) => {
            let output = storage
                .complete_multipart_upload(bucket, key, &upload_id, parts)
                .await
                .map_err(|err| Error::storage("complete_multipart_upload", err))?;
            Ok(UploadAck::Multipart(output))
        }
        Err(err) => {
            if let Err(abort_err) = storage
                .abort_multipart_upload(bucket, key, &upload_id)
                .await
            {
                warn!(
                    bucket,
                    key,
                    upload_id = %upload_id,
                    "failed to abort multipart upload: {abort_err}"
                );
            }
            Err(err)
        }
    }
}

async fn upload_parts<S, B>(
    storage: &S,
    bucket: &str,
    key: &str,
    upload_id: &str,
    mut body: B,
    mut buf: BytesMut,
    part_size: usize,
) -> Result<Vec<CompletedPart>>
where
    S: ObjectStorage,
    B: futures::Stream<Item = Result<Bytes>> + Unpin,
{
    let mut parts = Vec::new();
    let mut body_done = false;
    loop {
        while !body_done && buf.len() < part_size {
            match body.try_next().await? {
                Some(chunk) => buf.extend_from_slice(&chunk),
                None => body_done = true,
            }
        }
        if buf.is_empty() {
            break;
        }

        let part = buf.split_to(part_size.min(buf.len())).freeze();
        let part_number = i32::try_from(parts.len() + 1)
            .map_err(|err| Error::storage("upload_part", err))?;
        let len = part.len();
        let e_tag = storage
            .upload_part(bucket, key, upload_id, part_number, part)
            .await
            .map_err(|err| Error::storage("upload_part", err))?;
        debug!(bucket, key, part_number, len, "uploaded part");
        parts.push(
            CompletedPart::builder()
                .e_tag(e_tag)
                .part_number(part_number)
                .build(),
        );
    }

    Ok(parts)
}
