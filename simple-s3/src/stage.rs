//! Materializing byte streams as local files.

use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use futures::{Stream, TryStream, TryStreamExt as _};
use tokio::io::AsyncWriteExt as _;

use crate::error::{Error, Result};

/// Writes every chunk of `stream` to `path` and returns the number of bytes
/// written.
///
/// The chunks go to a temporary file in the same directory which is flushed,
/// synced, closed and then renamed onto `path`. Nothing exists at `path` until
/// all of that succeeded, and the temporary file is removed on every error.
pub(crate) async fn write_stream<S>(stream: S, path: &Utf8Path) -> Result<u64>
where
    S: TryStream<Ok = Bytes, Error = Error>,
{
    let parent_dir = match path.parent() {
        Some(p) if !p.as_str().is_empty() => p.to_owned(),
        _ => Utf8PathBuf::from("."),
    };

    let (tmp_file, tmp_path) = tokio::task::spawn_blocking({
        let parent_dir = parent_dir.clone();
        move || tempfile::NamedTempFile::new_in(parent_dir).map(|f| f.into_parts())
    })
    .await
    .map_err(|join_err| Error::io(&parent_dir, join_err.into()))?
    .map_err(|err| Error::io(&parent_dir, err))?;
    // `tmp_path` deletes the file when dropped, which covers all early returns.

    let mut file = tokio::fs::File::from_std(tmp_file);
    let mut stream = std::pin::pin!(stream.into_stream());
    let mut bytes_written: u64 = 0;
    while let Some(chunk) = stream.try_next().await? {
        file.write_all(&chunk)
            .await
            .map_err(|err| Error::io(path, err))?;
        bytes_written += chunk.len() as u64;
    }
    file.flush().await.map_err(|err| Error::io(path, err))?;
    file.sync_all().await.map_err(|err| Error::io(path, err))?;
    drop(file);

    let out_path = path.to_owned();
    tokio::task::spawn_blocking(move || {
        tmp_path
            .persist(&out_path)
            .map_err(|err| Error::io(&out_path, err.error))
    })
    .await
    .map_err(|join_err| Error::io(path, join_err.into()))??;

    Ok(bytes_written)
}

/// Adapts an s3 object body to the chunk stream expected by [`write_stream`].
pub(crate) fn body_chunks(
    body: ByteStream,
    op: &'static str,
) -> impl Stream<Item = Result<Bytes>> + Send {
    futures::stream::try_unfold(body, move |mut body| async move {
        let chunk = body
            .try_next()
            .await
            .map_err(|err| Error::storage(op, err))?;

        Ok::<_, Error>(chunk.map(|chunk| (chunk, body)))
    })
}
