//! Upload sources and their capabilities.
//!
//! A direct upload needs to know the payload size before anything is written, and it
//! reads the payload twice when that size has to be measured. Sources declare up
//! front what they can do: [`UploadSource::declared_len`] is the sized capability and
//! [`UploadSource::rewind`] the seekable one.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::{self, Cursor, SeekFrom};
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeekExt, ReadBuf};

/// Readable payload of a direct upload.
#[async_trait]
pub trait UploadSource: AsyncRead + Send + Unpin {
    /// Payload length, when known without reading.
    fn declared_len(&self) -> Option<u64> {
        None
    }

    /// Return to the first byte. `Ok(false)` means the source cannot seek.
    async fn rewind(&mut self) -> io::Result<bool> {
        Ok(false)
    }
}

/// A file on local disk.
pub struct FileSource {
    file: File,
    len: u64,
}

impl FileSource {
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path).await?;
        let len = file.metadata().await?.len();
        Ok(Self { file, len })
    }
}

impl AsyncRead for FileSource {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().file).poll_read(cx, buf)
    }
}

#[async_trait]
impl UploadSource for FileSource {
    fn declared_len(&self) -> Option<u64> {
        Some(self.len)
    }

    async fn rewind(&mut self) -> io::Result<bool> {
        self.file.seek(SeekFrom::Start(0)).await?;
        Ok(true)
    }
}

/// An in-memory payload.
pub struct BytesSource {
    cursor: Cursor<Bytes>,
}

impl BytesSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            cursor: Cursor::new(data.into()),
        }
    }
}

impl AsyncRead for BytesSource {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().cursor).poll_read(cx, buf)
    }
}

#[async_trait]
impl UploadSource for BytesSource {
    fn declared_len(&self) -> Option<u64> {
        Some(self.cursor.get_ref().len() as u64)
    }

    async fn rewind(&mut self) -> io::Result<bool> {
        self.cursor.set_position(0);
        Ok(true)
    }
}

/// A one-shot reader of unknown length, such as a socket or a pipe.
///
/// It can be measured but not replayed, so direct uploads reject it with
/// `NotSeekable`; large or streamed payloads go through chunked uploads instead.
pub struct StreamSource<R> {
    reader: R,
}

impl<R> StreamSource<R>
where
    R: AsyncRead + Send + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R> AsyncRead for StreamSource<R>
where
    R: AsyncRead + Send + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().reader).poll_read(cx, buf)
    }
}

impl<R> UploadSource for StreamSource<R> where R: AsyncRead + Send + Unpin {}
