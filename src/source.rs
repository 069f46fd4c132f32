// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The pull side of a download: an open, ordered byte source bound to one
//! remote object.

use crate::error::{Error, Result};
use bytes::Buf;
use bytes::Bytes;

/// An open read stream for one remote object.
///
/// A source has single-owner semantics: it is created by the connection
/// opener and handed to exactly one drain or relay, which must call
/// [close][ObjectSource::close] exactly once, on every exit path.
#[async_trait::async_trait]
pub trait ObjectSource: Send {
    /// Reads up to `buf.len()` bytes into `buf`.
    ///
    /// Returns the number of bytes read, with `Ok(0)` reserved for the end of
    /// the stream. Any buffered bytes are yielded before the end of the
    /// stream is reported.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Releases the underlying connection.
    ///
    /// After `close` all reads return `Ok(0)`.
    async fn close(&mut self);
}

/// An [ObjectSource] over an HTTP media-download response.
///
/// The transport produces chunks of arbitrary size; the remainder buffer
/// carries bytes across reads so each read honors the caller's buffer size.
#[derive(Debug)]
pub(crate) struct HttpSource {
    response: Option<reqwest::Response>,
    remainder: Bytes,
}

impl HttpSource {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        Self {
            response: Some(response),
            remainder: Bytes::new(),
        }
    }
}

#[async_trait::async_trait]
impl ObjectSource for HttpSource {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        while self.remainder.is_empty() {
            let Some(response) = self.response.as_mut() else {
                return Ok(0);
            };
            match response.chunk().await {
                Ok(Some(b)) => self.remainder = b,
                Ok(None) => {
                    self.response = None;
                    return Ok(0);
                }
                Err(e) => {
                    // A failed stream yields nothing further.
                    self.response = None;
                    return Err(Error::read(e));
                }
            }
        }
        let n = self.remainder.len().min(buf.len());
        buf[..n].copy_from_slice(&self.remainder[..n]);
        self.remainder.advance(n);
        Ok(n)
    }

    async fn close(&mut self) {
        self.response = None;
        self.remainder = Bytes::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Result = anyhow::Result<()>;

    fn response_from_chunks(
        chunks: Vec<std::result::Result<Bytes, anyhow::Error>>,
    ) -> anyhow::Result<reqwest::Response> {
        let stream = futures::stream::iter(chunks);
        let body = reqwest::Body::wrap_stream(stream);
        let response = http::Response::builder().status(200).body(body)?;
        Ok(reqwest::Response::from(response))
    }

    #[tokio::test]
    async fn splits_large_chunks() -> Result {
        let response = response_from_chunks(vec![Ok(Bytes::from_static(b"0123456789"))])?;
        let mut source = HttpSource::new(response);

        let mut buf = [0_u8; 4];
        let n = source.read(&mut buf).await?;
        assert_eq!((n, &buf[..n]), (4, b"0123".as_slice()));
        let n = source.read(&mut buf).await?;
        assert_eq!((n, &buf[..n]), (4, b"4567".as_slice()));
        let n = source.read(&mut buf).await?;
        assert_eq!((n, &buf[..n]), (2, b"89".as_slice()));
        let n = source.read(&mut buf).await?;
        assert_eq!(n, 0);
        Ok(())
    }

    #[tokio::test]
    async fn merges_small_chunks() -> Result {
        let response = response_from_chunks(vec![
            Ok(Bytes::from_static(b"ab")),
            Ok(Bytes::from_static(b"cd")),
        ])?;
        let mut source = HttpSource::new(response);

        let mut buf = [0_u8; 16];
        let n = source.read(&mut buf).await?;
        assert_eq!(&buf[..n], b"ab");
        let n = source.read(&mut buf).await?;
        assert_eq!(&buf[..n], b"cd");
        let n = source.read(&mut buf).await?;
        assert_eq!(n, 0);
        Ok(())
    }

    #[tokio::test]
    async fn empty_transport_chunks_are_not_eof() -> Result {
        let response = response_from_chunks(vec![
            Ok(Bytes::new()),
            Ok(Bytes::from_static(b"data")),
        ])?;
        let mut source = HttpSource::new(response);

        let mut buf = [0_u8; 16];
        let n = source.read(&mut buf).await?;
        assert_eq!(&buf[..n], b"data");
        Ok(())
    }

    #[tokio::test]
    async fn read_error_poisons_the_source() -> Result {
        let response = response_from_chunks(vec![
            Ok(Bytes::from_static(b"hello")),
            Err(anyhow::Error::msg("bad stuff")),
        ])?;
        let mut source = HttpSource::new(response);

        let mut buf = [0_u8; 16];
        let n = source.read(&mut buf).await?;
        assert_eq!(&buf[..n], b"hello");
        let err = source.read(&mut buf).await.unwrap_err();
        assert!(err.is_stream_read(), "{err:?}");
        // Subsequent reads report end of stream rather than failing again.
        let n = source.read(&mut buf).await?;
        assert_eq!(n, 0);
        Ok(())
    }

    #[tokio::test]
    async fn reads_after_close_return_eof() -> Result {
        let response = response_from_chunks(vec![Ok(Bytes::from_static(b"pending"))])?;
        let mut source = HttpSource::new(response);
        source.close().await;

        let mut buf = [0_u8; 16];
        let n = source.read(&mut buf).await?;
        assert_eq!(n, 0);
        Ok(())
    }
}
