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

//! The streaming fetch operation: resolve a push-stream handle immediately,
//! deliver the object data in the background.

use crate::client::StorageInner;
use crate::error::Result;
use crate::relay::{self, CHUNK_SIZE};
use crate::source::HttpSource;
use bytes::Bytes;
use futures::Stream;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// The request builder for [Storage::stream_object][crate::Storage::stream_object] calls.
///
/// # Example
/// ```no_run
/// # tokio_test::block_on(async {
/// # use gcs_fetch::Storage;
/// # let client = Storage::builder().with_access_token("token").build()?;
/// let mut stream = client
///     .stream_object("my-bucket", "my-object")
///     .send()
///     .await?
///     .into_inner();
/// while let Some(chunk) = stream.next().await {
///     println!("received {} bytes", chunk?.len());
/// }
/// # Ok::<(), gcs_fetch::Error>(()) });
/// ```
pub struct StreamObject {
    inner: Arc<StorageInner>,
    bucket: String,
    object: String,
    chunk_size: usize,
}

impl StreamObject {
    pub(crate) fn new<B, O>(inner: Arc<StorageInner>, bucket: B, object: O) -> Self
    where
        B: Into<String>,
        O: Into<String>,
    {
        StreamObject {
            inner,
            bucket: bucket.into(),
            object: object.into(),
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Overrides the chunk size used by the relay.
    ///
    /// The default is [CHUNK_SIZE]. Smaller values reduce the peak memory per
    /// in-flight chunk and the time to the first chunk; larger values reduce
    /// per-chunk overhead. Values below 1 are clamped to 1.
    pub fn with_chunk_size(mut self, v: usize) -> Self {
        self.chunk_size = v.max(1);
        self
    }

    /// Sends the request.
    ///
    /// Resolves as soon as the read stream is open, before any object data
    /// has been transferred. The data is delivered afterwards through
    /// [StreamResponse::into_inner], produced by a background relay task that
    /// runs independently of this future's caller.
    pub async fn send(self) -> Result<StreamResponse> {
        let response = self.inner.open_read(&self.bucket, &self.object).await?;
        let status = response.status();
        let source = HttpSource::new(response);
        // Capacity 1 keeps chunk delivery strictly ordered while bounding
        // relay-side memory to one in-flight chunk beyond the read buffer.
        let (tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        tokio::spawn(relay::run(source, tx, cancel.clone(), self.chunk_size));
        Ok(StreamResponse {
            status,
            stream: ByteStream { rx, cancel },
        })
    }
}

/// The result of a streaming fetch.
///
/// Settles as soon as the read stream is open; the payload follows through
/// the [ByteStream] handle.
#[derive(Debug)]
pub struct StreamResponse {
    status: http::StatusCode,
    stream: ByteStream,
}

impl StreamResponse {
    /// The HTTP status of the open request, `200 OK` on success.
    pub fn status(&self) -> http::StatusCode {
        self.status
    }

    /// Consumes the response, returning the push-stream handle.
    pub fn into_inner(self) -> ByteStream {
        self.stream
    }
}

/// The push-stream handle for a streaming fetch.
///
/// Chunks arrive in read order. After the last chunk the stream produces
/// exactly one terminal: the channel closes (`next()` returns `None`) on a
/// clean end of stream, or one final `Err` item if a mid-transfer read
/// failed. A cancelled stream simply closes.
#[derive(Debug)]
pub struct ByteStream {
    rx: mpsc::Receiver<Result<Bytes>>,
    cancel: CancellationToken,
}

impl ByteStream {
    /// The next chunk of the object.
    ///
    /// Returns `None` once the transfer has ended.
    pub async fn next(&mut self) -> Option<Result<Bytes>> {
        self.rx.recv().await
    }

    /// Signals the relay that no more data is wanted.
    ///
    /// Cancellation is cooperative and best-effort: the relay observes it
    /// between reads, so at most one more chunk may still be delivered, and a
    /// read already blocked on the network is not interrupted. The underlying
    /// connection is released once the relay observes the signal. Dropping
    /// the handle has the same effect.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Converts the handle into a [Stream] of chunks.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes>> + Unpin {
        use futures::stream::unfold;
        Box::pin(unfold(Some(self), move |state| async move {
            if let Some(mut this) = state {
                if let Some(chunk) = this.next().await {
                    return Some((chunk, Some(this)));
                }
            };
            None
        }))
    }
}

impl Drop for ByteStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
