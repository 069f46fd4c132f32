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

//! The buffered fetch operation: read a whole object into memory.

use crate::client::StorageInner;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::sync::Arc;

/// The request builder for [Storage::fetch_object][crate::Storage::fetch_object] calls.
///
/// # Example
/// ```no_run
/// # tokio_test::block_on(async {
/// # use gcs_fetch::Storage;
/// # let client = Storage::builder().with_access_token("token").build()?;
/// let response = client.fetch_object("my-bucket", "my-object").send().await?;
/// println!("object contents={:?}", response.payload());
/// # Ok::<(), gcs_fetch::Error>(()) });
/// ```
///
/// There is no way to cancel a buffered fetch once `send()` is running; use
/// [Storage::stream_object][crate::Storage::stream_object] when the caller
/// needs to abandon a transfer midway.
pub struct FetchObject {
    inner: Arc<StorageInner>,
    bucket: String,
    object: String,
}

impl FetchObject {
    pub(crate) fn new<B, O>(inner: Arc<StorageInner>, bucket: B, object: O) -> Self
    where
        B: Into<String>,
        O: Into<String>,
    {
        FetchObject {
            inner,
            bucket: bucket.into(),
            object: object.into(),
        }
    }

    /// Sends the request.
    ///
    /// Resolves with the complete object payload or an error, never a
    /// prefix.
    pub async fn send(self) -> Result<FetchResponse> {
        let mut response = self.inner.open_read(&self.bucket, &self.object).await?;
        let status = response.status();
        let mut contents = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(b)) => contents.extend_from_slice(&b),
                Ok(None) => break,
                // The connection is dropped with `response`.
                Err(e) => return Err(Error::read(e)),
            }
        }
        tracing::debug!(
            bucket = self.bucket,
            object = self.object,
            size = contents.len(),
            "buffered fetch complete"
        );
        Ok(FetchResponse {
            status,
            payload: Bytes::from_owner(contents),
        })
    }
}

/// The result of a buffered fetch: the complete object payload.
#[derive(Debug)]
pub struct FetchResponse {
    status: http::StatusCode,
    payload: Bytes,
}

impl FetchResponse {
    /// The HTTP status of the read, `200 OK` on success.
    pub fn status(&self) -> http::StatusCode {
        self.status
    }

    /// The full object contents.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consumes the response, returning the object contents.
    pub fn into_bytes(self) -> Bytes {
        self.payload
    }
}
