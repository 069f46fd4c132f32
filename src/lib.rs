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

//! Buffered and streaming downloads for Google Cloud Storage objects.
//!
//! This crate exposes two retrieval operations for callers that hold a
//! pre-obtained bearer token:
//!
//! * [fetch_object] downloads a whole object into memory and resolves once
//!   with the complete payload.
//! * [stream_object] resolves as soon as the read stream is open, and then
//!   delivers the object incrementally, in fixed-size chunks, through a
//!   [ByteStream] handle fed by a background relay task. The consumer can
//!   cancel the transfer at any time.
//!
//! Each call opens one independent connection; there is no retry, caching,
//! or connection sharing between calls.
//!
//! # Example
//! ```no_run
//! # tokio_test::block_on(async {
//! let mut stream = gcs_fetch::stream_object("my-bucket", "my-object", "ya29.my-token")
//!     .await?
//!     .into_inner();
//! while let Some(chunk) = stream.next().await {
//!     println!("received {} bytes", chunk?.len());
//! }
//! # Ok::<(), gcs_fetch::Error>(()) });
//! ```
//!
//! Applications making several calls with the same token can build one
//! [Storage] client and reuse it:
//! ```no_run
//! # tokio_test::block_on(async {
//! use gcs_fetch::Storage;
//! let client = Storage::builder()
//!     .with_access_token("ya29.my-token")
//!     .build()?;
//! let response = client.fetch_object("my-bucket", "my-object").send().await?;
//! # Ok::<(), gcs_fetch::Error>(()) });
//! ```

mod client;
mod error;
mod fetch_object;
mod relay;
mod source;
mod stream_object;

pub use crate::client::{ClientBuilder, Storage};
pub use crate::error::{Error, Result};
pub use crate::fetch_object::{FetchObject, FetchResponse};
pub use crate::relay::CHUNK_SIZE;
pub use crate::source::ObjectSource;
pub use crate::stream_object::{ByteStream, StreamObject, StreamResponse};

/// Fetches a whole object into memory.
///
/// Builds a client from `access_token` and resolves with the complete
/// payload, or with an error, never a prefix.
///
/// # Parameters
/// * `bucket` - the bucket name, e.g. `my-bucket`.
/// * `object` - the object name.
/// * `access_token` - a bearer token, presented to the service as-is.
pub async fn fetch_object<B, O, T>(bucket: B, object: O, access_token: T) -> Result<FetchResponse>
where
    B: Into<String>,
    O: Into<String>,
    T: Into<String>,
{
    Storage::builder()
        .with_access_token(access_token)
        .build()?
        .fetch_object(bucket, object)
        .send()
        .await
}

/// Opens a streaming fetch for an object.
///
/// Builds a client from `access_token` and resolves as soon as the read
/// stream is open. The object data follows through the returned
/// [StreamResponse]'s [ByteStream] handle, delivered by a background relay
/// task.
///
/// # Parameters
/// * `bucket` - the bucket name, e.g. `my-bucket`.
/// * `object` - the object name.
/// * `access_token` - a bearer token, presented to the service as-is.
pub async fn stream_object<B, O, T>(bucket: B, object: O, access_token: T) -> Result<StreamResponse>
where
    B: Into<String>,
    O: Into<String>,
    T: Into<String>,
{
    Storage::builder()
        .with_access_token(access_token)
        .build()?
        .stream_object(bucket, object)
        .send()
        .await
}
