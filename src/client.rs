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

//! The client and the connection opener shared by both fetch operations.

use crate::error::{Error, Result};
use crate::fetch_object::FetchObject;
use crate::stream_object::StreamObject;
use std::sync::Arc;

pub(crate) const DEFAULT_HOST: &str = "https://storage.googleapis.com";

/// A client for downloading Google Cloud Storage objects.
///
/// The client authenticates with a pre-obtained bearer token, presented to
/// the service as-is. The token is never parsed, validated, or refreshed;
/// when it expires the service rejects the next open with an
/// [ObjectOpen][crate::Error::ObjectOpen] error.
///
/// # Example
/// ```no_run
/// # tokio_test::block_on(async {
/// use gcs_fetch::Storage;
/// let client = Storage::builder()
///     .with_access_token("ya29.my-token")
///     .build()?;
/// let response = client.fetch_object("my-bucket", "my-object").send().await?;
/// println!("downloaded {} bytes", response.payload().len());
/// # Ok::<(), gcs_fetch::Error>(()) });
/// ```
///
/// `Storage` holds a connection pool internally; it is cheap to clone and
/// does not need to be wrapped in an [Arc] to be reused.
#[derive(Clone, Debug)]
pub struct Storage {
    inner: Arc<StorageInner>,
}

#[derive(Debug)]
pub(crate) struct StorageInner {
    pub(crate) client: reqwest::Client,
    pub(crate) auth: reqwest::header::HeaderValue,
    pub(crate) endpoint: String,
}

impl Storage {
    /// Returns a builder for [Storage].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Fetches a whole object into memory.
    ///
    /// The returned builder's `send()` resolves with the complete payload or
    /// an error, never a prefix.
    ///
    /// # Parameters
    /// * `bucket` - the bucket name, e.g. `my-bucket`.
    /// * `object` - the object name.
    pub fn fetch_object<B, O>(&self, bucket: B, object: O) -> FetchObject
    where
        B: Into<String>,
        O: Into<String>,
    {
        FetchObject::new(self.inner.clone(), bucket, object)
    }

    /// Opens a streaming fetch for an object.
    ///
    /// The returned builder's `send()` resolves as soon as the read stream is
    /// open; the object data is delivered afterwards, in order, through the
    /// [ByteStream][crate::ByteStream] handle.
    pub fn stream_object<B, O>(&self, bucket: B, object: O) -> StreamObject
    where
        B: Into<String>,
        O: Into<String>,
    {
        StreamObject::new(self.inner.clone(), bucket, object)
    }

    pub(crate) fn new(builder: ClientBuilder) -> Result<Self> {
        let client = reqwest::Client::builder()
            // Disable all automatic decompression, the payload must reach the
            // caller byte-for-byte as stored.
            .no_brotli()
            .no_deflate()
            .no_gzip()
            .no_zstd()
            .build()
            .map_err(Error::client)?;
        let token = builder.access_token.unwrap_or_default();
        let mut auth = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(Error::client)?;
        auth.set_sensitive(true);
        let endpoint = builder
            .endpoint
            .unwrap_or_else(|| self::DEFAULT_HOST.to_string());
        Ok(Self {
            inner: Arc::new(StorageInner {
                client,
                auth,
                endpoint,
            }),
        })
    }
}

impl StorageInner {
    /// Opens a read stream positioned at offset 0 and covering the whole
    /// object.
    ///
    /// This is the first point where network failures surface. On any failure
    /// no stream is handed downstream.
    pub(crate) async fn open_read(&self, bucket: &str, object: &str) -> Result<reqwest::Response> {
        let builder = self
            .client
            .request(
                reqwest::Method::GET,
                format!(
                    "{}/storage/v1/b/{bucket}/o/{}",
                    &self.endpoint,
                    enc(object)
                ),
            )
            .query(&[("alt", "media")])
            .header(reqwest::header::AUTHORIZATION, self.auth.clone());
        let response = builder
            .send()
            .await
            .map_err(|e| Error::open_transport(bucket, object, e))?;
        if !response.status().is_success() {
            return Err(open_error(bucket, object, response).await);
        }
        tracing::debug!(bucket, object, "opened object read stream");
        Ok(response)
    }
}

/// Converts a non-success open response into an [Error].
async fn open_error(bucket: &str, object: &str, response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();
    let message = service_error_message(&body)
        .unwrap_or_else(|| String::from_utf8_lossy(&body).into_owned());
    Error::open_rejected(bucket, object, status, message)
}

/// Extracts the message from a JSON error payload, e.g.
/// `{"error": {"code": 404, "message": "No such object: b/o"}}`.
fn service_error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// A builder for [Storage].
///
/// ```no_run
/// use gcs_fetch::Storage;
/// let client = Storage::builder()
///     .with_access_token("ya29.my-token")
///     .build()?;
/// # Ok::<(), gcs_fetch::Error>(())
/// ```
pub struct ClientBuilder {
    endpoint: Option<String>,
    access_token: Option<String>,
}

impl ClientBuilder {
    pub(crate) fn new() -> Self {
        Self {
            endpoint: None,
            access_token: None,
        }
    }

    /// Creates a new client.
    pub fn build(self) -> Result<Storage> {
        Storage::new(self)
    }

    /// Sets the endpoint.
    ///
    /// By default the client uses the global endpoint
    /// (`https://storage.googleapis.com`). Applications using regional
    /// endpoints, emulators, or test servers may override this.
    pub fn with_endpoint<V: Into<String>>(mut self, v: V) -> Self {
        self.endpoint = Some(v.into());
        self
    }

    /// Sets the bearer token used to authenticate requests.
    ///
    /// The token is used as a static credential: it is presented verbatim on
    /// each request and never refreshed.
    pub fn with_access_token<V: Into<String>>(mut self, v: V) -> Self {
        self.access_token = Some(v.into());
        self
    }
}

/// The set of characters that are percent encoded.
///
/// This set is defined at https://cloud.google.com/storage/docs/request-endpoints#encoding:
///
/// Encode the following characters when they appear in either the object name
/// or query string of a request URL:
///     !, #, $, &, ', (, ), *, +, ,, /, :, ;, =, ?, @, [, ], and space characters.
const ENCODED_CHARS: percent_encoding::AsciiSet = percent_encoding::CONTROLS
    .add(b'!')
    .add(b'#')
    .add(b'$')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'=')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b']')
    .add(b' ');

/// Percent encode a string.
///
/// To ensure compatibility certain characters need to be encoded when they
/// appear in the object name of a request URL.
pub(crate) fn enc(value: &str) -> String {
    percent_encoding::utf8_percent_encode(value, &ENCODED_CHARS).to_string()
}
