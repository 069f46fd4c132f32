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

//! Errors for buffered and streaming object downloads.

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A `Result` alias where the `Err` case is [enum@Error].
pub type Result<T> = std::result::Result<T, Error>;

/// The errors produced by this crate.
///
/// Every error is local to one call: nothing is retried automatically, and a
/// failed call has no effect on other in-flight calls. On the streaming path
/// an error can surface in two places: before the push-stream handle exists,
/// through the `send()` future, or mid-transfer, as an `Err` item on the
/// [ByteStream][crate::ByteStream] itself.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The client could not be constructed from the provided token.
    ///
    /// This is a local failure, detected before any request is sent. The most
    /// common cause is a token containing characters that cannot appear in an
    /// HTTP header value.
    #[error("cannot construct the storage client: {0}")]
    ClientConstruction(#[source] BoxError),

    /// The service refused to open a read stream for the object.
    ///
    /// Covers not-found, forbidden, and missing-bucket rejections, as well as
    /// transport failures at connect time. The message carries the failure
    /// description reported by the service, when one was available.
    #[error("cannot open object `{object}` in bucket `{bucket}`: {message}")]
    ObjectOpen {
        bucket: String,
        object: String,
        /// The HTTP status returned by the service, if the request got as far
        /// as a response.
        status: Option<http::StatusCode>,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A read against an already-open stream failed.
    ///
    /// Some bytes may have been delivered (streaming) or accumulated
    /// (buffered) before this error; the buffered path discards them and
    /// reports only the error.
    #[error("error reading object data: {0}")]
    StreamRead(#[source] BoxError),
}

impl Error {
    pub(crate) fn client<T: Into<BoxError>>(source: T) -> Self {
        Self::ClientConstruction(source.into())
    }

    pub(crate) fn open_rejected<B, O>(
        bucket: B,
        object: O,
        status: http::StatusCode,
        message: String,
    ) -> Self
    where
        B: Into<String>,
        O: Into<String>,
    {
        Self::ObjectOpen {
            bucket: bucket.into(),
            object: object.into(),
            status: Some(status),
            message,
            source: None,
        }
    }

    pub(crate) fn open_transport<B, O, T>(bucket: B, object: O, source: T) -> Self
    where
        B: Into<String>,
        O: Into<String>,
        T: Into<BoxError>,
    {
        let source = source.into();
        Self::ObjectOpen {
            bucket: bucket.into(),
            object: object.into(),
            status: None,
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub(crate) fn read<T: Into<BoxError>>(source: T) -> Self {
        Self::StreamRead(source.into())
    }

    /// Returns true if the client could not be constructed locally.
    pub fn is_client_construction(&self) -> bool {
        matches!(self, Self::ClientConstruction(_))
    }

    /// Returns true if the service refused to open the read stream.
    pub fn is_object_open(&self) -> bool {
        matches!(self, Self::ObjectOpen { .. })
    }

    /// Returns true if a read failed after the stream was opened.
    pub fn is_stream_read(&self) -> bool {
        matches!(self, Self::StreamRead(_))
    }

    /// The HTTP status attached to this error, if any.
    pub fn http_status(&self) -> Option<http::StatusCode> {
        match self {
            Self::ObjectOpen { status, .. } => *status,
            _ => None,
        }
    }
}
