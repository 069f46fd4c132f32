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

//! The chunk relay: a background task bridging a pull-based byte source to a
//! push-based consumer.
//!
//! Each streaming fetch runs one relay. The relay reads fixed-size chunks
//! from its [ObjectSource] and sends each into an `mpsc` channel whose
//! receiving half is the consumer's [ByteStream][crate::ByteStream]. It ends
//! in exactly one of three ways:
//!
//! - the source reports end of stream: the sender is dropped and the
//!   consumer sees the channel close;
//! - a read fails: the error is sent as the final item, then the sender is
//!   dropped;
//! - the consumer cancels (or drops its handle): the relay stops without a
//!   terminal item of its own.
//!
//! On every one of these paths the source is closed exactly once.
//!
//! Cancellation is cooperative: the token is checked between read
//! iterations only, and a read already in flight is never aborted. At most
//! one more chunk can be delivered after `cancel()` is observed.

use crate::error::Result;
use crate::source::ObjectSource;
use bytes::Bytes;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

/// The default size of each chunk pushed to the consumer.
///
/// Smaller chunks add per-chunk delivery overhead; larger chunks increase
/// peak memory per in-flight chunk and delay the first byte.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// Transfers bytes from `source` to `sink` in chunks of up to `chunk_size`.
///
/// Chunks are delivered in read order, and each send completes before the
/// next read is issued, so the ordering the consumer observes is the
/// ordering on the wire.
pub(crate) async fn run<S>(
    mut source: S,
    sink: Sender<Result<Bytes>>,
    cancel: CancellationToken,
    chunk_size: usize,
) where
    S: ObjectSource,
{
    let mut buf = vec![0_u8; chunk_size];
    let mut total = 0_u64;
    loop {
        if cancel.is_cancelled() {
            tracing::debug!(total, "relay cancelled by the consumer");
            break;
        }
        match source.read(&mut buf).await {
            Ok(0) => {
                tracing::debug!(total, "relay reached end of stream");
                break;
            }
            Ok(n) => {
                total += n as u64;
                if sink
                    .send(Ok(Bytes::copy_from_slice(&buf[..n])))
                    .await
                    .is_err()
                {
                    // The consumer dropped its end of the stream.
                    tracing::debug!(total, "relay consumer went away");
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, total, "relay read failed");
                let _ = sink.send(Err(e)).await;
                break;
            }
        }
    }
    source.close().await;
    // Dropping `sink` here closes the consumer-facing stream.
}
