//! The store client seam.
//!
//! The access layer never talks to the network itself. It hands a
//! [`StoreRequest`] to a [`StoreClient`] and waits for the matching
//! [`StoreResponse`]. Transport, signing, retries and timeouts all belong to
//! the client implementation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use nodb_model::error::StoreError;
use nodb_model::{StoreRequest, StoreResponse};

use crate::error::{NoDbError, NoDbResult};

/// Boxed future returned by [`StoreClient::send`].
pub type StoreFuture<'a> =
    Pin<Box<dyn Future<Output = Result<StoreResponse, StoreError>> + Send + 'a>>;

/// Something that can carry one request to the store and bring back its
/// response.
///
/// Implementations are shared across operations and must tolerate repeated
/// sequential calls. The access layer never issues two calls of the same
/// logical operation concurrently.
pub trait StoreClient: Send + Sync + 'static {
    /// Send one request and resolve to the store's response or failure.
    fn send(&self, request: StoreRequest) -> StoreFuture<'_>;
}

impl<C: StoreClient + ?Sized> StoreClient for Arc<C> {
    fn send(&self, request: StoreRequest) -> StoreFuture<'_> {
        self.as_ref().send(request)
    }
}

/// Issue one round trip and unwrap the response kind the caller expects.
///
/// Any failure, including a response of the wrong kind, is logged together
/// with the request body and returned as [`NoDbError::Store`].
pub(crate) async fn call<T>(
    client: &dyn StoreClient,
    request: StoreRequest,
    unwrap: fn(StoreResponse) -> Result<T, StoreError>,
) -> NoDbResult<T> {
    let operation = request.operation();
    let retained = request.clone();
    let started = Instant::now();
    tracing::debug!(%operation, "store call started");

    let result = client.send(request).await.and_then(unwrap);

    match result {
        Ok(output) => {
            tracing::debug!(%operation, elapsed = ?started.elapsed(), "store call finished");
            Ok(output)
        }
        Err(source) => {
            let request = retained.to_json_string();
            tracing::error!(
                %operation,
                code = %source.code,
                error = %source.message,
                params = %request,
                "store call failed"
            );
            Err(NoDbError::Store {
                operation,
                request,
                source,
            })
        }
    }
}
