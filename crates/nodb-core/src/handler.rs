//! Bridge from `async` operations to completion callbacks.

use std::future::Future;

use crate::error::NoDbResult;

/// Drive `operation` to its end and hand the outcome to `callback`.
///
/// The callback runs exactly once, with either the success payload or the
/// failure. Nothing is reported if the returned future is dropped first.
///
/// ```
/// # async fn demo(db: nodb_core::NoDb) {
/// use nodb_core::complete_with;
///
/// complete_with(db.count(nodb_core::QueryRequest::new("orders", "user_id", "u1")), |res| {
///     match res {
///         Ok(n) => println!("{n} orders"),
///         Err(e) => eprintln!("count failed: {e}"),
///     }
/// })
/// .await;
/// # }
/// ```
pub async fn complete_with<T, Fut, F>(operation: Fut, callback: F)
where
    Fut: Future<Output = NoDbResult<T>>,
    F: FnOnce(NoDbResult<T>),
{
    callback(operation.await);
}
