//! Request handlers, one module per resource.
//!
//! Every handler takes its guard (`AuthUser` or `Authorized<_>`) first, then the path id,
//! then state, then the body. Axum runs extractors in argument order, which yields the
//! 401 → 403 → 400 (id) → 404 → 400 (files/body) sequence clients rely on.

pub mod auth;
pub mod categories;
pub mod commands;
pub mod promo_codes;
pub mod service_providers;
pub mod service_types;

use crate::storage::StorageState;

/// Removes a stored file that is no longer referenced. Failures are logged, not returned:
/// the request has already succeeded or failed on its own terms.
pub(crate) async fn discard_file(storage: &StorageState, key: &str) {
    if let Err(e) = storage.delete_object(key).await {
        tracing::warn!(%key, error = %e, "could not remove stored file");
    }
}
