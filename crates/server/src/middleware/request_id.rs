//! Request correlation IDs.
//!
//! Every response carries an `x-request-id` header, generated when the
//! client did not supply one and propagated when it did.

use axum::http::{header::HeaderValue, HeaderName, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// The header name for request correlation IDs.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// A UUID v4 generator for request IDs.
#[derive(Clone, Copy, Default)]
pub struct UuidRequestIdGenerator;

impl MakeRequestId for UuidRequestIdGenerator {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        Some(RequestId::new(HeaderValue::from_str(&id).ok()?))
    }
}

/// Creates the request ID layer stack.
///
/// Layers are applied in reverse order, so apply the propagate layer first
/// and the set layer after it.
#[must_use]
pub fn create_request_id_layers() -> (
    tower_http::request_id::SetRequestIdLayer<UuidRequestIdGenerator>,
    tower_http::request_id::PropagateRequestIdLayer,
) {
    use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};

    let set_layer = SetRequestIdLayer::new(X_REQUEST_ID.clone(), UuidRequestIdGenerator);
    let propagate_layer = PropagateRequestIdLayer::new(X_REQUEST_ID.clone());

    (set_layer, propagate_layer)
}
