use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;
use serde_json::json;

type RespBody = BoxBody<Bytes, hyper::Error>;

/// Denial reason sent with every 429
pub const X_TURNSTILE_REASON: HeaderName = HeaderName::from_static("x-turnstile-reason");

/// Build HTTP response with status code of 4xx and 5xx
pub(crate) fn synthetic_error_response(status_code: StatusCode) -> Response<RespBody> {
    let mut resp = Response::new(empty_body());
    *resp.status_mut() = status_code;
    resp
}

/// Build a 429 carrying `reason` in the body and in `x-turnstile-reason`,
/// plus any rate limit headers for the decision
pub(crate) fn too_many_requests(reason: &'static str, headers: HeaderMap) -> Response<RespBody> {
    let body = json!({ "error": "Too Many Requests", "reason": reason }).to_string();

    let mut resp = Response::new(full_body(body));
    *resp.status_mut() = StatusCode::TOO_MANY_REQUESTS;
    resp.headers_mut().extend(headers);
    resp.headers_mut()
        .insert(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp.headers_mut()
        .insert(X_TURNSTILE_REASON, HeaderValue::from_static(reason));
    resp
}

fn empty_body() -> RespBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

fn full_body(text: String) -> RespBody {
    Full::new(Bytes::from(text))
        .map_err(|never| match never {})
        .boxed()
}
