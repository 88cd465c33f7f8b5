//! HTTP Handler (spec §4.7): routes `/dns-query` by method to the Request
//! Validator + Racing Dispatcher and composes the Response Shaper. Grounded
//! on the teacher's `proxy::handler::handle_request` phased pipeline
//! (validate → dispatch → shape → log), narrowed from the teacher's
//! multi-route, filter-chain gateway down to the one fixed route this
//! system exposes.

use crate::body::{text_response, ProxyBody};
use crate::dispatch::{self, Payload};
use crate::region::region_of;
use crate::response::{preflight_headers, shape_headers};
use crate::server::state::AppState;
use crate::validate::{validate_get, validate_post_body, validate_post_content_type};
use http::{Method, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Request, Response};
use std::time::Instant;

const DNS_QUERY_PATH: &str = "/dns-query";

pub async fn handle_request(
    req: Request<Incoming>,
    state: AppState,
) -> Result<Response<ProxyBody>, hyper::Error> {
    let start = Instant::now();
    let method = req.method().clone();

    if req.uri().path() != DNS_QUERY_PATH {
        return Ok(text_response(StatusCode::NOT_FOUND, "not found"));
    }

    let region = region_of(req.headers());

    let response = match method {
        Method::OPTIONS => options_response(),
        Method::GET => get_response(&req, &state, &region).await,
        Method::POST => post_response(req, &state, &region).await,
        _ => text_response(StatusCode::NOT_FOUND, "not found"),
    };

    record_metrics(&method, response.status(), start.elapsed());
    tracing::info!(
        method = %method,
        region = %region,
        status = response.status().as_u16(),
        latency_ms = %start.elapsed().as_millis(),
        "access"
    );

    Ok(response)
}

fn options_response() -> Response<ProxyBody> {
    let mut builder = Response::builder().status(StatusCode::NO_CONTENT);
    for (name, value) in preflight_headers().iter() {
        builder = builder.header(name, value);
    }
    builder
        .body(crate::body::empty_body())
        .unwrap_or_else(|_| text_response(StatusCode::NO_CONTENT, ""))
}

async fn get_response(req: &Request<Incoming>, state: &AppState, region: &str) -> Response<ProxyBody> {
    let query = req.uri().query().unwrap_or("");
    let dns_value = match validate_get(query) {
        Ok(v) => v.to_string(),
        Err(e) => return shaped_error(e.status, e.message),
    };

    let ordered = state.latency_table.order(region, state.upstreams.as_slice());
    dispatch::dispatch(&state.client, &ordered, Payload::Get(dns_value), region, &state.latency_table).await
}

async fn post_response(req: Request<Incoming>, state: &AppState, region: &str) -> Response<ProxyBody> {
    let content_type = req
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if let Err(e) = validate_post_content_type(content_type.as_deref()) {
        return shaped_error(e.status, e.message);
    }

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return shaped_error(StatusCode::BAD_REQUEST, "failed to read request body"),
    };

    if let Err(e) = validate_post_body(&body) {
        return shaped_error(e.status, e.message);
    }

    let ordered = state.latency_table.order(region, state.upstreams.as_slice());
    dispatch::dispatch(&state.client, &ordered, Payload::Post(body), region, &state.latency_table).await
}

fn shaped_error(status: StatusCode, message: &str) -> Response<ProxyBody> {
    let mut resp = text_response(status, message);
    shape_headers(resp.headers_mut(), false);
    resp
}

fn record_metrics(method: &Method, status: StatusCode, elapsed: std::time::Duration) {
    let mut buf = itoa::Buffer::new();
    let status_str = buf.format(status.as_u16());
    metrics::counter!(
        "doh_requests_total",
        "method" => method.as_str().to_owned(),
        "status" => status_str.to_owned(),
    )
    .increment(1);
    metrics::histogram!(
        "doh_request_duration_seconds",
        "method" => method.as_str().to_owned(),
    )
    .record(elapsed.as_secs_f64());
}
