//! Admin endpoints (spec SPEC_FULL.md §4.8): `/health`, `/ready`,
//! `/metrics`. Not part of the DoH contract — purely operational. Grounded
//! on the teacher's `server::admin::handle_admin`.

use crate::body::{full_body, text_response};
use crate::server::state::AppState;
use hyper::body::Incoming;
use hyper::{Request, Response};

use crate::body::ProxyBody;

pub fn handle_admin(req: Request<Incoming>, state: AppState) -> Result<Response<ProxyBody>, hyper::Error> {
    match req.uri().path() {
        "/health" | "/healthz" => Ok(Response::builder()
            .status(200)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(full_body(r#"{"status":"ok"}"#))
            .unwrap()),

        "/ready" | "/readyz" => Ok(Response::builder()
            .status(200)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(full_body(format!(
                r#"{{"status":"ready","upstreams":{},"latency_table_entries":{}}}"#,
                state.upstreams.len(),
                state.latency_table.entry_count(),
            )))
            .unwrap()),

        "/metrics" => {
            metrics::gauge!("doh_latency_table_entries").set(state.latency_table.entry_count() as f64);
            Ok(Response::builder()
                .status(200)
                .header("content-type", "text/plain; version=0.0.4; charset=utf-8")
                .body(full_body(state.metrics.render()))
                .unwrap())
        }

        _ => Ok(text_response(http::StatusCode::NOT_FOUND, "not found")),
    }
}
