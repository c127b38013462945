use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::HandlerErr;

type TryHandle = fn(&mut AppState, &Request) -> Option<serde_json::Value>;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    let _span = tracing::debug_span!("request", id = %req.id, method = %req.method).entered();

    let families: [TryHandle; 9] = [
        handlers::core::try_handle,
        handlers::students::try_handle,
        handlers::courses::try_handle,
        handlers::enrollments::try_handle,
        handlers::grades::try_handle,
        handlers::attendance::try_handle,
        handlers::calc::try_handle,
        handlers::reports::try_handle,
        handlers::backup::try_handle,
    ];
    for try_handle in families {
        if let Some(resp) = try_handle(state, &req) {
            return resp;
        }
    }

    tracing::warn!(method = %req.method, "unknown method");
    HandlerErr::new("not_implemented", format!("unknown method: {}", req.method))
        .response(&req.id)
}
