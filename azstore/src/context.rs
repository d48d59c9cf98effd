use azstore_core::{Context, OsEnv};
use azstore_http_send_reqwest::ReqwestHttpSend;

/// Create a context that sends requests with `reqwest` and reads the
/// process environment.
pub fn default_context() -> Context {
    Context::new()
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv)
}
