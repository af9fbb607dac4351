//! C ABI call surface.
//!
//! Every function takes one NUL-terminated UTF-8 JSON string and returns a
//! pointer to a NUL-terminated JSON string owned by the library. Each
//! returned payload carries an `id`; the pointer stays valid until
//! `freeMemory` is called with that id.
//!
//! Errors never cross the boundary as anything but JSON: malformed input
//! and failed operations come back as a status-0 response whose body is the
//! error text.
//!
//! The library starts a multi-threaded tokio runtime on first use and
//! installs a `tracing` subscriber filtered by `MIMICNET_LOG` (default
//! `warn`).

use crate::base::neterror::NetError;
use crate::client::Engine;
use crate::marshal::{
    AddCookiesInput, DecompressInput, DestroySessionInput, GetCookiesInput, RequestInput,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;
use std::sync::OnceLock;
use tokio::runtime::Runtime;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "MIMICNET_LOG";

struct Global {
    runtime: Runtime,
    engine: Engine,
}

static GLOBAL: OnceLock<Result<Global, String>> = OnceLock::new();

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // Fails only when the host already installed a subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn global() -> Option<&'static Global> {
    let global = GLOBAL.get_or_init(|| {
        init_logging();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("mimicnet")
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Global {
            runtime,
            engine: Engine::new(),
        })
    });
    match global {
        Ok(global) => Some(global),
        Err(e) => {
            error!(error = %e, "failed to start runtime");
            None
        }
    }
}

/// Borrow the caller's string.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
unsafe fn read_str<'a>(ptr: *const c_char) -> Result<&'a str, NetError> {
    if ptr.is_null() {
        return Err(NetError::InvalidPayload("null input".into()));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|e| NetError::InvalidPayload(format!("input is not UTF-8: {}", e)))
}

unsafe fn read_json<T: DeserializeOwned>(ptr: *const c_char) -> Result<T, NetError> {
    let text = read_str(ptr)?;
    serde_json::from_str(text).map_err(|e| NetError::InvalidPayload(e.to_string()))
}

fn emit(engine: &Engine, id: &str) -> *const c_char {
    engine.registry().ptr(id).unwrap_or(ptr::null())
}

fn emit_error(engine: &Engine, session_id: Option<String>, err: &NetError) -> *const c_char {
    let response = engine.fail(session_id, err);
    emit(engine, &response.id)
}

/// Run an operation that yields a retained payload id.
fn respond<F>(op: F) -> *const c_char
where
    F: FnOnce(&Engine) -> Result<String, NetError>,
{
    let Some(global) = global() else {
        return ptr::null();
    };
    match op(&global.engine) {
        Ok(id) => emit(&global.engine, &id),
        Err(e) => emit_error(&global.engine, None, &e),
    }
}

/// Execute one request and return its response JSON.
///
/// Returns null only if the runtime could not be started.
///
/// # Safety
///
/// `params` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn request(params: *const c_char) -> *const c_char {
    let Some(global) = global() else {
        return ptr::null();
    };
    let input: RequestInput = match read_json(params) {
        Ok(input) => input,
        Err(e) => return emit_error(&global.engine, None, &e),
    };
    let response = global.runtime.block_on(global.engine.request(input));
    emit(&global.engine, &response.id)
}

/// Cookies of a session that apply to a URL.
///
/// # Safety
///
/// `params` must be null or a valid NUL-terminated string.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn getCookiesFromSession(params: *const c_char) -> *const c_char {
    let input = read_json::<GetCookiesInput>(params);
    respond(|engine| Ok(engine.cookies_for(&input?)?.id))
}

/// Store cookies in a session and return its cookies for the URL.
///
/// # Safety
///
/// `params` must be null or a valid NUL-terminated string.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn addCookiesToSession(params: *const c_char) -> *const c_char {
    let input = read_json::<AddCookiesInput>(params);
    respond(|engine| Ok(engine.add_cookies(&input?)?.id))
}

/// # Safety
///
/// `params` must be null or a valid NUL-terminated string.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn destroySession(params: *const c_char) -> *const c_char {
    let input = read_json::<DestroySessionInput>(params);
    respond(|engine| Ok(engine.destroy_session(&input?)?.id))
}

/// Drop every session.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn destroyAll() -> *const c_char {
    respond(|engine| Ok(engine.destroy_all()?.id))
}

#[derive(Deserialize)]
struct ReleaseInput {
    id: String,
}

/// Release the payload with the given id. Accepts the bare id or
/// `{"id": "..."}`. Unknown ids are ignored.
///
/// # Safety
///
/// `id` must be null or a valid NUL-terminated string. Pointers previously
/// returned for this id must not be used afterwards.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn freeMemory(id: *const c_char) {
    let Some(global) = global() else {
        return;
    };
    let text = match read_str(id) {
        Ok(text) => text.trim(),
        Err(e) => {
            debug!(error = %e, "freeMemory with unreadable id");
            return;
        }
    };
    let id = match serde_json::from_str::<ReleaseInput>(text) {
        Ok(input) => input.id,
        Err(_) => text.to_string(),
    };
    if let Err(e) = global.engine.release(&id) {
        debug!(error = %e, "freeMemory ignored");
    }
}

/// Decode a base64 body with the named content encoding.
///
/// # Safety
///
/// `params` must be null or a valid NUL-terminated string.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn decompressBody(params: *const c_char) -> *const c_char {
    let input = read_json::<DecompressInput>(params);
    respond(|engine| Ok(engine.decompress_body(&input?)?.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::ffi::CString;

    fn call(f: unsafe extern "C" fn(*const c_char) -> *const c_char, input: &str) -> Value {
        let input = CString::new(input).unwrap();
        let out = unsafe { f(input.as_ptr()) };
        assert!(!out.is_null());
        let text = unsafe { CStr::from_ptr(out) }.to_str().unwrap().to_string();
        serde_json::from_str(&text).unwrap()
    }

    fn free(id: &str) {
        let id = CString::new(id).unwrap();
        unsafe { freeMemory(id.as_ptr()) };
    }

    #[test]
    fn test_malformed_request_json() {
        let out = call(request, "{not json");
        assert_eq!(out["status"], 0);
        let id = out["id"].as_str().unwrap().to_string();
        assert!(global().unwrap().engine.registry().contains(&id));
        free(&id);
        assert!(!global().unwrap().engine.registry().contains(&id));
        // second release is a no-op
        free(&id);
    }

    #[test]
    fn test_cookie_functions() {
        let out = call(
            addCookiesToSession,
            r#"{"sessionId":"ffi-s1","url":"https://example.test/","cookies":[{"name":"a","value":"1"}]}"#,
        );
        assert_eq!(out["cookies"][0]["name"], "a");
        free(out["id"].as_str().unwrap());

        let out = call(
            getCookiesFromSession,
            r#"{"sessionId":"ffi-s1","url":"https://example.test/"}"#,
        );
        assert_eq!(out["cookies"].as_array().unwrap().len(), 1);

        let out = call(destroySession, r#"{"sessionId":"ffi-s1"}"#);
        assert_eq!(out["success"], true);
        let out = call(destroySession, r#"{"sessionId":"ffi-s1"}"#);
        assert_eq!(out["success"], false);
    }

    #[test]
    fn test_destroy_all_and_release_by_object() {
        let out = destroyAll();
        let text = unsafe { CStr::from_ptr(out) }.to_str().unwrap();
        let value: Value = serde_json::from_str(text).unwrap();
        assert_eq!(value["success"], true);
        let id = value["id"].as_str().unwrap().to_string();
        free(&format!(r#"{{"id":"{}"}}"#, id));
        assert!(!global().unwrap().engine.registry().contains(&id));
    }

    #[test]
    fn test_decompress_body() {
        // gzip of "hello"
        let out = call(
            decompressBody,
            r#"{"type":"gzip","body":"H4sIAAAAAAAA/8tIzcnJBwCGphA2BQAAAA=="}"#,
        );
        assert_eq!(out["body"], "hello");

        let out = call(decompressBody, r#"{"type":"lzma","body":"AA=="}"#);
        assert_eq!(out["status"], 0);
    }

    #[test]
    fn test_null_input() {
        let out = unsafe { request(ptr::null()) };
        let text = unsafe { CStr::from_ptr(out) }.to_str().unwrap();
        assert!(text.contains("\"status\":0"));
    }
}
