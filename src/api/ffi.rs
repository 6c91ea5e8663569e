//! C-compatible API for embedding the pipeline in other runtimes.
//!
//! Every call returning `*const c_char` hands over a JSON envelope that the
//! caller must release with [`shipcost_free_str`]. Success looks like
//! `{"ok":true,...}`; failure like `{"ok":false,"code":N,"error":"..."}`,
//! with the same code also readable through [`shipcost_last_error_code`].

use std::cell::Cell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;

use serde_json::{json, Value};
use tracing::error;

use crate::common::config::{AppCfg, ValidationConfig};
use crate::common::error::{ShipCode, ShipError, ShipResult};
use crate::inference::{CostPredictor, ShippingData};
use crate::validation::ValidationOrchestrator;

/// ABI version to coordinate with host bindings.
pub const API_VERSION: u32 = 1;

thread_local! {
    static LAST_ERROR: Cell<ShipCode> = const { Cell::new(ShipCode::Ok) };
}

#[no_mangle]
pub extern "C" fn shipcost_api_version() -> u32 {
    API_VERSION
}

/// Code of the most recent failure on this thread, `0` after a success.
#[no_mangle]
pub extern "C" fn shipcost_last_error_code() -> u32 {
    LAST_ERROR.with(|c| c.get()) as u32
}

/// Validate the train/test CSV pair. `config_path` may be null to use the
/// environment configuration.
///
/// # Safety
/// Non-null pointers must reference valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn shipcost_validate(
    config_path: *const c_char,
    train_path: *const c_char,
    test_path: *const c_char,
) -> *const c_char {
    respond(|| {
        let cfg = app_config(config_path)?;
        let train = required(train_path, "train_path")?;
        let test = required(test_path, "test_path")?;
        let orchestrator = ValidationOrchestrator::new(ValidationConfig::from_app(&cfg)?);
        let artifact = orchestrator.run(Path::new(&train), Path::new(&test))?;
        Ok(json!({
            "ok": true,
            "drift_report_path": artifact.drift_report_path,
            "validation_status": artifact.validation_status,
        }))
    })
}

/// Price one shipment given as a JSON object keyed by column name.
///
/// # Safety
/// Non-null pointers must reference valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn shipcost_predict(
    config_path: *const c_char,
    input_json: *const c_char,
) -> *const c_char {
    respond(|| {
        let cfg = app_config(config_path)?;
        let input = required(input_json, "input_json")?;
        let data: ShippingData = serde_json::from_str(&input)
            .map_err(|e| ShipError::invalid(format!("malformed shipment: {e}")))?;
        let cost = CostPredictor::from_app(&cfg).predict(&data.to_dataset()?)?;
        Ok(json!({ "ok": true, "cost": cost }))
    })
}

/// Free strings allocated by this library.
///
/// # Safety
/// `ptr` must be null or a pointer previously returned by this library.
#[no_mangle]
pub unsafe extern "C" fn shipcost_free_str(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    drop(CString::from_raw(ptr as *mut c_char));
}

fn respond(call: impl FnOnce() -> ShipResult<Value>) -> *const c_char {
    let body = match call() {
        Ok(body) => {
            LAST_ERROR.with(|c| c.set(ShipCode::Ok));
            body
        }
        Err(err) => {
            let code = err.code();
            LAST_ERROR.with(|c| c.set(code));
            error!(code = code as u32, error = %err, "ffi call failed");
            json!({ "ok": false, "code": code as u32, "error": err.to_string() })
        }
    };
    string_to_raw(body.to_string())
}

unsafe fn optional(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

unsafe fn required(ptr: *const c_char, name: &str) -> ShipResult<String> {
    optional(ptr).ok_or_else(|| ShipError::invalid(format!("`{name}` must not be null")))
}

unsafe fn app_config(path: *const c_char) -> ShipResult<AppCfg> {
    match optional(path) {
        Some(path) => AppCfg::from_file(path),
        None => AppCfg::load(),
    }
}

fn string_to_raw(s: String) -> *const c_char {
    // serde_json escapes control characters, so interior NULs cannot occur.
    match CString::new(s) {
        Ok(cstring) => cstring.into_raw(),
        Err(_) => std::ptr::null(),
    }
}
