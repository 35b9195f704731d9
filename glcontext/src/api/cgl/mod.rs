//! The CGL Api.

use std::ffi::{c_void, CStr};
use std::ptr;

use cgl::{kCGLNoError, CGLError, CGLErrorString};
use core_foundation::base::TCFType;
use core_foundation::bundle::{CFBundleGetBundleWithIdentifier, CFBundleGetFunctionPointerForName};
use core_foundation::string::CFString;

use crate::error::{Error, ErrorKind, Result};

pub mod context;
pub(crate) mod make_current_guard;

/// Bundle of the system OpenGL framework.
const OPENGL_FRAMEWORK: &str = "com.apple.opengl";

/// Turn a CGL status into a [`Result`].
pub(crate) fn check_error(error: CGLError) -> Result<()> {
    if error == kCGLNoError {
        return Ok(());
    }

    let description = unsafe { CStr::from_ptr(CGLErrorString(error)) }
        .to_str()
        .unwrap_or_default()
        .to_string();
    Err(Error::new(Some(error as _), Some(description), ErrorKind::ContextCreationFailed))
}

/// Look a GL entry point up in the OpenGL framework.
pub(crate) fn get_proc_address(name: &str) -> *const c_void {
    if crate::api::proc_name(name).is_none() {
        return ptr::null();
    }

    let symbol_name = CFString::new(name);
    let framework_name = CFString::new(OPENGL_FRAMEWORK);
    unsafe {
        let framework = CFBundleGetBundleWithIdentifier(framework_name.as_concrete_TypeRef());
        if framework.is_null() {
            return ptr::null();
        }

        CFBundleGetFunctionPointerForName(framework, symbol_name.as_concrete_TypeRef()).cast()
    }
}
