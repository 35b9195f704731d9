//! The native context APIs and the plumbing they share.

use std::ffi::{c_void, CString};
use std::mem;

use log::{debug, warn};

use crate::config::Version;
use crate::error::{Error, ErrorKind, Result};

#[cfg(cgl_backend)]
pub mod cgl;
#[cfg(egl_backend)]
pub mod egl;
#[cfg(glx_backend)]
pub mod glx;
#[cfg(wgl_backend)]
pub mod wgl;

/// `GL_VERSION` for `glGetString`.
const GL_VERSION: u32 = 0x1F02;

/// Entry points the platforms can resolve.
///
/// Some `glXGetProcAddress`/`eglGetProcAddress` implementations hand out a
/// dispatch stub for any name, so anything else is rejected up front.
const PROC_PREFIXES: &[&str] = &["gl", "wgl", "egl", "CGL"];

type GlGetString = unsafe extern "system" fn(u32) -> *const u8;

/// Turn a GL entry point name into the string handed to the native lookup.
///
/// Returns [`None`] for names that can't be a GL entry point. Only the prefix
/// is checked: an unknown `gl*` name passes and may still resolve to a
/// dispatch stub.
pub(crate) fn proc_name(name: &str) -> Option<CString> {
    if !PROC_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
        return None;
    }

    CString::new(name).ok()
}

/// Check that the context current on this thread satisfies `requested`.
///
/// The context is accepted when `GL_VERSION` can't be read or parsed, since
/// the native API already accepted the version attributes.
pub(crate) fn verify_version<F>(requested: Option<Version>, get_proc_address: F) -> Result<()>
where
    F: Fn(&str) -> *const c_void,
{
    let requested = match requested {
        Some(requested) => requested,
        None => return Ok(()),
    };

    let get_string = get_proc_address("glGetString");
    if get_string.is_null() {
        warn!("glGetString is missing, can't verify OpenGL {requested}");
        return Ok(());
    }

    let version = unsafe {
        let get_string: GlGetString = mem::transmute(get_string);
        let ptr = get_string(GL_VERSION);
        if ptr.is_null() {
            warn!("GL_VERSION is not available, can't verify OpenGL {requested}");
            return Ok(());
        }

        std::ffi::CStr::from_ptr(ptr.cast()).to_string_lossy().into_owned()
    };

    match parse_gl_version(&version) {
        Some(reported) if reported < requested => Err(Error::new(
            None,
            Some(format!("OpenGL {requested} was requested, but the driver reports `{version}`")),
            ErrorKind::UnsupportedVersion,
        )),
        Some(_) => {
            debug!("created context reports `{version}`");
            Ok(())
        },
        None => {
            warn!("unrecognized GL_VERSION `{version}`");
            Ok(())
        },
    }
}

/// Parse the leading `major.minor` of a `GL_VERSION` string.
pub(crate) fn parse_gl_version(version: &str) -> Option<Version> {
    let version = version.trim_start();
    let version = ["OpenGL ES-CM ", "OpenGL ES-CL ", "OpenGL ES "]
        .iter()
        .find_map(|prefix| version.strip_prefix(prefix))
        .unwrap_or(version);

    let mut parts = version.split(|c: char| c == '.' || c.is_whitespace());
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?;
    let digits = minor.find(|c: char| !c.is_ascii_digit()).unwrap_or(minor.len());
    let minor = minor[..digits].parse().ok()?;

    Some(Version::new(major, minor))
}

/// Split a space separated extension string.
#[cfg(any(egl_backend, glx_backend, wgl_backend))]
pub(crate) fn parse_extensions(extensions: &str) -> std::collections::HashSet<String> {
    extensions.split_whitespace().map(String::from).collect()
}

/// # Safety
///
/// The `extensions` pointer must be null or point to a null terminated string.
#[cfg(any(egl_backend, glx_backend, wgl_backend))]
pub(crate) unsafe fn extensions_from_ptr(
    extensions: *const std::ffi::c_char,
) -> std::collections::HashSet<String> {
    if extensions.is_null() {
        return Default::default();
    }

    parse_extensions(&unsafe { std::ffi::CStr::from_ptr(extensions) }.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_gl_names_are_resolved() {
        assert!(proc_name("glGetString").is_some());
        assert!(proc_name("glXCreateContextAttribsARB").is_some());
        assert!(proc_name("wglCreateContextAttribsARB").is_some());
        assert!(proc_name("eglGetProcAddress").is_some());
        assert!(proc_name("bogus").is_none());
        assert!(proc_name("").is_none());
        assert!(proc_name("glGet\0String").is_none());
        // Not an existence check, unknown GL names go to the native lookup.
        assert!(proc_name("glNotARealFunction").is_some());
    }

    #[test]
    fn desktop_versions() {
        assert_eq!(parse_gl_version("4.6.0 NVIDIA 535.54.03"), Some(Version::new(4, 6)));
        assert_eq!(
            parse_gl_version("3.3 (Core Profile) Mesa 23.2.1"),
            Some(Version::new(3, 3))
        );
        assert_eq!(parse_gl_version("2.1 Metal - 83.1"), Some(Version::new(2, 1)));
        assert_eq!(parse_gl_version("4.1 ATI-4.14.1"), Some(Version::new(4, 1)));
    }

    #[test]
    fn es_versions() {
        assert_eq!(parse_gl_version("OpenGL ES 3.2 Mesa 23.0"), Some(Version::new(3, 2)));
        assert_eq!(parse_gl_version("OpenGL ES-CM 1.1"), Some(Version::new(1, 1)));
    }

    #[test]
    fn garbage_versions() {
        assert_eq!(parse_gl_version(""), None);
        assert_eq!(parse_gl_version("Mesa"), None);
        assert_eq!(parse_gl_version("4"), None);
    }

    #[test]
    fn no_minimum_skips_the_query() {
        let result = verify_version(None, |_| panic!("nothing should be resolved"));
        assert!(result.is_ok());
    }

    #[test]
    fn missing_get_string_is_accepted() {
        let result = verify_version(Some(Version::new(3, 3)), |_| std::ptr::null());
        assert!(result.is_ok());
    }

    #[cfg(any(egl_backend, glx_backend, wgl_backend))]
    #[test]
    fn extension_strings() {
        let extensions = parse_extensions("EGL_EXT_device_base  EGL_MESA_device_software ");
        assert_eq!(extensions.len(), 2);
        assert!(extensions.contains("EGL_MESA_device_software"));
        assert!(unsafe { extensions_from_ptr(std::ptr::null()) }.is_empty());
    }
}
