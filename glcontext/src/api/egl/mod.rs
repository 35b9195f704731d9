//! EGL, on an enumerated device or on the default display.

use std::collections::HashSet;
use std::ffi::{c_char, c_void, CString};
use std::ops::Deref;
use std::ptr;

use bitflags::bitflags;
use glcontext_egl_sys::egl;
use glcontext_egl_sys::egl::types::{EGLDisplay, EGLenum};
use libloading::Library;

use crate::config::ContextConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::lib_loading::{self, SymLoading, SymWrapper};
use crate::utils::NoPrint;

pub mod context;
pub mod device;
pub(crate) mod make_current_guard;

pub use self::device::{devices, Device};

/// Default names of the EGL loader.
pub(crate) const EGL_LIBS: &[&str] = &["libEGL.so.1", "libEGL.so"];

/// Default names of the GL driver, `libOpenGL` being the GLVND one.
pub(crate) const GL_LIBS: &[&str] = &["libGL.so.1", "libGL.so", "libOpenGL.so.0"];

type EglGetProcAddress = unsafe extern "system" fn(*const c_char) -> *const c_void;

/// The EGL entry points together with the loaded `libEGL`.
#[derive(Debug)]
pub(crate) struct Egl(NoPrint<SymWrapper<egl::Egl>>);

impl Egl {
    /// Load `libEGL`, which stays loaded for the rest of the process once it
    /// was found.
    pub(crate) fn load(config: &ContextConfig) -> Result<Self> {
        let lib = lib_loading::locate_resident(
            config.windowing_library(),
            config.windowing_library_override(),
            EGL_LIBS,
        )?;

        let egl = unsafe { SymWrapper::<egl::Egl>::new(lib) };
        if !egl.GetError.is_loaded() || !egl.GetDisplay.is_loaded() {
            return Err(Error::new(
                None,
                Some(String::from("the EGL library doesn't export the core entry points")),
                ErrorKind::LibraryNotFound,
            ));
        }

        Ok(Self(NoPrint(egl)))
    }

    /// Extensions of a display, or the client extensions for `NO_DISPLAY`.
    pub(crate) fn extensions(&self, display: EGLDisplay) -> HashSet<String> {
        // SAFETY: eglQueryString returns a static, null terminated string or
        // null.
        unsafe {
            let extensions = self.QueryString(display, egl::EXTENSIONS as i32);
            if extensions.is_null() {
                // Querying client extensions without EGL_EXT_client_extensions
                // raises EGL_BAD_DISPLAY.
                self.GetError();
            }

            super::extensions_from_ptr(extensions)
        }
    }

    /// `eglGetProcAddress` for GL entry points.
    pub(crate) fn get_proc_address(&self, name: &CString) -> *const c_void {
        if !self.GetProcAddress.is_loaded() {
            return ptr::null();
        }

        unsafe { self.GetProcAddress(name.as_ptr()) as *const c_void }
    }
}

impl Deref for Egl {
    type Target = egl::Egl;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl SymLoading for egl::Egl {
    unsafe fn load_with(lib: &Library) -> Self {
        let get_proc_address = unsafe { lib.get::<EglGetProcAddress>(b"eglGetProcAddress\0") }
            .ok()
            .map(|sym| *sym);

        Self::load_with(|name| {
            let name = match CString::new(name) {
                Ok(name) => name,
                Err(_) => return ptr::null(),
            };

            // Check if the symbol is available in the library directly.
            let sym = unsafe { lib_loading::symbol(lib, &name) };
            if !sym.is_null() {
                return sym;
            }

            // eglGetProcAddress was only able to look up extension functions
            // prior to EGL 1.5, hence this two-part dance.
            match get_proc_address {
                Some(get_proc_address) => unsafe { get_proc_address(name.as_ptr()) },
                None => ptr::null(),
            }
        })
    }
}

bitflags! {
    /// Capabilities of the EGL client library.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct ClientFeatures: u8 {
        /// `eglQueryDevicesEXT` is available.
        const DEVICE_ENUMERATION = 0b00000001;

        /// `eglQueryDeviceStringEXT` is available.
        const DEVICE_QUERY       = 0b00000010;

        /// Displays can be created from devices.
        const PLATFORM_DEVICE    = 0b00000100;
    }
}

impl ClientFeatures {
    pub(crate) fn from_extensions(egl: &egl::Egl, extensions: &HashSet<String>) -> Self {
        let mut features = ClientFeatures::empty();

        // EGL_EXT_device_base is the union of enumeration and query.
        let device_base = extensions.contains("EGL_EXT_device_base");
        features.set(
            ClientFeatures::DEVICE_ENUMERATION,
            (device_base || extensions.contains("EGL_EXT_device_enumeration"))
                && egl.QueryDevicesEXT.is_loaded(),
        );
        features.set(
            ClientFeatures::DEVICE_QUERY,
            (device_base || extensions.contains("EGL_EXT_device_query"))
                && egl.QueryDeviceStringEXT.is_loaded(),
        );
        features.set(
            ClientFeatures::PLATFORM_DEVICE,
            extensions.contains("EGL_EXT_platform_device")
                && egl.GetPlatformDisplayEXT.is_loaded(),
        );

        features
    }
}

bitflags! {
    /// Capabilities of an initialized display.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct DisplayFeatures: u8 {
        /// Contexts can be made current without a surface.
        const SURFACELESS    = 0b00000001;

        /// Desktop GL version and profile attributes are understood.
        const CREATE_CONTEXT = 0b00000010;
    }
}

impl DisplayFeatures {
    pub(crate) fn extract(extensions: &HashSet<String>, major: i32, minor: i32) -> Self {
        let mut features = DisplayFeatures::empty();
        features.set(
            DisplayFeatures::SURFACELESS,
            extensions.contains("EGL_KHR_surfaceless_context"),
        );
        features.set(
            DisplayFeatures::CREATE_CONTEXT,
            (major, minor) >= (1, 5) || extensions.contains("EGL_KHR_create_context"),
        );
        features
    }
}

/// Turn the pending EGL error into a [`Result`].
pub(crate) fn check_error(egl: &egl::Egl) -> Result<()> {
    let code = unsafe { egl.GetError() } as EGLenum;
    if code == egl::SUCCESS {
        return Ok(());
    }

    Err(Error::new(
        Some(code as i64),
        Some(String::from(error_name(code))),
        ErrorKind::ContextCreationFailed,
    ))
}

/// The error of a failed EGL call, annotated with the call.
pub(crate) fn egl_error(egl: &egl::Egl, call: &str) -> Error {
    match check_error(egl) {
        Err(err) => {
            let message = format!("{call} failed: {}", err.raw_os_message().unwrap_or_default());
            Error::new(err.raw_code(), Some(message), err.error_kind())
        },
        Ok(()) => {
            Error::new(None, Some(format!("{call} failed")), ErrorKind::ContextCreationFailed)
        },
    }
}

fn error_name(code: EGLenum) -> &'static str {
    match code {
        egl::SUCCESS => "EGL_SUCCESS",
        egl::NOT_INITIALIZED => "EGL_NOT_INITIALIZED",
        egl::BAD_ACCESS => "EGL_BAD_ACCESS",
        egl::BAD_ALLOC => "EGL_BAD_ALLOC",
        egl::BAD_ATTRIBUTE => "EGL_BAD_ATTRIBUTE",
        egl::BAD_CONFIG => "EGL_BAD_CONFIG",
        egl::BAD_CONTEXT => "EGL_BAD_CONTEXT",
        egl::BAD_CURRENT_SURFACE => "EGL_BAD_CURRENT_SURFACE",
        egl::BAD_DISPLAY => "EGL_BAD_DISPLAY",
        egl::BAD_MATCH => "EGL_BAD_MATCH",
        egl::BAD_NATIVE_PIXMAP => "EGL_BAD_NATIVE_PIXMAP",
        egl::BAD_NATIVE_WINDOW => "EGL_BAD_NATIVE_WINDOW",
        egl::BAD_PARAMETER => "EGL_BAD_PARAMETER",
        egl::BAD_SURFACE => "EGL_BAD_SURFACE",
        egl::CONTEXT_LOST => "EGL_CONTEXT_LOST",
        _ => "unknown EGL error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_names() {
        assert_eq!(error_name(0x3009), "EGL_BAD_MATCH");
        assert_eq!(error_name(0x3004), "EGL_BAD_ATTRIBUTE");
        assert_eq!(error_name(0x300E), "EGL_CONTEXT_LOST");
        assert_eq!(error_name(0x4000), "unknown EGL error");
    }

    #[test]
    fn display_features() {
        let extensions = crate::api::parse_extensions("EGL_KHR_surfaceless_context");
        let features = DisplayFeatures::extract(&extensions, 1, 4);
        assert!(features.contains(DisplayFeatures::SURFACELESS));
        assert!(!features.contains(DisplayFeatures::CREATE_CONTEXT));

        let features = DisplayFeatures::extract(&HashSet::new(), 1, 5);
        assert_eq!(features, DisplayFeatures::CREATE_CONTEXT);
    }
}
