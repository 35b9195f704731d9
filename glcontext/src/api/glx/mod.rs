//! GLX on an X11 display.

use std::ffi::{c_char, c_int, c_uint, c_ulong, c_void, CString};
use std::fmt;
use std::ops::Deref;
use std::ptr;
use std::sync::atomic::{AtomicI32, Ordering};

use glcontext_glx_sys as ffi;
use glcontext_glx_sys::{glx, glx_extra};
use libloading::Library;

use crate::config::ContextConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::lib_loading::{self, SymLoading, SymWrapper};
use crate::utils::NoPrint;

pub mod context;
pub(crate) mod make_current_guard;

/// Default names of the GL driver exporting GLX.
pub(crate) const GL_LIBS: &[&str] = &["libGL.so.1", "libGL.so"];

/// Default names of Xlib.
pub(crate) const X11_LIBS: &[&str] = &["libX11.so.6", "libX11.so"];

/// `GLXBadFBConfig`, relative to the GLX error base.
const GLX_BAD_FB_CONFIG: c_int = 9;

/// The X error code recorded by [`silent_error_handler`].
static LAST_ERROR_CODE: AtomicI32 = AtomicI32::new(0);

type GlxGetProcAddress = unsafe extern "system" fn(*const u8) -> *const c_void;

/// The argument and return type of `XSetErrorHandler`.
pub(crate) type XErrorHandler =
    Option<unsafe extern "C" fn(*mut ffi::Display, *mut ffi::XErrorEvent) -> c_int>;

/// The GLX entry points together with the loaded `libGL`.
#[derive(Debug)]
pub(crate) struct Glx(NoPrint<SymWrapper<glx::Glx>>);

impl Glx {
    pub(crate) fn load(config: &ContextConfig) -> Result<Self> {
        let lib = lib_loading::locate(
            config.driver_library(),
            config.driver_library_override(),
            GL_LIBS,
        )?;

        let glx = unsafe { SymWrapper::<glx::Glx>::new(lib) };
        if !glx.GetCurrentContext.is_loaded()
            || !glx.MakeCurrent.is_loaded()
            || !glx.GetProcAddress.is_loaded()
        {
            return Err(Error::new(
                None,
                Some(String::from("the GL library doesn't export GLX")),
                ErrorKind::LibraryNotFound,
            ));
        }

        Ok(Self(NoPrint(glx)))
    }

    /// `glXGetProcAddress`, it may hand out stubs for unknown names.
    pub(crate) fn get_proc_address(&self, name: &CString) -> *const c_void {
        unsafe { self.GetProcAddress(name.as_ptr() as *const _) as *const c_void }
    }

    /// Load the `GLX_ARB_create_context` entry points.
    pub(crate) fn load_extra(&self) -> glx_extra::Glx {
        glx_extra::Glx::load_with(|name| match CString::new(name) {
            Ok(name) => self.get_proc_address(&name),
            Err(_) => ptr::null(),
        })
    }

    pub(crate) fn library(&self) -> &Library {
        self.0.library()
    }
}

impl Deref for Glx {
    type Target = glx::Glx;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl SymLoading for glx::Glx {
    unsafe fn load_with(lib: &Library) -> Self {
        let get_proc_address = unsafe { lib.get::<GlxGetProcAddress>(b"glXGetProcAddressARB\0") }
            .ok()
            .map(|sym| *sym);

        Self::load_with(|name| {
            let name = match CString::new(name) {
                Ok(name) => name,
                Err(_) => return ptr::null(),
            };

            let sym = unsafe { lib_loading::symbol(lib, &name) };
            if !sym.is_null() {
                return sym;
            }

            match get_proc_address {
                Some(get_proc_address) => unsafe { get_proc_address(name.as_ptr().cast()) },
                None => ptr::null(),
            }
        })
    }
}

/// The subset of Xlib needed to host a context, loaded from the located
/// `libX11`.
#[allow(non_snake_case)]
pub(crate) struct Xlib {
    pub XOpenDisplay: unsafe extern "C" fn(*const c_char) -> *mut ffi::Display,
    pub XCloseDisplay: unsafe extern "C" fn(*mut ffi::Display) -> c_int,
    pub XDefaultScreen: unsafe extern "C" fn(*mut ffi::Display) -> c_int,
    pub XRootWindow: unsafe extern "C" fn(*mut ffi::Display, c_int) -> ffi::Window,
    pub XCreateColormap: unsafe extern "C" fn(
        *mut ffi::Display,
        ffi::Window,
        *mut ffi::Visual,
        c_int,
    ) -> ffi::Colormap,
    pub XFreeColormap: unsafe extern "C" fn(*mut ffi::Display, ffi::Colormap) -> c_int,
    pub XCreateWindow: unsafe extern "C" fn(
        *mut ffi::Display,
        ffi::Window,
        c_int,
        c_int,
        c_uint,
        c_uint,
        c_uint,
        c_int,
        c_uint,
        *mut ffi::Visual,
        c_ulong,
        *mut ffi::XSetWindowAttributes,
    ) -> ffi::Window,
    pub XDestroyWindow: unsafe extern "C" fn(*mut ffi::Display, ffi::Window) -> c_int,
    pub XFree: unsafe extern "C" fn(*mut c_void) -> c_int,
    pub XSync: unsafe extern "C" fn(*mut ffi::Display, ffi::Bool) -> c_int,
    pub XSetErrorHandler: unsafe extern "C" fn(XErrorHandler) -> XErrorHandler,

    _lib: Library,
}

impl Xlib {
    pub(crate) fn load(config: &ContextConfig) -> Result<Self> {
        let lib = lib_loading::locate(
            config.windowing_library(),
            config.windowing_library_override(),
            X11_LIBS,
        )?;

        unsafe {
            Ok(Self {
                XOpenDisplay: lib_loading::required(&lib, b"XOpenDisplay\0")?,
                XCloseDisplay: lib_loading::required(&lib, b"XCloseDisplay\0")?,
                XDefaultScreen: lib_loading::required(&lib, b"XDefaultScreen\0")?,
                XRootWindow: lib_loading::required(&lib, b"XRootWindow\0")?,
                XCreateColormap: lib_loading::required(&lib, b"XCreateColormap\0")?,
                XFreeColormap: lib_loading::required(&lib, b"XFreeColormap\0")?,
                XCreateWindow: lib_loading::required(&lib, b"XCreateWindow\0")?,
                XDestroyWindow: lib_loading::required(&lib, b"XDestroyWindow\0")?,
                XFree: lib_loading::required(&lib, b"XFree\0")?,
                XSync: lib_loading::required(&lib, b"XSync\0")?,
                XSetErrorHandler: lib_loading::required(&lib, b"XSetErrorHandler\0")?,
                _lib: lib,
            })
        }
    }
}

impl fmt::Debug for Xlib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Xlib").finish_non_exhaustive()
    }
}

/// Swallows X errors until dropped, recording the last error code.
///
/// The handler is process wide, so creation on several threads at once can
/// attribute an error to the wrong call.
pub(crate) struct SilentErrors<'a> {
    xlib: &'a Xlib,
    previous: XErrorHandler,
}

impl<'a> SilentErrors<'a> {
    pub(crate) fn install(xlib: &'a Xlib) -> Self {
        LAST_ERROR_CODE.store(0, Ordering::Relaxed);
        let previous = unsafe { (xlib.XSetErrorHandler)(Some(silent_error_handler)) };
        Self { xlib, previous }
    }

    /// Flush the requests and take the error they raised, if any.
    pub(crate) fn take(&self, display: *mut ffi::Display) -> Option<c_int> {
        unsafe {
            (self.xlib.XSync)(display, ffi::False);
        }

        match LAST_ERROR_CODE.swap(0, Ordering::Relaxed) {
            0 => None,
            code => Some(code),
        }
    }
}

impl Drop for SilentErrors<'_> {
    fn drop(&mut self) {
        unsafe {
            (self.xlib.XSetErrorHandler)(self.previous);
        }
    }
}

unsafe extern "C" fn silent_error_handler(
    _display: *mut ffi::Display,
    event: *mut ffi::XErrorEvent,
) -> c_int {
    if let Some(event) = unsafe { event.as_ref() } {
        LAST_ERROR_CODE.store(event.error_code as i32, Ordering::Relaxed);
    }

    0
}

/// Whether an X error raised by context creation means the version can't be
/// provided.
///
/// Drivers report `GLXBadFBConfig` as the extension mandates, some older ones
/// `BadMatch` or `BadValue`. When sharing, `BadMatch` also stands for a share
/// context that doesn't fit the config, so only `GLXBadFBConfig` counts.
pub(crate) fn is_version_error(error_code: c_int, glx_error_base: c_int, sharing: bool) -> bool {
    if error_code == glx_error_base + GLX_BAD_FB_CONFIG {
        return true;
    }

    !sharing && (error_code == ffi::BadMatch as c_int || error_code == ffi::BadValue as c_int)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_errors() {
        // A typical error base for GLX.
        let base = 156;
        assert!(is_version_error(base + GLX_BAD_FB_CONFIG, base, false));
        assert!(is_version_error(8, base, false));
        assert!(is_version_error(2, base, false));
        assert!(!is_version_error(base + 5, base, false));
        assert!(!is_version_error(11, base, false));
    }

    #[test]
    fn sharing_only_trusts_bad_fb_config() {
        let base = 156;
        assert!(is_version_error(base + GLX_BAD_FB_CONFIG, base, true));
        assert!(!is_version_error(ffi::BadMatch as c_int, base, true));
        assert!(!is_version_error(ffi::BadValue as c_int, base, true));
    }

    #[test]
    fn silent_handler_records_the_code() {
        // Installed through `XSetErrorHandler`, so it has to fit its slot.
        let handler: XErrorHandler = Some(silent_error_handler);
        let mut event: ffi::XErrorEvent = unsafe { std::mem::zeroed() };
        event.error_code = ffi::BadAlloc;

        unsafe { handler.unwrap()(ptr::null_mut(), &mut event) };
        assert_eq!(LAST_ERROR_CODE.swap(0, Ordering::Relaxed), ffi::BadAlloc as i32);
    }
}
