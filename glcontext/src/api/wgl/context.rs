//! WGL context creation and teardown.

use std::ffi::{c_int, c_void};
use std::io::Error as IoError;
use std::ptr;

use glcontext_wgl_sys::wgl::types::{HDC, HGLRC};
use glcontext_wgl_sys::wgl_extra;
use log::{debug, trace, warn};

use crate::config::{ContextConfig, Mode, Version};
use crate::error::{Error, ErrorKind, Result};
use crate::lib_loading;

use super::make_current_guard::MakeCurrentGuard;
use super::{is_version_error, Extensions, Wgl, Window};

/// A WGL context, detected, created next to the current one, or hosted by a
/// hidden window.
///
/// The context is destroyed before its window.
#[derive(Debug)]
pub(crate) struct Context {
    hdc: HDC,
    context: HGLRC,

    /// Whether the context was created by us.
    owns_context: bool,

    /// The hidden window, standalone only.
    window: Option<Window>,

    wgl: Wgl,
}

impl Context {
    pub(crate) fn new(config: &ContextConfig) -> Result<Self> {
        let wgl = Wgl::load(config)?;

        match config.mode() {
            Mode::Detect => Self::detect(wgl),
            Mode::Standalone => Self::standalone(wgl, config),
            Mode::Share => Self::share(wgl, config),
        }
    }

    fn detect(wgl: Wgl) -> Result<Self> {
        let (context, hdc) = unsafe { (wgl.GetCurrentContext(), wgl.GetCurrentDC()) };
        if context.is_null() {
            return Err(ErrorKind::NoCurrentContext.into());
        }

        debug!("detected WGL context {context:?}");
        Ok(Self { hdc, context, owns_context: false, window: None, wgl })
    }

    fn standalone(wgl: Wgl, config: &ContextConfig) -> Result<Self> {
        let window = Window::create()?;
        window.set_pixel_format()?;

        let hdc = window.hdc();
        let extensions = Extensions::bootstrap(&wgl, hdc)?;
        let context = create_context(&wgl, &extensions, hdc, ptr::null(), config.gl_version())?;

        debug!("created standalone WGL context {context:?}");
        let this = Self { hdc, context, owns_context: true, window: Some(window), wgl };
        this.activate(config)
    }

    fn share(wgl: Wgl, config: &ContextConfig) -> Result<Self> {
        let (share, hdc) = unsafe { (wgl.GetCurrentContext(), wgl.GetCurrentDC()) };
        if share.is_null() {
            return Err(ErrorKind::NoCurrentContext.into());
        }

        // The shared context is current, so the extensions can be queried
        // right away.
        let extensions = Extensions::query(&wgl, hdc);
        let context = create_context(&wgl, &extensions, hdc, share, config.gl_version())?;

        debug!("created WGL context {context:?} sharing with {share:?}");
        let this = Self { hdc, context, owns_context: true, window: None, wgl };
        this.activate(config)
    }

    /// Make a freshly created context current and check its version.
    fn activate(self, config: &ContextConfig) -> Result<Self> {
        if unsafe { self.wgl.MakeCurrent(self.hdc, self.context) } == 0 {
            return Err(IoError::last_os_error().into());
        }

        crate::api::verify_version(config.gl_version(), |name| self.get_proc_address(name))?;
        Ok(self)
    }

    /// Resolve a GL entry point, `wglGetProcAddress` first, then
    /// `opengl32.dll` for the GL 1.1 functions it doesn't hand out.
    pub(crate) fn get_proc_address(&self, name: &str) -> *const c_void {
        let name = match crate::api::proc_name(name) {
            Some(name) => name,
            None => return ptr::null(),
        };

        let address = self.wgl.get_proc_address(&name);
        if !address.is_null() {
            return address;
        }

        unsafe { lib_loading::symbol(self.wgl.library(), &name) }
    }

    pub(crate) fn make_current(&self) -> Result<MakeCurrentGuard<'_>> {
        MakeCurrentGuard::new(&self.wgl, self.hdc, self.context)
    }

    pub(crate) fn is_current(&self) -> bool {
        unsafe { self.wgl.GetCurrentContext() == self.context }
    }

    pub(crate) fn raw_context(&self) -> *const c_void {
        self.context
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if !self.owns_context {
            return;
        }

        unsafe {
            if self.wgl.GetCurrentContext() == self.context {
                self.wgl.MakeCurrent(ptr::null(), ptr::null());
            }

            if self.wgl.DeleteContext(self.context) == 0 {
                warn!("`wglDeleteContext` failed: {}", IoError::last_os_error());
            }
        }
        trace!("deleted WGL context {:?}", self.context);
    }
}

fn create_context(
    wgl: &Wgl,
    extensions: &Extensions,
    hdc: HDC,
    share: HGLRC,
    version: Option<Version>,
) -> Result<HGLRC> {
    let version = match version {
        Some(version) => version,
        None => return create_legacy_context(wgl, hdc, share),
    };

    if !extensions.contains("WGL_ARB_create_context")
        || !extensions.wgl_extra.CreateContextAttribsARB.is_loaded()
    {
        return Err(Error::new(
            None,
            Some(format!("OpenGL {version} requires WGL_ARB_create_context")),
            ErrorKind::UnsupportedVersion,
        ));
    }

    let mut attrs = Vec::<c_int>::with_capacity(7);
    attrs.push(wgl_extra::CONTEXT_MAJOR_VERSION_ARB as c_int);
    attrs.push(version.major as c_int);
    attrs.push(wgl_extra::CONTEXT_MINOR_VERSION_ARB as c_int);
    attrs.push(version.minor as c_int);

    // Profiles only exist since 3.2.
    if version >= Version::new(3, 2) && extensions.contains("WGL_ARB_create_context_profile") {
        attrs.push(wgl_extra::CONTEXT_PROFILE_MASK_ARB as c_int);
        attrs.push(wgl_extra::CONTEXT_CORE_PROFILE_BIT_ARB as c_int);
    }

    // Terminate list with zero.
    attrs.push(0);

    unsafe {
        let raw = extensions.wgl_extra.CreateContextAttribsARB(hdc, share, attrs.as_ptr());
        if !raw.is_null() {
            return Ok(raw);
        }
    }

    let err = IoError::last_os_error();
    let is_version = err.raw_os_error().map_or(false, is_version_error);
    let err = Error::from(err);
    if is_version {
        Err(err.with_kind(ErrorKind::UnsupportedVersion))
    } else {
        Err(err)
    }
}

/// A context of whatever version the driver picks.
fn create_legacy_context(wgl: &Wgl, hdc: HDC, share: HGLRC) -> Result<HGLRC> {
    unsafe {
        let raw = wgl.CreateContext(hdc);
        if raw.is_null() {
            return Err(IoError::last_os_error().into());
        }

        // Context sharing.
        if !share.is_null() && wgl.ShareLists(share, raw) == 0 {
            let err = IoError::last_os_error().into();
            wgl.DeleteContext(raw);
            return Err(err);
        }

        Ok(raw)
    }
}
