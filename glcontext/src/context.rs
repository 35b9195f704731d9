//! The context handle.

use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr;

use log::{debug, trace};

use crate::api;
use crate::backend::Backend;
use crate::config::{ContextConfig, Mode};
use crate::error::{ErrorKind, Result};

/// Forward a call to whichever native context the enum holds.
macro_rules! gl_api_dispatch {
    ($what:expr; $enum:ident($inner:ident) => $body:expr) => {
        match *$what {
            #[cfg(egl_backend)]
            $enum::Egl(ref $inner) => $body,
            #[cfg(glx_backend)]
            $enum::Glx(ref $inner) => $body,
            #[cfg(wgl_backend)]
            $enum::Wgl(ref $inner) => $body,
            #[cfg(cgl_backend)]
            $enum::Cgl(ref $inner) => $body,
        }
    };
}

pub(crate) const UNAVAILABLE: &str = "backend is not available on this target";

/// An OpenGL context usable for function loading and scoped activation.
///
/// A handle either attaches to the context current on the calling thread
/// ([`Mode::Detect`]) or owns a context it created. Owned native resources are
/// destroyed on [`Context::release`] or when the handle is dropped, an attached
/// context is never destroyed.
///
/// The handle is neither [`Send`] nor [`Sync`].
#[derive(Debug)]
pub struct Context {
    /// The native context, [`None`] once released.
    inner: Option<ContextInner>,
    mode: Mode,
    backend: Backend,
    _nosendsync: PhantomData<*mut ()>,
}

impl Context {
    /// Create a context with the default backend of the target.
    ///
    /// See [`Backend::create`] to pick the backend.
    pub fn new(config: &ContextConfig) -> Result<Self> {
        Backend::default_for_target()
            .ok_or(ErrorKind::NotSupported("no backend for this target"))?
            .create(config)
    }

    pub(crate) fn with_backend(backend: Backend, config: &ContextConfig) -> Result<Self> {
        let inner = match backend {
            #[cfg(egl_backend)]
            Backend::Egl => ContextInner::Egl(api::egl::context::Context::new(config)?),
            #[cfg(glx_backend)]
            Backend::Glx => ContextInner::Glx(api::glx::context::Context::new(config)?),
            #[cfg(wgl_backend)]
            Backend::Wgl => ContextInner::Wgl(api::wgl::context::Context::new(config)?),
            #[cfg(cgl_backend)]
            Backend::Cgl => ContextInner::Cgl(api::cgl::context::Context::new(config)?),
            #[allow(unreachable_patterns)]
            _ => return Err(ErrorKind::NotSupported(UNAVAILABLE).into()),
        };

        debug!("{} context ready on {backend}", config.mode());
        Ok(Self { inner: Some(inner), mode: config.mode(), backend, _nosendsync: PhantomData })
    }

    /// Resolve a GL entry point.
    ///
    /// Names that aren't GL, WGL, EGL or CGL entry points, and any name once
    /// the handle is released, give null. This is not an existence check: an
    /// unknown `gl*` name may still resolve to a dispatch stub, for instance
    /// with GLVND. Check the version or the extensions before calling what an
    /// optional name returns.
    pub fn load(&self, name: &str) -> *const c_void {
        match self.inner {
            Some(ref inner) => inner.get_proc_address(name),
            None => ptr::null(),
        }
    }

    /// Make the context current until the returned guard is dropped.
    ///
    /// Dropping the guard restores the context that was current before, or
    /// unbinds if there was none.
    pub fn enter(&self) -> Result<ContextGuard<'_>> {
        let inner = self.inner.as_ref().ok_or(ErrorKind::ContextReleased)?;
        let guard = match *inner {
            #[cfg(egl_backend)]
            ContextInner::Egl(ref context) => GuardInner::Egl(context.make_current()?),
            #[cfg(glx_backend)]
            ContextInner::Glx(ref context) => GuardInner::Glx(context.make_current()?),
            #[cfg(wgl_backend)]
            ContextInner::Wgl(ref context) => GuardInner::Wgl(context.make_current()?),
            #[cfg(cgl_backend)]
            ContextInner::Cgl(ref context) => GuardInner::Cgl(context.make_current()?),
        };

        Ok(ContextGuard { _inner: guard, _context: PhantomData })
    }

    /// Destroy the owned native resources.
    ///
    /// Releasing again does nothing. A detected context is left alone, only
    /// the libraries opened for it are closed.
    pub fn release(&mut self) {
        if let Some(inner) = self.inner.take() {
            drop(inner);
            trace!("released {} context on {}", self.mode, self.backend);
        }
    }

    /// The mode the context was obtained with.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether the context was created as a standalone one.
    pub fn is_standalone(&self) -> bool {
        self.mode == Mode::Standalone
    }

    /// The native API in use.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }

    /// Whether the context is current on the calling thread.
    pub fn is_current(&self) -> bool {
        self.inner.as_ref().map_or(false, ContextInner::is_current)
    }

    /// The native context object, `EGLContext`, `GLXContext`, `HGLRC` or
    /// `CGLContextObj`. Null once released.
    pub fn raw_context(&self) -> *const c_void {
        self.inner.as_ref().map_or(ptr::null(), ContextInner::raw_context)
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Debug)]
enum ContextInner {
    #[cfg(egl_backend)]
    Egl(api::egl::context::Context),
    #[cfg(glx_backend)]
    Glx(api::glx::context::Context),
    #[cfg(wgl_backend)]
    Wgl(api::wgl::context::Context),
    #[cfg(cgl_backend)]
    Cgl(api::cgl::context::Context),
}

impl ContextInner {
    fn get_proc_address(&self, name: &str) -> *const c_void {
        gl_api_dispatch!(self; Self(context) => context.get_proc_address(name))
    }

    fn is_current(&self) -> bool {
        gl_api_dispatch!(self; Self(context) => context.is_current())
    }

    fn raw_context(&self) -> *const c_void {
        gl_api_dispatch!(self; Self(context) => context.raw_context())
    }
}

/// A scope during which a [`Context`] is current.
///
/// Dropping it restores the previously current context, failures to do so
/// are logged.
#[derive(Debug)]
pub struct ContextGuard<'a> {
    _inner: GuardInner<'a>,
    _context: PhantomData<&'a Context>,
}

// Held for its `Drop` only.
#[allow(dead_code)]
#[derive(Debug)]
enum GuardInner<'a> {
    #[cfg(egl_backend)]
    Egl(api::egl::make_current_guard::MakeCurrentGuard<'a>),
    #[cfg(glx_backend)]
    Glx(api::glx::make_current_guard::MakeCurrentGuard<'a>),
    #[cfg(wgl_backend)]
    Wgl(api::wgl::make_current_guard::MakeCurrentGuard<'a>),
    #[cfg(cgl_backend)]
    Cgl(api::cgl::make_current_guard::MakeCurrentGuard),
    #[cfg(not(any(egl_backend, glx_backend, wgl_backend)))]
    Unbound(PhantomData<&'a ()>),
}
