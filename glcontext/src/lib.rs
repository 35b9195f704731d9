//! The purpose of this library is to give an embedding layer an OpenGL
//! [`Context`] to load GL functions from, without any window or event loop.
//!
//! A context is either detected, standalone or shared, see [`Mode`]. Detection
//! attaches to the context already current on the calling thread. Standalone
//! creation builds an offscreen context on a hidden window, a pbuffer or no
//! surface at all, depending on the platform. Sharing creates a context next to
//! the current one that shares its objects.
//!
//! The native API is chosen with a [`Backend`]: WGL on Windows, GLX or EGL on
//! the free unix systems, CGL on macOS. [`Context::new`] picks the default one
//! for the target.
//!
//! ```no_run
//! use glcontext::{ContextConfig, Mode};
//!
//! let config = ContextConfig::builder()
//!     .with_mode(Mode::Standalone)
//!     .with_gl_version(330)
//!     .build();
//! let context = glcontext::Context::new(&config)?;
//! let get_string = context.load("glGetString");
//! assert!(!get_string.is_null());
//!
//! // Scoped activation restores whatever was current before.
//! let guard = context.enter()?;
//! drop(guard);
//! # Ok::<(), glcontext::Error>(())
//! ```
//!
//! The native libraries are loaded at runtime. Their location can be forced
//! through the configuration, see [`ContextConfigBuilder`].

#![deny(rust_2018_idioms, missing_debug_implementations)]

mod api;
pub mod backend;
pub mod config;
pub mod context;
pub mod error;
mod lib_loading;
mod utils;

pub use crate::backend::Backend;
pub use crate::config::{ContextConfig, ContextConfigBuilder, Mode, Version, DEFAULT_GL_VERSION};
pub use crate::context::{Context, ContextGuard};
pub use crate::error::{Error, ErrorKind, Result};

/// EGL device enumeration.
#[cfg(egl_backend)]
pub mod egl {
    pub use crate::api::egl::{devices, Device};
}
