//! Selection of the native API a context is created with.

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::config::ContextConfig;
use crate::context::{Context, UNAVAILABLE};
use crate::error::{Error, ErrorKind, Result};

/// The native context API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// WGL on Windows.
    Wgl,

    /// GLX on X11.
    Glx,

    /// EGL, headless through a device or the default display.
    Egl,

    /// CGL on macOS.
    Cgl,
}

impl Backend {
    /// The backend used when none is named, if one was compiled in.
    ///
    /// On the free unix systems GLX is preferred over EGL.
    pub const fn default_for_target() -> Option<Backend> {
        if cfg!(wgl_backend) {
            Some(Backend::Wgl)
        } else if cfg!(cgl_backend) {
            Some(Backend::Cgl)
        } else if cfg!(glx_backend) {
            Some(Backend::Glx)
        } else if cfg!(egl_backend) {
            Some(Backend::Egl)
        } else {
            None
        }
    }

    /// Whether the backend was compiled for this target.
    pub const fn is_available(&self) -> bool {
        match self {
            Backend::Wgl => cfg!(wgl_backend),
            Backend::Glx => cfg!(glx_backend),
            Backend::Egl => cfg!(egl_backend),
            Backend::Cgl => cfg!(cgl_backend),
        }
    }

    /// Create a context with this backend.
    pub fn create(self, config: &ContextConfig) -> Result<Context> {
        debug!(
            "creating a {} context on {self}, requested version {:?}",
            config.mode(),
            config.gl_version()
        );

        if !self.is_available() {
            return Err(ErrorKind::NotSupported(UNAVAILABLE).into());
        }

        Context::with_backend(self, config)
    }

    fn as_str(&self) -> &'static str {
        match self {
            Backend::Wgl => "wgl",
            Backend::Glx => "glx",
            Backend::Egl => "egl",
            Backend::Cgl => "cgl",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "wgl" => Ok(Backend::Wgl),
            "x11" | "glx" => Ok(Backend::Glx),
            "egl" => Ok(Backend::Egl),
            "darwin" | "cgl" => Ok(Backend::Cgl),
            _ => Err(Error::new(
                None,
                Some(format!("unknown backend `{s}`")),
                ErrorKind::InvalidConfig,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names() {
        assert_eq!("x11".parse::<Backend>().unwrap(), Backend::Glx);
        assert_eq!("glx".parse::<Backend>().unwrap(), Backend::Glx);
        assert_eq!("darwin".parse::<Backend>().unwrap(), Backend::Cgl);
        assert_eq!("wgl".parse::<Backend>().unwrap(), Backend::Wgl);
        assert_eq!("egl".parse::<Backend>().unwrap(), Backend::Egl);

        let err = "metal".parse::<Backend>().unwrap_err();
        assert_eq!(err.error_kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn display_parses_back() {
        for backend in [Backend::Wgl, Backend::Glx, Backend::Egl, Backend::Cgl] {
            assert_eq!(backend.to_string().parse::<Backend>().unwrap(), backend);
        }
    }

    #[test]
    fn default_backend_is_available() {
        match Backend::default_for_target() {
            Some(backend) => assert!(backend.is_available()),
            None => assert!(!cfg!(any(
                egl_backend,
                glx_backend,
                wgl_backend,
                cgl_backend
            ))),
        }
    }

    #[test]
    fn egl_is_the_fallback_without_glx() {
        if cfg!(all(egl_backend, not(glx_backend))) {
            assert_eq!(Backend::default_for_target(), Some(Backend::Egl));
        }
        if cfg!(glx_backend) {
            assert_eq!(Backend::default_for_target(), Some(Backend::Glx));
        }
    }

    #[test]
    fn unavailable_backend_is_not_supported() {
        let unavailable = [Backend::Wgl, Backend::Glx, Backend::Egl, Backend::Cgl]
            .into_iter()
            .find(|backend| !backend.is_available());

        if let Some(backend) = unavailable {
            let err = backend.create(&ContextConfig::default()).unwrap_err();
            assert!(err.not_supported());
        }
    }
}
