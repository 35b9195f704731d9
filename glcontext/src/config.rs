//! Context configuration.
//!
//! A [`ContextConfig`] is assembled once by the embedding layer, either through
//! [`ContextConfigBuilder`] or from the flat key/value surface with
//! [`ContextConfig::from_options`], and is then consumed by a backend.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, ErrorKind, Result};

/// The `glversion` used when none is given, OpenGL 3.3.
pub const DEFAULT_GL_VERSION: u32 = 330;

/// How the context is obtained.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Attach to the context current on the calling thread.
    #[default]
    Detect,

    /// Create an offscreen context owned by the handle.
    Standalone,

    /// Create a context sharing objects with the current one and bind it to
    /// the current drawable.
    Share,
}

impl Mode {
    fn as_str(&self) -> &'static str {
        match self {
            Mode::Detect => "detect",
            Mode::Standalone => "standalone",
            Mode::Share => "share",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "detect" => Ok(Mode::Detect),
            "standalone" => Ok(Mode::Standalone),
            "share" => Ok(Mode::Share),
            _ => Err(invalid(format!("unknown mode `{s}`"))),
        }
    }
}

/// A minimum OpenGL version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major version of the api.
    pub major: u8,
    /// Minor version of the api.
    pub minor: u8,
}

impl Version {
    /// Create new version with the given `major` and `minor` values.
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Split a `major * 100 + minor * 10` integer, `330` being 3.3.
    ///
    /// Zero means no minimum is requested.
    pub fn from_glversion(glversion: u32) -> Option<Self> {
        if glversion == 0 {
            return None;
        }

        Some(Self::new((glversion / 100 % 10) as u8, (glversion / 10 % 10) as u8))
    }

    /// The `major * 100 + minor * 10` form of this version.
    pub fn glversion(&self) -> u32 {
        self.major as u32 * 100 + self.minor as u32 * 10
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Immutable configuration consumed by a backend.
///
/// Not every field applies to every backend: CGL ignores the library paths
/// and the device index, and only EGL honors the device index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    pub(crate) mode: Mode,
    pub(crate) gl_version: Option<Version>,
    pub(crate) driver_library: Option<PathBuf>,
    pub(crate) windowing_library: Option<PathBuf>,
    pub(crate) driver_library_override: Option<PathBuf>,
    pub(crate) windowing_library_override: Option<PathBuf>,
    pub(crate) device_index: Option<usize>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfigBuilder::new().build()
    }
}

impl ContextConfig {
    /// Start building a configuration.
    pub fn builder() -> ContextConfigBuilder {
        ContextConfigBuilder::new()
    }

    /// Parse the flat key/value configuration surface.
    ///
    /// Recognized keys are `mode`, `glversion`, `libgl`, `libx11`, `libegl`
    /// and `device_index`. `libx11` and `libegl` both name the windowing
    /// library of the backend in use.
    pub fn from_options<'a, I>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut builder = ContextConfigBuilder::new();
        for (key, value) in options {
            builder = match key {
                "mode" => builder.with_mode(value.parse()?),
                "glversion" => builder.with_gl_version(parse_int(key, value)?),
                "libgl" => builder.with_driver_library(value),
                "libx11" | "libegl" => builder.with_windowing_library(value),
                "device_index" => builder.with_device_index(parse_int(key, value)?),
                _ => return Err(invalid(format!("unknown option `{key}`"))),
            };
        }

        Ok(builder.build())
    }

    /// The requested mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The minimum requested version, [`None`] when no minimum is requested.
    pub fn gl_version(&self) -> Option<Version> {
        self.gl_version
    }

    /// Explicit path or name of the GL driver library.
    pub fn driver_library(&self) -> Option<&Path> {
        self.driver_library.as_deref()
    }

    /// Explicit path or name of the windowing library (`libX11`, `libEGL`).
    pub fn windowing_library(&self) -> Option<&Path> {
        self.windowing_library.as_deref()
    }

    /// Environment supplied driver library, tried after the explicit one.
    pub fn driver_library_override(&self) -> Option<&Path> {
        self.driver_library_override.as_deref()
    }

    /// Environment supplied windowing library, tried after the explicit one.
    pub fn windowing_library_override(&self) -> Option<&Path> {
        self.windowing_library_override.as_deref()
    }

    /// The EGL device to create the context on.
    pub fn device_index(&self) -> Option<usize> {
        self.device_index
    }
}

/// Builder for [`ContextConfig`].
#[derive(Debug, Clone)]
pub struct ContextConfigBuilder {
    config: ContextConfig,
}

impl Default for ContextConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextConfigBuilder {
    /// Create a builder holding the defaults: detect mode and OpenGL 3.3.
    pub fn new() -> Self {
        Self {
            config: ContextConfig {
                mode: Mode::Detect,
                gl_version: Version::from_glversion(DEFAULT_GL_VERSION),
                driver_library: None,
                windowing_library: None,
                driver_library_override: None,
                windowing_library_override: None,
                device_index: None,
            },
        }
    }

    /// Sets how the context is obtained.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Sets the minimum version as `major * 100 + minor * 10`.
    ///
    /// Passing `0` requests a legacy context with no minimum.
    pub fn with_gl_version(mut self, glversion: u32) -> Self {
        self.config.gl_version = Version::from_glversion(glversion);
        self
    }

    /// Sets the GL driver library, a bare name or a path.
    pub fn with_driver_library(mut self, library: impl Into<PathBuf>) -> Self {
        self.config.driver_library = Some(library.into());
        self
    }

    /// Sets the windowing library, a bare name or a path.
    pub fn with_windowing_library(mut self, library: impl Into<PathBuf>) -> Self {
        self.config.windowing_library = Some(library.into());
        self
    }

    /// Sets the driver library taken from the environment.
    pub fn with_driver_library_override(mut self, library: Option<impl Into<PathBuf>>) -> Self {
        self.config.driver_library_override = library.map(Into::into);
        self
    }

    /// Sets the windowing library taken from the environment.
    pub fn with_windowing_library_override(mut self, library: Option<impl Into<PathBuf>>) -> Self {
        self.config.windowing_library_override = library.map(Into::into);
        self
    }

    /// Selects an enumerated EGL device.
    pub fn with_device_index(mut self, index: usize) -> Self {
        self.config.device_index = Some(index);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ContextConfig {
        self.config
    }
}

fn parse_int<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| invalid(format!("`{key}` expects an integer, got `{value}`")))
}

fn invalid(message: String) -> Error {
    Error::new(None, Some(message), ErrorKind::InvalidConfig)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glversion_split() {
        assert_eq!(Version::from_glversion(330), Some(Version::new(3, 3)));
        assert_eq!(Version::from_glversion(460), Some(Version::new(4, 6)));
        assert_eq!(Version::from_glversion(0), None);
        assert_eq!(Version::new(4, 5).glversion(), 450);
    }

    #[test]
    fn version_ordering() {
        assert!(Version::new(3, 3) < Version::new(4, 0));
        assert!(Version::new(4, 1) > Version::new(3, 9));
        assert_eq!(Version::new(3, 3).to_string(), "3.3");
    }

    #[test]
    fn defaults() {
        let config = ContextConfig::default();
        assert_eq!(config.mode(), Mode::Detect);
        assert_eq!(config.gl_version(), Some(Version::new(3, 3)));
        assert!(config.driver_library().is_none());
        assert!(config.device_index().is_none());
    }

    #[test]
    fn options_are_parsed() {
        let config = ContextConfig::from_options([
            ("mode", "standalone"),
            ("glversion", "450"),
            ("libgl", "libGL.so.1"),
            ("libegl", "/usr/lib/libEGL.so.1"),
            ("device_index", "2"),
        ])
        .unwrap();

        assert_eq!(config.mode(), Mode::Standalone);
        assert_eq!(config.gl_version(), Some(Version::new(4, 5)));
        assert_eq!(config.driver_library(), Some(Path::new("libGL.so.1")));
        assert_eq!(config.windowing_library(), Some(Path::new("/usr/lib/libEGL.so.1")));
        assert_eq!(config.device_index(), Some(2));
    }

    #[test]
    fn libx11_is_the_windowing_library() {
        let config = ContextConfig::from_options([("libx11", "libX11.so.6")]).unwrap();
        assert_eq!(config.windowing_library(), Some(Path::new("libX11.so.6")));
    }

    #[test]
    fn bad_options_are_rejected() {
        let unknown = ContextConfig::from_options([("backend", "egl")]).unwrap_err();
        assert_eq!(unknown.error_kind(), ErrorKind::InvalidConfig);

        let mode = ContextConfig::from_options([("mode", "window")]).unwrap_err();
        assert_eq!(mode.error_kind(), ErrorKind::InvalidConfig);

        let version = ContextConfig::from_options([("glversion", "3.3")]).unwrap_err();
        assert_eq!(version.error_kind(), ErrorKind::InvalidConfig);

        let index = ContextConfig::from_options([("device_index", "-1")]).unwrap_err();
        assert_eq!(index.error_kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn mode_round_trips_through_strings() {
        for mode in [Mode::Detect, Mode::Standalone, Mode::Share] {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
    }
}
