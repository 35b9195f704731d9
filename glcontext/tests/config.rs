use std::path::Path;

use glcontext::{Backend, ContextConfig, ErrorKind, Mode, Version, DEFAULT_GL_VERSION};

#[test]
fn builder_defaults() {
    let config = ContextConfig::builder().build();
    assert_eq!(config, ContextConfig::default());
    assert_eq!(config.mode(), Mode::Detect);
    assert_eq!(config.gl_version(), Version::from_glversion(DEFAULT_GL_VERSION));
    assert!(config.windowing_library().is_none());
    assert!(config.driver_library_override().is_none());
}

#[test]
fn zero_glversion_has_no_minimum() {
    let config = ContextConfig::builder().with_gl_version(0).build();
    assert_eq!(config.gl_version(), None);
}

#[test]
fn overrides_are_kept_apart() {
    let config = ContextConfig::builder()
        .with_driver_library("libGL.so.1")
        .with_driver_library_override(Some("/opt/mesa/libGL.so.1"))
        .with_windowing_library_override(None::<&str>)
        .build();

    assert_eq!(config.driver_library(), Some(Path::new("libGL.so.1")));
    assert_eq!(config.driver_library_override(), Some(Path::new("/opt/mesa/libGL.so.1")));
    assert!(config.windowing_library_override().is_none());
}

#[test]
fn options_surface() {
    let config =
        ContextConfig::from_options([("mode", "share"), ("glversion", "0"), ("libx11", "x.so")])
            .unwrap();
    assert_eq!(config.mode(), Mode::Share);
    assert_eq!(config.gl_version(), None);
    assert_eq!(config.windowing_library(), Some(Path::new("x.so")));

    let err = ContextConfig::from_options([("glversion", "three")]).unwrap_err();
    assert_eq!(err.error_kind(), ErrorKind::InvalidConfig);
    assert!(err.to_string().contains("glversion"));
}

#[test]
fn missing_libraries_are_reported() {
    let config = ContextConfig::builder()
        .with_mode(Mode::Standalone)
        .with_driver_library("./libglcontext-missing.so")
        .with_windowing_library("./libglcontext-missing.so")
        .build();

    // CGL always uses the system framework.
    let backends = [Backend::Glx, Backend::Egl, Backend::Wgl];
    for backend in backends.into_iter().filter(Backend::is_available) {
        let err = backend.create(&config).unwrap_err();
        assert_eq!(err.error_kind(), ErrorKind::LibraryNotFound, "{backend}: {err}");
        assert!(err.to_string().contains("libglcontext-missing.so"));
    }
}
