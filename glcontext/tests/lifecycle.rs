//! These need a GPU or a software rasterizer, and a display where the
//! platform requires one. Run them with `cargo test -- --ignored`.

use std::ffi::CStr;
use std::mem;
use std::thread;

use glcontext::{Backend, Context, ContextConfig, ErrorKind, Mode};

const GL_VERSION: u32 = 0x1F02;

type GlGetString = unsafe extern "system" fn(u32) -> *const u8;

fn standalone() -> Context {
    let config = ContextConfig::builder().with_mode(Mode::Standalone).build();
    Context::new(&config).unwrap()
}

#[test]
#[ignore]
fn standalone_context_loads_functions() {
    let context = standalone();
    assert!(context.is_standalone());
    assert!(context.is_current());
    assert!(!context.raw_context().is_null());

    let get_string = context.load("glGetString");
    assert!(!get_string.is_null());
    assert!(context.load("bogus").is_null());

    let _guard = context.enter().unwrap();
    let get_string: GlGetString = unsafe { mem::transmute(get_string) };
    let version = unsafe { CStr::from_ptr(get_string(GL_VERSION).cast()) };
    assert!(!version.to_bytes().is_empty());
}

#[test]
#[ignore]
fn enter_restores_the_previous_context() {
    let first = standalone();
    let second = standalone();
    assert!(second.is_current());

    {
        let _guard = first.enter().unwrap();
        assert!(first.is_current());
        assert!(!second.is_current());
    }

    assert!(second.is_current());
    assert!(!first.is_current());
}

#[test]
#[ignore]
fn release_is_idempotent() {
    let mut context = standalone();
    context.release();
    context.release();

    assert!(context.is_released());
    assert!(!context.is_current());
    assert!(context.load("glGetString").is_null());
    assert!(context.raw_context().is_null());
    assert_eq!(context.enter().unwrap_err().error_kind(), ErrorKind::ContextReleased);
}

#[test]
#[ignore]
fn create_release_cycles() {
    let config = ContextConfig::builder().with_mode(Mode::Standalone).build();
    for _ in 0..1000 {
        let mut context = Context::new(&config).unwrap();
        assert!(!context.load("glGetString").is_null());
        context.release();
    }
}

#[test]
#[ignore]
fn detect_without_current_context() {
    let config = ContextConfig::builder().with_mode(Mode::Detect).build();
    let kind = thread::spawn(move || Context::new(&config).unwrap_err().error_kind())
        .join()
        .unwrap();
    assert_eq!(kind, ErrorKind::NoCurrentContext);
}

#[test]
#[ignore]
fn detect_leaves_the_context_alive() {
    let owner = standalone();

    let config = ContextConfig::builder().with_mode(Mode::Detect).build();
    let mut detected = Context::new(&config).unwrap();
    assert_eq!(detected.raw_context(), owner.raw_context());
    assert!(!detected.is_standalone());
    assert!(!detected.load("glGetString").is_null());

    detected.release();
    assert!(owner.is_current());
    assert!(!owner.load("glGetString").is_null());
}

#[test]
#[ignore]
fn impossible_version_is_refused() {
    let config = ContextConfig::builder().with_mode(Mode::Standalone).with_gl_version(990).build();
    let err = Context::new(&config).unwrap_err();
    assert_eq!(err.error_kind(), ErrorKind::UnsupportedVersion);
}

#[test]
#[ignore]
fn legacy_context_without_minimum() {
    let config = ContextConfig::builder().with_mode(Mode::Standalone).with_gl_version(0).build();
    let context = Context::new(&config).unwrap();
    assert!(!context.load("glGetString").is_null());
}

#[cfg(any(glx_backend, wgl_backend, cgl_backend))]
#[test]
#[ignore]
fn share_with_the_current_context() {
    let owner = standalone();

    let config = ContextConfig::builder().with_mode(Mode::Share).build();
    let shared = Context::new(&config).unwrap();
    assert_eq!(shared.mode(), Mode::Share);
    assert!(shared.is_current());
    assert_ne!(shared.raw_context(), owner.raw_context());
}

#[cfg(egl_backend)]
#[test]
#[ignore]
fn egl_devices() {
    let devices = glcontext::egl::devices(&ContextConfig::default()).unwrap();
    for (index, device) in devices.iter().enumerate() {
        assert_eq!(device.index(), index);
    }

    let builder = ContextConfig::builder().with_mode(Mode::Standalone);
    let context = Backend::Egl.create(&builder.clone().build()).unwrap();
    assert_eq!(context.backend(), Backend::Egl);
    assert!(!context.load("glGetString").is_null());

    if !devices.is_empty() {
        let config = builder.with_device_index(devices.len()).build();
        let err = Backend::Egl.create(&config).unwrap_err();
        assert_eq!(err.error_kind(), ErrorKind::InvalidConfig);
    }
}

#[cfg(egl_backend)]
#[test]
#[ignore]
fn egl_share_is_not_supported() {
    let config = ContextConfig::builder().with_mode(Mode::Share).build();
    assert!(Backend::Egl.create(&config).unwrap_err().not_supported());
}

#[cfg(egl_backend)]
#[test]
#[ignore]
fn egl_create_release_cycles() {
    let devices = glcontext::egl::devices(&ContextConfig::default()).unwrap().len();

    let config = ContextConfig::builder().with_mode(Mode::Standalone).build();
    for cycle in 0..1000 {
        let mut context = Backend::Egl
            .create(&config)
            .unwrap_or_else(|err| panic!("cycle {cycle}: {err}"));
        context.release();
    }

    let after = glcontext::egl::devices(&ContextConfig::default()).unwrap().len();
    assert_eq!(after, devices);
}

#[cfg(egl_backend)]
#[test]
#[ignore]
fn egl_device_by_extension() {
    let devices = glcontext::egl::devices(&ContextConfig::default()).unwrap();
    let device = match devices.iter().find(|device| device.matches("EGL_MESA_device_software")) {
        Some(device) => device,
        None => return,
    };

    let config = ContextConfig::builder()
        .with_mode(Mode::Standalone)
        .with_device_index(device.index())
        .build();
    let context = Backend::Egl.create(&config).unwrap();
    assert!(context.is_current());
    assert!(!context.load("glGetString").is_null());
}
