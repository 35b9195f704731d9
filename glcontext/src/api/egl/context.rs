//! EGL context creation and teardown.

use std::ffi::c_void;
use std::ptr;

use glcontext_egl_sys::egl;
use glcontext_egl_sys::egl::types::{EGLConfig, EGLContext, EGLDisplay, EGLSurface, EGLint};
use libloading::Library;
use log::{debug, trace, warn};

use crate::config::{ContextConfig, Mode, Version};
use crate::error::{Error, ErrorKind, Result};
use crate::lib_loading;

use super::device::query_devices;
use super::make_current_guard::MakeCurrentGuard;
use super::{egl_error, ClientFeatures, DisplayFeatures, Egl, GL_LIBS};

/// An EGL context, detected or owned.
#[derive(Debug)]
pub(crate) struct Context {
    display: EGLDisplay,
    surface: EGLSurface,
    context: EGLContext,

    /// Whether the context and surface were created by us.
    owned: bool,

    libgl: Library,
    egl: Egl,
}

impl Context {
    pub(crate) fn new(config: &ContextConfig) -> Result<Self> {
        let egl = Egl::load(config)?;
        let libgl = lib_loading::locate(
            config.driver_library(),
            config.driver_library_override(),
            GL_LIBS,
        )?;

        match config.mode() {
            Mode::Detect => Self::detect(egl, libgl),
            Mode::Standalone => Self::standalone(egl, libgl, config),
            Mode::Share => {
                Err(ErrorKind::NotSupported("share mode is not supported with EGL").into())
            },
        }
    }

    fn detect(egl: Egl, libgl: Library) -> Result<Self> {
        let (display, surface, context) = unsafe {
            (
                egl.GetCurrentDisplay(),
                egl.GetCurrentSurface(egl::DRAW as EGLint),
                egl.GetCurrentContext(),
            )
        };

        if context == egl::NO_CONTEXT {
            return Err(ErrorKind::NoCurrentContext.into());
        }

        debug!("detected EGL context {context:?}");
        Ok(Self { display, surface, context, owned: false, libgl, egl })
    }

    fn standalone(egl: Egl, libgl: Library, config: &ContextConfig) -> Result<Self> {
        // Filled in step by step so a failure tears down what was acquired.
        let mut this = Self {
            display: egl::NO_DISPLAY,
            surface: egl::NO_SURFACE,
            context: egl::NO_CONTEXT,
            owned: true,
            libgl,
            egl,
        };

        this.display = open_display(&this.egl, config)?;

        let (mut major, mut minor) = (0, 0);
        if unsafe { this.egl.Initialize(this.display, &mut major, &mut minor) } == egl::FALSE {
            return Err(egl_error(&this.egl, "eglInitialize"));
        }

        let extensions = this.egl.extensions(this.display);
        let features = DisplayFeatures::extract(&extensions, major, minor);
        debug!("initialized EGL {major}.{minor}, {features:?}");

        let egl_config = choose_config(&this.egl, this.display, features)?;

        if unsafe { this.egl.BindAPI(egl::OPENGL_API) } == egl::FALSE {
            return Err(egl_error(&this.egl, "eglBindAPI"));
        }

        this.context = create_context(&this.egl, this.display, egl_config, config, features)?;

        if !features.contains(DisplayFeatures::SURFACELESS) {
            let attrs = [egl::WIDTH as EGLint, 1, egl::HEIGHT as EGLint, 1, egl::NONE as EGLint];
            this.surface = unsafe {
                this.egl.CreatePbufferSurface(this.display, egl_config, attrs.as_ptr())
            };
            if this.surface == egl::NO_SURFACE {
                return Err(egl_error(&this.egl, "eglCreatePbufferSurface"));
            }
        }

        let made_current = unsafe {
            this.egl.MakeCurrent(this.display, this.surface, this.surface, this.context)
        };
        if made_current == egl::FALSE {
            return Err(egl_error(&this.egl, "eglMakeCurrent"));
        }

        crate::api::verify_version(config.gl_version(), |name| this.get_proc_address(name))?;

        debug!("created standalone EGL context {:?}", this.context);
        Ok(this)
    }

    /// Resolve a GL entry point, `eglGetProcAddress` first, then the driver.
    pub(crate) fn get_proc_address(&self, name: &str) -> *const c_void {
        let name = match crate::api::proc_name(name) {
            Some(name) => name,
            None => return ptr::null(),
        };

        let address = self.egl.get_proc_address(&name);
        if !address.is_null() {
            return address;
        }

        unsafe { lib_loading::symbol(&self.libgl, &name) }
    }

    pub(crate) fn make_current(&self) -> Result<MakeCurrentGuard<'_>> {
        MakeCurrentGuard::new(&self.egl, self.display, self.surface, self.context)
    }

    pub(crate) fn is_current(&self) -> bool {
        unsafe { self.egl.GetCurrentContext() == self.context }
    }

    pub(crate) fn raw_context(&self) -> *const c_void {
        self.context as *const c_void
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }

        unsafe {
            if self.context != egl::NO_CONTEXT {
                if self.egl.GetCurrentContext() == self.context {
                    self.egl.MakeCurrent(
                        self.display,
                        egl::NO_SURFACE,
                        egl::NO_SURFACE,
                        egl::NO_CONTEXT,
                    );
                }

                if self.egl.DestroyContext(self.display, self.context) == egl::FALSE {
                    warn!("{}", egl_error(&self.egl, "eglDestroyContext"));
                }
                trace!("destroyed EGL context {:?}", self.context);
            }

            if self.surface != egl::NO_SURFACE {
                if self.egl.DestroySurface(self.display, self.surface) == egl::FALSE {
                    warn!("{}", egl_error(&self.egl, "eglDestroySurface"));
                }
                trace!("destroyed EGL pbuffer {:?}", self.surface);
            }
        }

        // The display stays initialized. An `EGLDisplay` is a singleton per
        // device and terminating it would invalidate every other context on it.
    }
}

/// Open the display of the configured device, or the default display when
/// the library can't create displays from devices.
fn open_display(egl: &Egl, config: &ContextConfig) -> Result<EGLDisplay> {
    let client_extensions = egl.extensions(egl::NO_DISPLAY);
    let features = ClientFeatures::from_extensions(egl, &client_extensions);

    if features.contains(ClientFeatures::PLATFORM_DEVICE) {
        if let Some(devices) = query_devices(egl, features)? {
            let index = config.device_index().unwrap_or(0);
            match devices.get(index) {
                Some(&device) => {
                    debug!("using EGL device {index} of {}", devices.len());
                    let attrs = [egl::NONE as EGLint];
                    let display = unsafe {
                        egl.GetPlatformDisplayEXT(
                            egl::PLATFORM_DEVICE_EXT,
                            device as *mut _,
                            attrs.as_ptr(),
                        )
                    };
                    return check_display(egl, display, "eglGetPlatformDisplayEXT");
                },
                None if config.device_index().is_some() => {
                    return Err(Error::new(
                        None,
                        Some(format!(
                            "device index {index} is out of range, {} devices are available",
                            devices.len()
                        )),
                        ErrorKind::InvalidConfig,
                    ));
                },
                None => (),
            }
        }
    }

    if config.device_index().is_some() {
        return Err(ErrorKind::NotSupported("the EGL library can't select devices").into());
    }

    let display = unsafe { egl.GetDisplay(egl::DEFAULT_DISPLAY as _) };
    check_display(egl, display, "eglGetDisplay")
}

fn check_display(egl: &Egl, display: EGLDisplay, call: &str) -> Result<EGLDisplay> {
    if display == egl::NO_DISPLAY {
        Err(egl_error(egl, call))
    } else {
        Ok(display)
    }
}

fn choose_config(egl: &Egl, display: EGLDisplay, features: DisplayFeatures) -> Result<EGLConfig> {
    // Surfaceless contexts don't need the config to back any surface.
    let surface_type =
        if features.contains(DisplayFeatures::SURFACELESS) { 0 } else { egl::PBUFFER_BIT };

    let attrs = [
        egl::SURFACE_TYPE as EGLint,
        surface_type as EGLint,
        egl::RENDERABLE_TYPE as EGLint,
        egl::OPENGL_BIT as EGLint,
        egl::RED_SIZE as EGLint,
        8,
        egl::GREEN_SIZE as EGLint,
        8,
        egl::BLUE_SIZE as EGLint,
        8,
        egl::DEPTH_SIZE as EGLint,
        8,
        egl::NONE as EGLint,
    ];

    let mut egl_config: EGLConfig = ptr::null();
    let mut num_configs = 0;
    unsafe {
        if egl.ChooseConfig(display, attrs.as_ptr(), &mut egl_config, 1, &mut num_configs)
            == egl::FALSE
        {
            return Err(egl_error(egl, "eglChooseConfig"));
        }
    }

    if num_configs == 0 {
        return Err(Error::new(
            None,
            Some(String::from("no EGL config supports desktop OpenGL")),
            ErrorKind::ContextCreationFailed,
        ));
    }

    Ok(egl_config)
}

fn create_context(
    egl: &Egl,
    display: EGLDisplay,
    egl_config: EGLConfig,
    config: &ContextConfig,
    features: DisplayFeatures,
) -> Result<EGLContext> {
    let version =
        config.gl_version().filter(|_| features.contains(DisplayFeatures::CREATE_CONTEXT));

    let mut attrs = Vec::<EGLint>::with_capacity(7);
    if let Some(version) = version {
        attrs.push(egl::CONTEXT_MAJOR_VERSION as EGLint);
        attrs.push(version.major as EGLint);
        attrs.push(egl::CONTEXT_MINOR_VERSION as EGLint);
        attrs.push(version.minor as EGLint);

        // Profiles only exist since 3.2.
        if version >= Version::new(3, 2) {
            attrs.push(egl::CONTEXT_OPENGL_PROFILE_MASK as EGLint);
            attrs.push(egl::CONTEXT_OPENGL_CORE_PROFILE_BIT as EGLint);
        }
    }

    // Push `egl::NONE` to terminate the list.
    attrs.push(egl::NONE as EGLint);

    let context =
        unsafe { egl.CreateContext(display, egl_config, egl::NO_CONTEXT, attrs.as_ptr()) };
    if context != egl::NO_CONTEXT {
        return Ok(context);
    }

    let err = egl_error(egl, "eglCreateContext");
    // Versions the driver can't provide are refused with EGL_BAD_MATCH.
    if version.is_some() && err.raw_code() == Some(egl::BAD_MATCH as i64) {
        Err(err.with_kind(ErrorKind::UnsupportedVersion))
    } else {
        Err(err)
    }
}
