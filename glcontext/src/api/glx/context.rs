//! GLX context creation and teardown.

use std::ffi::{c_int, c_uint, c_void};
use std::{mem, ptr};

use glcontext_glx_sys as ffi;
use glcontext_glx_sys::glx;
use glcontext_glx_sys::glx::types::{GLXContext, GLXDrawable, GLXFBConfig};
use log::{debug, trace};

use crate::config::{ContextConfig, Mode, Version};
use crate::error::{Error, ErrorKind, Result};
use crate::lib_loading;

use super::make_current_guard::MakeCurrentGuard;
use super::{is_version_error, Glx, SilentErrors, Xlib};

/// A GLX context, detected, created next to the current one, or hosted by a
/// hidden window.
#[derive(Debug)]
pub(crate) struct Context {
    display: *mut ffi::Display,
    drawable: GLXDrawable,
    context: GLXContext,

    /// Whether the context was created by us.
    owns_context: bool,

    /// The X resources hosting the context, unset in detect mode. Held for its
    /// `Drop` only.
    _x11: Option<X11>,

    glx: Glx,
}

impl Context {
    pub(crate) fn new(config: &ContextConfig) -> Result<Self> {
        let glx = Glx::load(config)?;

        match config.mode() {
            Mode::Detect => Self::detect(glx),
            Mode::Standalone => Self::standalone(glx, config),
            Mode::Share => Self::share(glx, config),
        }
    }

    fn detect(glx: Glx) -> Result<Self> {
        let context = unsafe { glx.GetCurrentContext() };
        if context.is_null() {
            return Err(ErrorKind::NoCurrentContext.into());
        }

        let (display, drawable) = unsafe {
            (glx.GetCurrentDisplay() as *mut ffi::Display, glx.GetCurrentDrawable())
        };

        debug!("detected GLX context {context:?}");
        Ok(Self { display, drawable, context, owns_context: false, _x11: None, glx })
    }

    fn standalone(glx: Glx, config: &ContextConfig) -> Result<Self> {
        let mut x11 = X11::open(Xlib::load(config)?)?;
        let screen = x11.default_screen();

        // Some drivers patch themselves when GLX is first used, so this has
        // to be called before anything else.
        let (mut major, mut minor) = (0, 0);
        unsafe {
            glx.QueryVersion(x11.display as *mut _, &mut major, &mut minor);
        }
        debug!("using GLX {major}.{minor} on screen {screen}");

        let fb_config = x11.choose_fb_config(&glx, screen, None)?;
        x11.create_window(&glx, fb_config)?;

        let context = create_context(
            &glx,
            &x11.xlib,
            x11.display,
            screen,
            fb_config,
            ptr::null(),
            config.gl_version(),
        )?;

        let this = Self {
            display: x11.display,
            drawable: x11.window,
            context,
            owns_context: true,
            _x11: Some(x11),
            glx,
        };
        this.activate(config)
    }

    fn share(glx: Glx, config: &ContextConfig) -> Result<Self> {
        let share = unsafe { glx.GetCurrentContext() };
        if share.is_null() {
            return Err(ErrorKind::NoCurrentContext.into());
        }

        let (display, drawable) = unsafe {
            (glx.GetCurrentDisplay() as *mut ffi::Display, glx.GetCurrentDrawable())
        };

        let x11 = X11::borrowed(Xlib::load(config)?, display);
        let screen = x11.default_screen();

        // Reuse the config of the shared context so the new one fits its
        // drawable.
        let mut fb_config_id = 0;
        let queried = unsafe {
            glx.QueryContext(display as *mut _, share, glx::FBCONFIG_ID as c_int, &mut fb_config_id)
        };
        let fb_config_id = (queried == ffi::Success as c_int).then_some(fb_config_id);

        let fb_config = x11.choose_fb_config(&glx, screen, fb_config_id)?;
        let context = create_context(
            &glx,
            &x11.xlib,
            display,
            screen,
            fb_config,
            share,
            config.gl_version(),
        )?;

        debug!("created GLX context {context:?} sharing with {share:?}");
        let this = Self { display, drawable, context, owns_context: true, _x11: Some(x11), glx };
        this.activate(config)
    }

    /// Make a freshly created context current and check its version.
    fn activate(self, config: &ContextConfig) -> Result<Self> {
        if unsafe { self.glx.MakeCurrent(self.display as *mut _, self.drawable, self.context) } == 0
        {
            return Err(Error::new(
                None,
                Some(String::from("`glXMakeCurrent` failed")),
                ErrorKind::ContextCreationFailed,
            ));
        }

        crate::api::verify_version(config.gl_version(), |name| self.get_proc_address(name))?;
        Ok(self)
    }

    /// Resolve a GL entry point, `glXGetProcAddress` first, then the driver.
    pub(crate) fn get_proc_address(&self, name: &str) -> *const c_void {
        let name = match crate::api::proc_name(name) {
            Some(name) => name,
            None => return ptr::null(),
        };

        let address = self.glx.get_proc_address(&name);
        if !address.is_null() {
            return address;
        }

        unsafe { lib_loading::symbol(self.glx.library(), &name) }
    }

    pub(crate) fn make_current(&self) -> Result<MakeCurrentGuard<'_>> {
        MakeCurrentGuard::new(&self.glx, self.display, self.drawable, self.context)
    }

    pub(crate) fn is_current(&self) -> bool {
        unsafe { self.glx.GetCurrentContext() == self.context }
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
            if self.glx.GetCurrentContext() == self.context {
                self.glx.MakeCurrent(self.display as *mut _, 0, ptr::null());
            }

            self.glx.DestroyContext(self.display as *mut _, self.context);
        }
        trace!("destroyed GLX context {:?}", self.context);
    }
}

/// The X display, window and colormap hosting a context.
#[derive(Debug)]
struct X11 {
    display: *mut ffi::Display,
    window: ffi::Window,
    colormap: ffi::Colormap,

    /// Whether the display was opened by us.
    owns_display: bool,

    xlib: Xlib,
}

impl X11 {
    fn open(xlib: Xlib) -> Result<Self> {
        let mut display = unsafe { (xlib.XOpenDisplay)(ptr::null()) };
        if display.is_null() {
            debug!("no default X display, trying `:0.0`");
            display = unsafe { (xlib.XOpenDisplay)(b":0.0\0".as_ptr().cast()) };
        }

        if display.is_null() {
            return Err(Error::new(
                None,
                Some(String::from("`XOpenDisplay` failed, no X display is reachable")),
                ErrorKind::ContextCreationFailed,
            ));
        }

        Ok(Self { display, window: 0, colormap: 0, owns_display: true, xlib })
    }

    fn borrowed(xlib: Xlib, display: *mut ffi::Display) -> Self {
        Self { display, window: 0, colormap: 0, owns_display: false, xlib }
    }

    fn default_screen(&self) -> c_int {
        unsafe { (self.xlib.XDefaultScreen)(self.display) }
    }

    /// Pick a window renderable RGBA config, or the config with the given id.
    fn choose_fb_config(
        &self,
        glx: &Glx,
        screen: c_int,
        fb_config_id: Option<c_int>,
    ) -> Result<GLXFBConfig> {
        let attrs: Vec<c_int> = match fb_config_id {
            Some(id) => vec![glx::FBCONFIG_ID as c_int, id, 0],
            None => vec![
                glx::X_RENDERABLE as c_int,
                1,
                glx::DRAWABLE_TYPE as c_int,
                glx::WINDOW_BIT as c_int,
                glx::RENDER_TYPE as c_int,
                glx::RGBA_BIT as c_int,
                glx::RED_SIZE as c_int,
                8,
                glx::GREEN_SIZE as c_int,
                8,
                glx::BLUE_SIZE as c_int,
                8,
                glx::DEPTH_SIZE as c_int,
                24,
                glx::DOUBLEBUFFER as c_int,
                1,
                0,
            ],
        };

        unsafe {
            let mut count = 0;
            let configs =
                glx.ChooseFBConfig(self.display as *mut _, screen, attrs.as_ptr(), &mut count);
            if configs.is_null() {
                return Err(Error::new(
                    None,
                    Some(String::from("`glXChooseFBConfig` found no usable config")),
                    ErrorKind::ContextCreationFailed,
                ));
            }

            let fb_config = if count > 0 { Some(*configs) } else { None };
            (self.xlib.XFree)(configs as *mut c_void);

            fb_config.ok_or_else(|| {
                Error::new(
                    None,
                    Some(String::from("`glXChooseFBConfig` found no usable config")),
                    ErrorKind::ContextCreationFailed,
                )
            })
        }
    }

    /// Create the unmapped 1x1 window the context is made current on.
    fn create_window(&mut self, glx: &Glx, fb_config: GLXFBConfig) -> Result<()> {
        unsafe {
            let visual = glx.GetVisualFromFBConfig(self.display as *mut _, fb_config)
                as *mut ffi::XVisualInfo;
            let visual_info = match visual.as_ref() {
                Some(visual_info) => visual_info,
                None => {
                    return Err(Error::new(
                        None,
                        Some(String::from("the GLX config has no visual")),
                        ErrorKind::ContextCreationFailed,
                    ))
                },
            };

            let root = (self.xlib.XRootWindow)(self.display, visual_info.screen);
            self.colormap =
                (self.xlib.XCreateColormap)(self.display, root, visual_info.visual, ffi::AllocNone);

            let mut attributes: ffi::XSetWindowAttributes = mem::zeroed();
            attributes.colormap = self.colormap;
            attributes.border_pixel = 0;
            attributes.event_mask = ffi::StructureNotifyMask;

            self.window = (self.xlib.XCreateWindow)(
                self.display,
                root,
                0,
                0,
                1,
                1,
                0,
                visual_info.depth,
                ffi::InputOutput as c_uint,
                visual_info.visual,
                ffi::CWBorderPixel | ffi::CWColormap | ffi::CWEventMask,
                &mut attributes,
            );
            (self.xlib.XFree)(visual as *mut c_void);
        }

        if self.window == 0 {
            return Err(Error::new(
                None,
                Some(String::from("`XCreateWindow` failed")),
                ErrorKind::ContextCreationFailed,
            ));
        }

        Ok(())
    }
}

impl Drop for X11 {
    fn drop(&mut self) {
        unsafe {
            if self.window != 0 {
                (self.xlib.XDestroyWindow)(self.display, self.window);
                trace!("destroyed X window {}", self.window);
            }

            if self.colormap != 0 {
                (self.xlib.XFreeColormap)(self.display, self.colormap);
            }

            if self.owns_display {
                (self.xlib.XCloseDisplay)(self.display);
                trace!("closed X display");
            }
        }
    }
}

/// Create the context with X errors silenced, translating the error the
/// driver raised.
fn create_context(
    glx: &Glx,
    xlib: &Xlib,
    display: *mut ffi::Display,
    screen: c_int,
    fb_config: GLXFBConfig,
    share: GLXContext,
    version: Option<Version>,
) -> Result<GLXContext> {
    let (mut error_base, mut event_base) = (0, 0);
    unsafe {
        glx.QueryExtension(display as *mut _, &mut error_base, &mut event_base);
    }

    let (call, context, error_code) = {
        let silent = SilentErrors::install(xlib);

        let (call, context) = match version {
            // A legacy context, whatever version the driver picks.
            None => ("glXCreateNewContext", unsafe {
                glx.CreateNewContext(
                    display as *mut _,
                    fb_config,
                    glx::RGBA_TYPE as c_int,
                    share,
                    1,
                )
            }),
            Some(version) => {
                let extensions = unsafe {
                    crate::api::extensions_from_ptr(
                        glx.QueryExtensionsString(display as *mut _, screen),
                    )
                };

                let extra = glx.load_extra();
                if !extensions.contains("GLX_ARB_create_context")
                    || !extra.CreateContextAttribsARB.is_loaded()
                {
                    return Err(Error::new(
                        None,
                        Some(format!("OpenGL {version} requires GLX_ARB_create_context")),
                        ErrorKind::UnsupportedVersion,
                    ));
                }

                let mut attrs = Vec::<c_int>::with_capacity(7);
                attrs.push(ffi::glx_extra::CONTEXT_MAJOR_VERSION_ARB as c_int);
                attrs.push(version.major as c_int);
                attrs.push(ffi::glx_extra::CONTEXT_MINOR_VERSION_ARB as c_int);
                attrs.push(version.minor as c_int);

                // Profiles only exist since 3.2.
                if version >= Version::new(3, 2) {
                    attrs.push(ffi::glx_extra::CONTEXT_PROFILE_MASK_ARB as c_int);
                    attrs.push(ffi::glx_extra::CONTEXT_CORE_PROFILE_BIT_ARB as c_int);
                }

                attrs.push(0);

                ("glXCreateContextAttribsARB", unsafe {
                    extra.CreateContextAttribsARB(
                        display as *mut _,
                        fb_config,
                        share,
                        1,
                        attrs.as_ptr(),
                    )
                })
            },
        };

        (call, context, silent.take(display))
    };

    if !context.is_null() {
        return Ok(context);
    }

    if let Some(code) = error_code {
        debug!("`{call}` raised X error {code}, GLX error base {error_base}");
    }

    let sharing = !share.is_null();
    let kind = match (version, error_code) {
        (Some(_), Some(code)) if is_version_error(code, error_base, sharing) => {
            ErrorKind::UnsupportedVersion
        },
        _ => ErrorKind::ContextCreationFailed,
    };

    let message = match error_code {
        Some(code) => format!("`{call}` failed with X error {code}"),
        None => format!("`{call}` failed"),
    };

    Err(Error::new(error_code.map(i64::from), Some(message), kind))
}
