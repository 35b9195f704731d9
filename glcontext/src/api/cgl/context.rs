//! CGL context creation and teardown.

use std::ffi::{c_int, c_void};
use std::ptr;

use cgl::{
    CGLChoosePixelFormat, CGLContextObj, CGLCreateContext, CGLDestroyContext,
    CGLDestroyPixelFormat, CGLGetCurrentContext, CGLGetPixelFormat, CGLPixelFormatAttribute,
    CGLPixelFormatObj, CGLSetCurrentContext, kCGLOGLPVersion_GL3_Core, kCGLOGLPVersion_GL4_Core,
    kCGLPFAOpenGLProfile,
};
use log::{debug, trace, warn};

use crate::config::{ContextConfig, Mode};
use crate::error::{Error, ErrorKind, Result};

use super::check_error;
use super::make_current_guard::MakeCurrentGuard;

/// A CGL context, detected or owned.
#[derive(Debug)]
pub(crate) struct Context {
    context: CGLContextObj,

    /// Whether the context was created by us.
    owns_context: bool,
}

impl Context {
    pub(crate) fn new(config: &ContextConfig) -> Result<Self> {
        let current = unsafe { CGLGetCurrentContext() };

        let this = match config.mode() {
            Mode::Detect => {
                if current.is_null() {
                    return Err(ErrorKind::NoCurrentContext.into());
                }

                debug!("detected CGL context {current:?}");
                return Ok(Self { context: current, owns_context: false });
            },
            Mode::Standalone => {
                let pixel_format = choose_pixel_format(config)?;
                let context = create_context(pixel_format, ptr::null_mut());
                unsafe {
                    CGLDestroyPixelFormat(pixel_format);
                }
                Self { context: context?, owns_context: true }
            },
            Mode::Share => {
                if current.is_null() {
                    return Err(ErrorKind::NoCurrentContext.into());
                }

                // The pixel format is owned by the shared context.
                let pixel_format = unsafe { CGLGetPixelFormat(current) };
                Self { context: create_context(pixel_format, current)?, owns_context: true }
            },
        };

        debug!("created CGL context {:?}", this.context);
        check_error(unsafe { CGLSetCurrentContext(this.context) })?;
        crate::api::verify_version(config.gl_version(), super::get_proc_address)?;
        Ok(this)
    }

    pub(crate) fn get_proc_address(&self, name: &str) -> *const c_void {
        super::get_proc_address(name)
    }

    pub(crate) fn make_current(&self) -> Result<MakeCurrentGuard> {
        MakeCurrentGuard::new(self.context)
    }

    pub(crate) fn is_current(&self) -> bool {
        unsafe { CGLGetCurrentContext() == self.context }
    }

    pub(crate) fn raw_context(&self) -> *const c_void {
        self.context as *const c_void
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if !self.owns_context {
            return;
        }

        unsafe {
            if CGLGetCurrentContext() == self.context {
                CGLSetCurrentContext(ptr::null_mut());
            }

            if let Err(err) = check_error(CGLDestroyContext(self.context)) {
                warn!("`CGLDestroyContext` failed: {err}");
            }
        }
        trace!("destroyed CGL context {:?}", self.context);
    }
}

/// The profiles to try, newest first. Without a minimum version only the
/// legacy one, `None`, is tried.
fn profiles(config: &ContextConfig) -> &'static [Option<c_int>] {
    match config.gl_version() {
        Some(_) => &[Some(kCGLOGLPVersion_GL4_Core), Some(kCGLOGLPVersion_GL3_Core), None],
        None => &[None],
    }
}

fn pixel_format_attributes(profile: Option<c_int>) -> Vec<CGLPixelFormatAttribute> {
    match profile {
        Some(profile) => vec![
            kCGLPFAOpenGLProfile as CGLPixelFormatAttribute,
            profile as CGLPixelFormatAttribute,
            0,
        ],
        None => vec![0],
    }
}

/// Pick the newest core profile available, falling back to the legacy one.
fn choose_pixel_format(config: &ContextConfig) -> Result<CGLPixelFormatObj> {
    for &profile in profiles(config) {
        let attrs = pixel_format_attributes(profile);

        let mut pixel_format = ptr::null_mut();
        let mut count = 0;
        unsafe {
            CGLChoosePixelFormat(attrs.as_ptr(), &mut pixel_format, &mut count);
        }

        if !pixel_format.is_null() {
            debug!("using CGL profile {profile:x?}");
            return Ok(pixel_format);
        }
    }

    Err(Error::new(
        None,
        Some(String::from("`CGLChoosePixelFormat` found no pixel format")),
        ErrorKind::ContextCreationFailed,
    ))
}

fn create_context(pixel_format: CGLPixelFormatObj, share: CGLContextObj) -> Result<CGLContextObj> {
    let mut context = ptr::null_mut();
    check_error(unsafe { CGLCreateContext(pixel_format, share, &mut context) })?;
    if context.is_null() {
        return Err(Error::new(
            None,
            Some(String::from("`CGLCreateContext` returned no context")),
            ErrorKind::ContextCreationFailed,
        ));
    }

    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_profiles_are_tried_newest_first() {
        let config = ContextConfig::builder().with_gl_version(330).build();
        assert_eq!(profiles(&config), &[Some(0x4100), Some(0x3200), None]);

        let config = ContextConfig::builder().with_gl_version(0).build();
        assert_eq!(profiles(&config), &[None]);
    }

    #[test]
    fn profile_attribute_lists() {
        assert_eq!(pixel_format_attributes(Some(kCGLOGLPVersion_GL3_Core)), [99, 0x3200, 0]);
        assert_eq!(pixel_format_attributes(None), [0]);
    }
}
