use std::ptr;

use glcontext_glx_sys as ffi;
use glcontext_glx_sys::glx::types::{GLXContext, GLXDrawable};
use log::error;

use crate::error::{Error, ErrorKind, Result};

use super::Glx;

/// A guard for when you want to make the context current. Destroying the guard
/// restores the previously-current context.
#[derive(Debug)]
pub struct MakeCurrentGuard<'a> {
    glx: &'a Glx,
    display: *mut ffi::Display,
    old_display: *mut ffi::Display,
    old_drawable: GLXDrawable,
    old_context: GLXContext,
}

impl<'a> MakeCurrentGuard<'a> {
    pub(crate) fn new(
        glx: &'a Glx,
        display: *mut ffi::Display,
        drawable: GLXDrawable,
        context: GLXContext,
    ) -> Result<Self> {
        unsafe {
            let old_display = glx.GetCurrentDisplay() as *mut ffi::Display;
            let old_drawable = glx.GetCurrentDrawable();
            let old_context = glx.GetCurrentContext();

            if glx.MakeCurrent(display as *mut _, drawable, context) == 0 {
                return Err(Error::new(
                    None,
                    Some(String::from("`glXMakeCurrent` failed")),
                    ErrorKind::ContextCreationFailed,
                ));
            }

            Ok(MakeCurrentGuard { glx, display, old_display, old_drawable, old_context })
        }
    }
}

impl Drop for MakeCurrentGuard<'_> {
    fn drop(&mut self) {
        let (display, drawable, context) = if self.old_display.is_null() {
            (self.display, 0, ptr::null())
        } else {
            (self.old_display, self.old_drawable, self.old_context)
        };

        if unsafe { self.glx.MakeCurrent(display as *mut _, drawable, context) } == 0 {
            error!("`glXMakeCurrent` failed to restore the previous context");
        }
    }
}
