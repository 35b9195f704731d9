use glcontext_egl_sys::egl;
use glcontext_egl_sys::egl::types::{EGLContext, EGLDisplay, EGLSurface};
use log::error;

use crate::error::Result;

use super::Egl;

/// A guard for when you want to make the context current. Destroying the guard
/// restores the previously-current context.
#[derive(Debug)]
pub struct MakeCurrentGuard<'a> {
    egl: &'a Egl,
    display: EGLDisplay,
    old_display: EGLDisplay,
    old_draw_surface: EGLSurface,
    old_read_surface: EGLSurface,
    old_context: EGLContext,
}

impl<'a> MakeCurrentGuard<'a> {
    pub(crate) fn new(
        egl: &'a Egl,
        display: EGLDisplay,
        surface: EGLSurface,
        context: EGLContext,
    ) -> Result<Self> {
        unsafe {
            let old_display = egl.GetCurrentDisplay();
            let old_draw_surface = egl.GetCurrentSurface(egl::DRAW as i32);
            let old_read_surface = egl.GetCurrentSurface(egl::READ as i32);
            let old_context = egl.GetCurrentContext();

            if egl.MakeCurrent(display, surface, surface, context) == egl::FALSE {
                return Err(super::egl_error(egl, "eglMakeCurrent"));
            }

            Ok(MakeCurrentGuard {
                egl,
                display,
                old_display,
                old_draw_surface,
                old_read_surface,
                old_context,
            })
        }
    }
}

impl Drop for MakeCurrentGuard<'_> {
    fn drop(&mut self) {
        let (display, draw_surface, read_surface, context) = if self.old_display == egl::NO_DISPLAY
        {
            (self.display, egl::NO_SURFACE, egl::NO_SURFACE, egl::NO_CONTEXT)
        } else {
            (self.old_display, self.old_draw_surface, self.old_read_surface, self.old_context)
        };

        unsafe {
            if self.egl.MakeCurrent(display, draw_surface, read_surface, context) == egl::FALSE {
                error!("{}", super::egl_error(self.egl, "restoring the previous EGL context"));
            }
        }
    }
}
