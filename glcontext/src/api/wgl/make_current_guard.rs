use std::io::Error as IoError;

use glcontext_wgl_sys::wgl::types::{HDC, HGLRC};
use log::error;

use crate::error::Result;

use super::Wgl;

/// A guard for when you want to make the context current. Destroying the guard
/// restores the previously-current context.
#[derive(Debug)]
pub struct MakeCurrentGuard<'a> {
    wgl: &'a Wgl,
    previous_hdc: HDC,
    previous_hglrc: HGLRC,
}

impl<'a> MakeCurrentGuard<'a> {
    pub(crate) fn new(wgl: &'a Wgl, hdc: HDC, context: HGLRC) -> Result<Self> {
        unsafe {
            let previous_hdc = wgl.GetCurrentDC();
            let previous_hglrc = wgl.GetCurrentContext();

            if wgl.MakeCurrent(hdc, context) == 0 {
                return Err(IoError::last_os_error().into());
            }

            Ok(MakeCurrentGuard { wgl, previous_hdc, previous_hglrc })
        }
    }
}

impl Drop for MakeCurrentGuard<'_> {
    fn drop(&mut self) {
        if unsafe { self.wgl.MakeCurrent(self.previous_hdc, self.previous_hglrc) } == 0 {
            let err = IoError::last_os_error();
            error!("`wglMakeCurrent` failed to restore the previous context: {err}");
        }
    }
}
