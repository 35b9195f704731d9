use cgl::{CGLContextObj, CGLGetCurrentContext, CGLSetCurrentContext};
use log::error;

use crate::error::Result;

/// A guard for when you want to make the context current. Destroying the guard
/// restores the previously-current context.
#[derive(Debug)]
pub struct MakeCurrentGuard {
    old_context: CGLContextObj,
}

impl MakeCurrentGuard {
    pub(crate) fn new(context: CGLContextObj) -> Result<Self> {
        unsafe {
            let old_context = CGLGetCurrentContext();
            super::check_error(CGLSetCurrentContext(context))?;
            Ok(MakeCurrentGuard { old_context })
        }
    }
}

impl Drop for MakeCurrentGuard {
    fn drop(&mut self) {
        if let Err(err) = super::check_error(unsafe { CGLSetCurrentContext(self.old_context) }) {
            error!("failed to restore the previous CGL context: {err}");
        }
    }
}
