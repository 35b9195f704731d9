use glcontext::*;

trait FailToCompileIfNotSendSync
where
    Self: Send + Sync,
{
}
impl FailToCompileIfNotSendSync for ContextConfig {}
impl FailToCompileIfNotSendSync for ContextConfigBuilder {}
impl FailToCompileIfNotSendSync for Backend {}
impl FailToCompileIfNotSendSync for Mode {}
impl FailToCompileIfNotSendSync for Version {}
impl FailToCompileIfNotSendSync for Error {}
impl FailToCompileIfNotSendSync for ErrorKind {}

#[cfg(egl_backend)]
impl FailToCompileIfNotSendSync for glcontext::egl::Device {}
