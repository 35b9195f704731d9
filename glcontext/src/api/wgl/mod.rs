//! WGL on a hidden window or on the current device context.

use std::collections::HashSet;
use std::ffi::{c_void, CString, OsStr};
use std::io::Error as IoError;
use std::mem::{self, MaybeUninit};
use std::ops::Deref;
use std::os::windows::ffi::OsStrExt;
use std::{iter, ptr};

use glcontext_wgl_sys::{wgl, wgl_extra};
use libloading::Library;
use log::{debug, trace};
use once_cell::sync::OnceCell;
use windows_sys::Win32::Foundation::{GetLastError, ERROR_CLASS_ALREADY_EXISTS, HWND};
use windows_sys::Win32::Graphics::Gdi::{self as gdi, HDC};
use windows_sys::Win32::Graphics::OpenGL::{self as gl, PIXELFORMATDESCRIPTOR};
use windows_sys::Win32::System::LibraryLoader as dll_loader;
use windows_sys::Win32::UI::WindowsAndMessaging as wm;

use crate::config::ContextConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::lib_loading::{self, SymLoading, SymWrapper};
use crate::utils::NoPrint;

pub mod context;
pub(crate) mod make_current_guard;

use self::make_current_guard::MakeCurrentGuard;

/// Default name of the GL driver.
pub(crate) const GL_LIBS: &[&str] = &["opengl32.dll"];

/// Class of the hidden windows hosting standalone contexts.
const WINDOW_CLASS_NAME: &str = "glcontext";

/// The registration outcome of [`WINDOW_CLASS_NAME`], shared by all contexts.
static WINDOW_CLASS: OnceCell<Result<()>> = OnceCell::new();

/// The WGL entry points together with the loaded `opengl32.dll`.
#[derive(Debug)]
pub(crate) struct Wgl(NoPrint<SymWrapper<wgl::Wgl>>);

impl Wgl {
    pub(crate) fn load(config: &ContextConfig) -> Result<Self> {
        let lib = lib_loading::locate(
            config.driver_library(),
            config.driver_library_override(),
            GL_LIBS,
        )?;

        let wgl = unsafe { SymWrapper::<wgl::Wgl>::new(lib) };
        if !wgl.GetProcAddress.is_loaded()
            || !wgl.CreateContext.is_loaded()
            || !wgl.MakeCurrent.is_loaded()
            || !wgl.GetCurrentContext.is_loaded()
        {
            return Err(Error::new(
                None,
                Some(String::from("the GL library doesn't export WGL")),
                ErrorKind::LibraryNotFound,
            ));
        }

        Ok(Self(NoPrint(wgl)))
    }

    /// `wglGetProcAddress`, with the failure sentinels some drivers return
    /// turned into null.
    pub(crate) fn get_proc_address(&self, name: &CString) -> *const c_void {
        let address = unsafe { self.GetProcAddress(name.as_ptr()) } as *const c_void;
        if is_invalid_proc(address) {
            ptr::null()
        } else {
            address
        }
    }

    /// Load the extension entry points, a context must be current.
    pub(crate) fn load_extra(&self) -> wgl_extra::Wgl {
        wgl_extra::Wgl::load_with(|name| match CString::new(name) {
            Ok(name) => self.get_proc_address(&name),
            Err(_) => ptr::null(),
        })
    }

    pub(crate) fn library(&self) -> &Library {
        self.0.library()
    }
}

impl Deref for Wgl {
    type Target = wgl::Wgl;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl SymLoading for wgl::Wgl {
    unsafe fn load_with(lib: &Library) -> Self {
        Self::load_with(|name| match CString::new(name) {
            Ok(name) => unsafe { lib_loading::symbol(lib, &name) },
            Err(_) => ptr::null(),
        })
    }
}

/// `wglGetProcAddress` may return 1, 2, 3 or -1 instead of null.
fn is_invalid_proc(address: *const c_void) -> bool {
    matches!(address as isize, -1..=3)
}

/// The extension entry points and extensions of a device context.
pub(crate) struct Extensions {
    pub(crate) wgl_extra: wgl_extra::Wgl,
    pub(crate) extensions: HashSet<String>,
}

impl Extensions {
    /// Query the extensions while a context is current on `hdc`.
    fn query(wgl: &Wgl, hdc: wgl::types::HDC) -> Self {
        let wgl_extra = wgl.load_extra();
        let extensions = unsafe {
            if wgl_extra.GetExtensionsStringARB.is_loaded() {
                crate::api::extensions_from_ptr(wgl_extra.GetExtensionsStringARB(hdc))
            } else if wgl_extra.GetExtensionsStringEXT.is_loaded() {
                crate::api::extensions_from_ptr(wgl_extra.GetExtensionsStringEXT())
            } else {
                HashSet::new()
            }
        };

        Self { wgl_extra, extensions }
    }

    /// Load the extensions through a throwaway context on `hdc`.
    ///
    /// The pixel format of `hdc` must already be set.
    fn bootstrap(wgl: &Wgl, hdc: wgl::types::HDC) -> Result<Self> {
        unsafe {
            let bootstrap = wgl.CreateContext(hdc);
            if bootstrap.is_null() {
                return Err(IoError::last_os_error().into());
            }

            let extensions = MakeCurrentGuard::new(wgl, hdc, bootstrap).map(|_guard| {
                let extensions = Self::query(wgl, hdc);
                debug!("bootstrapped WGL extensions: {:?}", extensions.extensions);
                extensions
            });

            wgl.DeleteContext(bootstrap);
            trace!("deleted the bootstrap WGL context");
            extensions
        }
    }

    pub(crate) fn contains(&self, extension: &str) -> bool {
        self.extensions.contains(extension)
    }
}

/// A hidden window and its device context.
#[derive(Debug)]
pub(crate) struct Window {
    hwnd: HWND,
    hdc: HDC,
}

impl Window {
    pub(crate) fn create() -> Result<Self> {
        register_window_class()?;

        let class_name = encode_wide(WINDOW_CLASS_NAME);
        unsafe {
            let hwnd = wm::CreateWindowExW(
                0,
                class_name.as_ptr(),
                ptr::null(),
                0,
                0,
                0,
                0,
                0,
                0,
                0,
                dll_loader::GetModuleHandleW(ptr::null()),
                ptr::null(),
            );
            if hwnd == 0 {
                return Err(IoError::last_os_error().into());
            }

            let hdc = gdi::GetDC(hwnd);
            if hdc == 0 {
                let err = IoError::last_os_error().into();
                wm::DestroyWindow(hwnd);
                return Err(err);
            }

            Ok(Self { hwnd, hdc })
        }
    }

    pub(crate) fn hdc(&self) -> wgl::types::HDC {
        self.hdc as wgl::types::HDC
    }

    /// Set a pixel format that is likely to be provided by the main video
    /// driver of the system.
    pub(crate) fn set_pixel_format(&self) -> Result<()> {
        let descriptor = PIXELFORMATDESCRIPTOR {
            nSize: mem::size_of::<PIXELFORMATDESCRIPTOR>() as u16,
            nVersion: 1,
            dwFlags: gl::PFD_DRAW_TO_WINDOW
                | gl::PFD_SUPPORT_OPENGL
                | gl::PFD_GENERIC_ACCELERATED
                | gl::PFD_DOUBLEBUFFER,
            iPixelType: gl::PFD_TYPE_RGBA,
            cColorBits: 24,
            cRedBits: 0,
            cRedShift: 0,
            cGreenBits: 0,
            cGreenShift: 0,
            cBlueBits: 0,
            cBlueShift: 0,
            cAlphaBits: 8,
            cAlphaShift: 0,
            cAccumBits: 0,
            cAccumRedBits: 0,
            cAccumGreenBits: 0,
            cAccumBlueBits: 0,
            cAccumAlphaBits: 0,
            cDepthBits: 24,
            cStencilBits: 8,
            cAuxBuffers: 0,
            iLayerType: gl::PFD_MAIN_PLANE,
            bReserved: 0,
            dwLayerMask: 0,
            dwVisibleMask: 0,
            dwDamageMask: 0,
        };

        unsafe {
            let pixel_format_index = gl::ChoosePixelFormat(self.hdc, &descriptor);
            if pixel_format_index == 0 {
                return Err(IoError::last_os_error().into());
            }

            let mut chosen = MaybeUninit::<PIXELFORMATDESCRIPTOR>::uninit();
            if gl::DescribePixelFormat(
                self.hdc,
                pixel_format_index as _,
                mem::size_of::<PIXELFORMATDESCRIPTOR>() as _,
                chosen.as_mut_ptr(),
            ) == 0
            {
                return Err(IoError::last_os_error().into());
            }

            if gl::SetPixelFormat(self.hdc, pixel_format_index, chosen.as_ptr()) == 0 {
                return Err(IoError::last_os_error().into());
            }

            debug!("using pixel format {pixel_format_index}");
        }

        Ok(())
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        unsafe {
            gdi::ReleaseDC(self.hwnd, self.hdc);
            wm::DestroyWindow(self.hwnd);
        }
        trace!("destroyed the hidden window");
    }
}

fn register_window_class() -> Result<()> {
    WINDOW_CLASS
        .get_or_init(|| unsafe {
            let class_name = encode_wide(WINDOW_CLASS_NAME);
            let mut class: wm::WNDCLASSEXW = mem::zeroed();
            class.cbSize = mem::size_of::<wm::WNDCLASSEXW>() as u32;
            class.style = wm::CS_OWNDC;
            class.lpfnWndProc = Some(wm::DefWindowProcW);
            class.hInstance = dll_loader::GetModuleHandleW(ptr::null());
            class.lpszClassName = class_name.as_ptr();

            // Another copy of this crate in the process may have registered
            // the class already.
            if wm::RegisterClassExW(&class) == 0 && GetLastError() != ERROR_CLASS_ALREADY_EXISTS {
                return Err(IoError::last_os_error().into());
            }

            debug!("registered the `{WINDOW_CLASS_NAME}` window class");
            Ok(())
        })
        .clone()
}

fn encode_wide(name: &str) -> Vec<u16> {
    OsStr::new(name).encode_wide().chain(iter::once(0)).collect()
}

/// Whether a `GetLastError` code reports a version or profile the driver
/// can't provide.
pub(crate) fn is_version_error(code: i32) -> bool {
    // The codes come back with the `0xC007` facility on some drivers.
    let code = code as u32 & 0xFFFF;
    code == wgl_extra::ERROR_INVALID_VERSION_ARB || code == wgl_extra::ERROR_INVALID_PROFILE_ARB
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_procs() {
        for sentinel in [-1isize, 0, 1, 2, 3] {
            assert!(is_invalid_proc(sentinel as *const c_void));
        }

        assert!(!is_invalid_proc(0x7ff0_1234 as *const c_void));
    }

    #[test]
    fn version_errors() {
        assert!(is_version_error(0x2095));
        assert!(is_version_error(0xC0072096u32 as i32));
        assert!(!is_version_error(5));
    }

    #[test]
    fn wide_names_are_terminated() {
        assert_eq!(encode_wide("gl"), vec![b'g' as u16, b'l' as u16, 0]);
    }
}
