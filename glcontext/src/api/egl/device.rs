//! Everything related to `EGLDevice`.

use std::collections::HashSet;
use std::ffi::CStr;
use std::ptr;

use glcontext_egl_sys::egl;
use glcontext_egl_sys::egl::types::{EGLDeviceEXT, EGLint};
use log::debug;

use crate::config::ContextConfig;
use crate::error::Result;

use super::{ClientFeatures, Egl};

/// A rendering device exposed by the EGL platform.
///
/// A device is only identified by its position in the enumeration, so it is
/// only meaningful for the EGL library it was enumerated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    index: usize,
    vendor: String,
    extensions: HashSet<String>,
}

impl Device {
    /// The position of the device in the enumeration, usable as
    /// `device_index`.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The vendor of the device.
    ///
    /// Empty when `EGL_EXT_device_query_name` is not available.
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// The device extensions.
    ///
    /// These are distinct from the display extensions.
    pub fn extensions(&self) -> &HashSet<String> {
        &self.extensions
    }

    /// Whether any device extension contains `token`.
    ///
    /// Convenient for picking a device by a marker such as
    /// `EGL_MESA_device_software`.
    pub fn matches(&self, token: &str) -> bool {
        self.extensions.iter().any(|extension| extension.contains(token))
    }

    fn from_raw(egl: &Egl, features: ClientFeatures, index: usize, raw: EGLDeviceEXT) -> Self {
        if !features.contains(ClientFeatures::DEVICE_QUERY) {
            return Self { index, vendor: String::new(), extensions: HashSet::new() };
        }

        // SAFETY: The EGL specification guarantees the returned string is
        // static and null terminated.
        let extensions = unsafe {
            super::super::extensions_from_ptr(
                egl.QueryDeviceStringEXT(raw, egl::EXTENSIONS as EGLint),
            )
        };

        let vendor = if extensions.contains("EGL_EXT_device_query_name") {
            unsafe { query_string(egl, raw, egl::VENDOR as EGLint) }.unwrap_or_default()
        } else {
            String::new()
        };

        Self { index, vendor, extensions }
    }
}

/// List the devices of the EGL library named by `config`.
///
/// The list is empty when the library can't enumerate devices. The library is
/// unloaded again before returning.
pub fn devices(config: &ContextConfig) -> Result<Vec<Device>> {
    let egl = Egl::load(config)?;
    let client_extensions = egl.extensions(egl::NO_DISPLAY);
    let features = ClientFeatures::from_extensions(&egl, &client_extensions);

    let raw_devices = match query_devices(&egl, features)? {
        Some(raw_devices) => raw_devices,
        None => {
            debug!("EGL device enumeration is not supported");
            return Ok(Vec::new());
        },
    };

    Ok(raw_devices
        .into_iter()
        .enumerate()
        .map(|(index, raw)| Device::from_raw(&egl, features, index, raw))
        .collect())
}

/// Query the raw devices, [`None`] when enumeration is not supported.
pub(crate) fn query_devices(
    egl: &Egl,
    features: ClientFeatures,
) -> Result<Option<Vec<EGLDeviceEXT>>> {
    if !features.contains(ClientFeatures::DEVICE_ENUMERATION) {
        return Ok(None);
    }

    let mut device_count = 0;
    if unsafe { egl.QueryDevicesEXT(0, ptr::null_mut(), &mut device_count) } == egl::FALSE {
        return Err(super::egl_error(egl, "eglQueryDevicesEXT"));
    }

    let capacity = device_count.max(0);
    let mut devices = Vec::<EGLDeviceEXT>::with_capacity(capacity as usize);
    unsafe {
        let mut count = 0;
        if egl.QueryDevicesEXT(capacity, devices.as_mut_ptr(), &mut count) == egl::FALSE {
            return Err(super::egl_error(egl, "eglQueryDevicesEXT"));
        }

        // SAFETY: EGL has initialized `count` devices, never more than the
        // capacity it was given.
        devices.set_len(count.clamp(0, capacity) as usize);
    }

    Ok(Some(devices))
}

unsafe fn query_string(egl: &Egl, raw: EGLDeviceEXT, name: EGLint) -> Option<String> {
    let ptr = unsafe { egl.QueryDeviceStringEXT(raw, name) };
    if ptr.is_null() {
        return None;
    }

    unsafe { CStr::from_ptr(ptr) }.to_str().ok().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn devices_match_extension_substrings() {
        let device = Device {
            index: 1,
            vendor: String::from("Mesa"),
            extensions: crate::api::parse_extensions(
                "EGL_EXT_device_drm EGL_MESA_device_software EGL_EXT_device_query_name",
            ),
        };

        assert!(device.matches("device_software"));
        assert!(device.matches("EGL_EXT_device_drm"));
        assert!(!device.matches("EGL_NV_device_cuda"));
        assert_eq!(device.index(), 1);
        assert_eq!(device.vendor(), "Mesa");
    }
}
