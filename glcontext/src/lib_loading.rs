//! Library loading routines.

use std::collections::HashMap;
use std::ffi::{c_void, CStr};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::{env, ptr};

use libloading::Library;
use log::debug;
use once_cell::sync::Lazy;

#[cfg(windows)]
use libloading::os::windows::{
    Library as WinLibrary, LOAD_LIBRARY_SEARCH_DEFAULT_DIRS, LOAD_LIBRARY_SEARCH_DLL_LOAD_DIR,
};

use crate::error::{Error, ErrorKind, Result};

/// Extra handles on libraries that must stay loaded until the process exits,
/// keyed by the candidate they were located with.
static RESIDENT: Lazy<Mutex<HashMap<PathBuf, Library>>> = Lazy::new(Default::default);

pub trait SymLoading {
    /// # Safety
    /// The library must be ensured to live long enough.
    unsafe fn load_with(lib: &Library) -> Self;
}

/// A symbol table together with the library it was loaded from.
///
/// The library is declared last so it's dropped after the table.
pub struct SymWrapper<T> {
    sym: T,
    lib: Library,
}

impl<T: SymLoading> SymWrapper<T> {
    /// # Safety
    /// Loading runs the library's symbol resolution, see [`SymLoading`].
    pub unsafe fn new(lib: Library) -> Self {
        let sym = unsafe { T::load_with(&lib) };
        Self { sym, lib }
    }
}

impl<T> SymWrapper<T> {
    pub fn library(&self) -> &Library {
        &self.lib
    }
}

impl<T> Deref for SymWrapper<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.sym
    }
}

impl<T> DerefMut for SymWrapper<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.sym
    }
}

/// Locate and load a native library.
///
/// An explicit library from the configuration wins over the environment
/// override, which wins over the platform defaults. The defaults are tried in
/// order and the first one that loads is returned.
pub fn locate(
    explicit: Option<&Path>,
    env_override: Option<&Path>,
    default_names: &[&str],
) -> Result<Library> {
    locate_candidate(explicit, env_override, default_names).map(|(lib, _)| lib)
}

/// Like [`locate`], but the library is never unloaded afterwards.
///
/// Drivers keep state behind displays that are never terminated, unloading
/// and loading them again stacks up that state.
#[cfg_attr(not(egl_backend), allow(dead_code))]
pub fn locate_resident(
    explicit: Option<&Path>,
    env_override: Option<&Path>,
    default_names: &[&str],
) -> Result<Library> {
    let (lib, candidate) = locate_candidate(explicit, env_override, default_names)?;

    let mut resident = RESIDENT.lock().unwrap_or_else(PoisonError::into_inner);
    if !resident.contains_key(&candidate) {
        let pinned = unsafe { open(&candidate) }.map_err(|err| {
            Error::new(
                None,
                Some(format!("failed to load {}: {err}", candidate.display())),
                ErrorKind::LibraryNotFound,
            )
        })?;
        debug!("keeping `{}` loaded", candidate.display());
        resident.insert(candidate, pinned);
    }

    Ok(lib)
}

fn locate_candidate(
    explicit: Option<&Path>,
    env_override: Option<&Path>,
    default_names: &[&str],
) -> Result<(Library, PathBuf)> {
    let candidates: Vec<PathBuf> = match explicit.or(env_override) {
        Some(path) => vec![normalize(path)],
        None => default_names.iter().map(PathBuf::from).collect(),
    };

    let mut failures = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match unsafe { open(&candidate) } {
            Ok(lib) => {
                debug!("loaded `{}`", candidate.display());
                return Ok((lib, candidate));
            },
            Err(err) => failures.push(format!("{}: {err}", candidate.display())),
        }
    }

    let message = if failures.is_empty() {
        String::from("no library candidates to load")
    } else {
        format!("failed to load {}", failures.join(", "))
    };

    Err(Error::new(None, Some(message), ErrorKind::LibraryNotFound))
}

/// Look up an exported symbol, null when the library doesn't export it.
///
/// # Safety
/// The returned address is only valid while `lib` is loaded.
pub unsafe fn symbol(lib: &Library, name: &CStr) -> *const c_void {
    unsafe { lib.get::<*const c_void>(name.to_bytes_with_nul()) }
        .map(|sym| *sym)
        .unwrap_or(ptr::null())
}

/// Look up a required entry point.
///
/// # Safety
/// `T` must be the function pointer type of the exported symbol and `name`
/// must be null terminated.
pub(crate) unsafe fn required<T: Copy>(lib: &Library, name: &[u8]) -> Result<T> {
    unsafe { lib.get::<T>(name) }.map(|sym| *sym).map_err(|err| {
        let name = String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name));
        Error::new(None, Some(format!("missing `{name}`: {err}")), ErrorKind::LibraryNotFound)
    })
}

/// Names containing a path separator are made absolute, bare names are left
/// to the platform search.
pub(crate) fn normalize(name: &Path) -> PathBuf {
    if !is_path(name) || name.is_absolute() {
        return name.to_path_buf();
    }

    match env::current_dir() {
        Ok(cwd) => cwd.join(name),
        Err(_) => name.to_path_buf(),
    }
}

fn is_path(name: &Path) -> bool {
    name.as_os_str().to_string_lossy().contains(['/', '\\'])
}

#[cfg(windows)]
unsafe fn open(path: &Path) -> std::result::Result<Library, libloading::Error> {
    // Let a dll resolve its own dependencies from its directory when it was
    // given by path.
    let mut flags = LOAD_LIBRARY_SEARCH_DEFAULT_DIRS;
    if is_path(path) {
        flags |= LOAD_LIBRARY_SEARCH_DLL_LOAD_DIR;
    }

    unsafe { WinLibrary::load_with_flags(path, flags) }.map(From::from)
}

#[cfg(not(windows))]
unsafe fn open(path: &Path) -> std::result::Result<Library, libloading::Error> {
    unsafe { Library::new(path) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_are_kept() {
        assert_eq!(normalize(Path::new("libGL.so.1")), PathBuf::from("libGL.so.1"));
    }

    #[test]
    fn relative_paths_become_absolute() {
        let path = normalize(Path::new("drivers/libGL.so"));
        assert!(path.is_absolute());
        assert!(path.ends_with("drivers/libGL.so"));
    }

    #[cfg(unix)]
    #[test]
    fn absolute_paths_are_kept() {
        assert_eq!(normalize(Path::new("/usr/lib/libGL.so")), PathBuf::from("/usr/lib/libGL.so"));
    }

    #[test]
    fn missing_library_reports_every_candidate() {
        let err = locate(None, None, &["libglcontext-missing-a.so", "libglcontext-missing-b.so"])
            .err()
            .unwrap();
        assert_eq!(err.error_kind(), ErrorKind::LibraryNotFound);

        let message = err.raw_os_message().unwrap();
        assert!(message.contains("libglcontext-missing-a.so"));
        assert!(message.contains("libglcontext-missing-b.so"));
    }

    #[test]
    fn explicit_library_shadows_defaults() {
        let err = locate(Some(Path::new("libglcontext-explicit.so")), None, &["libc.so.6"])
            .err()
            .unwrap();
        let message = err.raw_os_message().unwrap();
        assert!(message.contains("libglcontext-explicit.so"));
        assert!(!message.contains("libc.so.6"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn required_symbols() {
        type StrLen = unsafe extern "C" fn(*const std::ffi::c_char) -> usize;

        let lib = unsafe { Library::new("libc.so.6") }.unwrap();
        let strlen = unsafe { required::<StrLen>(&lib, b"strlen\0") };
        assert!(strlen.is_ok());

        let err = unsafe { required::<unsafe extern "C" fn()>(&lib, b"glcontext_missing\0") }
            .err()
            .unwrap();
        assert_eq!(err.error_kind(), ErrorKind::LibraryNotFound);
        assert!(err.raw_os_message().unwrap().contains("`glcontext_missing`"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn resident_libraries_are_pinned_once() {
        let pinned = || {
            let resident = RESIDENT.lock().unwrap();
            resident.keys().filter(|path| path.ends_with("libm.so.6")).count()
        };

        for _ in 0..3 {
            let lib = locate_resident(None, None, &["libm.so.6"]).unwrap();
            drop(lib);
            assert_eq!(pinned(), 1);
        }
    }

    #[test]
    fn missing_resident_library_pins_nothing() {
        let err = locate_resident(None, None, &["libglcontext-missing-resident.so"])
            .err()
            .unwrap();
        assert_eq!(err.error_kind(), ErrorKind::LibraryNotFound);

        let resident = RESIDENT.lock().unwrap();
        assert!(!resident.keys().any(|path| path.ends_with("libglcontext-missing-resident.so")));
    }

    #[test]
    fn override_is_used_without_explicit() {
        let err = locate(None, Some(Path::new("libglcontext-override.so")), &["libc.so.6"])
            .err()
            .unwrap();
        assert!(err.raw_os_message().unwrap().contains("libglcontext-override.so"));
    }
}
