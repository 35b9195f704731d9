use cfg_aliases::cfg_aliases;

fn main() {
    // Setup alias to reduce `cfg` boilerplate.
    cfg_aliases! {
        // Systems.
        macos_platform: { target_os = "macos" },
        free_unix: { all(unix, not(target_vendor = "apple"), not(target_os = "android")) },

        // Backends.
        egl_backend: { all(feature = "egl", free_unix) },
        glx_backend: { all(feature = "glx", free_unix) },
        wgl_backend: { all(feature = "wgl", windows) },
        cgl_backend: { all(feature = "cgl", macos_platform) },
    }
}
