use std::env;
use std::fs::File;
use std::path::PathBuf;

use gl_generator::{Api, Fallbacks, Profile, Registry, StructGenerator};

fn main() {
    let target = env::var("TARGET").unwrap();
    let dest = PathBuf::from(&env::var("OUT_DIR").unwrap());

    println!("cargo:rerun-if-changed=build.rs");

    if target.contains("windows") {
        // `opengl32.dll` is located at runtime, so even the core entry points
        // are loaded into a struct instead of being linked.
        let mut file = File::create(dest.join("wgl_bindings.rs")).unwrap();
        Registry::new(Api::Wgl, (1, 0), Profile::Core, Fallbacks::All, [])
            .write_bindings(StructGenerator, &mut file)
            .unwrap();

        let mut file = File::create(dest.join("wgl_extra_bindings.rs")).unwrap();
        Registry::new(Api::Wgl, (1, 0), Profile::Core, Fallbacks::All, [
            "WGL_ARB_create_context",
            "WGL_ARB_create_context_profile",
            "WGL_ARB_extensions_string",
            "WGL_EXT_extensions_string",
        ])
        .write_bindings(StructGenerator, &mut file)
        .unwrap();
    }
}
