//! Late-binding registration for the preload deployment: instead of the
//! application calling `register` directly, this module finds the
//! middleware's own shared libraries on disk, resolves the registration
//! entry points by symbol name, and injects the output driver before the
//! application's first audio call. Any resolution failure aborts the
//! registration; a half-wired host is worse than no driver.

use crate::error::OutputError;
use crate::host::{HostSystem, OutputDescription};
use crate::output;
use libloading::Library;
use std::ffi::{CString, c_char, c_int, c_uint, c_void};
use tracing::{info, warn};

/// Base names of the middleware's core and studio runtime libraries. The
/// on-disk file names carry the packed version (0xMMMMmmpp).
pub const CORE_LIB: &str = "mixcore";
pub const STUDIO_LIB: &str = "mixstudio";

pub fn version_tag(version: u32) -> String {
    let major = (version >> 16) & 0xFFFF;
    let minor = (version >> 8) & 0xFF;
    format!("{major}.{minor}")
}

/// Platform file name for a versioned runtime library.
pub fn library_file(base: &str, version: u32) -> String {
    if cfg!(target_os = "windows") {
        format!("{base}.dll")
    } else if cfg!(target_os = "macos") {
        format!("lib{base}.{}.dylib", version_tag(version))
    } else {
        format!("lib{base}.so.{}", version_tag(version))
    }
}

#[repr(C)]
struct RawOutputDescription {
    version: c_uint,
    name: *const c_char,
    plugin_data: *mut c_void,
}

type StudioCreateFn = unsafe extern "C" fn(*mut *mut c_void, c_uint) -> c_int;
type GetCoreSystemFn = unsafe extern "C" fn(*mut c_void, *mut *mut c_void) -> c_int;
type RegisterOutputFn =
    unsafe extern "C" fn(*mut c_void, *const RawOutputDescription, *mut c_uint) -> c_int;
type SetOutputByPluginFn = unsafe extern "C" fn(*mut c_void, c_uint) -> c_int;

/// The four middleware entry points, bound at load time. Keeping the
/// `Library` handles alive here keeps every resolved pointer valid.
pub struct HostApi {
    _core: Library,
    _studio: Library,
    core_system: *mut c_void,
    register_output: RegisterOutputFn,
    set_output: SetOutputByPluginFn,
    // Name strings handed to the host stay valid as long as the API does;
    // hosts are allowed to keep the description's pointers.
    names: Vec<CString>,
}

impl HostApi {
    pub fn load(version: u32) -> Result<Self, OutputError> {
        let studio_path = library_file(STUDIO_LIB, version);
        let core_path = library_file(CORE_LIB, version);

        // SAFETY: these are the middleware's own runtime libraries; their
        // constructors are the ones the application would run anyway.
        let studio = unsafe { Library::new(&studio_path) }.map_err(|e| {
            OutputError::SubsystemInit(format!("Failed to load {studio_path}: {e}"))
        })?;
        let core = unsafe { Library::new(&core_path) }
            .map_err(|e| OutputError::SubsystemInit(format!("Failed to load {core_path}: {e}")))?;

        let create: StudioCreateFn = resolve(&studio, "Studio_System_Create")?;
        let get_core: GetCoreSystemFn = resolve(&studio, "Studio_System_GetCoreSystem")?;
        let register_output: RegisterOutputFn = resolve(&core, "System_RegisterOutput")?;
        let set_output: SetOutputByPluginFn = resolve(&core, "System_SetOutputByPlugin")?;

        let mut studio_system: *mut c_void = std::ptr::null_mut();
        // SAFETY: signatures follow the middleware ABI; the out-pointers
        // are valid for the duration of each call.
        let rc = unsafe { create(&mut studio_system, version) };
        if rc != 0 || studio_system.is_null() {
            return Err(OutputError::SubsystemInit(format!(
                "Host system creation failed (rc {rc})"
            )));
        }
        let mut core_system: *mut c_void = std::ptr::null_mut();
        // SAFETY: studio_system was just validated non-null.
        let rc = unsafe { get_core(studio_system, &mut core_system) };
        if rc != 0 || core_system.is_null() {
            return Err(OutputError::SubsystemInit(format!(
                "Host core system lookup failed (rc {rc})"
            )));
        }
        info!("Bound host runtime {core_path} + {studio_path}");

        Ok(Self {
            _core: core,
            _studio: studio,
            core_system,
            register_output,
            set_output,
            names: Vec::new(),
        })
    }
}

fn resolve<T: Copy>(library: &Library, name: &str) -> Result<T, OutputError> {
    // SAFETY: the caller pairs each symbol name with its ABI type.
    unsafe { library.get::<T>(name.as_bytes()) }
        .map(|symbol| *symbol)
        .map_err(|e| OutputError::SubsystemInit(format!("Missing host symbol {name}: {e}")))
}

impl HostSystem for HostApi {
    fn register_output(&mut self, description: OutputDescription) -> u32 {
        let name = CString::new(description.name).unwrap_or_default();
        // The host owns the driver for the rest of the process lifetime.
        let driver = Box::into_raw(Box::new(description.driver));
        let raw = RawOutputDescription {
            version: description.version,
            name: name.as_ptr(),
            plugin_data: driver as *mut c_void,
        };
        let mut handle: c_uint = 0;
        // SAFETY: all pointers in `raw` outlive the call; `handle` is a
        // valid out-pointer.
        let rc = unsafe { (self.register_output)(self.core_system, &raw, &mut handle) };
        if rc != 0 {
            warn!("Host rejected output registration (rc {rc})");
        }
        self.names.push(name);
        handle
    }

    fn set_output(&mut self, handle: u32) {
        // SAFETY: core_system was validated at load time.
        let rc = unsafe { (self.set_output)(self.core_system, handle) };
        if rc != 0 {
            warn!("Host rejected output selection (rc {rc})");
        }
    }
}

/// Full preload sequence: bind the host runtime, then run the same
/// registration as the statically linked path.
pub fn preload_register(version: u32) -> Result<u32, OutputError> {
    let mut api = HostApi::load(version)?;
    output::register(&mut api)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_tag_unpacks_major_minor() {
        assert_eq!(version_tag(0x0001_0200), "1.2");
        assert_eq!(version_tag(0x0002_1400), "2.20");
        assert_eq!(version_tag(0), "0.0");
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn library_names_carry_the_version() {
        assert_eq!(library_file("mixcore", 0x0001_0200), "libmixcore.so.1.2");
        assert_eq!(library_file("mixstudio", 0x0001_0200), "libmixstudio.so.1.2");
    }
}
