//! GL context services for the window shell.
//!
//! The shell owns the window and the context itself; this module covers
//! what the engine needs once a context is current: function-pointer
//! loading, a capability check, and driver debug-output routing.

mod debug;

pub use debug::install_debug_output;

use std::ffi::{CStr, c_void};

use anyhow::{Context as _, Result};
use gl::types::{GLenum, GLint};

/// Identity of the current GL context.
#[derive(Debug, Clone)]
pub struct ContextInfo {
    pub vendor: String,
    pub renderer: String,
    pub version: String,
    pub major: i32,
    pub minor: i32,
}

/// Loads GL function pointers through the shell-provided loader.
///
/// Must run once after the shell makes its context current and before any
/// other engine call touches GL.
pub fn load_with<F>(loader: F)
where
    F: FnMut(&'static str) -> *const c_void,
{
    gl::load_with(loader);
}

/// Reads the current context's identity strings and version.
pub fn context_info() -> Result<ContextInfo> {
    let version =
        get_string(gl::VERSION).context("GL_VERSION is null; is a GL context current?")?;
    let vendor = get_string(gl::VENDOR).unwrap_or_default();
    let renderer = get_string(gl::RENDERER).unwrap_or_default();

    let mut major: GLint = 0;
    let mut minor: GLint = 0;
    unsafe {
        gl::GetIntegerv(gl::MAJOR_VERSION, &mut major);
        gl::GetIntegerv(gl::MINOR_VERSION, &mut minor);
    }

    Ok(ContextInfo {
        vendor,
        renderer,
        version,
        major,
        minor,
    })
}

/// Verifies the context can run the pipeline.
///
/// Compute shaders and image load/store arrived in GL 4.3; without them
/// the engine cannot degrade, so this is a hard error for the shell to
/// surface.
pub fn require_compute_support() -> Result<()> {
    let info = context_info().context("failed to query the GL context")?;
    anyhow::ensure!(
        (info.major, info.minor) >= (4, 3),
        "GL {}.{} on {} lacks compute shaders; 4.3+ is required",
        info.major,
        info.minor,
        info.renderer,
    );
    log::info!("GL {} on {} ({})", info.version, info.renderer, info.vendor);
    Ok(())
}

fn get_string(name: GLenum) -> Option<String> {
    let ptr = unsafe { gl::GetString(name) };
    if ptr.is_null() {
        return None;
    }
    let s = unsafe { CStr::from_ptr(ptr.cast()) };
    Some(s.to_string_lossy().into_owned())
}
