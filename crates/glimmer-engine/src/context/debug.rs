//! Driver debug-output routing.
//!
//! GL debug messages arrive through a callback on the context; they are
//! forwarded to the `log` facade with a two-tier severity policy.

use std::ffi::c_void;

use gl::types::{GLchar, GLenum, GLsizei, GLuint};
use log::Level;

/// Enables `GL_DEBUG_OUTPUT` on the current context and installs the
/// message callback.
///
/// Requires a 4.3+ (KHR_debug) context; call once after
/// [`load_with`](super::load_with).
pub fn install_debug_output() {
    unsafe {
        gl::Enable(gl::DEBUG_OUTPUT);
        gl::DebugMessageCallback(Some(on_debug_message), std::ptr::null());
    }
    log::debug!("GL debug output installed");
}

/// Severity policy: high-severity messages are escalated, everything else
/// stays at warning level.
fn level_for_severity(severity: GLenum) -> Level {
    match severity {
        gl::DEBUG_SEVERITY_HIGH => Level::Error,
        _ => Level::Warn,
    }
}

extern "system" fn on_debug_message(
    _source: GLenum,
    _kind: GLenum,
    id: GLuint,
    severity: GLenum,
    length: GLsizei,
    message: *const GLchar,
    _user: *mut c_void,
) {
    if message.is_null() {
        return;
    }
    let bytes =
        unsafe { std::slice::from_raw_parts(message.cast::<u8>(), length.max(0) as usize) };
    let text = String::from_utf8_lossy(bytes);
    log::log!(level_for_severity(severity), "GL [{id}] {}", text.trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_severity_escalates() {
        assert_eq!(level_for_severity(gl::DEBUG_SEVERITY_HIGH), Level::Error);
    }

    #[test]
    fn other_severities_stay_at_warn() {
        assert_eq!(level_for_severity(gl::DEBUG_SEVERITY_MEDIUM), Level::Warn);
        assert_eq!(level_for_severity(gl::DEBUG_SEVERITY_LOW), Level::Warn);
        assert_eq!(
            level_for_severity(gl::DEBUG_SEVERITY_NOTIFICATION),
            Level::Warn
        );
    }
}
