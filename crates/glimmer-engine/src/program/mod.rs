//! GPU program abstraction.
//!
//! A [`ShaderProgram`] compiles one or more stages from source files,
//! links them into a native program object, and exposes name-addressed
//! uniform setters. Failures never propagate as errors: a stage that does
//! not compile is dropped (the others proceed), a failed link leaves the
//! program allocated but unusable, and everything is reported through the
//! `log` facade. The system degrades to wrong output rather than halting.

mod stage;

pub use stage::{ShaderStage, StageKind};

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::CString;
use std::fs;
use std::path::Path;
use std::ptr;

use gl::types::{GLint, GLuint};
use glam::{Mat4, Vec3};

/// Owns a single native GL program object.
///
/// The handle is 0 until [`load`](Self::load) runs. Dropping the value
/// releases the handle; like every other call here, that requires the
/// shell's GL context to be current.
#[derive(Debug, Default)]
pub struct ShaderProgram {
    id: GLuint,
    // Uniform locations per name, including the -1 "not found" sentinel.
    // Cleared on every load since relinking invalidates locations.
    locations: RefCell<HashMap<String, GLint>>,
}

impl ShaderProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// The native program handle (0 = never built).
    pub fn id(&self) -> GLuint {
        self.id
    }

    /// Builds the program from the given stages.
    ///
    /// Each stage's source is read wholesale from its path; an unreadable
    /// path yields an empty source, which fails compilation through the
    /// normal diagnostic path. A stage that fails to compile is logged
    /// (with its path and the compiler log) and skipped; the remaining
    /// stages still compile, attach and link. Stage objects are detached
    /// and deleted after linking whether or not the link succeeded.
    ///
    /// The handle is allocated even if every stage fails; a failed link is
    /// logged and leaves the program unusable but allocated.
    pub fn load(&mut self, stages: &[ShaderStage]) {
        if self.id != 0 {
            unsafe { gl::DeleteProgram(self.id) };
        }
        self.locations.borrow_mut().clear();
        self.id = unsafe { gl::CreateProgram() };

        let mut attached: Vec<GLuint> = Vec::with_capacity(stages.len());
        for stage in stages {
            if let Some(shader) = compile_stage(stage) {
                unsafe { gl::AttachShader(self.id, shader) };
                attached.push(shader);
            }
        }

        unsafe { gl::LinkProgram(self.id) };

        // Stage objects are single-use: release them regardless of the
        // link result.
        for shader in attached {
            unsafe {
                gl::DetachShader(self.id, shader);
                gl::DeleteShader(shader);
            }
        }

        let mut linked: GLint = 0;
        unsafe { gl::GetProgramiv(self.id, gl::LINK_STATUS, &mut linked) };
        if linked == 0 {
            log::warn!(
                "shader program link failed:\n{}",
                program_info_log(self.id)
            );
        }
    }

    /// Runs driver-side validation against current GL state.
    ///
    /// Advisory only: a program that fails validation may still be used.
    /// Failures are logged. Call once after each [`load`](Self::load).
    pub fn validate(&self) -> bool {
        let mut status: GLint = 0;
        unsafe {
            gl::ValidateProgram(self.id);
            gl::GetProgramiv(self.id, gl::VALIDATE_STATUS, &mut status);
        }
        if status == 0 {
            log::warn!(
                "program validation failed:\n{}",
                program_info_log(self.id)
            );
        }
        status != 0
    }

    /// Binds this program for subsequent uniform writes and draws.
    pub fn bind(&self) {
        unsafe { gl::UseProgram(self.id) };
    }

    /// Restores the neutral program binding.
    pub fn unbind() {
        unsafe { gl::UseProgram(0) };
    }

    // Uniform setters write against the currently bound program; callers
    // bind() first. An unknown name resolves to -1 and the write is a
    // driver-level no-op.

    pub fn set_bool(&self, name: &str, value: bool) {
        unsafe { gl::Uniform1i(self.location(name), value as GLint) };
    }

    pub fn set_int(&self, name: &str, value: i32) {
        unsafe { gl::Uniform1i(self.location(name), value) };
    }

    pub fn set_float(&self, name: &str, value: f32) {
        unsafe { gl::Uniform1f(self.location(name), value) };
    }

    pub fn set_vec3(&self, name: &str, value: Vec3) {
        let v = value.to_array();
        unsafe { gl::Uniform3fv(self.location(name), 1, v.as_ptr()) };
    }

    pub fn set_mat4(&self, name: &str, value: &Mat4) {
        let m = value.to_cols_array();
        unsafe { gl::UniformMatrix4fv(self.location(name), 1, gl::FALSE, m.as_ptr()) };
    }

    /// Selects a subroutine for the subroutine uniform of the given stage.
    ///
    /// Subroutine state is not retained across program binds, so this is a
    /// per-frame call after [`bind`](Self::bind).
    pub fn use_subroutine(&self, stage: StageKind, name: &str) {
        let c_name = CString::new(name).unwrap_or_default();
        unsafe {
            let index = gl::GetSubroutineIndex(self.id, stage.gl_enum(), c_name.as_ptr());
            gl::UniformSubroutinesuiv(stage.gl_enum(), 1, &index);
        }
    }

    fn location(&self, name: &str) -> GLint {
        if let Some(&loc) = self.locations.borrow().get(name) {
            return loc;
        }
        let c_name = CString::new(name).unwrap_or_default();
        let loc = unsafe { gl::GetUniformLocation(self.id, c_name.as_ptr()) };
        if loc < 0 {
            // Misspelled, or optimized away by the compiler; the driver
            // cannot tell us which.
            log::debug!("uniform {name:?} not found in program {}", self.id);
        }
        self.locations.borrow_mut().insert(name.to_owned(), loc);
        loc
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        if self.id != 0 {
            unsafe { gl::DeleteProgram(self.id) };
        }
    }
}

fn compile_stage(stage: &ShaderStage) -> Option<GLuint> {
    let source = CString::new(read_source(&stage.path)).unwrap_or_default();

    unsafe {
        let shader = gl::CreateShader(stage.kind.gl_enum());
        let src_ptr = source.as_ptr();
        gl::ShaderSource(shader, 1, &src_ptr, ptr::null());
        gl::CompileShader(shader);

        let mut compiled: GLint = 0;
        gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut compiled);
        if compiled == 0 {
            log::warn!(
                "{} shader compilation failed for {}:\n{}",
                stage.kind.label(),
                stage.path.display(),
                shader_info_log(shader)
            );
            gl::DeleteShader(shader);
            return None;
        }
        Some(shader)
    }
}

// An unreadable path yields an empty source on purpose: the empty string
// fails compilation, which reports through the normal diagnostic path.
fn read_source(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

fn shader_info_log(shader: GLuint) -> String {
    let mut len: GLint = 0;
    unsafe { gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len) };
    if len <= 0 {
        return String::new();
    }
    let mut buf = vec![0u8; len as usize];
    let mut written: GLint = 0;
    unsafe { gl::GetShaderInfoLog(shader, len, &mut written, buf.as_mut_ptr().cast()) };
    buf.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buf).trim_end().to_owned()
}

fn program_info_log(program: GLuint) -> String {
    let mut len: GLint = 0;
    unsafe { gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len) };
    if len <= 0 {
        return String::new();
    }
    let mut buf = vec![0u8; len as usize];
    let mut written: GLint = 0;
    unsafe { gl::GetProgramInfoLog(program, len, &mut written, buf.as_mut_ptr().cast()) };
    buf.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buf).trim_end().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_path_reads_as_empty_source() {
        assert_eq!(read_source(Path::new("/no/such/shader.glsl")), "");
    }

    #[test]
    fn readable_path_reads_wholesale() {
        let path = std::env::temp_dir().join("glimmer_read_source_test.vert");
        fs::write(&path, "#version 430 core\nvoid main() {}\n").unwrap();
        assert_eq!(read_source(&path), "#version 430 core\nvoid main() {}\n");
        let _ = fs::remove_file(&path);
    }
}
