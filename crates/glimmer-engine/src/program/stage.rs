use std::path::PathBuf;

use gl::types::GLenum;

/// Pipeline stage a shader source compiles into.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StageKind {
    Vertex,
    Fragment,
    Compute,
}

impl StageKind {
    pub(crate) fn gl_enum(self) -> GLenum {
        match self {
            StageKind::Vertex => gl::VERTEX_SHADER,
            StageKind::Fragment => gl::FRAGMENT_SHADER,
            StageKind::Compute => gl::COMPUTE_SHADER,
        }
    }

    /// Name used in diagnostics.
    pub(crate) fn label(self) -> &'static str {
        match self {
            StageKind::Vertex => "vertex",
            StageKind::Fragment => "fragment",
            StageKind::Compute => "compute",
        }
    }
}

/// One stage request: a kind plus the path of its source text.
#[derive(Debug, Clone)]
pub struct ShaderStage {
    pub kind: StageKind,
    pub path: PathBuf,
}

impl ShaderStage {
    pub fn new(kind: StageKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn vertex(path: impl Into<PathBuf>) -> Self {
        Self::new(StageKind::Vertex, path)
    }

    pub fn fragment(path: impl Into<PathBuf>) -> Self {
        Self::new(StageKind::Fragment, path)
    }

    pub fn compute(path: impl Into<PathBuf>) -> Self {
        Self::new(StageKind::Compute, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_kinds_map_to_gl_enums() {
        assert_eq!(StageKind::Vertex.gl_enum(), gl::VERTEX_SHADER);
        assert_eq!(StageKind::Fragment.gl_enum(), gl::FRAGMENT_SHADER);
        assert_eq!(StageKind::Compute.gl_enum(), gl::COMPUTE_SHADER);
    }

    #[test]
    fn constructors_record_kind_and_path() {
        let stage = ShaderStage::fragment("shaders/blit.frag");
        assert_eq!(stage.kind, StageKind::Fragment);
        assert_eq!(stage.path, PathBuf::from("shaders/blit.frag"));
    }
}
