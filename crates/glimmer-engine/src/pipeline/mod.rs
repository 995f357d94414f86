//! Per-frame render pipeline.
//!
//! Sequences a compute dispatch into an off-screen color buffer, a
//! shader-image-access barrier, and a full-screen textured-quad blit to
//! the default framebuffer. The shell calls [`RenderPipeline::initialize`]
//! once after the context exists, [`RenderPipeline::resize`] on every size
//! change (including once before the first frame), and
//! [`RenderPipeline::render_frame`] per redraw; the shell serializes these
//! on its event-loop thread.

mod dispatch;

pub use dispatch::{group_counts, round_up_to_pow2};

use std::path::PathBuf;
use std::ptr;

use gl::types::{GLint, GLuint};
use winit::dpi::PhysicalSize;

use crate::program::{ShaderProgram, ShaderStage};

/// Shader source locations for the pipeline's two programs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub blit_vertex: PathBuf,
    pub blit_fragment: PathBuf,
    pub compute: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            blit_vertex: PathBuf::from("shaders/blit.vert"),
            blit_fragment: PathBuf::from("shaders/blit.frag"),
            compute: PathBuf::from("shaders/compute.glsl"),
        }
    }
}

/// Full-screen quad: two triangles over NDC [-1,1]², one vec2 position
/// per vertex.
const QUAD_VERTICES: [f32; 12] = [
    // top-left triangle
    -1.0, 1.0, //
    1.0, 1.0, //
    -1.0, -1.0, //
    // bottom-right triangle
    -1.0, -1.0, //
    1.0, 1.0, //
    1.0, -1.0, //
];

const INPUT_RED: [u8; 4] = [255, 0, 0, 255];
const INPUT_BLUE: [u8; 4] = [0, 0, 255, 255];

/// Owns the two programs, the off-screen color buffer, the static input
/// textures and the screen quad.
///
/// The off-screen texture's storage always matches the last size passed to
/// [`resize`](Self::resize); the compute pass writes it through image unit
/// 0 and the blit pass samples it in the same frame, with a memory barrier
/// between the two.
pub struct RenderPipeline {
    config: PipelineConfig,
    size: PhysicalSize<u32>,

    blit: ShaderProgram,
    compute: ShaderProgram,
    // Queried once right after the compute program links; zeros when the
    // link failed, in which case dispatch is skipped.
    work_group_size: [GLint; 3],

    quad_vao: GLuint,
    quad_vbo: GLuint,
    screen_texture: GLuint,
    input_textures: [GLuint; 2],

    initialized: bool,
}

impl RenderPipeline {
    /// Records configuration and the initial drawable size. No GL calls;
    /// the context may not exist yet.
    pub fn new(config: PipelineConfig, initial_size: PhysicalSize<u32>) -> Self {
        Self {
            config,
            size: initial_size,
            blit: ShaderProgram::new(),
            compute: ShaderProgram::new(),
            work_group_size: [0; 3],
            quad_vao: 0,
            quad_vbo: 0,
            screen_texture: 0,
            input_textures: [0; 2],
            initialized: false,
        }
    }

    /// Current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Work-group size of the compute program, as queried after link.
    pub fn work_group_size(&self) -> [GLint; 3] {
        self.work_group_size
    }

    /// One-time GPU resource setup. Call exactly once, after the shell has
    /// a current context and function pointers are loaded.
    pub fn initialize(&mut self) {
        debug_assert!(!self.initialized, "initialize called twice");

        self.create_quad();

        self.blit.load(&[
            ShaderStage::vertex(&self.config.blit_vertex),
            ShaderStage::fragment(&self.config.blit_fragment),
        ]);
        self.blit.validate();

        // Off-screen color buffer, sized to the current (possibly
        // placeholder) drawable size; the first resize corrects it.
        self.screen_texture = create_color_texture(
            self.size.width as GLint,
            self.size.height as GLint,
            None,
        );

        self.compute.load(&[ShaderStage::compute(&self.config.compute)]);
        unsafe {
            gl::GetProgramiv(
                self.compute.id(),
                gl::COMPUTE_WORK_GROUP_SIZE,
                self.work_group_size.as_mut_ptr(),
            );
        }
        if self.work_group_size.iter().any(|&d| d <= 0) {
            log::warn!(
                "compute work-group size query returned {:?}; dispatch will be skipped",
                self.work_group_size
            );
        }
        self.compute.validate();

        // Static 1x1 inputs on texture units 0 and 1.
        unsafe { gl::ActiveTexture(gl::TEXTURE0) };
        self.input_textures[0] = create_color_texture(1, 1, Some(&INPUT_RED));
        unsafe { gl::ActiveTexture(gl::TEXTURE1) };
        self.input_textures[1] = create_color_texture(1, 1, Some(&INPUT_BLUE));

        unsafe {
            gl::ActiveTexture(gl::TEXTURE0);
            gl::UseProgram(0);
        }

        self.initialized = true;
    }

    /// Reallocates the off-screen color buffer's storage at the new size.
    ///
    /// The texture handle is preserved; previous contents are discarded.
    /// Safe to repeat with identical dimensions. Before `initialize` has
    /// created the texture, only the recorded size changes and becomes the
    /// allocation size at initialize.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
        if self.screen_texture == 0 {
            return;
        }
        unsafe {
            gl::BindTexture(gl::TEXTURE_2D, self.screen_texture);
            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                gl::RGBA32F as GLint,
                size.width as GLint,
                size.height as GLint,
                0,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                ptr::null(),
            );
            gl::BindTexture(gl::TEXTURE_2D, 0);
        }
    }

    /// Renders one frame: compute pass into the off-screen buffer, image
    /// barrier, then the full-screen blit. Ends with neutral bindings
    /// (program 0, texture 0, VAO 0) so no state leaks to the shell.
    pub fn render_frame(&mut self) {
        debug_assert!(self.initialized, "render_frame called before initialize");

        unsafe { gl::Clear(gl::COLOR_BUFFER_BIT) };

        // Compute pass: fill the off-screen buffer.
        self.compute.bind();
        unsafe {
            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, self.input_textures[0]);
        }
        self.compute.set_int("textures[0]", 0);
        unsafe {
            gl::ActiveTexture(gl::TEXTURE1);
            gl::BindTexture(gl::TEXTURE_2D, self.input_textures[1]);
        }
        self.compute.set_int("textures[1]", 1);

        unsafe {
            gl::BindImageTexture(
                0,
                self.screen_texture,
                0,
                gl::FALSE,
                0,
                gl::WRITE_ONLY,
                gl::RGBA32F,
            );
        }
        match group_counts(self.size.width, self.size.height, self.work_group_size) {
            Some((groups_x, groups_y)) => unsafe {
                gl::DispatchCompute(groups_x, groups_y, 1);
            },
            None => log::warn!(
                "skipping compute dispatch: work-group size is {:?}",
                self.work_group_size
            ),
        }

        unsafe {
            gl::BindImageTexture(0, 0, 0, gl::FALSE, 0, gl::READ_WRITE, gl::RGBA32F);
            // The blit samples what the dispatch wrote; image writes must
            // be visible before the draw is issued.
            gl::MemoryBarrier(gl::SHADER_IMAGE_ACCESS_BARRIER_BIT);
        }

        // Blit pass: off-screen buffer to the screen.
        self.blit.bind();
        unsafe {
            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(gl::TEXTURE_2D, self.screen_texture);
        }
        self.blit.set_int("render", 0);

        unsafe {
            gl::BindVertexArray(self.quad_vao);
            gl::DrawArrays(gl::TRIANGLES, 0, 6);

            gl::BindTexture(gl::TEXTURE_2D, 0);
            gl::BindVertexArray(0);
        }
        ShaderProgram::unbind();
    }

    fn create_quad(&mut self) {
        unsafe {
            gl::GenVertexArrays(1, &mut self.quad_vao);
            gl::BindVertexArray(self.quad_vao);

            gl::GenBuffers(1, &mut self.quad_vbo);
            gl::BindBuffer(gl::ARRAY_BUFFER, self.quad_vbo);
            let bytes: &[u8] = bytemuck::cast_slice(&QUAD_VERTICES);
            gl::BufferData(
                gl::ARRAY_BUFFER,
                bytes.len() as isize,
                bytes.as_ptr().cast(),
                gl::STATIC_DRAW,
            );

            gl::VertexAttribPointer(
                0,
                2,
                gl::FLOAT,
                gl::FALSE,
                (2 * size_of::<f32>()) as GLint,
                ptr::null(),
            );
            gl::EnableVertexAttribArray(0);

            gl::BindVertexArray(0);
            gl::BindBuffer(gl::ARRAY_BUFFER, 0);
        }
    }
}

impl Drop for RenderPipeline {
    fn drop(&mut self) {
        // Handles are only nonzero once initialize has run, which implies
        // GL functions are loaded; a never-initialized pipeline drops
        // without touching GL.
        unsafe {
            if self.quad_vbo != 0 {
                gl::DeleteBuffers(1, &self.quad_vbo);
            }
            if self.quad_vao != 0 {
                gl::DeleteVertexArrays(1, &self.quad_vao);
            }
            if self.screen_texture != 0 {
                gl::DeleteTextures(1, &self.screen_texture);
            }
            for tex in self.input_textures {
                if tex != 0 {
                    gl::DeleteTextures(1, &tex);
                }
            }
        }
    }
}

// RGBA32F with linear filtering and repeat wrapping: the shared parameter
// set for the off-screen buffer and the 1x1 inputs. Leaves the 2D texture
// binding neutral.
fn create_color_texture(width: GLint, height: GLint, pixels: Option<&[u8; 4]>) -> GLuint {
    let mut tex: GLuint = 0;
    unsafe {
        gl::GenTextures(1, &mut tex);
        gl::BindTexture(gl::TEXTURE_2D, tex);

        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::REPEAT as GLint);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::REPEAT as GLint);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as GLint);
        gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as GLint);

        gl::TexImage2D(
            gl::TEXTURE_2D,
            0,
            gl::RGBA32F as GLint,
            width,
            height,
            0,
            gl::RGBA,
            gl::UNSIGNED_BYTE,
            pixels.map_or(ptr::null(), |p| p.as_ptr().cast()),
        );

        gl::BindTexture(gl::TEXTURE_2D, 0);
    }
    tex
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── quad geometry ─────────────────────────────────────────────────────

    #[test]
    fn quad_is_two_triangles_of_vec2() {
        assert_eq!(QUAD_VERTICES.len(), 12);
    }

    #[test]
    fn quad_spans_full_ndc_range() {
        let xs: Vec<f32> = QUAD_VERTICES.iter().step_by(2).copied().collect();
        let ys: Vec<f32> = QUAD_VERTICES.iter().skip(1).step_by(2).copied().collect();
        for v in xs.iter().chain(ys.iter()) {
            assert!(*v == 1.0 || *v == -1.0);
        }
        // All four corners appear.
        for corner in [(-1.0, 1.0), (1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)] {
            assert!(
                QUAD_VERTICES
                    .chunks_exact(2)
                    .any(|c| (c[0], c[1]) == corner)
            );
        }
    }

    // ── configuration ─────────────────────────────────────────────────────

    #[test]
    fn default_config_points_at_shipped_sources() {
        let config = PipelineConfig::default();
        assert_eq!(config.blit_vertex, PathBuf::from("shaders/blit.vert"));
        assert_eq!(config.blit_fragment, PathBuf::from("shaders/blit.frag"));
        assert_eq!(config.compute, PathBuf::from("shaders/compute.glsl"));
    }

    #[test]
    fn new_records_size_without_touching_gl() {
        let pipeline = RenderPipeline::new(PipelineConfig::default(), PhysicalSize::new(800, 600));
        assert_eq!(pipeline.size(), PhysicalSize::new(800, 600));
        assert_eq!(pipeline.work_group_size(), [0, 0, 0]);
    }

    #[test]
    fn input_payloads_are_opaque_red_and_blue() {
        assert_eq!(INPUT_RED, [255, 0, 0, 255]);
        assert_eq!(INPUT_BLUE, [0, 0, 255, 255]);
    }

    // ── lifecycle contracts ───────────────────────────────────────────────

    #[test]
    fn latest_resize_wins() {
        // Before initialize the off-screen texture does not exist, so
        // resize only records the size, which is the part under test.
        let mut pipeline =
            RenderPipeline::new(PipelineConfig::default(), PhysicalSize::new(800, 600));
        pipeline.resize(PhysicalSize::new(640, 480));
        pipeline.resize(PhysicalSize::new(1024, 768));
        assert_eq!(pipeline.size(), PhysicalSize::new(1024, 768));
    }

    #[test]
    #[should_panic]
    fn render_frame_before_initialize_is_a_contract_violation() {
        let mut pipeline =
            RenderPipeline::new(PipelineConfig::default(), PhysicalSize::new(800, 600));
        pipeline.render_frame();
    }
}
