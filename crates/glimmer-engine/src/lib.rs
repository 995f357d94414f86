//! Glimmer engine crate.
//!
//! Renders a full-screen image by dispatching a compute program into an
//! off-screen color buffer and blitting that buffer to the screen with a
//! textured quad. The window shell (event loop, GL context, swap) lives
//! outside this crate and drives the [`pipeline::RenderPipeline`]
//! lifecycle: `initialize` once, `resize` on every size change, and
//! `render_frame` per redraw.

pub mod context;
pub mod logging;
pub mod pipeline;
pub mod program;
