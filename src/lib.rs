//! Viz Render - a backend-agnostic GPU resource layer
//!
//! Scene code creates every GPU resource through one [`Engine`], which owns a
//! concrete [`RenderBackend`]. On top of that backend the crate provides:
//!
//! - [`TextureBuffer`]s and [`RenderBuffer`]s with explicit, destructive resize
//! - [`FrameBuffer`]s composed of named attachments, with viewport, clear and
//!   pixel readback
//! - [`ShaderProgram`]s that merge the slots declared by their stages and
//!   refuse to draw until every slot is satisfied
//! - a deferred pipeline: G-buffer, lighting pass, presentation
//!
//! # Threading
//!
//! Everything is bound to the thread owning the native graphics context.
//! Resources are shared through [`Shared`] (`Rc<RefCell<_>>`) and are not
//! `Send`.
//!
//! # Example
//!
//! ```ignore
//! let mut engine = Engine::headless(EngineConfig::default());
//! engine.initialize()?;
//!
//! let program = engine.generate_shader_program(&stages, DrawMode::Triangles, None)?;
//! program.borrow_mut().set_attribute("a_position", positions)?;
//! program.borrow_mut().set_uniform("u_color", Vec3::new(1.0, 0.5, 0.0))?;
//!
//! engine.clear_g_buffer()?;
//! program.borrow().draw()?;
//! engine.compute_lighting()?;
//! engine.to_display()?;
//! engine.check_error(false)?;
//! ```

pub mod backend;
pub mod engine;
pub mod error;
pub mod resources;
pub mod shader;

use glam::Vec3;

pub use backend::{
    AttachmentRole, BackendError, BackendResult, DataType, DrawMode, FilterMode, RenderBackend,
    RenderBufferType, TextureFormat, TextureUploadFlags, Viewport,
};
#[cfg(feature = "headless")]
pub use backend::{DrawRecord, HeadlessBackend};
pub use engine::Engine;
pub use error::{RenderError, RenderResult, ValidationError};
pub use resources::{Attachment, FrameBuffer, RenderBuffer, Shared, TextureBuffer};
pub use shader::{
    AttributeData, ShaderAttribute, ShaderProgram, ShaderStageSpecification, ShaderStageType,
    ShaderTexture, ShaderUniform, UniformSlot, UniformValue,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the render subsystem.
///
/// Only logs the version; call it once the logger is set up.
pub fn init() {
    log::info!("Viz Render v{} initialized", VERSION);
}

/// Configuration for the engine and its deferred pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Initial surface width
    pub width: u32,
    /// Initial surface height
    pub height: u32,
    /// Clear color of the G-buffer and display buffer
    pub background_color: Vec3,
    pub background_alpha: f32,
    /// Exposure applied by the lighting pass
    pub exposure: f32,
    pub gamma: f32,
    /// Format of the G-buffer color attachment
    pub g_buffer_format: TextureFormat,
    /// Format of the presented image
    pub display_format: TextureFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            background_color: Vec3::ONE,
            background_alpha: 1.0,
            exposure: 1.0,
            gamma: 2.2,
            g_buffer_format: TextureFormat::Rgba32Float,
            display_format: TextureFormat::Rgba8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.g_buffer_format, TextureFormat::Rgba32Float);
        assert_eq!(config.display_format, TextureFormat::Rgba8);
    }
}
