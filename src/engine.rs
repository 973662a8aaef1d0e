//! Main engine orchestrator
//!
//! The [`Engine`] owns the backend, acts as the only factory for GPU
//! resources, and drives the deferred pipeline: geometry is drawn into the
//! G-buffer, the lighting pass tone-maps it into the display buffer, and the
//! display buffer is presented.

use std::cell::RefCell;
use std::rc::Rc;

use crate::backend::{
    BackendError, BackendRef, DrawMode, RenderBackend, RenderBufferType, TextureDescriptor,
    TextureFormat,
};
use crate::error::{RenderError, RenderResult};
use crate::resources::{shared, FrameBuffer, RenderBuffer, Shared, TextureBuffer};
use crate::shader::library::{lighting_stages, FULL_SCREEN_QUAD};
use crate::shader::{ShaderProgram, ShaderStageSpecification};
use crate::EngineConfig;

/// Resources created by [`Engine::initialize`]
struct Pipeline {
    g_buffer: FrameBuffer,
    display: FrameBuffer,
    lighting: ShaderProgram,
}

/// Owns the backend and every pipeline resource.
pub struct Engine {
    backend: BackendRef,
    config: EngineConfig,
    pipeline: Option<Pipeline>,
    terminated: bool,
}

impl Engine {
    /// Create an engine around a concrete backend. Nothing is allocated until
    /// [`initialize`](Self::initialize).
    pub fn new(backend: impl RenderBackend + 'static, config: EngineConfig) -> Self {
        let backend: BackendRef = Rc::new(RefCell::new(backend));
        log::debug!("Engine created with {} backend", backend.borrow().name());
        Self {
            backend,
            config,
            pipeline: None,
            terminated: false,
        }
    }

    /// Create an engine running on the CPU-memory backend
    #[cfg(feature = "headless")]
    pub fn headless(config: EngineConfig) -> Self {
        Self::new(crate::backend::HeadlessBackend::new(), config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current surface size
    pub fn dimensions(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn backend_name(&self) -> String {
        self.backend.borrow().name().to_string()
    }

    pub fn is_initialized(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Whether a fatal device error ended the session
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn ensure_alive(&self) -> RenderResult<()> {
        if self.terminated {
            return Err(RenderError::SessionTerminated);
        }
        Ok(())
    }

    fn pipeline_mut(&mut self) -> RenderResult<&mut Pipeline> {
        self.ensure_alive()?;
        self.pipeline.as_mut().ok_or(RenderError::NotInitialized)
    }

    /// One-time setup of the backend, G-buffer, display buffer and lighting
    /// program. Calling it twice is an error.
    pub fn initialize(&mut self) -> RenderResult<()> {
        self.ensure_alive()?;
        if self.pipeline.is_some() {
            return Err(RenderError::AlreadyInitialized);
        }
        let (width, height) = self.dimensions();
        self.backend.borrow_mut().initialize(width, height)?;

        let g_color = self.generate_texture_buffer_2d(self.config.g_buffer_format, width, height, None)?;
        let g_depth = self.generate_render_buffer(RenderBufferType::Depth, width, height)?;
        let mut g_buffer = FrameBuffer::new(Rc::clone(&self.backend))?;
        g_buffer.bind_to_color_texture_buffer("color", &g_color)?;
        g_buffer.bind_to_depth_render_buffer("depth", &g_depth)?;
        g_buffer.set_viewport(0, 0, width, height);
        g_buffer.clear_color = self.config.background_color;
        g_buffer.clear_alpha = self.config.background_alpha;

        let display_color =
            self.generate_texture_buffer_2d(self.config.display_format, width, height, None)?;
        let mut display = FrameBuffer::new(Rc::clone(&self.backend))?;
        display.bind_to_color_texture_buffer("color", &display_color)?;
        display.set_viewport(0, 0, width, height);
        display.clear_color = self.config.background_color;
        display.clear_alpha = self.config.background_alpha;

        let mut lighting = ShaderProgram::new(
            Rc::clone(&self.backend),
            &lighting_stages(),
            DrawMode::Triangles,
            None,
        )?;
        lighting.set_attribute("a_position", FULL_SCREEN_QUAD.to_vec())?;
        lighting.set_texture("t_gbuffer_color", &g_color)?;
        lighting.set_uniform("u_exposure", self.config.exposure)?;
        lighting.set_uniform("u_gamma", self.config.gamma)?;

        self.pipeline = Some(Pipeline {
            g_buffer,
            display,
            lighting,
        });
        log::info!(
            "Engine initialized: {}x{} on {} backend",
            width,
            height,
            self.backend_name()
        );
        self.check_error(true)
    }

    /// Bind and clear the G-buffer for a new frame.
    pub fn clear_g_buffer(&mut self) -> RenderResult<()> {
        let pipeline = self.pipeline_mut()?;
        if !pipeline.g_buffer.bind_for_rendering() {
            return Err(RenderError::BindFailed("g-buffer".into()));
        }
        pipeline.g_buffer.clear()
    }

    /// Run the lighting pass from the G-buffer into the display buffer.
    pub fn compute_lighting(&mut self) -> RenderResult<()> {
        let exposure = self.config.exposure;
        let gamma = self.config.gamma;
        let pipeline = self.pipeline_mut()?;
        if !pipeline.display.bind_for_rendering() {
            return Err(RenderError::BindFailed("display buffer".into()));
        }
        pipeline.display.clear()?;
        pipeline.lighting.set_uniform("u_exposure", exposure)?;
        pipeline.lighting.set_uniform("u_gamma", gamma)?;
        pipeline.lighting.draw()
    }

    /// Present the display buffer on the visible surface.
    pub fn to_display(&mut self) -> RenderResult<()> {
        let handle = self.pipeline_mut()?.display.handle();
        self.backend.borrow_mut().present(handle)?;
        Ok(())
    }

    /// Drain pending asynchronous device errors.
    ///
    /// With `fatal` unset, errors are logged and the call succeeds. With
    /// `fatal` set, any error ends the session: the first one is returned and
    /// every later pipeline or factory call fails with
    /// [`RenderError::SessionTerminated`].
    pub fn check_error(&mut self, fatal: bool) -> RenderResult<()> {
        let mut first: Option<BackendError> = None;
        loop {
            let error = self.backend.borrow_mut().poll_error();
            let Some(error) = error else { break };
            if fatal {
                log::error!("Fatal device error: {}", error);
                first.get_or_insert(error);
            } else {
                log::warn!("Device error: {}", error);
            }
        }

        match first {
            Some(error) => {
                self.terminated = true;
                Err(error.into())
            }
            None => Ok(()),
        }
    }

    /// Resize the surface, the G-buffer and the display buffer.
    ///
    /// Zero sizes (minimized windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.ensure_alive()?;
        if width == 0 || height == 0 || (width, height) == self.dimensions() {
            return Ok(());
        }
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.g_buffer.resize_buffers(width, height)?;
            pipeline.display.resize_buffers(width, height)?;
            for fb in [&mut pipeline.g_buffer, &mut pipeline.display] {
                fb.set_viewport(0, 0, width, height);
            }
        }
        self.config.width = width;
        self.config.height = height;
        log::debug!("Engine resized to {}x{}", width, height);
        Ok(())
    }

    /// Exposure used by the next [`compute_lighting`](Self::compute_lighting)
    pub fn set_exposure(&mut self, exposure: f32) {
        self.config.exposure = exposure;
    }

    pub fn set_gamma(&mut self, gamma: f32) {
        self.config.gamma = gamma;
    }

    /// Geometry buffer, once initialized
    pub fn g_buffer(&self) -> Option<&FrameBuffer> {
        self.pipeline.as_ref().map(|p| &p.g_buffer)
    }

    pub fn g_buffer_mut(&mut self) -> Option<&mut FrameBuffer> {
        self.pipeline.as_mut().map(|p| &mut p.g_buffer)
    }

    /// Lit image presented by [`to_display`](Self::to_display)
    pub fn display_buffer(&self) -> Option<&FrameBuffer> {
        self.pipeline.as_ref().map(|p| &p.display)
    }

    pub fn lighting_program(&self) -> Option<&ShaderProgram> {
        self.pipeline.as_ref().map(|p| &p.lighting)
    }

    // Factories

    /// Create a 1D texture, optionally filled with `data` in its native format.
    pub fn generate_texture_buffer_1d(
        &self,
        format: TextureFormat,
        length: u32,
        data: Option<&[u8]>,
    ) -> RenderResult<Shared<TextureBuffer>> {
        self.ensure_alive()?;
        let mut texture =
            TextureBuffer::new(Rc::clone(&self.backend), TextureDescriptor::new_1d(format, length))?;
        if let Some(data) = data {
            texture.fill_texture_data_1d(data, length)?;
        }
        Ok(shared(texture))
    }

    /// Create a 1D float texture filled with `data`.
    pub fn generate_texture_buffer_1d_f32(
        &self,
        format: TextureFormat,
        length: u32,
        data: &[f32],
    ) -> RenderResult<Shared<TextureBuffer>> {
        self.generate_texture_buffer_1d(format, length, Some(bytemuck::cast_slice(data)))
    }

    /// Create a 2D texture, optionally filled with `data` in its native format.
    pub fn generate_texture_buffer_2d(
        &self,
        format: TextureFormat,
        size_x: u32,
        size_y: u32,
        data: Option<&[u8]>,
    ) -> RenderResult<Shared<TextureBuffer>> {
        self.ensure_alive()?;
        let mut texture = TextureBuffer::new(
            Rc::clone(&self.backend),
            TextureDescriptor::new_2d(format, size_x, size_y),
        )?;
        if let Some(data) = data {
            let flags = texture.native_upload_flags();
            texture.fill_texture_data_2d(data, size_x, size_y, flags)?;
        }
        Ok(shared(texture))
    }

    pub fn generate_render_buffer(
        &self,
        buffer_type: RenderBufferType,
        size_x: u32,
        size_y: u32,
    ) -> RenderResult<Shared<RenderBuffer>> {
        self.ensure_alive()?;
        Ok(shared(RenderBuffer::new(
            Rc::clone(&self.backend),
            buffer_type,
            size_x,
            size_y,
        )?))
    }

    pub fn generate_frame_buffer(&self) -> RenderResult<Shared<FrameBuffer>> {
        self.ensure_alive()?;
        Ok(shared(FrameBuffer::new(Rc::clone(&self.backend))?))
    }

    /// Link a program from `stages`.
    ///
    /// `patch_vertices` is required for [`DrawMode::Patches`] and ignored
    /// otherwise.
    pub fn generate_shader_program(
        &self,
        stages: &[ShaderStageSpecification],
        draw_mode: DrawMode,
        patch_vertices: Option<u32>,
    ) -> RenderResult<Shared<ShaderProgram>> {
        self.ensure_alive()?;
        Ok(shared(ShaderProgram::new(
            Rc::clone(&self.backend),
            stages,
            draw_mode,
            patch_vertices,
        )?))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("backend", &self.backend_name())
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .field("terminated", &self.terminated)
            .finish()
    }
}

static_assertions::assert_not_impl_any!(Engine: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;

    fn small_config() -> EngineConfig {
        EngineConfig {
            width: 8,
            height: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_initialize_twice_fails() {
        let mut engine = Engine::headless(small_config());
        engine.initialize().unwrap();
        assert_eq!(engine.initialize(), Err(RenderError::AlreadyInitialized));
    }

    #[test]
    fn test_pipeline_requires_initialize() {
        let mut engine = Engine::headless(small_config());
        assert_eq!(engine.clear_g_buffer(), Err(RenderError::NotInitialized));
        assert_eq!(engine.compute_lighting(), Err(RenderError::NotInitialized));
        assert!(engine.g_buffer().is_none());
    }

    #[test]
    fn test_g_buffer_layout() {
        let mut engine = Engine::headless(small_config());
        engine.initialize().unwrap();
        let g_buffer = engine.g_buffer().unwrap();
        assert_eq!(g_buffer.attachment_names(), vec!["color", "depth"]);
        let color = g_buffer.texture_buffer("color").unwrap();
        assert_eq!(color.borrow().format(), TextureFormat::Rgba32Float);
        assert_eq!(
            g_buffer.render_buffer("depth").unwrap().borrow().buffer_type(),
            RenderBufferType::Depth
        );
    }

    #[test]
    fn test_non_fatal_errors_are_drained() {
        let probe = HeadlessBackend::new();
        let mut engine = Engine::new(probe.clone(), small_config());
        probe.push_error(BackendError::OutOfMemory);
        engine.check_error(false).unwrap();
        assert!(!engine.is_terminated());
        engine.check_error(true).unwrap();
    }

    #[test]
    fn test_fatal_error_terminates_session() {
        let probe = HeadlessBackend::new();
        let mut engine = Engine::new(probe.clone(), small_config());
        engine.initialize().unwrap();
        probe.push_error(BackendError::DeviceLost);
        probe.push_error(BackendError::OutOfMemory);

        assert_eq!(
            engine.check_error(true),
            Err(RenderError::Backend(BackendError::DeviceLost))
        );
        assert!(engine.is_terminated());
        assert_eq!(engine.clear_g_buffer(), Err(RenderError::SessionTerminated));
        assert!(matches!(
            engine.generate_frame_buffer(),
            Err(RenderError::SessionTerminated)
        ));
        // Both errors were drained
        assert_eq!(engine.check_error(true), Ok(()));
    }

    #[test]
    fn test_failed_resize_keeps_dimensions() {
        let mut engine = Engine::headless(small_config());
        engine.initialize().unwrap();
        let g_color = engine.g_buffer().unwrap().texture_buffer("color").unwrap();

        let guard = g_color.borrow();
        assert!(matches!(
            engine.resize(16, 16),
            Err(RenderError::ResourceBusy(_))
        ));
        drop(guard);

        assert_eq!(engine.dimensions(), (8, 4));
        let viewport = engine.g_buffer().unwrap().viewport().unwrap();
        assert_eq!((viewport.width, viewport.height), (8, 4));
        assert_eq!(g_color.borrow().size_x(), 8);

        engine.resize(16, 16).unwrap();
        assert_eq!(engine.dimensions(), (16, 16));
    }

    #[test]
    fn test_initialize_with_empty_surface_fails() {
        let mut engine = Engine::headless(EngineConfig {
            width: 0,
            ..Default::default()
        });
        assert!(matches!(
            engine.initialize(),
            Err(RenderError::Backend(BackendError::InitializationFailed(_)))
        ));
        assert!(!engine.is_initialized());
    }
}
