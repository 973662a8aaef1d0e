//! GPU texture resource.

use crate::backend::{
    BackendRef, FilterMode, TextureDescriptor, TextureFormat, TextureHandle, TextureUploadFlags,
};
use crate::error::{RenderError, RenderResult};

/// A 1D or 2D image stored on the GPU.
///
/// Textures are created by the [`Engine`](crate::Engine) factories and can be
/// sampled by shader programs or attached to frame buffers. Resizing discards
/// the contents; callers that need them must upload again.
///
/// # Example
///
/// ```ignore
/// let texture = engine.generate_texture_buffer_2d(TextureFormat::Rgba8, 256, 256, None)?;
/// texture.borrow_mut().fill_texture_data_2d(&pixels, 256, 256, TextureUploadFlags::WITH_ALPHA)?;
/// println!("Texture size: {}x{}", texture.borrow().size_x(), texture.borrow().size_y());
/// ```
pub struct TextureBuffer {
    backend: BackendRef,
    handle: TextureHandle,
    descriptor: TextureDescriptor,
    filter_mode: FilterMode,
}

impl TextureBuffer {
    /// Allocate native storage for `descriptor` (called by the Engine).
    pub(crate) fn new(backend: BackendRef, descriptor: TextureDescriptor) -> RenderResult<Self> {
        let handle = backend.borrow_mut().create_texture(&descriptor)?;
        log::debug!(
            "Created {}D texture {} ({}x{}, {:?})",
            descriptor.dimension,
            handle.raw(),
            descriptor.width,
            descriptor.height,
            descriptor.format
        );
        Ok(Self {
            backend,
            handle,
            descriptor,
            filter_mode: FilterMode::default(),
        })
    }

    /// Native handle of the texture.
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    /// Sampler dimensionality, 1 or 2.
    pub fn dimension(&self) -> u32 {
        self.descriptor.dimension
    }

    pub fn size_x(&self) -> u32 {
        self.descriptor.width
    }

    /// Height in texels; always 1 for 1D textures.
    pub fn size_y(&self) -> u32 {
        self.descriptor.height
    }

    pub fn format(&self) -> TextureFormat {
        self.descriptor.format
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }

    /// Switch between nearest and linear sampling; effective on next bind.
    pub fn set_filter_mode(&mut self, mode: FilterMode) {
        self.filter_mode = mode;
        self.backend
            .borrow_mut()
            .set_texture_filter(self.handle, mode);
    }

    /// Reallocate a 1D texture, discarding its contents.
    pub fn resize_1d(&mut self, length: u32) -> RenderResult<()> {
        self.resize(1, length, 1)
    }

    /// Reallocate a 2D texture, discarding its contents.
    pub fn resize_2d(&mut self, size_x: u32, size_y: u32) -> RenderResult<()> {
        self.resize(2, size_x, size_y)
    }

    pub(crate) fn resize(&mut self, dimension: u32, width: u32, height: u32) -> RenderResult<()> {
        self.check_dimension(dimension)?;
        if width == self.descriptor.width && height == self.descriptor.height {
            return Ok(());
        }

        let descriptor = TextureDescriptor {
            width,
            height,
            ..self.descriptor
        };
        {
            let mut backend = self.backend.borrow_mut();
            backend.resize_texture(self.handle, &descriptor)?;
            // Reallocation resets sampler state on some backends.
            backend.set_texture_filter(self.handle, self.filter_mode);
        }
        log::debug!(
            "Resized texture {} from {}x{} to {}x{}",
            self.handle.raw(),
            self.descriptor.width,
            self.descriptor.height,
            width,
            height
        );
        self.descriptor = descriptor;
        Ok(())
    }

    /// Upload the whole contents of a 1D texture.
    ///
    /// `data` holds `length` texels in the texture's native format.
    pub fn fill_texture_data_1d(&mut self, data: &[u8], length: u32) -> RenderResult<()> {
        self.check_dimension(1)?;
        if length != self.descriptor.width {
            return Err(RenderError::TextureSizeMismatch {
                given: length as usize,
                expected: self.descriptor.width as usize,
            });
        }
        self.upload(data, self.native_upload_flags())
    }

    /// Flags describing data already laid out in the texture's own format
    pub(crate) fn native_upload_flags(&self) -> TextureUploadFlags {
        if self.descriptor.format.channels() == 4 {
            TextureUploadFlags::WITH_ALPHA
        } else {
            TextureUploadFlags::empty()
        }
    }

    /// Upload float texels into a 1D float texture.
    pub fn fill_texture_data_1d_f32(&mut self, data: &[f32]) -> RenderResult<()> {
        let channels = self.descriptor.format.channels();
        let length = (data.len() / channels) as u32;
        self.fill_texture_data_1d(bytemuck::cast_slice(data), length)
    }

    /// Upload the whole contents of a 2D texture.
    ///
    /// For 8-bit formats, `flags` decides whether `data` carries an alpha
    /// channel; without [`TextureUploadFlags::WITH_ALPHA`] the source is read
    /// as three channels per texel.
    pub fn fill_texture_data_2d(
        &mut self,
        data: &[u8],
        width: u32,
        height: u32,
        flags: TextureUploadFlags,
    ) -> RenderResult<()> {
        self.check_dimension(2)?;
        if width != self.descriptor.width || height != self.descriptor.height {
            return Err(RenderError::TextureSizeMismatch {
                given: width as usize * height as usize,
                expected: self.descriptor.texel_count(),
            });
        }
        self.upload(data, flags)
    }

    fn upload(&mut self, data: &[u8], flags: TextureUploadFlags) -> RenderResult<()> {
        self.backend
            .borrow_mut()
            .write_texture(self.handle, data, flags)?;
        Ok(())
    }

    fn check_dimension(&self, expected: u32) -> RenderResult<()> {
        if self.descriptor.dimension != expected {
            return Err(RenderError::DimensionMismatch {
                expected,
                found: self.descriptor.dimension,
            });
        }
        Ok(())
    }
}

impl Drop for TextureBuffer {
    fn drop(&mut self) {
        match self.backend.try_borrow_mut() {
            Ok(mut backend) => backend.destroy_texture(self.handle),
            Err(_) => log::warn!(
                "Backend busy while dropping texture {}; native storage leaked",
                self.handle.raw()
            ),
        }
    }
}

impl std::fmt::Debug for TextureBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureBuffer")
            .field("handle", &self.handle)
            .field("size", &(self.descriptor.width, self.descriptor.height))
            .field("dimension", &self.descriptor.dimension)
            .field("format", &self.descriptor.format)
            .field("filter_mode", &self.filter_mode)
            .finish()
    }
}

// Bound to the thread owning the native context
static_assertions::assert_not_impl_any!(TextureBuffer: Send, Sync);
