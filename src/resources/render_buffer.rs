//! Attachment-only render buffer.

use crate::backend::{BackendRef, RenderBufferHandle, RenderBufferType};
use crate::error::RenderResult;

/// A 2D surface that can be attached to a frame buffer but never sampled.
///
/// Its size only changes through [`FrameBuffer::resize_buffers`](crate::FrameBuffer::resize_buffers).
pub struct RenderBuffer {
    backend: BackendRef,
    handle: RenderBufferHandle,
    buffer_type: RenderBufferType,
    size_x: u32,
    size_y: u32,
}

impl RenderBuffer {
    pub(crate) fn new(
        backend: BackendRef,
        buffer_type: RenderBufferType,
        size_x: u32,
        size_y: u32,
    ) -> RenderResult<Self> {
        let handle = backend
            .borrow_mut()
            .create_render_buffer(buffer_type, size_x, size_y)?;
        log::debug!(
            "Created {:?} render buffer {} ({}x{})",
            buffer_type,
            handle.raw(),
            size_x,
            size_y
        );
        Ok(Self {
            backend,
            handle,
            buffer_type,
            size_x,
            size_y,
        })
    }

    pub fn handle(&self) -> RenderBufferHandle {
        self.handle
    }

    pub fn buffer_type(&self) -> RenderBufferType {
        self.buffer_type
    }

    pub fn size_x(&self) -> u32 {
        self.size_x
    }

    pub fn size_y(&self) -> u32 {
        self.size_y
    }

    /// Reallocate unless the size is unchanged. Contents are discarded.
    pub(crate) fn resize(&mut self, size_x: u32, size_y: u32) -> RenderResult<()> {
        if size_x == self.size_x && size_y == self.size_y {
            return Ok(());
        }
        self.backend
            .borrow_mut()
            .resize_render_buffer(self.handle, size_x, size_y)?;
        log::debug!(
            "Resized render buffer {} to {}x{}",
            self.handle.raw(),
            size_x,
            size_y
        );
        self.size_x = size_x;
        self.size_y = size_y;
        Ok(())
    }
}

impl Drop for RenderBuffer {
    fn drop(&mut self) {
        match self.backend.try_borrow_mut() {
            Ok(mut backend) => backend.destroy_render_buffer(self.handle),
            Err(_) => log::warn!(
                "Backend busy while dropping render buffer {}; native storage leaked",
                self.handle.raw()
            ),
        }
    }
}

impl std::fmt::Debug for RenderBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderBuffer")
            .field("handle", &self.handle)
            .field("type", &self.buffer_type)
            .field("size", &(self.size_x, self.size_y))
            .finish()
    }
}

static_assertions::assert_not_impl_any!(RenderBuffer: Send, Sync);
