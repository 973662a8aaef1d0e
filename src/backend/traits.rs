//! Core backend abstraction
//!
//! [`RenderBackend`] is the contract a concrete graphics API implements. The
//! resource layer (`TextureBuffer`, `FrameBuffer`, `ShaderProgram`, ...) only
//! ever talks to the GPU through this trait, using the opaque handles below.

use crate::backend::types::*;
use crate::shader::{ShaderStageSpecification, UniformValue};
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to initialize backend: {0}")]
    InitializationFailed(String),
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to create render buffer: {0}")]
    RenderBufferCreationFailed(String),
    #[error("Failed to create frame buffer: {0}")]
    FrameBufferCreationFailed(String),
    #[error("Failed to create shader program: {0}")]
    ProgramCreationFailed(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Unknown resource: {0}")]
    UnknownResource(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

macro_rules! native_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a backend-specific identifier.
            pub const fn from_raw(id: u64) -> Self {
                Self(id)
            }

            pub const fn raw(&self) -> u64 {
                self.0
            }
        }
    };
}

native_handle!(
    /// Handle to a native texture
    TextureHandle
);
native_handle!(
    /// Handle to a native render buffer
    RenderBufferHandle
);
native_handle!(
    /// Handle to a native frame buffer
    FrameBufferHandle
);
native_handle!(
    /// Handle to a linked shader program
    ProgramHandle
);

/// Main graphics backend trait.
///
/// All calls happen on the thread owning the native context. Implementations
/// may assume the resource layer has already validated slot names, data types
/// and draw parameters; they remain responsible for payload sizes and for
/// reporting native failures.
pub trait RenderBackend {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// One-time setup of the native context and presentation surface
    fn initialize(&mut self, width: u32, height: u32) -> BackendResult<()>;

    /// Pop the oldest pending asynchronous error, if any
    fn poll_error(&mut self) -> Option<BackendError>;

    // Textures

    /// Allocate texture storage; contents are undefined until written
    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle>;

    /// Reallocate texture storage with a new size, discarding contents
    fn resize_texture(&mut self, texture: TextureHandle, desc: &TextureDescriptor)
        -> BackendResult<()>;

    /// Upload the full image of a texture.
    ///
    /// Must fail if `data` does not match the texture size and format.
    fn write_texture(
        &mut self,
        texture: TextureHandle,
        data: &[u8],
        flags: TextureUploadFlags,
    ) -> BackendResult<()>;

    fn set_texture_filter(&mut self, texture: TextureHandle, mode: FilterMode);

    fn destroy_texture(&mut self, texture: TextureHandle);

    // Render buffers

    fn create_render_buffer(
        &mut self,
        ty: RenderBufferType,
        width: u32,
        height: u32,
    ) -> BackendResult<RenderBufferHandle>;

    fn resize_render_buffer(
        &mut self,
        buffer: RenderBufferHandle,
        width: u32,
        height: u32,
    ) -> BackendResult<()>;

    fn destroy_render_buffer(&mut self, buffer: RenderBufferHandle);

    // Frame buffers

    fn create_frame_buffer(&mut self) -> BackendResult<FrameBufferHandle>;

    /// Attach a target under `name`, replacing any attachment with that name
    fn attach(
        &mut self,
        frame_buffer: FrameBufferHandle,
        name: &str,
        role: AttachmentRole,
        target: AttachmentTarget,
    ) -> BackendResult<()>;

    /// Make `frame_buffer` the active render target.
    ///
    /// Returns `false` if the attachment set is incomplete; the previous
    /// binding is then left untouched.
    fn bind_frame_buffer(
        &mut self,
        frame_buffer: FrameBufferHandle,
        viewport: Option<Viewport>,
    ) -> bool;

    /// Currently bound render target
    fn bound_frame_buffer(&self) -> Option<FrameBufferHandle>;

    /// Viewport of the bound render target, if one was given when binding
    fn bound_viewport(&self) -> Option<Viewport>;

    /// Clear color attachments to `color` and depth attachments to the far plane
    fn clear(&mut self, frame_buffer: FrameBufferHandle, color: [f32; 4]) -> BackendResult<()>;

    /// Synchronously read one pixel of the first color attachment
    fn read_pixel(
        &mut self,
        frame_buffer: FrameBufferHandle,
        x: u32,
        y: u32,
    ) -> BackendResult<[f32; 4]>;

    fn destroy_frame_buffer(&mut self, frame_buffer: FrameBufferHandle);

    // Shader programs

    fn create_program(
        &mut self,
        stages: &[ShaderStageSpecification],
        mode: DrawMode,
    ) -> BackendResult<ProgramHandle>;

    /// Allocate fresh storage for an attribute slot, initialised with `data`
    fn allocate_attribute(
        &mut self,
        program: ProgramHandle,
        slot: u32,
        data: &[u8],
    ) -> BackendResult<()>;

    /// Overwrite `data.len()` bytes of an attribute slot starting at `byte_offset`
    fn write_attribute(
        &mut self,
        program: ProgramHandle,
        slot: u32,
        byte_offset: usize,
        data: &[u8],
    ) -> BackendResult<()>;

    fn write_uniform(
        &mut self,
        program: ProgramHandle,
        slot: u32,
        value: &UniformValue,
    ) -> BackendResult<()>;

    /// Bind a texture to a sampler unit of a program
    fn bind_texture(
        &mut self,
        program: ProgramHandle,
        unit: u32,
        texture: TextureHandle,
    ) -> BackendResult<()>;

    fn write_index(&mut self, program: ProgramHandle, indices: &[u32]) -> BackendResult<()>;

    /// Issue a validated draw into the currently bound frame buffer
    fn draw(&mut self, program: ProgramHandle, call: &DrawCall) -> BackendResult<()>;

    fn destroy_program(&mut self, program: ProgramHandle);

    // Presentation

    /// Show the first color attachment of `frame_buffer` on the visible surface
    fn present(&mut self, frame_buffer: FrameBufferHandle) -> BackendResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_roundtrip_raw() {
        let handle = TextureHandle::from_raw(42);
        assert_eq!(handle.raw(), 42);
        assert_ne!(handle, TextureHandle::from_raw(43));
    }

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::InvalidParameter("bad size".into());
        assert_eq!(err.to_string(), "Invalid parameter: bad size");
        assert_eq!(BackendError::DeviceLost.to_string(), "Device lost");
    }
}
