//! Render target composed of named attachments.

use std::rc::Rc;

use glam::{Vec3, Vec4};

use crate::backend::{AttachmentRole, AttachmentTarget, BackendRef, FrameBufferHandle, Viewport};
use crate::error::{RenderError, RenderResult};
use crate::resources::{RenderBuffer, Shared, TextureBuffer};

/// A buffer attached to a frame buffer
#[derive(Debug, Clone)]
pub enum Attachment {
    Texture(Shared<TextureBuffer>),
    RenderBuffer(Shared<RenderBuffer>),
}

impl Attachment {
    fn target(&self, name: &str) -> RenderResult<AttachmentTarget> {
        Ok(match self {
            Attachment::Texture(texture) => {
                AttachmentTarget::Texture(texture.try_borrow().map_err(|_| busy(name))?.handle())
            }
            Attachment::RenderBuffer(buffer) => AttachmentTarget::RenderBuffer(
                buffer.try_borrow().map_err(|_| busy(name))?.handle(),
            ),
        })
    }

    fn size(&self, name: &str) -> RenderResult<(u32, u32)> {
        Ok(match self {
            Attachment::Texture(texture) => {
                let texture = texture.try_borrow().map_err(|_| busy(name))?;
                (texture.size_x(), texture.size_y())
            }
            Attachment::RenderBuffer(buffer) => {
                let buffer = buffer.try_borrow().map_err(|_| busy(name))?;
                (buffer.size_x(), buffer.size_y())
            }
        })
    }

    /// Whether both attachments refer to the same buffer
    pub fn ptr_eq(&self, other: &Attachment) -> bool {
        match (self, other) {
            (Attachment::Texture(a), Attachment::Texture(b)) => Rc::ptr_eq(a, b),
            (Attachment::RenderBuffer(a), Attachment::RenderBuffer(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn busy(name: &str) -> RenderError {
    RenderError::ResourceBusy(format!("attachment `{name}`"))
}

struct NamedAttachment {
    name: String,
    role: AttachmentRole,
    attachment: Attachment,
}

/// A bindable render target.
///
/// Attachments are kept in insertion order. The frame buffer only references
/// them; a texture may be attached here and sampled by a program at the same
/// time.
///
/// Typical frame:
///
/// ```ignore
/// if fb.borrow_mut().bind_for_rendering() {
///     fb.borrow_mut().clear()?;
///     program.borrow_mut().draw()?;
/// }
/// ```
pub struct FrameBuffer {
    backend: BackendRef,
    handle: FrameBufferHandle,
    attachments: Vec<NamedAttachment>,
    viewport: Option<Viewport>,
    /// Color written to color attachments by [`clear`](Self::clear)
    pub clear_color: Vec3,
    pub clear_alpha: f32,
}

impl FrameBuffer {
    pub(crate) fn new(backend: BackendRef) -> RenderResult<Self> {
        let handle = backend.borrow_mut().create_frame_buffer()?;
        log::debug!("Created frame buffer {}", handle.raw());
        Ok(Self {
            backend,
            handle,
            attachments: Vec::new(),
            viewport: None,
            clear_color: Vec3::ZERO,
            clear_alpha: 1.0,
        })
    }

    pub fn handle(&self) -> FrameBufferHandle {
        self.handle
    }

    /// Whether this is the backend's active render target
    pub fn is_bound(&self) -> bool {
        self.backend.borrow().bound_frame_buffer() == Some(self.handle)
    }

    /// Try to make this the active render target.
    ///
    /// Returns `false` if the attachment set is incomplete. Callers must skip
    /// their draws for this frame in that case.
    pub fn bind_for_rendering(&mut self) -> bool {
        let bound = self
            .backend
            .borrow_mut()
            .bind_frame_buffer(self.handle, self.viewport);
        if !bound {
            log::warn!(
                "Frame buffer {} could not be bound ({} attachments)",
                self.handle.raw(),
                self.attachments.len()
            );
        }
        bound
    }

    /// Reset color attachments to the clear color and depth to the far plane.
    pub fn clear(&mut self) -> RenderResult<()> {
        if !self.is_bound() {
            return Err(RenderError::NotBound);
        }
        let color = self.clear_color.extend(self.clear_alpha).to_array();
        self.backend.borrow_mut().clear(self.handle, color)?;
        Ok(())
    }

    pub fn bind_to_color_render_buffer(
        &mut self,
        name: &str,
        buffer: &Shared<RenderBuffer>,
    ) -> RenderResult<()> {
        self.attach_render_buffer(name, AttachmentRole::Color, buffer)
    }

    pub fn bind_to_depth_render_buffer(
        &mut self,
        name: &str,
        buffer: &Shared<RenderBuffer>,
    ) -> RenderResult<()> {
        self.attach_render_buffer(name, AttachmentRole::Depth, buffer)
    }

    pub fn bind_to_color_texture_buffer(
        &mut self,
        name: &str,
        texture: &Shared<TextureBuffer>,
    ) -> RenderResult<()> {
        self.attach(name, AttachmentRole::Color, Attachment::Texture(Rc::clone(texture)))
    }

    pub fn bind_to_depth_texture_buffer(
        &mut self,
        name: &str,
        texture: &Shared<TextureBuffer>,
    ) -> RenderResult<()> {
        self.attach(name, AttachmentRole::Depth, Attachment::Texture(Rc::clone(texture)))
    }

    fn attach_render_buffer(
        &mut self,
        name: &str,
        role: AttachmentRole,
        buffer: &Shared<RenderBuffer>,
    ) -> RenderResult<()> {
        let buffer_type = buffer.try_borrow().map_err(|_| busy(name))?.buffer_type();
        if buffer_type.is_depth() != (role == AttachmentRole::Depth) {
            return Err(RenderError::AttachmentRoleMismatch {
                name: name.to_string(),
                role,
                buffer: buffer_type,
            });
        }
        self.attach(name, role, Attachment::RenderBuffer(Rc::clone(buffer)))
    }

    /// Attach under `name`; an existing attachment with that name is replaced
    /// in place.
    fn attach(&mut self, name: &str, role: AttachmentRole, attachment: Attachment) -> RenderResult<()> {
        let target = attachment.target(name)?;
        self.backend
            .borrow_mut()
            .attach(self.handle, name, role, target)?;

        match self.attachments.iter_mut().find(|a| a.name == name) {
            Some(existing) => {
                log::debug!(
                    "Frame buffer {}: replacing attachment `{}`",
                    self.handle.raw(),
                    name
                );
                existing.role = role;
                existing.attachment = attachment;
            }
            None => self.attachments.push(NamedAttachment {
                name: name.to_string(),
                role,
                attachment,
            }),
        }
        Ok(())
    }

    /// Set the sub-rectangle used by subsequent draws.
    pub fn set_viewport(&mut self, x: i32, y: i32, size_x: u32, size_y: u32) {
        let viewport = Viewport {
            x,
            y,
            width: size_x,
            height: size_y,
        };
        self.viewport = Some(viewport);
        if self.is_bound() {
            self.backend
                .borrow_mut()
                .bind_frame_buffer(self.handle, self.viewport);
        }
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Resize every attachment. Attachments already at the requested size are
    /// left alone, and every name keeps its buffer.
    pub fn resize_buffers(&mut self, size_x: u32, size_y: u32) -> RenderResult<()> {
        for entry in &self.attachments {
            match &entry.attachment {
                Attachment::Texture(texture) => {
                    let mut texture = texture.try_borrow_mut().map_err(|_| busy(&entry.name))?;
                    if texture.dimension() == 1 {
                        texture.resize(1, size_x, 1)?;
                    } else {
                        texture.resize(2, size_x, size_y)?;
                    }
                }
                Attachment::RenderBuffer(buffer) => buffer
                    .try_borrow_mut()
                    .map_err(|_| busy(&entry.name))?
                    .resize(size_x, size_y)?,
            }
        }
        Ok(())
    }

    pub fn attachment(&self, name: &str) -> Option<&Attachment> {
        self.attachments
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.attachment)
    }

    /// Render buffer attached under `name`, if any
    pub fn render_buffer(&self, name: &str) -> Option<Shared<RenderBuffer>> {
        match self.attachment(name)? {
            Attachment::RenderBuffer(buffer) => Some(Rc::clone(buffer)),
            Attachment::Texture(_) => None,
        }
    }

    /// Texture attached under `name`, if any
    pub fn texture_buffer(&self, name: &str) -> Option<Shared<TextureBuffer>> {
        match self.attachment(name)? {
            Attachment::Texture(texture) => Some(Rc::clone(texture)),
            Attachment::RenderBuffer(_) => None,
        }
    }

    /// Attachment names in insertion order
    pub fn attachment_names(&self) -> Vec<&str> {
        self.attachments.iter().map(|a| a.name.as_str()).collect()
    }

    fn color_attachment(&self) -> RenderResult<&NamedAttachment> {
        self.attachments
            .iter()
            .find(|a| a.role == AttachmentRole::Color)
            .ok_or(RenderError::MissingAttachment)
    }

    /// Read one pixel of the first color attachment.
    ///
    /// Stalls until the backend has finished rendering; not meant for
    /// per-frame loops over many pixels.
    pub fn read_float4(&self, x: i32, y: i32) -> RenderResult<Vec4> {
        let color = self.color_attachment()?;
        let (width, height) = color.attachment.size(&color.name)?;
        if x < 0 || y < 0 || x as u32 >= width || y as u32 >= height {
            return Err(RenderError::PixelOutOfBounds {
                x,
                y,
                width,
                height,
            });
        }
        let pixel = self
            .backend
            .borrow_mut()
            .read_pixel(self.handle, x as u32, y as u32)?;
        Ok(Vec4::from_array(pixel))
    }

    /// Read the whole first color attachment, row by row.
    ///
    /// Same stalling caveat as [`read_float4`](Self::read_float4).
    pub fn read_buffer(&self) -> RenderResult<Vec<Vec4>> {
        let color = self.color_attachment()?;
        let (width, height) = color.attachment.size(&color.name)?;
        let mut backend = self.backend.borrow_mut();
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(Vec4::from_array(backend.read_pixel(self.handle, x, y)?));
            }
        }
        Ok(pixels)
    }
}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        match self.backend.try_borrow_mut() {
            Ok(mut backend) => backend.destroy_frame_buffer(self.handle),
            Err(_) => log::warn!(
                "Backend busy while dropping frame buffer {}",
                self.handle.raw()
            ),
        }
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("handle", &self.handle)
            .field("attachments", &self.attachment_names())
            .field("viewport", &self.viewport)
            .field("clear_color", &self.clear_color)
            .field("clear_alpha", &self.clear_alpha)
            .finish()
    }
}

static_assertions::assert_not_impl_any!(FrameBuffer: Send, Sync);
