//! Headless backend for testing and GPU-less runs.
//!
//! Every resource lives in CPU memory: textures keep their texels, render
//! buffers keep one RGBA float per pixel, programs keep their attribute bytes,
//! uniforms and indices. Draws are recorded but never rasterized, so pixel
//! contents only change through uploads and clears.
//!
//! `HeadlessBackend` is a cheap handle to shared state. Clone it before
//! handing it to an [`Engine`](crate::Engine) to keep a probe for inspection.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::shader::{ShaderStageSpecification, UniformValue};

/// A draw call as seen by the headless backend
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: ProgramHandle,
    pub frame_buffer: FrameBufferHandle,
    pub viewport: Viewport,
    pub call: DrawCall,
}

struct HeadlessTexture {
    desc: TextureDescriptor,
    filter: FilterMode,
    flags: TextureUploadFlags,
    data: Vec<u8>,
    allocations: u32,
}

struct HeadlessRenderBuffer {
    ty: RenderBufferType,
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

#[derive(Default)]
struct HeadlessFrameBuffer {
    attachments: Vec<(String, AttachmentRole, AttachmentTarget)>,
}

struct HeadlessProgram {
    mode: DrawMode,
    attributes: HashMap<u32, Vec<u8>>,
    uniforms: HashMap<u32, UniformValue>,
    textures: HashMap<u32, TextureHandle>,
    indices: Vec<u32>,
}

#[derive(Default)]
struct HeadlessState {
    next_id: u64,
    surface: Option<(u32, u32)>,
    textures: HashMap<TextureHandle, HeadlessTexture>,
    render_buffers: HashMap<RenderBufferHandle, HeadlessRenderBuffer>,
    frame_buffers: HashMap<FrameBufferHandle, HeadlessFrameBuffer>,
    programs: HashMap<ProgramHandle, HeadlessProgram>,
    bound: Option<(FrameBufferHandle, Option<Viewport>)>,
    draws: Vec<DrawRecord>,
    presented: Vec<FrameBufferHandle>,
    pending_errors: VecDeque<BackendError>,
}

impl HeadlessState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn target_size(&self, target: AttachmentTarget) -> Option<(u32, u32)> {
        match target {
            AttachmentTarget::Texture(t) => self
                .textures
                .get(&t)
                .map(|t| (t.desc.width, t.desc.height)),
            AttachmentTarget::RenderBuffer(rb) => {
                self.render_buffers.get(&rb).map(|rb| (rb.width, rb.height))
            }
        }
    }

    fn is_complete(&self, frame_buffer: &HeadlessFrameBuffer) -> bool {
        if frame_buffer.attachments.is_empty() {
            return false;
        }
        let depth_count = frame_buffer
            .attachments
            .iter()
            .filter(|(_, role, _)| *role == AttachmentRole::Depth)
            .count();
        if depth_count > 1 {
            return false;
        }
        let mut sizes = frame_buffer
            .attachments
            .iter()
            .map(|(_, _, target)| self.target_size(*target));
        let first = sizes.next().flatten();
        first.is_some() && sizes.all(|s| s == first)
    }

    fn first_color(&self, frame_buffer: FrameBufferHandle) -> BackendResult<AttachmentTarget> {
        let fb = self.frame_buffers.get(&frame_buffer).ok_or_else(|| {
            BackendError::UnknownResource(format!("frame buffer {}", frame_buffer.raw()))
        })?;
        fb.attachments
            .iter()
            .find(|(_, role, _)| *role == AttachmentRole::Color)
            .map(|(_, _, target)| *target)
            .ok_or_else(|| BackendError::InvalidOperation("no color attachment".into()))
    }

    fn fill(&mut self, target: AttachmentTarget, value: [f32; 4]) {
        match target {
            AttachmentTarget::Texture(handle) => {
                if let Some(texture) = self.textures.get_mut(&handle) {
                    let texel = encode_texel(texture.desc.format, value);
                    texture.data = texel.repeat(texture.desc.texel_count());
                }
            }
            AttachmentTarget::RenderBuffer(handle) => {
                if let Some(buffer) = self.render_buffers.get_mut(&handle) {
                    buffer.pixels.fill(value);
                }
            }
        }
    }

    fn program_mut(&mut self, program: ProgramHandle) -> BackendResult<&mut HeadlessProgram> {
        self.programs
            .get_mut(&program)
            .ok_or_else(|| BackendError::UnknownResource(format!("program {}", program.raw())))
    }
}

fn decode_texel(format: TextureFormat, bytes: &[u8]) -> [f32; 4] {
    let mut out = [0.0, 0.0, 0.0, 1.0];
    let size = format.channel_size();
    for (c, channel) in bytes.chunks_exact(size).take(format.channels()).enumerate() {
        out[c] = if format.is_float() {
            bytemuck::pod_read_unaligned::<f32>(channel)
        } else {
            channel[0] as f32 / 255.0
        };
    }
    out
}

fn encode_texel(format: TextureFormat, value: [f32; 4]) -> Vec<u8> {
    let mut out = Vec::with_capacity(format.bytes_per_texel());
    for v in value.iter().take(format.channels()) {
        if format.is_float() {
            out.extend_from_slice(bytemuck::bytes_of(v));
        } else {
            out.push((v.clamp(0.0, 1.0) * 255.0).round() as u8);
        }
    }
    out
}

/// CPU-memory backend
#[derive(Clone, Default)]
pub struct HeadlessBackend {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an asynchronous device error for the next `poll_error`.
    pub fn push_error(&self, error: BackendError) {
        self.state.borrow_mut().pending_errors.push_back(error);
    }

    /// Surface size passed to `initialize`, if it ran
    pub fn surface_size(&self) -> Option<(u32, u32)> {
        self.state.borrow().surface
    }

    /// Every draw issued so far, oldest first
    pub fn draw_calls(&self) -> Vec<DrawRecord> {
        self.state.borrow().draws.clone()
    }

    /// Frame buffers handed to `present`, oldest first
    pub fn presented_frames(&self) -> Vec<FrameBufferHandle> {
        self.state.borrow().presented.clone()
    }

    pub fn attribute_bytes(&self, program: ProgramHandle, slot: u32) -> Option<Vec<u8>> {
        let state = self.state.borrow();
        state.programs.get(&program)?.attributes.get(&slot).cloned()
    }

    pub fn uniform(&self, program: ProgramHandle, slot: u32) -> Option<UniformValue> {
        let state = self.state.borrow();
        state.programs.get(&program)?.uniforms.get(&slot).copied()
    }

    pub fn bound_texture(&self, program: ProgramHandle, unit: u32) -> Option<TextureHandle> {
        let state = self.state.borrow();
        state.programs.get(&program)?.textures.get(&unit).copied()
    }

    pub fn index_buffer(&self, program: ProgramHandle) -> Option<Vec<u32>> {
        let state = self.state.borrow();
        state.programs.get(&program).map(|p| p.indices.clone())
    }

    pub fn program_draw_mode(&self, program: ProgramHandle) -> Option<DrawMode> {
        self.state.borrow().programs.get(&program).map(|p| p.mode)
    }

    /// How many times the texture storage was (re)allocated
    pub fn texture_allocations(&self, texture: TextureHandle) -> Option<u32> {
        self.state.borrow().textures.get(&texture).map(|t| t.allocations)
    }

    pub fn texture_filter(&self, texture: TextureHandle) -> Option<FilterMode> {
        self.state.borrow().textures.get(&texture).map(|t| t.filter)
    }

    pub fn texture_upload_flags(&self, texture: TextureHandle) -> Option<TextureUploadFlags> {
        self.state.borrow().textures.get(&texture).map(|t| t.flags)
    }

    pub fn texture_data(&self, texture: TextureHandle) -> Option<Vec<u8>> {
        self.state.borrow().textures.get(&texture).map(|t| t.data.clone())
    }

    pub fn live_texture_count(&self) -> usize {
        self.state.borrow().textures.len()
    }

    pub fn live_render_buffer_count(&self) -> usize {
        self.state.borrow().render_buffers.len()
    }

    pub fn live_frame_buffer_count(&self) -> usize {
        self.state.borrow().frame_buffers.len()
    }

    pub fn live_program_count(&self) -> usize {
        self.state.borrow().programs.len()
    }
}

impl std::fmt::Debug for HeadlessBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("HeadlessBackend")
            .field("surface", &state.surface)
            .field("textures", &state.textures.len())
            .field("render_buffers", &state.render_buffers.len())
            .field("frame_buffers", &state.frame_buffers.len())
            .field("programs", &state.programs.len())
            .finish()
    }
}

impl RenderBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "Headless"
    }

    fn initialize(&mut self, width: u32, height: u32) -> BackendResult<()> {
        if width == 0 || height == 0 {
            return Err(BackendError::InitializationFailed(format!(
                "surface size {width}x{height} is empty"
            )));
        }
        log::trace!("HeadlessBackend: initialize {}x{}", width, height);
        self.state.borrow_mut().surface = Some((width, height));
        Ok(())
    }

    fn poll_error(&mut self) -> Option<BackendError> {
        self.state.borrow_mut().pending_errors.pop_front()
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        if desc.width == 0 || desc.height == 0 {
            return Err(BackendError::TextureCreationFailed(
                "texture dimensions cannot be zero".into(),
            ));
        }
        let mut state = self.state.borrow_mut();
        let handle = TextureHandle::from_raw(state.next_id());
        log::trace!(
            "HeadlessBackend: creating texture {} ({}x{}, {:?})",
            handle.raw(),
            desc.width,
            desc.height,
            desc.format
        );
        state.textures.insert(
            handle,
            HeadlessTexture {
                desc: *desc,
                filter: FilterMode::default(),
                flags: TextureUploadFlags::empty(),
                data: vec![0; desc.byte_size()],
                allocations: 1,
            },
        );
        Ok(handle)
    }

    fn resize_texture(
        &mut self,
        texture: TextureHandle,
        desc: &TextureDescriptor,
    ) -> BackendResult<()> {
        if desc.width == 0 || desc.height == 0 {
            return Err(BackendError::InvalidParameter(
                "texture dimensions cannot be zero".into(),
            ));
        }
        let mut state = self.state.borrow_mut();
        let entry = state.textures.get_mut(&texture).ok_or_else(|| {
            BackendError::UnknownResource(format!("texture {}", texture.raw()))
        })?;
        log::trace!(
            "HeadlessBackend: resize texture {} to {}x{}",
            texture.raw(),
            desc.width,
            desc.height
        );
        entry.desc = *desc;
        entry.data = vec![0; desc.byte_size()];
        entry.allocations += 1;
        Ok(())
    }

    fn write_texture(
        &mut self,
        texture: TextureHandle,
        data: &[u8],
        flags: TextureUploadFlags,
    ) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        let entry = state.textures.get_mut(&texture).ok_or_else(|| {
            BackendError::UnknownResource(format!("texture {}", texture.raw()))
        })?;
        let format = entry.desc.format;
        let src_channels = if format.is_float() {
            format.channels()
        } else if flags.contains(TextureUploadFlags::WITH_ALPHA) {
            4
        } else {
            3
        };
        let channel_size = format.channel_size();
        let src_stride = src_channels * channel_size;
        let expected = entry.desc.texel_count() * src_stride;
        if data.len() != expected {
            return Err(BackendError::InvalidParameter(format!(
                "expected {} bytes for {}x{} {:?} upload, got {}",
                expected,
                entry.desc.width,
                entry.desc.height,
                format,
                data.len()
            )));
        }

        log::trace!(
            "HeadlessBackend: write_texture {} len={} flags={:?}",
            texture.raw(),
            data.len(),
            flags
        );
        entry.flags = flags;
        if src_stride == format.bytes_per_texel() {
            entry.data = data.to_vec();
        } else {
            let mut converted = Vec::with_capacity(entry.desc.byte_size());
            for texel in data.chunks_exact(src_stride) {
                for c in 0..format.channels() {
                    if c < src_channels {
                        converted.extend_from_slice(&texel[c * channel_size..(c + 1) * channel_size]);
                    } else {
                        converted.push(u8::MAX);
                    }
                }
            }
            entry.data = converted;
        }
        Ok(())
    }

    fn set_texture_filter(&mut self, texture: TextureHandle, mode: FilterMode) {
        if let Some(entry) = self.state.borrow_mut().textures.get_mut(&texture) {
            entry.filter = mode;
        }
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        log::trace!("HeadlessBackend: destroy texture {}", texture.raw());
        self.state.borrow_mut().textures.remove(&texture);
    }

    fn create_render_buffer(
        &mut self,
        ty: RenderBufferType,
        width: u32,
        height: u32,
    ) -> BackendResult<RenderBufferHandle> {
        if width == 0 || height == 0 {
            return Err(BackendError::RenderBufferCreationFailed(
                "render buffer dimensions cannot be zero".into(),
            ));
        }
        let mut state = self.state.borrow_mut();
        let handle = RenderBufferHandle::from_raw(state.next_id());
        log::trace!(
            "HeadlessBackend: creating render buffer {} ({:?}, {}x{})",
            handle.raw(),
            ty,
            width,
            height
        );
        state.render_buffers.insert(
            handle,
            HeadlessRenderBuffer {
                ty,
                width,
                height,
                pixels: vec![[0.0; 4]; width as usize * height as usize],
            },
        );
        Ok(handle)
    }

    fn resize_render_buffer(
        &mut self,
        buffer: RenderBufferHandle,
        width: u32,
        height: u32,
    ) -> BackendResult<()> {
        if width == 0 || height == 0 {
            return Err(BackendError::InvalidParameter(
                "render buffer dimensions cannot be zero".into(),
            ));
        }
        let mut state = self.state.borrow_mut();
        let entry = state.render_buffers.get_mut(&buffer).ok_or_else(|| {
            BackendError::UnknownResource(format!("render buffer {}", buffer.raw()))
        })?;
        log::trace!(
            "HeadlessBackend: resize render buffer {} ({:?}) to {}x{}",
            buffer.raw(),
            entry.ty,
            width,
            height
        );
        entry.width = width;
        entry.height = height;
        entry.pixels = vec![[0.0; 4]; width as usize * height as usize];
        Ok(())
    }

    fn destroy_render_buffer(&mut self, buffer: RenderBufferHandle) {
        log::trace!("HeadlessBackend: destroy render buffer {}", buffer.raw());
        self.state.borrow_mut().render_buffers.remove(&buffer);
    }

    fn create_frame_buffer(&mut self) -> BackendResult<FrameBufferHandle> {
        let mut state = self.state.borrow_mut();
        let handle = FrameBufferHandle::from_raw(state.next_id());
        log::trace!("HeadlessBackend: creating frame buffer {}", handle.raw());
        state
            .frame_buffers
            .insert(handle, HeadlessFrameBuffer::default());
        Ok(handle)
    }

    fn attach(
        &mut self,
        frame_buffer: FrameBufferHandle,
        name: &str,
        role: AttachmentRole,
        target: AttachmentTarget,
    ) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        if state.target_size(target).is_none() {
            return Err(BackendError::UnknownResource(format!(
                "attachment target {target:?}"
            )));
        }
        let fb = state.frame_buffers.get_mut(&frame_buffer).ok_or_else(|| {
            BackendError::UnknownResource(format!("frame buffer {}", frame_buffer.raw()))
        })?;
        log::trace!(
            "HeadlessBackend: attach {:?} as {} ({:?}) to frame buffer {}",
            target,
            name,
            role,
            frame_buffer.raw()
        );
        match fb.attachments.iter_mut().find(|(n, _, _)| n == name) {
            Some(existing) => *existing = (name.to_string(), role, target),
            None => fb.attachments.push((name.to_string(), role, target)),
        }
        Ok(())
    }

    fn bind_frame_buffer(
        &mut self,
        frame_buffer: FrameBufferHandle,
        viewport: Option<Viewport>,
    ) -> bool {
        let mut state = self.state.borrow_mut();
        let complete = state
            .frame_buffers
            .get(&frame_buffer)
            .is_some_and(|fb| state.is_complete(fb));
        if !complete {
            log::trace!(
                "HeadlessBackend: frame buffer {} is incomplete",
                frame_buffer.raw()
            );
            return false;
        }
        state.bound = Some((frame_buffer, viewport));
        true
    }

    fn bound_frame_buffer(&self) -> Option<FrameBufferHandle> {
        self.state.borrow().bound.map(|(fb, _)| fb)
    }

    fn bound_viewport(&self) -> Option<Viewport> {
        self.state.borrow().bound.and_then(|(_, viewport)| viewport)
    }

    fn clear(&mut self, frame_buffer: FrameBufferHandle, color: [f32; 4]) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        let attachments = state
            .frame_buffers
            .get(&frame_buffer)
            .ok_or_else(|| {
                BackendError::UnknownResource(format!("frame buffer {}", frame_buffer.raw()))
            })?
            .attachments
            .clone();
        log::trace!(
            "HeadlessBackend: clear frame buffer {} to {:?}",
            frame_buffer.raw(),
            color
        );
        for (_, role, target) in attachments {
            match role {
                AttachmentRole::Color => state.fill(target, color),
                AttachmentRole::Depth => state.fill(target, [1.0; 4]),
            }
        }
        Ok(())
    }

    fn read_pixel(
        &mut self,
        frame_buffer: FrameBufferHandle,
        x: u32,
        y: u32,
    ) -> BackendResult<[f32; 4]> {
        let state = self.state.borrow();
        let target = state.first_color(frame_buffer)?;
        let (width, height) = state
            .target_size(target)
            .ok_or_else(|| BackendError::UnknownResource(format!("attachment {target:?}")))?;
        if x >= width || y >= height {
            return Err(BackendError::InvalidParameter(format!(
                "pixel ({x}, {y}) outside {width}x{height}"
            )));
        }
        let index = y as usize * width as usize + x as usize;
        match target {
            AttachmentTarget::Texture(handle) => {
                let texture = &state.textures[&handle];
                let stride = texture.desc.format.bytes_per_texel();
                Ok(decode_texel(
                    texture.desc.format,
                    &texture.data[index * stride..(index + 1) * stride],
                ))
            }
            AttachmentTarget::RenderBuffer(handle) => Ok(state.render_buffers[&handle].pixels[index]),
        }
    }

    fn destroy_frame_buffer(&mut self, frame_buffer: FrameBufferHandle) {
        log::trace!("HeadlessBackend: destroy frame buffer {}", frame_buffer.raw());
        let mut state = self.state.borrow_mut();
        state.frame_buffers.remove(&frame_buffer);
        if state.bound.is_some_and(|(fb, _)| fb == frame_buffer) {
            state.bound = None;
        }
    }

    fn create_program(
        &mut self,
        stages: &[ShaderStageSpecification],
        mode: DrawMode,
    ) -> BackendResult<ProgramHandle> {
        if stages.is_empty() {
            return Err(BackendError::ProgramCreationFailed("no stages".into()));
        }
        let mut state = self.state.borrow_mut();
        let handle = ProgramHandle::from_raw(state.next_id());
        log::trace!(
            "HeadlessBackend: linking program {} ({} stages, {:?})",
            handle.raw(),
            stages.len(),
            mode
        );
        state.programs.insert(
            handle,
            HeadlessProgram {
                mode,
                attributes: HashMap::new(),
                uniforms: HashMap::new(),
                textures: HashMap::new(),
                indices: Vec::new(),
            },
        );
        Ok(handle)
    }

    fn allocate_attribute(
        &mut self,
        program: ProgramHandle,
        slot: u32,
        data: &[u8],
    ) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        log::trace!(
            "HeadlessBackend: allocate attribute {} of program {} ({} bytes)",
            slot,
            program.raw(),
            data.len()
        );
        state
            .program_mut(program)?
            .attributes
            .insert(slot, data.to_vec());
        Ok(())
    }

    fn write_attribute(
        &mut self,
        program: ProgramHandle,
        slot: u32,
        byte_offset: usize,
        data: &[u8],
    ) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        let storage = state
            .program_mut(program)?
            .attributes
            .get_mut(&slot)
            .ok_or_else(|| {
                BackendError::InvalidOperation(format!("attribute {slot} is not allocated"))
            })?;
        let end = byte_offset + data.len();
        if end > storage.len() {
            return Err(BackendError::InvalidParameter(format!(
                "write of [{byte_offset}, {end}) exceeds {} allocated bytes",
                storage.len()
            )));
        }
        storage[byte_offset..end].copy_from_slice(data);
        Ok(())
    }

    fn write_uniform(
        &mut self,
        program: ProgramHandle,
        slot: u32,
        value: &UniformValue,
    ) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        state.program_mut(program)?.uniforms.insert(slot, *value);
        Ok(())
    }

    fn bind_texture(
        &mut self,
        program: ProgramHandle,
        unit: u32,
        texture: TextureHandle,
    ) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.textures.contains_key(&texture) {
            return Err(BackendError::UnknownResource(format!(
                "texture {}",
                texture.raw()
            )));
        }
        state.program_mut(program)?.textures.insert(unit, texture);
        Ok(())
    }

    fn write_index(&mut self, program: ProgramHandle, indices: &[u32]) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        state.program_mut(program)?.indices = indices.to_vec();
        Ok(())
    }

    fn draw(&mut self, program: ProgramHandle, call: &DrawCall) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.programs.contains_key(&program) {
            return Err(BackendError::UnknownResource(format!(
                "program {}",
                program.raw()
            )));
        }
        let (frame_buffer, viewport) = state
            .bound
            .ok_or_else(|| BackendError::InvalidOperation("no frame buffer bound".into()))?;
        let viewport = viewport.ok_or_else(|| {
            BackendError::InvalidOperation(format!(
                "frame buffer {} has no viewport",
                frame_buffer.raw()
            ))
        })?;
        if let Some(missing) = call.textures.iter().find(|t| !state.textures.contains_key(*t)) {
            return Err(BackendError::UnknownResource(format!(
                "texture {}",
                missing.raw()
            )));
        }
        log::trace!(
            "HeadlessBackend: draw program {} ({:?}, {} elements) into frame buffer {}",
            program.raw(),
            call.mode,
            call.element_count,
            frame_buffer.raw()
        );
        state.draws.push(DrawRecord {
            program,
            frame_buffer,
            viewport,
            call: call.clone(),
        });
        Ok(())
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        log::trace!("HeadlessBackend: destroy program {}", program.raw());
        self.state.borrow_mut().programs.remove(&program);
    }

    fn present(&mut self, frame_buffer: FrameBufferHandle) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        if state.surface.is_none() {
            return Err(BackendError::InvalidOperation(
                "backend is not initialized".into(),
            ));
        }
        state.first_color(frame_buffer)?;
        log::trace!("HeadlessBackend: present frame buffer {}", frame_buffer.raw());
        state.presented.push(frame_buffer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> HeadlessBackend {
        HeadlessBackend::new()
    }

    #[test]
    fn test_probe_shares_state() {
        let mut backend = backend();
        let probe = backend.clone();
        backend
            .create_texture(&TextureDescriptor::new_2d(TextureFormat::Rgba8, 2, 2))
            .unwrap();
        assert_eq!(probe.live_texture_count(), 1);
    }

    #[test]
    fn test_rgb_upload_into_rgba_fills_alpha() {
        let mut backend = backend();
        let texture = backend
            .create_texture(&TextureDescriptor::new_2d(TextureFormat::Rgba8, 2, 1))
            .unwrap();
        backend
            .write_texture(texture, &[1, 2, 3, 4, 5, 6], TextureUploadFlags::empty())
            .unwrap();
        assert_eq!(
            backend.texture_data(texture).unwrap(),
            vec![1, 2, 3, 255, 4, 5, 6, 255]
        );
    }

    #[test]
    fn test_upload_size_mismatch_is_rejected() {
        let mut backend = backend();
        let texture = backend
            .create_texture(&TextureDescriptor::new_2d(TextureFormat::Rgba8, 2, 2))
            .unwrap();
        let result = backend.write_texture(texture, &[0; 15], TextureUploadFlags::WITH_ALPHA);
        assert!(matches!(result, Err(BackendError::InvalidParameter(_))));
    }

    #[test]
    fn test_incomplete_frame_buffer_does_not_bind() {
        let mut backend = backend();
        let fb = backend.create_frame_buffer().unwrap();
        assert!(!backend.bind_frame_buffer(fb, None));

        let small = backend
            .create_render_buffer(RenderBufferType::Color, 4, 4)
            .unwrap();
        let large = backend
            .create_render_buffer(RenderBufferType::Depth, 8, 8)
            .unwrap();
        backend
            .attach(fb, "color", AttachmentRole::Color, AttachmentTarget::RenderBuffer(small))
            .unwrap();
        backend
            .attach(fb, "depth", AttachmentRole::Depth, AttachmentTarget::RenderBuffer(large))
            .unwrap();
        assert!(!backend.bind_frame_buffer(fb, None));

        backend.resize_render_buffer(large, 4, 4).unwrap();
        assert!(backend.bind_frame_buffer(fb, None));
        assert_eq!(backend.bound_frame_buffer(), Some(fb));
    }

    #[test]
    fn test_clear_then_read_pixel() {
        let mut backend = backend();
        let fb = backend.create_frame_buffer().unwrap();
        let texture = backend
            .create_texture(&TextureDescriptor::new_2d(TextureFormat::Rgba32Float, 3, 3))
            .unwrap();
        backend
            .attach(fb, "color", AttachmentRole::Color, AttachmentTarget::Texture(texture))
            .unwrap();
        backend.clear(fb, [0.25, 0.5, 0.75, 1.0]).unwrap();
        assert_eq!(backend.read_pixel(fb, 2, 1).unwrap(), [0.25, 0.5, 0.75, 1.0]);
        assert!(backend.read_pixel(fb, 3, 0).is_err());
    }

    #[test]
    fn test_draw_requires_bound_target_with_viewport() {
        let mut backend = backend();
        let stage = ShaderStageSpecification::new(crate::shader::ShaderStageType::Vertex, "");
        let program = backend.create_program(&[stage], DrawMode::Points).unwrap();
        let call = DrawCall {
            mode: DrawMode::Points,
            element_count: 0,
            indexed: false,
            primitive_restart: None,
            patch_vertices: None,
            textures: Vec::new(),
        };
        assert!(backend.draw(program, &call).is_err());

        let fb = backend.create_frame_buffer().unwrap();
        let rb = backend
            .create_render_buffer(RenderBufferType::Float4, 2, 2)
            .unwrap();
        backend
            .attach(fb, "color", AttachmentRole::Color, AttachmentTarget::RenderBuffer(rb))
            .unwrap();
        assert!(backend.bind_frame_buffer(fb, None));
        assert!(backend.draw(program, &call).is_err());

        let viewport = Viewport {
            x: 0,
            y: 0,
            width: 2,
            height: 2,
        };
        assert!(backend.bind_frame_buffer(fb, Some(viewport)));
        backend.draw(program, &call).unwrap();
        assert_eq!(backend.draw_calls().len(), 1);
        assert_eq!(backend.draw_calls()[0].viewport, viewport);
    }

    #[test]
    fn test_pending_errors_drain_in_order() {
        let mut backend = backend();
        backend.push_error(BackendError::OutOfMemory);
        backend.push_error(BackendError::DeviceLost);
        assert_eq!(backend.poll_error(), Some(BackendError::OutOfMemory));
        assert_eq!(backend.poll_error(), Some(BackendError::DeviceLost));
        assert_eq!(backend.poll_error(), None);
    }
}
