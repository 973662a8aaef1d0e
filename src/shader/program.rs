//! Linked shader program and its slot bindings.

use std::collections::HashMap;
use std::rc::Rc;

use crate::backend::{BackendRef, DataType, DrawCall, DrawMode, ProgramHandle};
use crate::error::{RenderError, RenderResult, ValidationError};
use crate::resources::{Shared, TextureBuffer};
use crate::shader::{AttributeData, ShaderStageSpecification, UniformValue};

/// Resolved reference to a uniform slot of one program.
///
/// Obtained from [`ShaderProgram::uniform_slot`]; lets hot loops skip the
/// name lookup. Only meaningful for the program that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformSlot(usize);

#[derive(Debug)]
struct UniformEntry {
    name: String,
    data_type: DataType,
    is_set: bool,
}

#[derive(Debug)]
struct AttributeEntry {
    name: String,
    data_type: DataType,
    array_count: u32,
    /// Elements currently allocated, `None` until first set
    len: Option<usize>,
}

#[derive(Debug)]
struct TextureEntry {
    name: String,
    dimension: u32,
    unit: u32,
    texture: Option<Shared<TextureBuffer>>,
}

/// Merge one declaration into a name-keyed slot table.
///
/// Returns the slot index, or a conflict if the name was already declared
/// with a different shape.
fn merge_slot<T>(
    entries: &mut Vec<T>,
    index: &mut HashMap<String, usize>,
    name: &str,
    describe: impl Fn(&T) -> String,
    entry: T,
) -> Result<usize, ValidationError> {
    if let Some(&existing) = index.get(name) {
        let first = describe(&entries[existing]);
        let second = describe(&entry);
        if first != second {
            return Err(ValidationError::SlotConflict {
                name: name.to_string(),
                first,
                second,
            });
        }
        return Ok(existing);
    }
    entries.push(entry);
    index.insert(name.to_string(), entries.len() - 1);
    Ok(entries.len() - 1)
}

fn describe_attribute(entry: &AttributeEntry) -> String {
    if entry.array_count > 1 {
        format!("{:?}[{}]", entry.data_type, entry.array_count)
    } else {
        format!("{:?}", entry.data_type)
    }
}

/// A linked set of shader stages with named, typed slots.
///
/// Every uniform, attribute and texture declared by any stage becomes one
/// slot; stages that declare the same name share it. All slots must be
/// satisfied before [`draw`](Self::draw) is accepted.
pub struct ShaderProgram {
    backend: BackendRef,
    handle: ProgramHandle,
    draw_mode: DrawMode,
    patch_vertices: Option<u32>,

    uniforms: Vec<UniformEntry>,
    attributes: Vec<AttributeEntry>,
    textures: Vec<TextureEntry>,

    uniform_index: HashMap<String, usize>,
    attribute_index: HashMap<String, usize>,
    texture_index: HashMap<String, usize>,

    indices: Option<Vec<u32>>,
    primitive_restart: Option<u32>,
}

impl ShaderProgram {
    /// Link `stages` (called by the Engine).
    pub(crate) fn new(
        backend: BackendRef,
        stages: &[ShaderStageSpecification],
        draw_mode: DrawMode,
        patch_vertices: Option<u32>,
    ) -> RenderResult<Self> {
        if stages.is_empty() {
            return Err(ValidationError::NoStages.into());
        }
        let patch_vertices = match (draw_mode, patch_vertices) {
            (DrawMode::Patches, Some(n)) if n > 0 => Some(n),
            (DrawMode::Patches, _) => return Err(ValidationError::MissingPatchVertices.into()),
            (_, Some(n)) => {
                log::warn!(
                    "Ignoring patch vertex count {} for draw mode {:?}",
                    n,
                    draw_mode
                );
                None
            }
            (_, None) => None,
        };

        let mut uniforms = Vec::new();
        let mut attributes = Vec::new();
        let mut textures: Vec<TextureEntry> = Vec::new();
        let mut uniform_index = HashMap::new();
        let mut attribute_index = HashMap::new();
        let mut texture_index = HashMap::new();

        for stage in stages {
            for uniform in &stage.uniforms {
                merge_slot(
                    &mut uniforms,
                    &mut uniform_index,
                    &uniform.name,
                    |u: &UniformEntry| format!("{:?}", u.data_type),
                    UniformEntry {
                        name: uniform.name.clone(),
                        data_type: uniform.data_type,
                        is_set: false,
                    },
                )?;
            }
            for attribute in &stage.attributes {
                merge_slot(
                    &mut attributes,
                    &mut attribute_index,
                    &attribute.name,
                    describe_attribute,
                    AttributeEntry {
                        name: attribute.name.clone(),
                        data_type: attribute.data_type,
                        array_count: attribute.array_count.max(1),
                        len: None,
                    },
                )?;
            }
            for texture in &stage.textures {
                let unit = textures.len() as u32;
                merge_slot(
                    &mut textures,
                    &mut texture_index,
                    &texture.name,
                    |t: &TextureEntry| format!("{}D sampler", t.dimension),
                    TextureEntry {
                        name: texture.name.clone(),
                        dimension: texture.dimension,
                        unit,
                        texture: None,
                    },
                )?;
            }
        }

        let handle = backend.borrow_mut().create_program(stages, draw_mode)?;
        log::debug!(
            "Linked program {} ({} stages, {:?}): {} uniforms, {} attributes, {} textures",
            handle.raw(),
            stages.len(),
            draw_mode,
            uniforms.len(),
            attributes.len(),
            textures.len()
        );

        Ok(Self {
            backend,
            handle,
            draw_mode,
            patch_vertices,
            uniforms,
            attributes,
            textures,
            uniform_index,
            attribute_index,
            texture_index,
            indices: None,
            primitive_restart: None,
        })
    }

    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    /// Vertices per patch, only for [`DrawMode::Patches`]
    pub fn patch_vertices(&self) -> Option<u32> {
        self.patch_vertices
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniform_index.contains_key(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute_index.contains_key(name)
    }

    pub fn has_texture(&self, name: &str) -> bool {
        self.texture_index.contains_key(name)
    }

    /// Resolve a uniform name once for repeated [`set_uniform_at`](Self::set_uniform_at) calls.
    pub fn uniform_slot(&self, name: &str) -> Option<UniformSlot> {
        self.uniform_index.get(name).copied().map(UniformSlot)
    }

    /// Texture currently bound to the sampler `name`
    pub fn texture_buffer(&self, name: &str) -> Option<Shared<TextureBuffer>> {
        let entry = &self.textures[*self.texture_index.get(name)?];
        entry.texture.as_ref().map(Rc::clone)
    }

    /// Vertex count implied by the first allocated attribute
    pub fn vertex_count(&self) -> Option<usize> {
        self.attributes
            .iter()
            .find_map(|a| a.len.map(|len| len / a.array_count as usize))
    }

    /// Set a uniform by name.
    ///
    /// `f64` values are narrowed to `f32`.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) -> RenderResult<()> {
        let slot = self
            .uniform_slot(name)
            .ok_or_else(|| ValidationError::UnknownUniform(name.to_string()))?;
        self.set_uniform_at(slot, value)
    }

    pub fn set_uniform_at(
        &mut self,
        slot: UniformSlot,
        value: impl Into<UniformValue>,
    ) -> RenderResult<()> {
        let value = value.into();
        let entry = self
            .uniforms
            .get_mut(slot.0)
            .ok_or_else(|| ValidationError::UnknownUniform(format!("#{}", slot.0)))?;
        if !value.data_type().is_compatible_with(entry.data_type) {
            return Err(ValidationError::TypeMismatch {
                name: entry.name.clone(),
                declared: entry.data_type,
                given: value.data_type(),
            }
            .into());
        }
        self.backend
            .borrow_mut()
            .write_uniform(self.handle, slot.0 as u32, &value)?;
        entry.is_set = true;
        Ok(())
    }

    fn attribute_entry(&mut self, name: &str, given: DataType) -> RenderResult<(usize, &mut AttributeEntry)> {
        let slot = *self
            .attribute_index
            .get(name)
            .ok_or_else(|| ValidationError::UnknownAttribute(name.to_string()))?;
        let entry = &mut self.attributes[slot];
        if !given.is_compatible_with(entry.data_type) {
            return Err(ValidationError::TypeMismatch {
                name: name.to_string(),
                declared: entry.data_type,
                given,
            }
            .into());
        }
        Ok((slot, entry))
    }

    /// Allocate fresh storage for an attribute, sized to `data`.
    pub fn set_attribute(&mut self, name: &str, data: impl Into<AttributeData>) -> RenderResult<()> {
        let data = data.into();
        let handle = self.handle;
        let backend = Rc::clone(&self.backend);
        let (slot, entry) = self.attribute_entry(name, data.data_type())?;
        backend
            .borrow_mut()
            .allocate_attribute(handle, slot as u32, data.as_bytes())?;
        entry.len = Some(data.len());
        Ok(())
    }

    /// Overwrite elements `[offset, offset + size)` of an allocated attribute
    /// with the first `size` elements of `data`.
    ///
    /// `size` of `None` writes the whole of `data`. Elements outside the range
    /// keep their previous contents.
    pub fn update_attribute(
        &mut self,
        name: &str,
        data: impl Into<AttributeData>,
        offset: usize,
        size: Option<usize>,
    ) -> RenderResult<()> {
        let data = data.into();
        let handle = self.handle;
        let backend = Rc::clone(&self.backend);
        let (slot, entry) = self.attribute_entry(name, data.data_type())?;
        let available = entry
            .len
            .ok_or_else(|| ValidationError::AttributeNotAllocated(name.to_string()))?;

        let size = size.unwrap_or(data.len());
        if size > data.len() {
            return Err(ValidationError::UpdateOutOfRange {
                name: name.to_string(),
                offset: 0,
                end: size,
                available: data.len(),
            }
            .into());
        }
        match offset.checked_add(size) {
            Some(end) if end <= available => {}
            end => {
                return Err(ValidationError::UpdateOutOfRange {
                    name: name.to_string(),
                    offset,
                    end: end.unwrap_or(usize::MAX),
                    available,
                }
                .into());
            }
        }

        let element_size = data.data_type().size_bytes();
        let bytes = &data.as_bytes()[..size * element_size];
        backend
            .borrow_mut()
            .write_attribute(handle, slot as u32, offset * element_size, bytes)?;
        Ok(())
    }

    /// Allocate an array attribute from per-vertex arrays.
    ///
    /// Each `[T; C]` is laid out flat, one vertex after the other.
    pub fn set_attribute_array<T, const C: usize>(
        &mut self,
        name: &str,
        data: &[[T; C]],
    ) -> RenderResult<()>
    where
        T: Copy,
        Vec<T>: Into<AttributeData>,
    {
        self.check_array_width(name, C)?;
        self.set_attribute(name, flatten(data))
    }

    /// Array form of [`update_attribute`](Self::update_attribute). `offset` and
    /// `size` count flat elements, not vertices.
    pub fn update_attribute_array<T, const C: usize>(
        &mut self,
        name: &str,
        data: &[[T; C]],
        offset: usize,
        size: Option<usize>,
    ) -> RenderResult<()>
    where
        T: Copy,
        Vec<T>: Into<AttributeData>,
    {
        self.check_array_width(name, C)?;
        self.update_attribute(name, flatten(data), offset, size)
    }

    /// Per-vertex arrays must be exactly as wide as the declared array count.
    fn check_array_width(&self, name: &str, width: usize) -> RenderResult<()> {
        let slot = *self
            .attribute_index
            .get(name)
            .ok_or_else(|| ValidationError::UnknownAttribute(name.to_string()))?;
        let declared = self.attributes[slot].array_count;
        if width != declared as usize {
            return Err(ValidationError::ArrayWidthMismatch {
                name: name.to_string(),
                declared,
                given: width,
            }
            .into());
        }
        Ok(())
    }

    /// Bind `texture` to the sampler `name`.
    ///
    /// The program keeps a reference but never resizes or writes the texture.
    pub fn set_texture(&mut self, name: &str, texture: &Shared<TextureBuffer>) -> RenderResult<()> {
        let slot = *self
            .texture_index
            .get(name)
            .ok_or_else(|| ValidationError::UnknownTexture(name.to_string()))?;
        let entry = &mut self.textures[slot];
        let (dimension, native) = {
            let texture = texture
                .try_borrow()
                .map_err(|_| RenderError::ResourceBusy(format!("texture `{name}`")))?;
            (texture.dimension(), texture.handle())
        };
        if dimension != entry.dimension {
            return Err(ValidationError::TextureDimensionMismatch {
                name: name.to_string(),
                declared: entry.dimension,
                given: dimension,
            }
            .into());
        }
        self.backend
            .borrow_mut()
            .bind_texture(self.handle, entry.unit, native)?;
        entry.texture = Some(Rc::clone(texture));
        Ok(())
    }

    /// Upload a flat index buffer. Only valid for indexed draw modes.
    pub fn set_index(&mut self, indices: &[u32]) -> RenderResult<()> {
        if !self.draw_mode.is_indexed() {
            return Err(ValidationError::IndexNotUsed(self.draw_mode).into());
        }
        self.backend
            .borrow_mut()
            .write_index(self.handle, indices)?;
        self.indices = Some(indices.to_vec());
        Ok(())
    }

    pub fn set_index_triangles(&mut self, triangles: &[[u32; 3]]) -> RenderResult<()> {
        self.set_index(&flatten(triangles))
    }

    /// Index value that restarts the strip, for the line strip modes.
    pub fn set_primitive_restart_index(&mut self, restart: u32) -> RenderResult<()> {
        if !self.draw_mode.supports_primitive_restart() {
            return Err(ValidationError::RestartNotSupported(self.draw_mode).into());
        }
        self.primitive_restart = Some(restart);
        Ok(())
    }

    /// Check that every slot is satisfied and the data is consistent.
    pub fn validate_data(&self) -> RenderResult<()> {
        self.resolve_draw().map(|_| ())
    }

    fn resolve_draw(&self) -> RenderResult<DrawCall> {
        if let Some(unset) = self.uniforms.iter().find(|u| !u.is_set) {
            return Err(ValidationError::UnsetUniform(unset.name.clone()).into());
        }

        let mut textures = Vec::with_capacity(self.textures.len());
        for entry in &self.textures {
            let texture = entry
                .texture
                .as_ref()
                .ok_or_else(|| ValidationError::UnsetTexture(entry.name.clone()))?;
            let texture = texture
                .try_borrow()
                .map_err(|_| RenderError::ResourceBusy(format!("texture `{}`", entry.name)))?;
            textures.push(texture.handle());
        }

        let mut vertex_count: Option<(usize, &str)> = None;
        for entry in &self.attributes {
            let len = entry
                .len
                .ok_or_else(|| ValidationError::UnsetAttribute(entry.name.clone()))?;
            if len % entry.array_count as usize != 0 {
                return Err(ValidationError::AttributeArrayLength {
                    name: entry.name.clone(),
                    len,
                    array_count: entry.array_count,
                }
                .into());
            }
            let count = len / entry.array_count as usize;
            match vertex_count {
                None => vertex_count = Some((count, entry.name.as_str())),
                Some((expected, reference)) if expected != count => {
                    return Err(ValidationError::AttributeSizeMismatch {
                        name: entry.name.clone(),
                        count,
                        reference: reference.to_string(),
                        expected,
                    }
                    .into());
                }
                Some(_) => {}
            }
        }
        let vertex_count = vertex_count.map_or(0, |(count, _)| count);

        let element_count = if self.draw_mode.is_indexed() {
            let indices = self
                .indices
                .as_ref()
                .ok_or(ValidationError::MissingIndex(self.draw_mode))?;
            for (position, &value) in indices.iter().enumerate() {
                if Some(value) == self.primitive_restart {
                    continue;
                }
                if value as usize >= vertex_count {
                    return Err(ValidationError::IndexOutOfRange {
                        value,
                        position,
                        vertex_count,
                    }
                    .into());
                }
            }
            indices.len()
        } else {
            vertex_count
        };

        Ok(DrawCall {
            mode: self.draw_mode,
            element_count: element_count as u32,
            indexed: self.draw_mode.is_indexed(),
            primitive_restart: self.primitive_restart,
            patch_vertices: self.patch_vertices,
            textures,
        })
    }

    /// Validate and issue the draw into the currently bound frame buffer.
    ///
    /// Never binds a frame buffer itself.
    pub fn draw(&self) -> RenderResult<()> {
        let call = self.resolve_draw()?;
        let mut backend = self.backend.borrow_mut();
        if backend.bound_frame_buffer().is_none() {
            return Err(RenderError::NotBound);
        }
        if backend.bound_viewport().is_none() {
            return Err(RenderError::ViewportNotSet);
        }
        log::trace!(
            "Drawing program {} ({:?}, {} elements)",
            self.handle.raw(),
            call.mode,
            call.element_count
        );
        backend.draw(self.handle, &call)?;
        Ok(())
    }
}

fn flatten<T: Copy, const C: usize>(data: &[[T; C]]) -> Vec<T> {
    data.iter().flat_map(|v| v.iter().copied()).collect()
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        match self.backend.try_borrow_mut() {
            Ok(mut backend) => backend.destroy_program(self.handle),
            Err(_) => log::warn!(
                "Backend busy while dropping program {}",
                self.handle.raw()
            ),
        }
    }
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("handle", &self.handle)
            .field("draw_mode", &self.draw_mode)
            .field("uniforms", &self.uniforms)
            .field("attributes", &self.attributes)
            .field("textures", &self.textures)
            .finish()
    }
}

static_assertions::assert_not_impl_any!(ShaderProgram: Send, Sync);

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::backend::{TextureDescriptor, TextureFormat};
    use crate::resources::shared;
    use crate::resources::test_support::headless;
    use crate::shader::{ShaderAttribute, ShaderStageType, ShaderTexture, ShaderUniform};

    fn vertex_stage() -> ShaderStageSpecification {
        ShaderStageSpecification::new(ShaderStageType::Vertex, "")
            .with_attribute(ShaderAttribute::new("a_position", DataType::Vector3Float))
            .with_uniform(ShaderUniform::new("u_scale", DataType::Float))
    }

    fn fragment_stage() -> ShaderStageSpecification {
        ShaderStageSpecification::new(ShaderStageType::Fragment, "")
            .with_uniform(ShaderUniform::new("u_scale", DataType::Float))
            .with_uniform(ShaderUniform::new("u_color", DataType::Vector3Float))
            .with_output_loc("outputF")
    }

    fn linked(mode: DrawMode) -> (crate::backend::HeadlessBackend, ShaderProgram) {
        let (probe, backend) = headless();
        let program =
            ShaderProgram::new(backend, &[vertex_stage(), fragment_stage()], mode, None).unwrap();
        (probe, program)
    }

    #[test]
    fn test_shared_declarations_merge() {
        let (_, program) = linked(DrawMode::Triangles);
        assert!(program.has_uniform("u_scale"));
        assert!(program.has_uniform("u_color"));
        assert!(program.has_attribute("a_position"));
        assert!(!program.has_attribute("u_scale"));
        assert_eq!(program.uniforms.len(), 2);
    }

    #[test]
    fn test_conflicting_declarations_fail_to_link() {
        let (_, backend) = headless();
        let other = ShaderStageSpecification::new(ShaderStageType::Fragment, "")
            .with_uniform(ShaderUniform::new("u_scale", DataType::Vector2Float));
        let result = ShaderProgram::new(backend, &[vertex_stage(), other], DrawMode::Triangles, None);
        assert!(matches!(
            result,
            Err(RenderError::Validation(ValidationError::SlotConflict { ref name, .. })) if name == "u_scale"
        ));
    }

    #[test]
    fn test_empty_stage_list_fails() {
        let (_, backend) = headless();
        let result = ShaderProgram::new(backend, &[], DrawMode::Triangles, None);
        assert!(matches!(
            result,
            Err(RenderError::Validation(ValidationError::NoStages))
        ));
    }

    #[test]
    fn test_patches_need_vertex_count() {
        let (_, backend) = headless();
        let result = ShaderProgram::new(backend.clone(), &[vertex_stage()], DrawMode::Patches, None);
        assert!(matches!(
            result,
            Err(RenderError::Validation(ValidationError::MissingPatchVertices))
        ));

        let program =
            ShaderProgram::new(backend.clone(), &[vertex_stage()], DrawMode::Patches, Some(3)).unwrap();
        assert_eq!(program.patch_vertices(), Some(3));

        let program =
            ShaderProgram::new(backend, &[vertex_stage()], DrawMode::Triangles, Some(3)).unwrap();
        assert_eq!(program.patch_vertices(), None);
    }

    #[test]
    fn test_unset_uniform_is_named() {
        let (_, mut program) = linked(DrawMode::Triangles);
        program.set_uniform("u_scale", 1.0_f32).unwrap();
        program
            .set_attribute("a_position", vec![Vec3::ZERO; 3])
            .unwrap();
        assert_eq!(
            program.validate_data(),
            Err(ValidationError::UnsetUniform("u_color".into()).into())
        );
    }

    #[test]
    fn test_uniform_type_is_checked() {
        let (_, mut program) = linked(DrawMode::Triangles);
        let result = program.set_uniform("u_color", 1.0_f32);
        assert!(matches!(
            result,
            Err(RenderError::Validation(ValidationError::TypeMismatch { ref name, .. })) if name == "u_color"
        ));
        assert!(matches!(
            program.set_uniform("u_missing", 1.0_f32),
            Err(RenderError::Validation(ValidationError::UnknownUniform(_)))
        ));
    }

    #[test]
    fn test_cached_uniform_slot() {
        let (probe, mut program) = linked(DrawMode::Triangles);
        let slot = program.uniform_slot("u_color").unwrap();
        program.set_uniform_at(slot, [0.5, 0.25, 1.0]).unwrap();
        assert!(program.uniform_slot("u_nothing").is_none());
        assert_eq!(
            probe.uniform(program.handle(), 1),
            Some(UniformValue::Vec3(Vec3::new(0.5, 0.25, 1.0)))
        );
    }

    #[test]
    fn test_update_requires_allocation() {
        let (probe, mut program) = linked(DrawMode::Triangles);
        let result = program.update_attribute("a_position", vec![Vec3::ONE], 0, None);
        assert!(matches!(
            result,
            Err(RenderError::Validation(ValidationError::AttributeNotAllocated(_)))
        ));

        program
            .set_attribute("a_position", vec![Vec3::ZERO; 4])
            .unwrap();
        program
            .update_attribute("a_position", vec![Vec3::ONE, Vec3::ONE], 1, Some(2))
            .unwrap();

        let bytes = probe.attribute_bytes(program.handle(), 0).unwrap();
        let values: &[Vec3] = bytemuck::cast_slice(&bytes);
        assert_eq!(values, &[Vec3::ZERO, Vec3::ONE, Vec3::ONE, Vec3::ZERO]);

        let result = program.update_attribute("a_position", vec![Vec3::ONE; 2], 3, None);
        assert!(matches!(
            result,
            Err(RenderError::Validation(ValidationError::UpdateOutOfRange { end: 5, .. }))
        ));
    }

    #[test]
    fn test_update_offset_overflow_is_rejected() {
        let (_, mut program) = linked(DrawMode::Triangles);
        program
            .set_attribute("a_position", vec![Vec3::ZERO; 4])
            .unwrap();
        let result = program.update_attribute("a_position", vec![Vec3::ONE], usize::MAX, None);
        assert!(matches!(
            result,
            Err(RenderError::Validation(ValidationError::UpdateOutOfRange {
                offset: usize::MAX,
                available: 4,
                ..
            }))
        ));
    }

    #[test]
    fn test_array_attribute_vertex_count() {
        let (_, backend) = headless();
        let stage = ShaderStageSpecification::new(ShaderStageType::Vertex, "")
            .with_attribute(ShaderAttribute::array("a_corner", DataType::Float, 3));
        let mut program =
            ShaderProgram::new(backend, &[stage], DrawMode::Triangles, None).unwrap();
        program
            .set_attribute_array("a_corner", &[[0.0_f32, 1.0, 2.0], [3.0, 4.0, 5.0]])
            .unwrap();
        assert_eq!(program.vertex_count(), Some(2));
        program.validate_data().unwrap();

        program.set_attribute("a_corner", vec![0.0_f32; 4]).unwrap();
        assert!(matches!(
            program.validate_data(),
            Err(RenderError::Validation(ValidationError::AttributeArrayLength { .. }))
        ));
    }

    #[test]
    fn test_array_width_must_match_declaration() {
        let (probe, backend) = headless();
        let stage = ShaderStageSpecification::new(ShaderStageType::Vertex, "")
            .with_attribute(ShaderAttribute::array("a_corner", DataType::Float, 3));
        let mut program =
            ShaderProgram::new(backend, &[stage], DrawMode::Triangles, None).unwrap();

        let result = program.set_attribute_array("a_corner", &[[0.0_f32, 1.0]; 6]);
        assert_eq!(
            result,
            Err(ValidationError::ArrayWidthMismatch {
                name: "a_corner".into(),
                declared: 3,
                given: 2,
            }
            .into())
        );
        assert_eq!(program.vertex_count(), None);
        assert!(probe.attribute_bytes(program.handle(), 0).is_none());

        program
            .set_attribute_array("a_corner", &[[0.0_f32; 3]; 2])
            .unwrap();
        let result = program.update_attribute_array("a_corner", &[[1.0_f32; 4]], 0, None);
        assert!(matches!(
            result,
            Err(RenderError::Validation(ValidationError::ArrayWidthMismatch { given: 4, .. }))
        ));
    }

    #[test]
    fn test_index_rules_follow_draw_mode() {
        let (_, mut program) = linked(DrawMode::Triangles);
        assert_eq!(
            program.set_index(&[0, 1, 2]),
            Err(ValidationError::IndexNotUsed(DrawMode::Triangles).into())
        );

        let (_, mut program) = linked_with_data(DrawMode::IndexedTriangles);
        assert_eq!(
            program.set_primitive_restart_index(u32::MAX),
            Err(ValidationError::RestartNotSupported(DrawMode::IndexedTriangles).into())
        );
        assert_eq!(
            program.validate_data(),
            Err(ValidationError::MissingIndex(DrawMode::IndexedTriangles).into())
        );
    }

    fn linked_with_data(mode: DrawMode) -> (crate::backend::HeadlessBackend, ShaderProgram) {
        let (probe, mut program) = linked(mode);
        program.set_uniform("u_scale", 1.0_f32).unwrap();
        program.set_uniform("u_color", Vec3::ONE).unwrap();
        program
            .set_attribute("a_position", vec![Vec3::ZERO; 4])
            .unwrap();
        (probe, program)
    }

    #[test]
    fn test_restart_index_is_exempt_from_range_check() {
        let (_, mut program) = linked_with_data(DrawMode::IndexedLineStrip);
        program.set_index(&[0, 1, u32::MAX, 2, 3]).unwrap();
        assert!(matches!(
            program.validate_data(),
            Err(RenderError::Validation(ValidationError::IndexOutOfRange { position: 2, .. }))
        ));
        program.set_primitive_restart_index(u32::MAX).unwrap();
        program.validate_data().unwrap();
    }

    #[test]
    fn test_texture_dimension_is_checked() {
        let (_, backend) = headless();
        let stage = ShaderStageSpecification::new(ShaderStageType::Fragment, "")
            .with_texture(ShaderTexture::new("t_colormap", 1));
        let mut program =
            ShaderProgram::new(backend.clone(), &[stage], DrawMode::Triangles, None).unwrap();
        let image = shared(
            TextureBuffer::new(backend.clone(), TextureDescriptor::new_2d(TextureFormat::Rgba8, 2, 2))
                .unwrap(),
        );
        assert!(matches!(
            program.set_texture("t_colormap", &image),
            Err(RenderError::Validation(ValidationError::TextureDimensionMismatch { .. }))
        ));
        assert_eq!(
            program.validate_data(),
            Err(ValidationError::UnsetTexture("t_colormap".into()).into())
        );

        let colormap = shared(
            TextureBuffer::new(backend, TextureDescriptor::new_1d(TextureFormat::Rgb8, 16)).unwrap(),
        );
        program.set_texture("t_colormap", &colormap).unwrap();
        program.validate_data().unwrap();
        assert!(Rc::ptr_eq(&program.texture_buffer("t_colormap").unwrap(), &colormap));
    }

    #[test]
    fn test_draw_without_bound_frame_buffer() {
        let (_, program) = linked_with_data(DrawMode::Triangles);
        assert_eq!(program.draw(), Err(RenderError::NotBound));
    }
}
