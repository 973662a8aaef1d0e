//! Shader stage descriptions and the program binding contract.
//!
//! A [`ShaderStageSpecification`] declares one programmable stage: its source
//! text (opaque to this crate) and the uniforms, attributes and textures it
//! consumes. A [`ShaderProgram`] links one or more stages and merges their
//! declarations into named slots that must be satisfied before drawing.
//!
//! # Example
//!
//! ```ignore
//! let vertex = ShaderStageSpecification::new(ShaderStageType::Vertex, VERT_SRC)
//!     .with_attribute(ShaderAttribute::new("a_position", DataType::Vector3Float))
//!     .with_uniform(ShaderUniform::new("u_viewProj", DataType::Matrix44Float));
//! let fragment = ShaderStageSpecification::new(ShaderStageType::Fragment, FRAG_SRC)
//!     .with_uniform(ShaderUniform::new("u_color", DataType::Vector3Float))
//!     .with_output_loc("outputF");
//!
//! let program = engine.generate_shader_program(&[vertex, fragment], DrawMode::Triangles, None)?;
//! ```

pub mod library;
pub mod program;
pub mod values;

use crate::backend::types::DataType;

pub use program::{ShaderProgram, UniformSlot};
pub use values::{AttributeData, UniformValue};

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStageType {
    Vertex,
    /// Tessellation control
    Tessellation,
    /// Tessellation evaluation
    Evaluation,
    Geometry,
    Fragment,
}

/// Uniform declared by a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderUniform {
    pub name: String,
    pub data_type: DataType,
}

impl ShaderUniform {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Per-vertex input declared by a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderAttribute {
    pub name: String,
    pub data_type: DataType,
    /// Number of times the element repeats per vertex (`in vec3 v[3]` has 3)
    pub array_count: u32,
}

impl ShaderAttribute {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self::array(name, data_type, 1)
    }

    pub fn array(name: impl Into<String>, data_type: DataType, array_count: u32) -> Self {
        Self {
            name: name.into(),
            data_type,
            array_count,
        }
    }
}

/// Sampled texture declared by a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderTexture {
    pub name: String,
    /// Sampler dimensionality (1 or 2)
    pub dimension: u32,
}

impl ShaderTexture {
    pub fn new(name: impl Into<String>, dimension: u32) -> Self {
        Self {
            name: name.into(),
            dimension,
        }
    }
}

/// Immutable description of one programmable stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStageSpecification {
    pub stage: ShaderStageType,
    pub uniforms: Vec<ShaderUniform>,
    pub attributes: Vec<ShaderAttribute>,
    pub textures: Vec<ShaderTexture>,
    /// Name of the output binding (fragment stages)
    pub output_loc: String,
    pub src: String,
}

impl ShaderStageSpecification {
    pub fn new(stage: ShaderStageType, src: impl Into<String>) -> Self {
        Self {
            stage,
            uniforms: Vec::new(),
            attributes: Vec::new(),
            textures: Vec::new(),
            output_loc: String::new(),
            src: src.into(),
        }
    }

    pub fn with_uniform(mut self, uniform: ShaderUniform) -> Self {
        self.uniforms.push(uniform);
        self
    }

    pub fn with_attribute(mut self, attribute: ShaderAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_texture(mut self, texture: ShaderTexture) -> Self {
        self.textures.push(texture);
        self
    }

    pub fn with_output_loc(mut self, output_loc: impl Into<String>) -> Self {
        self.output_loc = output_loc.into();
        self
    }
}
