//! Typed payloads for uniform and attribute slots.
//!
//! Each payload carries a runtime [`DataType`] tag that is checked against the
//! declared slot type before anything reaches the backend.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::backend::types::DataType;

/// A single uniform value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    UInt(u32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn data_type(&self) -> DataType {
        match self {
            UniformValue::Int(_) => DataType::Int,
            UniformValue::UInt(_) => DataType::UInt,
            UniformValue::Float(_) => DataType::Float,
            UniformValue::Vec2(_) => DataType::Vector2Float,
            UniformValue::Vec3(_) => DataType::Vector3Float,
            UniformValue::Vec4(_) => DataType::Vector4Float,
            UniformValue::Mat4(_) => DataType::Matrix44Float,
        }
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        UniformValue::UInt(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

/// Narrows to `f32`. Values outside the `f32` range or needing more than 24
/// bits of mantissa lose precision; this is intended.
impl From<f64> for UniformValue {
    fn from(v: f64) -> Self {
        UniformValue::Float(v as f32)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        UniformValue::Vec3(Vec3::from_array(v))
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        UniformValue::Vec4(Vec4::from_array(v))
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

/// Column-major 4x4 matrix
impl From<[f32; 16]> for UniformValue {
    fn from(v: [f32; 16]) -> Self {
        UniformValue::Mat4(Mat4::from_cols_array(&v))
    }
}

/// Flat per-vertex attribute data
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    Vec2(Vec<Vec2>),
    Vec3(Vec<Vec3>),
    Vec4(Vec<Vec4>),
    Float(Vec<f32>),
    Int(Vec<i32>),
    UInt(Vec<u32>),
}

impl AttributeData {
    pub fn data_type(&self) -> DataType {
        match self {
            AttributeData::Vec2(_) => DataType::Vector2Float,
            AttributeData::Vec3(_) => DataType::Vector3Float,
            AttributeData::Vec4(_) => DataType::Vector4Float,
            AttributeData::Float(_) => DataType::Float,
            AttributeData::Int(_) => DataType::Int,
            AttributeData::UInt(_) => DataType::UInt,
        }
    }

    /// Number of elements (not scalars)
    pub fn len(&self) -> usize {
        match self {
            AttributeData::Vec2(d) => d.len(),
            AttributeData::Vec3(d) => d.len(),
            AttributeData::Vec4(d) => d.len(),
            AttributeData::Float(d) => d.len(),
            AttributeData::Int(d) => d.len(),
            AttributeData::UInt(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tightly packed bytes of the whole payload
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            AttributeData::Vec2(d) => bytemuck::cast_slice(d),
            AttributeData::Vec3(d) => bytemuck::cast_slice(d),
            AttributeData::Vec4(d) => bytemuck::cast_slice(d),
            AttributeData::Float(d) => bytemuck::cast_slice(d),
            AttributeData::Int(d) => bytemuck::cast_slice(d),
            AttributeData::UInt(d) => bytemuck::cast_slice(d),
        }
    }
}

macro_rules! attribute_from {
    ($ty:ty, $variant:ident) => {
        impl From<Vec<$ty>> for AttributeData {
            fn from(v: Vec<$ty>) -> Self {
                AttributeData::$variant(v)
            }
        }

        impl From<&[$ty]> for AttributeData {
            fn from(v: &[$ty]) -> Self {
                AttributeData::$variant(v.to_vec())
            }
        }
    };
}

attribute_from!(Vec2, Vec2);
attribute_from!(Vec3, Vec3);
attribute_from!(Vec4, Vec4);
attribute_from!(f32, Float);
attribute_from!(i32, Int);
attribute_from!(u32, UInt);

/// Narrows every element to `f32`, like the `f64` uniform conversion.
impl From<Vec<f64>> for AttributeData {
    fn from(v: Vec<f64>) -> Self {
        AttributeData::Float(v.into_iter().map(|x| x as f32).collect())
    }
}

impl From<&[f64]> for AttributeData {
    fn from(v: &[f64]) -> Self {
        AttributeData::Float(v.iter().map(|&x| x as f32).collect())
    }
}
