//! Descriptor types shared between the resource layer and backends

use crate::backend::traits::{RenderBufferHandle, TextureHandle};

/// Shape of a value bound to a shader slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Vector2Float,
    Vector3Float,
    Vector4Float,
    Matrix44Float,
    Float,
    Int,
    UInt,
    Index,
}

impl DataType {
    /// Number of scalar components in one element
    pub fn components(&self) -> usize {
        match self {
            DataType::Float | DataType::Int | DataType::UInt | DataType::Index => 1,
            DataType::Vector2Float => 2,
            DataType::Vector3Float => 3,
            DataType::Vector4Float => 4,
            DataType::Matrix44Float => 16,
        }
    }

    /// Size in bytes of one element (all scalars are 32-bit)
    pub fn size_bytes(&self) -> usize {
        self.components() * 4
    }

    /// Whether a value tagged `self` may be stored in a slot declared as `declared`.
    ///
    /// `UInt` and `Index` share a representation and are interchangeable.
    pub fn is_compatible_with(&self, declared: DataType) -> bool {
        match (self, declared) {
            (DataType::UInt, DataType::Index) | (DataType::Index, DataType::UInt) => true,
            (a, b) => *a == b,
        }
    }
}

/// How vertices assemble into primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Points,
    LinesAdjacency,
    Triangles,
    TrianglesAdjacency,
    Patches,
    IndexedTriangles,
    Lines,
    IndexedLines,
    IndexedLineStrip,
    IndexedLinesAdjacency,
    IndexedLineStripAdjacency,
}

impl DrawMode {
    /// Whether draws in this mode consume an index buffer
    pub fn is_indexed(&self) -> bool {
        matches!(
            self,
            DrawMode::IndexedTriangles
                | DrawMode::IndexedLines
                | DrawMode::IndexedLineStrip
                | DrawMode::IndexedLinesAdjacency
                | DrawMode::IndexedLineStripAdjacency
        )
    }

    /// Whether this mode accepts a primitive restart index
    pub fn supports_primitive_restart(&self) -> bool {
        matches!(
            self,
            DrawMode::IndexedLineStrip | DrawMode::IndexedLineStripAdjacency
        )
    }
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Texel format of a texture buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgb8,
    Rgba8,
    Rgba32Float,
    Rgb32Float,
    R32Float,
}

impl TextureFormat {
    pub fn channels(&self) -> usize {
        match self {
            TextureFormat::R32Float => 1,
            TextureFormat::Rgb8 | TextureFormat::Rgb32Float => 3,
            TextureFormat::Rgba8 | TextureFormat::Rgba32Float => 4,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            TextureFormat::Rgba32Float | TextureFormat::Rgb32Float | TextureFormat::R32Float
        )
    }

    /// Bytes per channel
    pub fn channel_size(&self) -> usize {
        if self.is_float() {
            4
        } else {
            1
        }
    }

    pub fn bytes_per_texel(&self) -> usize {
        self.channels() * self.channel_size()
    }
}

/// Storage kind of a render buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderBufferType {
    Color,
    ColorAlpha,
    Depth,
    Float4,
}

impl RenderBufferType {
    pub fn is_depth(&self) -> bool {
        matches!(self, RenderBufferType::Depth)
    }
}

bitflags::bitflags! {
    /// Options for 2D texture uploads.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUploadFlags: u32 {
        /// Source data carries an alpha channel (8-bit formats only).
        const WITH_ALPHA = 1 << 0;
        /// Generate a mip chain after upload.
        const MIPMAP = 1 << 1;
        /// Wrap with repeat instead of clamping to edge.
        const REPEAT = 1 << 2;
    }
}

impl Default for TextureUploadFlags {
    fn default() -> Self {
        TextureUploadFlags::WITH_ALPHA
    }
}

/// Native texture allocation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub format: TextureFormat,
    pub width: u32,
    /// Always 1 for 1D textures
    pub height: u32,
    /// 1 or 2
    pub dimension: u32,
}

impl TextureDescriptor {
    pub fn new_1d(format: TextureFormat, length: u32) -> Self {
        Self {
            format,
            width: length,
            height: 1,
            dimension: 1,
        }
    }

    pub fn new_2d(format: TextureFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
            dimension: 2,
        }
    }

    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn byte_size(&self) -> usize {
        self.texel_count() * self.format.bytes_per_texel()
    }
}

/// Role of an attachment within a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentRole {
    Color,
    Depth,
}

/// Native resource attached to a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentTarget {
    Texture(TextureHandle),
    RenderBuffer(RenderBufferHandle),
}

/// Sub-rectangle of the render target used by draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Fully resolved draw submitted to a backend after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub mode: DrawMode,
    /// Vertices for plain draws, indices for indexed draws
    pub element_count: u32,
    pub indexed: bool,
    pub primitive_restart: Option<u32>,
    pub patch_vertices: Option<u32>,
    /// Texture bound to each sampler unit, in unit order
    pub textures: Vec<TextureHandle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_sizes() {
        assert_eq!(DataType::Vector3Float.size_bytes(), 12);
        assert_eq!(DataType::Matrix44Float.components(), 16);
        assert_eq!(DataType::Index.size_bytes(), 4);
    }

    #[test]
    fn test_index_and_uint_are_interchangeable() {
        assert!(DataType::UInt.is_compatible_with(DataType::Index));
        assert!(DataType::Index.is_compatible_with(DataType::UInt));
        assert!(!DataType::Int.is_compatible_with(DataType::UInt));
    }

    #[test]
    fn test_draw_mode_classification() {
        assert!(DrawMode::IndexedTriangles.is_indexed());
        assert!(!DrawMode::Triangles.is_indexed());
        assert!(DrawMode::IndexedLineStripAdjacency.supports_primitive_restart());
        assert!(!DrawMode::IndexedLines.supports_primitive_restart());
    }

    #[test]
    fn test_texture_format_sizes() {
        assert_eq!(TextureFormat::Rgb8.bytes_per_texel(), 3);
        assert_eq!(TextureFormat::Rgba32Float.bytes_per_texel(), 16);
        assert_eq!(TextureFormat::R32Float.bytes_per_texel(), 4);
        assert_eq!(
            TextureDescriptor::new_2d(TextureFormat::Rgba8, 4, 2).byte_size(),
            32
        );
    }

    #[test]
    fn test_default_upload_flags() {
        let flags = TextureUploadFlags::default();
        assert!(flags.contains(TextureUploadFlags::WITH_ALPHA));
        assert!(!flags.contains(TextureUploadFlags::MIPMAP));
    }
}
