//! Error types for the resource layer.

use thiserror::Error;

use crate::backend::traits::BackendError;
use crate::backend::types::{AttachmentRole, DataType, DrawMode, RenderBufferType};

/// Programmer errors caught before anything reaches the backend.
///
/// Every slot-related variant names the offending slot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("shader program needs at least one stage")]
    NoStages,
    #[error("`{name}` is declared as {first} and as {second}")]
    SlotConflict {
        name: String,
        first: String,
        second: String,
    },
    #[error("draw mode Patches requires a positive patch vertex count")]
    MissingPatchVertices,
    #[error("no uniform named `{0}`")]
    UnknownUniform(String),
    #[error("no attribute named `{0}`")]
    UnknownAttribute(String),
    #[error("no texture named `{0}`")]
    UnknownTexture(String),
    #[error("`{name}` is declared as {declared:?} but was given {given:?}")]
    TypeMismatch {
        name: String,
        declared: DataType,
        given: DataType,
    },
    #[error("texture `{name}` samples {declared}D but was given a {given}D texture")]
    TextureDimensionMismatch {
        name: String,
        declared: u32,
        given: u32,
    },
    #[error("uniform `{0}` was never set")]
    UnsetUniform(String),
    #[error("texture `{0}` was never set")]
    UnsetTexture(String),
    #[error("attribute `{0}` was never set")]
    UnsetAttribute(String),
    #[error("attribute `{name}` has {len} elements, not a multiple of its array count {array_count}")]
    AttributeArrayLength {
        name: String,
        len: usize,
        array_count: u32,
    },
    #[error("attribute `{name}` has {count} vertices but `{reference}` has {expected}")]
    AttributeSizeMismatch {
        name: String,
        count: usize,
        reference: String,
        expected: usize,
    },
    #[error("attribute `{name}` holds arrays of {declared} elements but was given arrays of {given}")]
    ArrayWidthMismatch {
        name: String,
        declared: u32,
        given: usize,
    },
    #[error("attribute `{0}` must be allocated before it can be updated")]
    AttributeNotAllocated(String),
    #[error("update of attribute `{name}` covers [{offset}, {end}) but {available} elements are available")]
    UpdateOutOfRange {
        name: String,
        offset: usize,
        end: usize,
        available: usize,
    },
    #[error("draw mode {0:?} does not use an index buffer")]
    IndexNotUsed(DrawMode),
    #[error("draw mode {0:?} does not support primitive restart")]
    RestartNotSupported(DrawMode),
    #[error("draw mode {0:?} requires an index buffer")]
    MissingIndex(DrawMode),
    #[error("index {value} at position {position} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        value: u32,
        position: usize,
        vertex_count: usize,
    },
}

/// Errors surfaced by the resource layer and engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("frame buffer is not bound for rendering")]
    NotBound,
    #[error("frame buffer has no viewport")]
    ViewportNotSet,
    #[error("failed to bind {0} for rendering")]
    BindFailed(String),
    #[error("frame buffer has no color attachment")]
    MissingAttachment,
    #[error("attachment `{name}` cannot use a {buffer:?} render buffer as a {role:?} target")]
    AttachmentRoleMismatch {
        name: String,
        role: AttachmentRole,
        buffer: RenderBufferType,
    },
    #[error("{0} is borrowed elsewhere")]
    ResourceBusy(String),
    #[error("pixel ({x}, {y}) is outside the {width}x{height} target")]
    PixelOutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    #[error("expected a {expected}D texture, found {found}D")]
    DimensionMismatch { expected: u32, found: u32 },
    #[error("texture data has {given} texels, expected {expected}")]
    TextureSizeMismatch { given: usize, expected: usize },
    #[error("engine is not initialized")]
    NotInitialized,
    #[error("engine is already initialized")]
    AlreadyInitialized,
    #[error("rendering session was terminated by a fatal device error")]
    SessionTerminated,
}

pub type RenderResult<T> = Result<T, RenderError>;
