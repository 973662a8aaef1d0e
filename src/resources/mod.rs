//! GPU-resident resources
//!
//! Textures, render buffers and frame buffers created by the
//! [`Engine`](crate::Engine) factories. Each resource owns exactly one native
//! object and releases it when dropped.

mod frame_buffer;
mod render_buffer;
mod texture;

use std::cell::RefCell;
use std::rc::Rc;

pub use frame_buffer::*;
pub use render_buffer::*;
pub use texture::*;

/// Shared, mutable handle to a resource.
///
/// Frame buffers and shader programs hold these to keep attached or sampled
/// resources alive, so a resource outlives every user that still refers to it.
pub type Shared<T> = Rc<RefCell<T>>;

pub(crate) fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}
