//! Backend abstraction layer
//!
//! Provides the trait a concrete graphics API implements, the descriptor
//! types passed across it, and a CPU-memory headless implementation.

pub mod traits;
pub mod types;

#[cfg(feature = "headless")]
pub mod headless;

use std::cell::RefCell;
use std::rc::Rc;

pub use traits::*;
pub use types::*;

#[cfg(feature = "headless")]
pub use headless::{DrawRecord, HeadlessBackend};

/// Backend shared by the engine and every resource it created
pub(crate) type BackendRef = Rc<RefCell<dyn RenderBackend>>;
