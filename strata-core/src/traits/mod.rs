//! Hardware abstraction traits
//!
//! These traits define the interface between the upload pipeline and
//! board-specific implementations.

pub mod display;
pub mod screen;
pub mod system;

pub use display::{DisplayDriver, DisplayError, RenderMode, Rotation, Size};
pub use screen::{ImageScreen, StripError};
pub use system::{Clock, MemoryStats};
