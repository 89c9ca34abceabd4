//! Backend abstraction layer
//!
//! Provides the allocation capability the frame graph realizes resources
//! through, plus a dummy implementation that needs no GPU.

pub mod dummy;
pub mod traits;
pub mod types;

pub use dummy::DummyBackend;
pub use traits::*;
pub use types::*;
