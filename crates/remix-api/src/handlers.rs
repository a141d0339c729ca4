//! Request handlers.

pub mod health;
pub mod remix;

pub use health::*;
pub use remix::*;
