//! Task lifecycle and notification types.

pub mod notification;
pub mod state;

pub use notification::*;
pub use state::*;
