//! Route handlers for the control surface.

pub mod frames;
pub mod health;
pub mod save;
pub mod status;
pub mod tools;
