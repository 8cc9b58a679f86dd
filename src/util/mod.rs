//! Utility modules

pub mod frame;
pub mod time;
