extern crate self as karai_core;

pub mod log;
pub mod panic;
pub mod scope;
pub mod signals;
