//! Core traits for dependency injection.

pub mod dispose;
pub mod resolver;
pub mod service;

pub use dispose::*;
pub use resolver::*;
pub use service::*;
