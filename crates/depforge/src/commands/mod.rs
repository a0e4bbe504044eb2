//! CLI command implementations

pub mod compilers;
pub mod history;
pub mod libs;
pub mod tools;
