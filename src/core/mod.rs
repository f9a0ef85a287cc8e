pub mod engine;
pub mod error;
pub mod probe;
pub mod psychrochart;
pub mod psychrolib;
pub mod renderer;
pub mod request;
