//! Image stream tag references and their resolution

pub mod reference;
pub mod resolve;

pub use reference::{DockerImageReference, split_stream_tag};
pub use resolve::{ResolutionMode, TagReferenceError};
