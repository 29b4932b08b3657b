//! obu: read build related settings out of an OpenShift cluster
//!
//! Every command reads existing API objects and prints fields in a form
//! build scripts can store as files, parameters or environment variables.

pub mod commands;
pub mod config;
pub mod image;
pub mod k8s;
pub mod registries;
pub mod utils;

pub use utils::errors::{ObuError, Result};
