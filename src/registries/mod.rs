//! Registry configuration files handed to image build tools

pub mod conf;
pub mod docker_config;
pub mod mirrors;
