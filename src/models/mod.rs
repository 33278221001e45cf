//! Data model shared across the control plane

pub mod deployment;

pub use deployment::{Deployment, DeploymentStatus, SourceSpec};
