//! Docker runtime adapter.
//!
//! The only module that talks to the container runtime. Everything goes
//! through the local `docker` CLI via `tokio::process`, so no other module
//! needs to know how containers are created, started, or removed.

mod builder;
mod cli;
mod server;

pub use builder::BuildContainerSpec;
pub use cli::DockerClient;
pub use server::{traefik_labels, ServerContainerSpec};
