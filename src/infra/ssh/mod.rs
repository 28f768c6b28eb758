pub mod auth;
pub mod client;
pub mod transfer;

pub use client::{CommandOutput, RemoteHost, SshClient};
