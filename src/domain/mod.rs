pub mod config;
pub mod ports;
pub mod profile;
pub mod transfer;
