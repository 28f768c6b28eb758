pub mod archive;
pub mod config_store;
pub mod crypto;
pub mod profile_store;
pub mod ssh;
