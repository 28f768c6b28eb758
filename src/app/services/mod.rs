pub mod profile_service;
pub mod transfer_service;
