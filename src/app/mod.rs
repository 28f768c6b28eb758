pub mod context;
pub mod services;
