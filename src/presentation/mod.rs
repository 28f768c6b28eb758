pub mod profiles;
pub mod send;
