pub mod config;
pub mod receipt;
pub mod state;
pub mod upload;
