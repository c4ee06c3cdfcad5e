pub mod access_guard;
pub mod config_loader;
pub mod session_store;
pub mod submission_client;
pub mod submission_state;
