// Declare all modules as public so they can be used by the host shell and tests.
pub mod app;
pub mod config;
pub mod core;
pub mod utils;
