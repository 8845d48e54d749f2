// Library surface: the session engine and quota enforcer are usable
// without the binary, and the integration tests drive them headless.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod problem;
pub mod quota;
pub mod result;
pub mod runtime;
pub mod session;
pub mod text;
