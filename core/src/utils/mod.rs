// core/src/utils/mod.rs
pub mod logging;
pub mod models;

pub const DEFAULT_CONFIG_FILE: &str = "default.json";
pub const DEFAULT_SOCK_PATH: &str = "/tmp/warden.sock";
