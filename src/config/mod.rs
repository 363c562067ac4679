//! Project configuration (`.bpsecrets.toml`).

pub mod settings;

pub use settings::Settings;
