/// TOML configuration (`docqa.toml`).
pub mod toml_config;
