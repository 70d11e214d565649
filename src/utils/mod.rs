/// Bounded retry with timeouts for provider calls.
pub mod retry;
/// TOML-based application configuration.
pub mod toml_config;
