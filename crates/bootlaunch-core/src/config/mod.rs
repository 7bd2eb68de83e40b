//! bootlaunch configuration layer
//!
//! All environment variable reads are centralised here. Startup builds a
//! [`ConfigSource`] once, turns it into a [`LauncherConfig`], and every
//! component receives that value instead of calling `std::env::var`.
//!
//! - `loader`: `ConfigSource` with `env_or` / `env_optional` / `env_bool` helpers and `.env` parsing
//! - `schema`: `LauncherConfig`, `TimeoutConfig`, `ObservabilityConfig`, `ToolPreference`
//! - `env_keys`: key constants

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{parse_dotenv, ConfigSource};
pub use schema::{LauncherConfig, ObservabilityConfig, TimeoutConfig, ToolPreference};
