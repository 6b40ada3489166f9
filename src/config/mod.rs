//! Configuration module for Game Runner.
//!
//! This module handles parsing, validation, and access to the orchestrator's
//! settings: where instance directories and the registry snapshot live, how
//! often reconciliation runs, how the Minecraft template launches its server,
//! and how the HTTP API is exposed.
//!
//! # Examples
//!
//! Loading a configuration from a file:
//!
//! ```no_run
//! use game_runner::config::{Config, validate_config};
//!
//! let config = Config::from_file("config.json").unwrap();
//! validate_config(&config).unwrap();
//! println!("Servers live under {}", config.servers_dir.display());
//! ```
//!
//! Creating a configuration programmatically:
//!
//! ```
//! use game_runner::config::Config;
//!
//! let config = Config {
//!     servers_dir: "/srv/games".into(),
//!     state_file: "/srv/games/servers.json".into(),
//!     ..Config::default()
//! };
//! assert_eq!(config.minecraft.stop_timeout_secs, 15);
//! ```
mod parser;
pub mod validator;

pub use parser::{
    AuthConfig, BearerAuthConfig, Config, DEFAULT_MINECRAFT_DOWNLOAD_URL, DEFAULT_WORKERS,
    HttpConfig, MinecraftConfig,
};
pub use validator::validate_config;
