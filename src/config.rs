//! Configuration management for the accessory-state service.
//!
//! This module handles loading and saving configuration from disk,
//! including the Bluetooth adapter selection and polling intervals.

use std::{env, fs, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::{AccessoryError, Result};

/// Main configuration structure for the service.
#[derive(Serialize, Deserialize, Clone)]
pub struct Config {
   /// Bluetooth adapter to watch; the first available adapter when unset.
   #[serde(default)]
   pub adapter: Option<SmolStr>,

   /// Directory holding the kernel extcon connectors.
   #[serde(default = "default_extcon_dir")]
   pub extcon_dir: PathBuf,

   #[serde(default = "default_wired_poll_ms")]
   pub wired_poll_ms: u64,

   #[serde(default = "default_bluetooth_check_secs")]
   pub bluetooth_check_secs: u64,
}

fn default_extcon_dir() -> PathBuf {
   PathBuf::from("/sys/class/extcon")
}

const fn default_wired_poll_ms() -> u64 {
   500
}

const fn default_bluetooth_check_secs() -> u64 {
   5
}

impl Default for Config {
   fn default() -> Self {
      Self {
         adapter: None,
         extcon_dir: default_extcon_dir(),
         wired_poll_ms: default_wired_poll_ms(),
         bluetooth_check_secs: default_bluetooth_check_secs(),
      }
   }
}

impl Config {
   /// Loads configuration from disk or creates default if not exists.
   pub fn load() -> Result<Self> {
      let config_path = Self::config_path()?;

      if config_path.exists() {
         let contents = fs::read_to_string(&config_path)?;
         Ok(toml::from_str(&contents)?)
      } else {
         // Create default config
         let config = Self::default();
         config.save()?;
         Ok(config)
      }
   }

   /// Saves the current configuration to disk.
   pub fn save(&self) -> Result<()> {
      let config_path = Self::config_path()?;

      // Ensure directory exists
      if let Some(parent) = config_path.parent() {
         fs::create_dir_all(parent)?;
      }

      let contents = toml::to_string_pretty(self)?;
      fs::write(&config_path, contents)?;

      Ok(())
   }

   fn config_path() -> Result<PathBuf> {
      let config_dir = if let Ok(headsetd_home) = env::var("HEADSETD_HOME") {
         PathBuf::from(headsetd_home)
      } else if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
         PathBuf::from(config_home)
      } else if let Ok(home) = env::var("HOME") {
         PathBuf::from(home).join(".config")
      } else {
         return Err(AccessoryError::ConfigDirNotFound);
      };

      Ok(config_dir.join("headsetd").join("config.toml"))
   }

   pub const fn wired_poll_interval(&self) -> Duration {
      Duration::from_millis(self.wired_poll_ms)
   }

   pub const fn bluetooth_check_interval(&self) -> Duration {
      Duration::from_secs(self.bluetooth_check_secs)
   }
}
