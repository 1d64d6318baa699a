//! Error types for the accessory-state service.
//!
//! This module defines all error types that can occur during the operation
//! of the service, including Bluetooth, D-Bus, I/O, and configuration
//! errors.

use thiserror::Error;

/// Main error type for the accessory-state service.
#[derive(Error, Debug)]
pub enum AccessoryError {
   #[error("Bluetooth error: {0}")]
   Bluetooth(#[from] bluer::Error),

   #[error("D-Bus error: {0}")]
   DBus(#[from] zbus::Error),

   #[error("D-Bus connection error: {0}")]
   DBusConnection(#[from] zbus::fdo::Error),

   #[error("I/O error: {0}")]
   Io(#[from] std::io::Error),

   #[error("Device enumeration not supported on this system")]
   EnumerationUnsupported,

   #[error("Could not determine config directory")]
   ConfigDirNotFound,

   #[error("TOML parsing error: {0}")]
   TomlParse(#[from] toml::de::Error),

   #[error("TOML serialization error: {0}")]
   TomlSerialize(#[from] toml::ser::Error),

   #[error("Monitor has been shut down")]
   MonitorShutdown,
}

/// Convenience type alias for Results with `AccessoryError`.
pub type Result<T> = std::result::Result<T, AccessoryError>;
