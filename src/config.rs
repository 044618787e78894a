// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// This module handles loading and parsing configuration from config.toml.
// Provides sensible defaults if config file is missing or has errors.

use anyhow::{Context, Result};
use ash::vk;
use serde::Deserialize;
use std::ffi::CString;
use std::path::Path;

use crate::backend::debug::MessengerConfig;
use crate::backend::instance::ApplicationInfo;
use crate::backend::BootstrapOptions;

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub application: ApplicationConfig,
    pub debug: DebugConfig,
    pub device: DeviceConfig,
}

/// Window settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan".to_string(),
            width: 800,
            height: 600,
            resizable: false,
        }
    }
}

/// Identity reported to the driver at instance creation
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub name: String,
    pub version: [u32; 3],
    pub engine_name: String,
    pub engine_version: [u32; 3],
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "Hello Triangle".to_string(),
            version: [1, 0, 0],
            engine_name: "No Engine".to_string(),
            engine_version: [1, 0, 0],
        }
    }
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation_layers: bool,
    pub layers: Vec<String>,
    pub message_severity: Vec<String>,
    pub message_types: Vec<String>,
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: true,
            layers: vec!["VK_LAYER_KHRONOS_validation".to_string()],
            message_severity: vec![
                "verbose".to_string(),
                "warning".to_string(),
                "error".to_string(),
            ],
            message_types: vec![
                "general".to_string(),
                "validation".to_string(),
                "performance".to_string(),
            ],
            log_level: "info".to_string(),
        }
    }
}

/// Device settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Create the surface, pick a GPU and create the logical device
    pub enabled: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults if not found
    pub fn load() -> Self {
        Self::load_from_path("config.toml").unwrap_or_else(|e| {
            log::warn!("Failed to load config.toml: {}. Using defaults.", e);
            Config::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Get log level filter, defaulting to Info
    pub fn get_log_level(&self) -> log::LevelFilter {
        self.debug.log_level.parse().unwrap_or_else(|_| {
            log::warn!(
                "Unknown log level '{}', defaulting to info",
                self.debug.log_level
            );
            log::LevelFilter::Info
        })
    }

    /// Get messenger severity mask as Vulkan flags
    pub fn get_message_severity(&self) -> vk::DebugUtilsMessageSeverityFlagsEXT {
        self.debug
            .message_severity
            .iter()
            .fold(vk::DebugUtilsMessageSeverityFlagsEXT::empty(), |flags, name| {
                flags
                    | match name.to_lowercase().as_str() {
                        "verbose" => vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
                        "info" => vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
                        "warning" => vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
                        "error" => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                        _ => {
                            log::warn!("Unknown message severity '{}', ignoring", name);
                            vk::DebugUtilsMessageSeverityFlagsEXT::empty()
                        }
                    }
            })
    }

    /// Get messenger type mask as Vulkan flags
    pub fn get_message_types(&self) -> vk::DebugUtilsMessageTypeFlagsEXT {
        self.debug
            .message_types
            .iter()
            .fold(vk::DebugUtilsMessageTypeFlagsEXT::empty(), |flags, name| {
                flags
                    | match name.to_lowercase().as_str() {
                        "general" => vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
                        "validation" => vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                        "performance" => vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                        _ => {
                            log::warn!("Unknown message type '{}', ignoring", name);
                            vk::DebugUtilsMessageTypeFlagsEXT::empty()
                        }
                    }
            })
    }

    /// Everything the Vulkan bring-up needs, fixed for the whole run
    pub fn bootstrap_options(&self) -> Result<BootstrapOptions> {
        let app = &self.application;
        let [major, minor, patch] = app.version;
        let [engine_major, engine_minor, engine_patch] = app.engine_version;

        let application = ApplicationInfo {
            name: CString::new(app.name.as_str()).context("Application name contains a NUL byte")?,
            version: vk::make_api_version(0, major, minor, patch),
            engine_name: CString::new(app.engine_name.as_str())
                .context("Engine name contains a NUL byte")?,
            engine_version: vk::make_api_version(0, engine_major, engine_minor, engine_patch),
            api_version: vk::API_VERSION_1_0,
        };

        let validation_layers = self
            .debug
            .layers
            .iter()
            .map(|layer| {
                CString::new(layer.as_str())
                    .with_context(|| format!("Layer name contains a NUL byte: {:?}", layer))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(BootstrapOptions {
            application,
            diagnostics: self.debug.validation_layers,
            validation_layers,
            messenger: MessengerConfig {
                severity: self.get_message_severity(),
                types: self.get_message_types(),
            },
            presentation: self.device.enabled,
            device_features: vk::PhysicalDeviceFeatures::default(),
        })
    }
}
