// Vulkan Instance - the top-level driver context
//
// Responsibilities:
// - Refuse to create when requested layers or required extensions are missing
// - Chain the debug messenger create info so creation itself is validated
// - Destroy the instance (always last)

use ash::vk;
use std::ffi::CString;

use super::driver::{Driver, InstanceDescriptor};
use super::negotiate::Negotiator;
use super::{BootstrapError, BootstrapResult};

/// Application identity reported to the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    pub name: CString,
    pub version: u32,
    pub engine_name: CString,
    pub engine_version: u32,
    pub api_version: u32,
}

impl Default for ApplicationInfo {
    fn default() -> Self {
        Self {
            name: CString::from(c"Hello Triangle"),
            version: vk::make_api_version(0, 1, 0, 0),
            engine_name: CString::from(c"No Engine"),
            engine_version: vk::make_api_version(0, 1, 0, 0),
            api_version: vk::API_VERSION_1_0,
        }
    }
}

/// Inputs fixed before the instance exists
pub struct InstanceRequest<'a> {
    pub application: &'a ApplicationInfo,
    pub extensions: &'a [CString],
    /// Empty when diagnostics are off
    pub layers: &'a [CString],
    pub debug_messenger: Option<vk::DebugUtilsMessengerCreateInfoEXT>,
}

/// Create the instance after checking the negotiated support
///
/// Both checks happen before the driver is asked for anything, so a
/// missing layer or extension never reaches `vkCreateInstance`.
pub fn create_instance<D: Driver>(
    driver: &mut D,
    negotiator: &Negotiator,
    request: &InstanceRequest,
) -> BootstrapResult<vk::Instance> {
    log::info!(
        "Creating Vulkan instance: {}",
        request.application.name.to_string_lossy()
    );

    if !negotiator.check_support(request.layers) {
        return Err(BootstrapError::LayerUnsupported {
            missing: negotiator.missing_layers(request.layers),
        });
    }

    log::debug!("Available extensions:");
    for extension in negotiator.available_extensions() {
        log::debug!("  {}", extension);
    }

    let missing = negotiator.missing_extensions(request.extensions);
    if !missing.is_empty() {
        return Err(BootstrapError::ExtensionUnsupported { missing });
    }
    log::info!("All required extensions are available.");

    let desc = InstanceDescriptor {
        application: request.application,
        extensions: request.extensions,
        layers: request.layers,
        debug_messenger: request.debug_messenger,
    };

    let instance = driver.create_instance(&desc).map_err(|e| {
        BootstrapError::Initialization(format!("Failed to create Vulkan instance: {}", e))
    })?;

    for layer in request.layers {
        log::info!("Enabled layer: {}", layer.to_string_lossy());
    }
    Ok(instance)
}

pub fn destroy_instance<D: Driver>(driver: &mut D, instance: vk::Instance) {
    log::info!("Destroying Vulkan instance...");
    driver.destroy_instance(instance);
}
