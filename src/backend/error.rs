// Bootstrap errors
//
// One variant per way the forward sequence can stop. Teardown never
// produces one of these.

use ash::vk;
use thiserror::Error;

/// Errors raised while bringing the Vulkan backend up
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// A requested validation layer is not installed
    #[error("validation layers requested, but not available: {missing:?}")]
    LayerUnsupported {
        /// Layers the driver did not report
        missing: Vec<String>,
    },

    /// A required instance extension is not exposed by the driver
    #[error("required instance extensions are not supported: {missing:?}")]
    ExtensionUnsupported {
        /// Extensions the driver did not report
        missing: Vec<String>,
    },

    /// Loading Vulkan or creating the instance failed
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// A debug-utils entry point could not be resolved from the instance
    #[error("extension entry point not present: {0}")]
    ExtensionNotPresent(&'static str),

    /// The window surface was rejected
    #[error("failed to create window surface: {0}")]
    SurfaceCreation(vk::Result),

    /// No enumerated GPU exposes both graphics and present queues
    #[error("failed to find a suitable GPU")]
    NoSuitableDevice,

    /// The logical device was rejected
    #[error("failed to create logical device: {0}")]
    DeviceCreation(vk::Result),
}

/// Result type for bootstrap operations
pub type BootstrapResult<T> = Result<T, BootstrapError>;
