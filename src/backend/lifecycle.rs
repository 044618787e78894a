// Lifecycle - ordered bring-up and reverse teardown of every core handle
//
// Forward: negotiate -> instance -> [messenger] -> [surface -> GPU -> device]
// Teardown: exactly the reverse of whatever was reached, never faulting.

use ash::vk;
use std::ffi::CString;
use std::sync::Arc;

use super::debug::{messenger_create_info, DebugMessengerBridge, DiagnosticSink, MessengerConfig};
use super::device::{create_logical_device, destroy_logical_device, LogicalDevice};
use super::driver::Driver;
use super::instance::{create_instance, destroy_instance, ApplicationInfo, InstanceRequest};
use super::negotiate::{required_extensions, Negotiator};
use super::physical::{PhysicalDeviceSelector, SelectedDevice};
use super::surface::{create_surface, destroy_surface};
use super::window::WindowTarget;
use super::{BootstrapError, BootstrapResult};

/// How far the bring-up got
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Uninitialized,
    InstanceReady,
    MessengerReady,
    SurfaceReady,
    DeviceReady,
    Running,
    Terminal,
}

/// Fixed inputs to the bring-up
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub application: ApplicationInfo,
    /// Validation layers + debug messenger
    pub diagnostics: bool,
    pub validation_layers: Vec<CString>,
    pub messenger: MessengerConfig,
    /// Surface, GPU selection and logical device
    pub presentation: bool,
    pub device_features: vk::PhysicalDeviceFeatures,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            application: ApplicationInfo::default(),
            diagnostics: true,
            validation_layers: vec![CString::from(c"VK_LAYER_KHRONOS_validation")],
            messenger: MessengerConfig::default(),
            presentation: true,
            device_features: vk::PhysicalDeviceFeatures::default(),
        }
    }
}

/// Sole owner of the instance, messenger, surface and device
pub struct Lifecycle<D: Driver> {
    driver: D,
    options: BootstrapOptions,
    stage: Stage,
    // Outlives the instance: the chained messenger info points at it
    diagnostics: Arc<DiagnosticSink>,
    instance: Option<vk::Instance>,
    bridge: DebugMessengerBridge,
    messenger: Option<vk::DebugUtilsMessengerEXT>,
    surface: Option<vk::SurfaceKHR>,
    physical_device: Option<SelectedDevice>,
    device: Option<LogicalDevice>,
}

impl<D: Driver> Lifecycle<D> {
    pub fn new(driver: D, options: BootstrapOptions) -> Self {
        Self {
            driver,
            options,
            stage: Stage::Uninitialized,
            diagnostics: Arc::new(DiagnosticSink::new()),
            instance: None,
            bridge: DebugMessengerBridge::default(),
            messenger: None,
            surface: None,
            physical_device: None,
            device: None,
        }
    }

    /// Run the whole forward sequence
    ///
    /// On failure the partially initialized lifecycle is dropped, which tears
    /// down whatever was created, before the error is returned.
    pub fn bootstrap(
        driver: D,
        options: BootstrapOptions,
        target: Option<&WindowTarget>,
    ) -> BootstrapResult<Self> {
        let mut lifecycle = Self::new(driver, options);
        lifecycle.initialize(target)?;
        Ok(lifecycle)
    }

    /// Forward sequence; stops at the first failure, leaving the reached
    /// stages in place for `teardown`
    pub fn initialize(&mut self, target: Option<&WindowTarget>) -> BootstrapResult<()> {
        if self.stage != Stage::Uninitialized {
            return Err(BootstrapError::Initialization(format!(
                "bootstrap already ran (stage {:?})",
                self.stage
            )));
        }
        log::info!("Initializing Vulkan...");

        // Step 1: Negotiate layers and extensions
        let diagnostics = self.options.diagnostics;
        let layers = if diagnostics {
            self.options.validation_layers.clone()
        } else {
            Vec::new()
        };
        let negotiator = Negotiator::probe(&self.driver, &layers)?;
        let window_extensions = target.map(|t| t.required_extensions.as_slice()).unwrap_or(&[]);
        let extensions = required_extensions(window_extensions, diagnostics);

        // Step 2: Create instance
        let request = InstanceRequest {
            application: &self.options.application,
            extensions: &extensions,
            layers: &layers,
            debug_messenger: diagnostics
                .then(|| messenger_create_info(&self.diagnostics, &self.options.messenger)),
        };
        let instance = create_instance(&mut self.driver, &negotiator, &request)?;
        self.instance = Some(instance);
        self.stage = Stage::InstanceReady;

        // Step 3: Debug messenger if diagnostics enabled
        if diagnostics {
            self.bridge = DebugMessengerBridge::resolve(&self.driver, instance);
            let info = messenger_create_info(&self.diagnostics, &self.options.messenger);
            self.messenger = Some(self.bridge.setup(instance, &info)?);
            self.stage = Stage::MessengerReady;
        }

        let Some(target) = target.filter(|_| self.options.presentation) else {
            log::info!("Presentation disabled, Vulkan initialized without a device");
            return Ok(());
        };

        // Step 4: Surface
        let surface = create_surface(&mut self.driver, instance, target)?;
        self.surface = Some(surface);
        self.stage = Stage::SurfaceReady;

        // Step 5: Pick physical device (GPU)
        let selected = PhysicalDeviceSelector::new(&self.driver, instance, surface).select()?;

        // Step 6: Logical device + queues
        let device =
            create_logical_device(&mut self.driver, instance, &selected, self.options.device_features)?;
        self.physical_device = Some(selected);
        self.device = Some(device);
        self.stage = Stage::DeviceReady;

        log::info!("Vulkan initialized successfully!");
        Ok(())
    }

    /// Mark the backend as in use; no-op unless something was initialized
    pub fn start(&mut self) {
        if self.stage > Stage::Uninitialized && self.stage < Stage::Running {
            self.stage = Stage::Running;
        }
    }

    /// Release everything in reverse creation order. Idempotent.
    pub fn teardown(&mut self) {
        if self.stage == Stage::Terminal {
            return;
        }
        log::info!("Cleaning up Vulkan resources...");

        if let Some(device) = self.device.take() {
            destroy_logical_device(&mut self.driver, &device);
        }
        self.physical_device = None;

        if let Some(instance) = self.instance.take() {
            if let Some(surface) = self.surface.take() {
                destroy_surface(&mut self.driver, instance, surface);
            }
            if let Some(messenger) = self.messenger.take() {
                self.bridge.teardown(instance, messenger);
            }
            destroy_instance(&mut self.driver, instance);
        }

        self.stage = Stage::Terminal;
        log::info!("Cleanup complete");
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn instance(&self) -> Option<vk::Instance> {
        self.instance
    }

    pub fn messenger(&self) -> Option<vk::DebugUtilsMessengerEXT> {
        self.messenger
    }

    pub fn surface(&self) -> Option<vk::SurfaceKHR> {
        self.surface
    }

    pub fn physical_device(&self) -> Option<&SelectedDevice> {
        self.physical_device.as_ref()
    }

    pub fn device(&self) -> Option<&LogicalDevice> {
        self.device.as_ref()
    }

    pub fn graphics_queue(&self) -> Option<vk::Queue> {
        self.device.map(|d| d.graphics_queue)
    }

    pub fn present_queue(&self) -> Option<vk::Queue> {
        self.device.map(|d| d.present_queue)
    }

    /// Everything the validation layers reported so far
    pub fn diagnostics(&self) -> &Arc<DiagnosticSink> {
        &self.diagnostics
    }
}

impl<D: Driver> Drop for Lifecycle<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
