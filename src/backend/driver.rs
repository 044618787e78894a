// Driver boundary - every call that leaves the process for the Vulkan loader
//
// The bootstrap stages only ever talk to a `Driver`. `AshDriver` is the real
// one; tests script a mock. Handles cross the boundary as raw `vk::*` values,
// the function tables stay on the driver side.

use ash::extensions::khr;
use ash::prelude::VkResult;
use ash::{vk, Entry};
use std::ffi::{c_char, CStr, CString};

use super::instance::ApplicationInfo;
use super::window::WindowTarget;
use super::{BootstrapError, BootstrapResult};

/// Everything the driver needs to create an instance
pub struct InstanceDescriptor<'a> {
    pub application: &'a ApplicationInfo,
    pub extensions: &'a [CString],
    pub layers: &'a [CString],
    /// Chained into the create info so creation/destruction are reported too
    pub debug_messenger: Option<vk::DebugUtilsMessengerCreateInfoEXT>,
}

/// One queue-creation request
#[derive(Debug, Clone, PartialEq)]
pub struct QueueRequest {
    pub family_index: u32,
    pub priorities: Vec<f32>,
}

/// Everything the driver needs to create a logical device
pub struct DeviceDescriptor<'a> {
    pub queues: &'a [QueueRequest],
    pub features: vk::PhysicalDeviceFeatures,
}

/// The external Vulkan driver as seen by the bootstrap stages
pub trait Driver {
    /// Names of all instance layers the loader can enable
    fn layer_names(&self) -> VkResult<Vec<String>>;

    /// Instance extensions from the loader/ICDs, or from one layer
    fn instance_extension_names(&self, layer: Option<&CStr>) -> VkResult<Vec<String>>;

    fn create_instance(&mut self, desc: &InstanceDescriptor) -> VkResult<vk::Instance>;
    fn destroy_instance(&mut self, instance: vk::Instance);

    /// `vkGetInstanceProcAddr`; `None` when the entry point is absent
    fn instance_proc_addr(&self, instance: vk::Instance, name: &CStr) -> vk::PFN_vkVoidFunction;

    fn create_surface(&mut self, instance: vk::Instance, target: &WindowTarget) -> VkResult<vk::SurfaceKHR>;
    fn destroy_surface(&mut self, instance: vk::Instance, surface: vk::SurfaceKHR);

    fn physical_devices(&self, instance: vk::Instance) -> VkResult<Vec<vk::PhysicalDevice>>;
    fn physical_device_name(&self, instance: vk::Instance, device: vk::PhysicalDevice) -> String;
    fn queue_family_properties(
        &self,
        instance: vk::Instance,
        device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties>;
    fn surface_support(
        &self,
        instance: vk::Instance,
        device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;

    fn create_device(
        &mut self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceDescriptor,
    ) -> VkResult<vk::Device>;
    fn device_queue(&self, device: vk::Device, queue_family: u32, queue_index: u32) -> vk::Queue;

    /// Waits for the device to go idle, then destroys it
    fn destroy_device(&mut self, device: vk::Device);
}

/// Driver backed by the system Vulkan loader through ash
///
/// Holds at most one instance and one device, which is all the bootstrap
/// ever creates.
pub struct AshDriver {
    // Order matters for drop: loaders before the entry that produced them
    device: Option<ash::Device>,
    surface_loader: Option<khr::Surface>,
    instance: Option<ash::Instance>,
    entry: Entry,
}

impl AshDriver {
    /// Load the Vulkan library
    pub fn load() -> BootstrapResult<Self> {
        let entry = unsafe { Entry::load() }.map_err(|e| {
            BootstrapError::Initialization(format!(
                "Failed to load Vulkan library. Is Vulkan installed? ({})",
                e
            ))
        })?;

        Ok(Self {
            device: None,
            surface_loader: None,
            instance: None,
            entry,
        })
    }

    fn instance(&self, handle: vk::Instance) -> VkResult<&ash::Instance> {
        match &self.instance {
            Some(instance) if instance.handle() == handle => Ok(instance),
            _ => Err(vk::Result::ERROR_INITIALIZATION_FAILED),
        }
    }
}

fn property_names<const N: usize>(names: impl Iterator<Item = [c_char; N]>) -> Vec<String> {
    names
        .map(|raw| unsafe { CStr::from_ptr(raw.as_ptr()) }.to_string_lossy().into_owned())
        .collect()
}

impl Driver for AshDriver {
    fn layer_names(&self) -> VkResult<Vec<String>> {
        let layers = self.entry.enumerate_instance_layer_properties()?;
        Ok(property_names(layers.iter().map(|l| l.layer_name)))
    }

    fn instance_extension_names(&self, layer: Option<&CStr>) -> VkResult<Vec<String>> {
        let extensions = self.entry.enumerate_instance_extension_properties(layer)?;
        Ok(property_names(extensions.iter().map(|e| e.extension_name)))
    }

    fn create_instance(&mut self, desc: &InstanceDescriptor) -> VkResult<vk::Instance> {
        let app = desc.application;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app.name)
            .application_version(app.version)
            .engine_name(&app.engine_name)
            .engine_version(app.engine_version)
            .api_version(app.api_version);

        let extensions: Vec<*const c_char> = desc.extensions.iter().map(|e| e.as_ptr()).collect();
        let layers: Vec<*const c_char> = desc.layers.iter().map(|l| l.as_ptr()).collect();

        let mut debug_info = desc.debug_messenger;
        let mut create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);
        if let Some(debug_info) = debug_info.as_mut() {
            create_info = create_info.push_next(debug_info);
        }

        let instance = unsafe { self.entry.create_instance(&create_info, None) }?;
        let handle = instance.handle();

        self.surface_loader = Some(khr::Surface::new(&self.entry, &instance));
        self.instance = Some(instance);
        Ok(handle)
    }

    fn destroy_instance(&mut self, instance: vk::Instance) {
        if self.instance(instance).is_err() {
            return;
        }
        self.surface_loader = None;
        if let Some(instance) = self.instance.take() {
            unsafe { instance.destroy_instance(None) };
        }
    }

    fn instance_proc_addr(&self, instance: vk::Instance, name: &CStr) -> vk::PFN_vkVoidFunction {
        unsafe { (self.entry.static_fn().get_instance_proc_addr)(instance, name.as_ptr()) }
    }

    fn create_surface(&mut self, instance: vk::Instance, target: &WindowTarget) -> VkResult<vk::SurfaceKHR> {
        let instance = self.instance(instance)?;
        unsafe { ash_window::create_surface(&self.entry, instance, target.display, target.window, None) }
    }

    fn destroy_surface(&mut self, _instance: vk::Instance, surface: vk::SurfaceKHR) {
        if let Some(loader) = &self.surface_loader {
            unsafe { loader.destroy_surface(surface, None) };
        }
    }

    fn physical_devices(&self, instance: vk::Instance) -> VkResult<Vec<vk::PhysicalDevice>> {
        let instance = self.instance(instance)?;
        unsafe { instance.enumerate_physical_devices() }
    }

    fn physical_device_name(&self, instance: vk::Instance, device: vk::PhysicalDevice) -> String {
        match self.instance(instance) {
            Ok(instance) => {
                let props = unsafe { instance.get_physical_device_properties(device) };
                unsafe { CStr::from_ptr(props.device_name.as_ptr()) }
                    .to_string_lossy()
                    .into_owned()
            }
            Err(_) => String::from("<unknown>"),
        }
    }

    fn queue_family_properties(
        &self,
        instance: vk::Instance,
        device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        self.instance(instance)
            .map(|instance| unsafe { instance.get_physical_device_queue_family_properties(device) })
            .unwrap_or_default()
    }

    fn surface_support(
        &self,
        _instance: vk::Instance,
        device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        let loader = self
            .surface_loader
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
        unsafe { loader.get_physical_device_surface_support(device, queue_family, surface) }
    }

    fn create_device(
        &mut self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceDescriptor,
    ) -> VkResult<vk::Device> {
        let instance = self.instance(instance)?;

        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = desc
            .queues
            .iter()
            .map(|request| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(request.family_index)
                    .queue_priorities(&request.priorities)
                    .build()
            })
            .collect();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_features(&desc.features);

        let device = unsafe { instance.create_device(physical_device, &create_info, None) }?;
        let handle = device.handle();
        self.device = Some(device);
        Ok(handle)
    }

    fn device_queue(&self, device: vk::Device, queue_family: u32, queue_index: u32) -> vk::Queue {
        match &self.device {
            Some(d) if d.handle() == device => unsafe { d.get_device_queue(queue_family, queue_index) },
            _ => vk::Queue::null(),
        }
    }

    fn destroy_device(&mut self, device: vk::Device) {
        if !matches!(&self.device, Some(d) if d.handle() == device) {
            return;
        }
        if let Some(d) = self.device.take() {
            unsafe {
                let _ = d.device_wait_idle();
                d.destroy_device(None);
            }
        }
    }
}
