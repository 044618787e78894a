// Scripted driver for tests
//
// Records every create/destroy into a per-thread log so tests running in
// parallel never see each other's calls.

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use std::cell::RefCell;
use std::ffi::{c_void, CStr, CString};

use super::driver::{DeviceDescriptor, Driver, InstanceDescriptor, QueueRequest};
use super::window::WindowTarget;

pub const INSTANCE: u64 = 0x1000;
pub const SURFACE: u64 = 0x3000;
pub const DEVICE: u64 = 0x4000;
pub const MESSENGER: u64 = 0x6000;

/// A driver call with observable side effects
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateInstance {
        layers: Vec<String>,
        extensions: Vec<String>,
        debug_chained: bool,
    },
    DestroyInstance,
    CreateMessenger,
    DestroyMessenger,
    CreateSurface,
    DestroySurface,
    CreateDevice { queues: Vec<QueueRequest> },
    DestroyDevice,
}

thread_local! {
    static CALLS: RefCell<Vec<Call>> = const { RefCell::new(Vec::new()) };
}

fn record(call: Call) {
    CALLS.with(|calls| calls.borrow_mut().push(call));
}

/// Drain the calls recorded on this thread
pub fn take_calls() -> Vec<Call> {
    CALLS.with(|calls| std::mem::take(&mut *calls.borrow_mut()))
}

/// Queue handle the mock hands out for (family, index)
pub fn queue_handle(family: u32, index: u32) -> vk::Queue {
    vk::Queue::from_raw(0x5000 + u64::from(family) * 0x10 + u64::from(index))
}

pub fn physical_device_handle(position: usize) -> vk::PhysicalDevice {
    vk::PhysicalDevice::from_raw(0x2000 + position as u64)
}

/// Xlib-flavoured window target with the matching surface extensions
pub fn window_target() -> WindowTarget {
    use raw_window_handle::{RawDisplayHandle, RawWindowHandle, XlibDisplayHandle, XlibWindowHandle};
    WindowTarget {
        display: RawDisplayHandle::Xlib(XlibDisplayHandle::empty()),
        window: RawWindowHandle::Xlib(XlibWindowHandle::empty()),
        required_extensions: vec![
            CString::new("VK_KHR_surface").unwrap(),
            CString::new("VK_KHR_xlib_surface").unwrap(),
        ],
    }
}

/// One enumerated GPU: queue family flags with their present support
#[derive(Debug, Clone)]
pub struct MockGpu {
    pub name: String,
    pub families: Vec<(vk::QueueFlags, bool)>,
    pub present_query_fails: bool,
}

impl MockGpu {
    pub fn new(name: &str, families: &[(vk::QueueFlags, bool)]) -> Self {
        Self {
            name: name.to_string(),
            families: families.to_vec(),
            present_query_fails: false,
        }
    }
}

pub struct MockDriver {
    pub layers: Vec<String>,
    pub extensions: Vec<String>,
    pub layer_extensions: Vec<(String, Vec<String>)>,
    pub gpus: Vec<MockGpu>,
    pub debug_create_present: bool,
    pub debug_destroy_present: bool,
    pub fail_layer_query: Option<vk::Result>,
    pub fail_instance: Option<vk::Result>,
    pub fail_messenger: bool,
    pub fail_surface: Option<vk::Result>,
    pub fail_enumerate: Option<vk::Result>,
    pub fail_device: Option<vk::Result>,
    chained_debug: Option<vk::DebugUtilsMessengerCreateInfoEXT>,
}

impl MockDriver {
    /// Validation installed, one GPU with a graphics+present family
    pub fn new() -> Self {
        Self {
            layers: vec!["VK_LAYER_KHRONOS_validation".to_string()],
            extensions: vec![
                "VK_KHR_surface".to_string(),
                "VK_KHR_xlib_surface".to_string(),
                "VK_EXT_debug_utils".to_string(),
            ],
            layer_extensions: Vec::new(),
            gpus: vec![MockGpu::new(
                "Mock GPU",
                &[(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, true)],
            )],
            debug_create_present: true,
            debug_destroy_present: true,
            fail_layer_query: None,
            fail_instance: None,
            fail_messenger: false,
            fail_surface: None,
            fail_enumerate: None,
            fail_device: None,
            chained_debug: None,
        }
    }

    fn gpu(&self, device: vk::PhysicalDevice) -> Option<&MockGpu> {
        let position = device.as_raw().checked_sub(0x2000)? as usize;
        self.gpus.get(position)
    }
}

fn names(list: &[CString]) -> Vec<String> {
    list.iter().map(|n| n.to_string_lossy().into_owned()).collect()
}

/// Fire a diagnostic event through a chained create info, as a layer would
fn emit(info: &vk::DebugUtilsMessengerCreateInfoEXT, text: &str) {
    let Some(callback) = info.pfn_user_callback else {
        return;
    };
    let message = CString::new(text).unwrap();
    let data = vk::DebugUtilsMessengerCallbackDataEXT::builder()
        .message(&message)
        .build();
    unsafe {
        callback(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
            &data,
            info.p_user_data,
        );
    }
}

unsafe extern "system" fn create_messenger(
    _instance: vk::Instance,
    _create_info: *const vk::DebugUtilsMessengerCreateInfoEXT,
    _allocator: *const vk::AllocationCallbacks,
    messenger: *mut vk::DebugUtilsMessengerEXT,
) -> vk::Result {
    record(Call::CreateMessenger);
    *messenger = vk::DebugUtilsMessengerEXT::from_raw(MESSENGER);
    vk::Result::SUCCESS
}

unsafe extern "system" fn create_messenger_failing(
    _instance: vk::Instance,
    _create_info: *const vk::DebugUtilsMessengerCreateInfoEXT,
    _allocator: *const vk::AllocationCallbacks,
    _messenger: *mut vk::DebugUtilsMessengerEXT,
) -> vk::Result {
    vk::Result::ERROR_OUT_OF_HOST_MEMORY
}

unsafe extern "system" fn destroy_messenger(
    _instance: vk::Instance,
    _messenger: vk::DebugUtilsMessengerEXT,
    _allocator: *const vk::AllocationCallbacks,
) {
    record(Call::DestroyMessenger);
}

impl Driver for MockDriver {
    fn layer_names(&self) -> VkResult<Vec<String>> {
        match self.fail_layer_query {
            Some(err) => Err(err),
            None => Ok(self.layers.clone()),
        }
    }

    fn instance_extension_names(&self, layer: Option<&CStr>) -> VkResult<Vec<String>> {
        let Some(layer) = layer else {
            return Ok(self.extensions.clone());
        };
        let layer = layer.to_string_lossy();
        if !self.layers.iter().any(|l| *l == layer) {
            return Err(vk::Result::ERROR_LAYER_NOT_PRESENT);
        }
        Ok(self
            .layer_extensions
            .iter()
            .find(|(name, _)| *name == layer)
            .map(|(_, extensions)| extensions.clone())
            .unwrap_or_default())
    }

    fn create_instance(&mut self, desc: &InstanceDescriptor) -> VkResult<vk::Instance> {
        record(Call::CreateInstance {
            layers: names(desc.layers),
            extensions: names(desc.extensions),
            debug_chained: desc.debug_messenger.is_some(),
        });
        if let Some(err) = self.fail_instance {
            return Err(err);
        }
        if let Some(info) = &desc.debug_messenger {
            emit(info, "instance created");
        }
        self.chained_debug = desc.debug_messenger;
        Ok(vk::Instance::from_raw(INSTANCE))
    }

    fn destroy_instance(&mut self, _instance: vk::Instance) {
        if let Some(info) = self.chained_debug.take() {
            emit(&info, "instance destroyed");
        }
        record(Call::DestroyInstance);
    }

    fn instance_proc_addr(&self, _instance: vk::Instance, name: &CStr) -> vk::PFN_vkVoidFunction {
        unsafe {
            match name.to_bytes() {
                b"vkCreateDebugUtilsMessengerEXT" if self.debug_create_present => {
                    let create: vk::PFN_vkCreateDebugUtilsMessengerEXT = if self.fail_messenger {
                        create_messenger_failing
                    } else {
                        create_messenger
                    };
                    Some(std::mem::transmute::<
                        vk::PFN_vkCreateDebugUtilsMessengerEXT,
                        unsafe extern "system" fn(),
                    >(create))
                }
                b"vkDestroyDebugUtilsMessengerEXT" if self.debug_destroy_present => {
                    let destroy: vk::PFN_vkDestroyDebugUtilsMessengerEXT = destroy_messenger;
                    Some(std::mem::transmute::<
                        vk::PFN_vkDestroyDebugUtilsMessengerEXT,
                        unsafe extern "system" fn(),
                    >(destroy))
                }
                _ => None,
            }
        }
    }

    fn create_surface(&mut self, _instance: vk::Instance, _target: &WindowTarget) -> VkResult<vk::SurfaceKHR> {
        if let Some(err) = self.fail_surface {
            return Err(err);
        }
        record(Call::CreateSurface);
        Ok(vk::SurfaceKHR::from_raw(SURFACE))
    }

    fn destroy_surface(&mut self, _instance: vk::Instance, _surface: vk::SurfaceKHR) {
        record(Call::DestroySurface);
    }

    fn physical_devices(&self, _instance: vk::Instance) -> VkResult<Vec<vk::PhysicalDevice>> {
        if let Some(err) = self.fail_enumerate {
            return Err(err);
        }
        Ok((0..self.gpus.len()).map(physical_device_handle).collect())
    }

    fn physical_device_name(&self, _instance: vk::Instance, device: vk::PhysicalDevice) -> String {
        self.gpu(device).map(|g| g.name.clone()).unwrap_or_default()
    }

    fn queue_family_properties(
        &self,
        _instance: vk::Instance,
        device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        self.gpu(device)
            .map(|gpu| {
                gpu.families
                    .iter()
                    .map(|(flags, _)| vk::QueueFamilyProperties {
                        queue_flags: *flags,
                        queue_count: 1,
                        ..Default::default()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn surface_support(
        &self,
        _instance: vk::Instance,
        device: vk::PhysicalDevice,
        queue_family: u32,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        let gpu = self.gpu(device).ok_or(vk::Result::ERROR_DEVICE_LOST)?;
        if gpu.present_query_fails {
            return Err(vk::Result::ERROR_SURFACE_LOST_KHR);
        }
        Ok(gpu
            .families
            .get(queue_family as usize)
            .map(|(_, present)| *present)
            .unwrap_or(false))
    }

    fn create_device(
        &mut self,
        _instance: vk::Instance,
        _physical_device: vk::PhysicalDevice,
        desc: &DeviceDescriptor,
    ) -> VkResult<vk::Device> {
        record(Call::CreateDevice {
            queues: desc.queues.to_vec(),
        });
        if let Some(err) = self.fail_device {
            return Err(err);
        }
        Ok(vk::Device::from_raw(DEVICE))
    }

    fn device_queue(&self, _device: vk::Device, queue_family: u32, queue_index: u32) -> vk::Queue {
        queue_handle(queue_family, queue_index)
    }

    fn destroy_device(&mut self, _device: vk::Device) {
        record(Call::DestroyDevice);
    }
}

/// `p_user_data` pointer for a sink shared with a callback
pub fn user_data<T>(value: &T) -> *mut c_void {
    value as *const T as *mut c_void
}
