// Vulkan Device - logical device and its queues
//
// Responsibilities:
// - One queue-create request per distinct family (graphics may equal present)
// - Logical device creation on the selected GPU
// - Graphics/present queue retrieval (index 0 of each family)

use ash::vk;

use super::driver::{DeviceDescriptor, Driver, QueueRequest};
use super::physical::{QueueFamilies, SelectedDevice};
use super::{BootstrapError, BootstrapResult};

/// Single queue per family, full priority
const QUEUE_PRIORITY: f32 = 1.0;

/// Logical device plus the queues it was created with
///
/// `graphics_queue` and `present_queue` are the same handle when both
/// families coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalDevice {
    pub device: vk::Device,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
    pub families: QueueFamilies,
}

/// Queue-create requests for each distinct family, ascending
pub fn queue_requests(families: &QueueFamilies) -> Vec<QueueRequest> {
    families
        .unique()
        .into_iter()
        .map(|family_index| QueueRequest {
            family_index,
            priorities: vec![QUEUE_PRIORITY],
        })
        .collect()
}

pub fn create_logical_device<D: Driver>(
    driver: &mut D,
    instance: vk::Instance,
    selected: &SelectedDevice,
    features: vk::PhysicalDeviceFeatures,
) -> BootstrapResult<LogicalDevice> {
    let families = selected.families;
    let queues = queue_requests(&families);
    log::info!(
        "Creating logical device on {} with {} queue request(s)",
        selected.name,
        queues.len()
    );

    let desc = DeviceDescriptor {
        queues: &queues,
        features,
    };
    let device = driver
        .create_device(instance, selected.physical_device, &desc)
        .map_err(BootstrapError::DeviceCreation)?;

    let graphics_queue = driver.device_queue(device, families.graphics, 0);
    let present_queue = driver.device_queue(device, families.present, 0);

    Ok(LogicalDevice {
        device,
        graphics_queue,
        present_queue,
        families,
    })
}

/// Wait for the device to finish, then destroy it
pub fn destroy_logical_device<D: Driver>(driver: &mut D, device: &LogicalDevice) {
    log::info!("Destroying Vulkan device...");
    driver.destroy_device(device.device);
}
