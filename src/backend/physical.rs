// Physical device selection
//
// A GPU is suitable iff it has a queue family with graphics support and a
// queue family that can present to our surface (possibly the same one).
// The first suitable GPU in enumeration order wins.

use ash::prelude::VkResult;
use ash::vk;
use std::collections::BTreeSet;

use super::driver::Driver;
use super::{BootstrapError, BootstrapResult};

/// Queue family indices found on a physical device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Both indices, if both were found
    pub fn complete(&self) -> Option<QueueFamilies> {
        Some(QueueFamilies {
            graphics: self.graphics_family?,
            present: self.present_family?,
        })
    }
}

/// Complete set of queue family indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    /// Distinct family indices, ascending
    pub fn unique(&self) -> BTreeSet<u32> {
        [self.graphics, self.present].into_iter().collect()
    }
}

/// Scan families in ascending index order
///
/// Records the first graphics-capable index and, independently, the first
/// index `present` says can present. Stops once both are known.
pub fn find_queue_families_with<F>(
    families: &[vk::QueueFamilyProperties],
    mut present: F,
) -> VkResult<QueueFamilyIndices>
where
    F: FnMut(u32) -> VkResult<bool>,
{
    let mut indices = QueueFamilyIndices::default();

    for (index, family) in families.iter().enumerate() {
        let index = index as u32;

        if indices.graphics_family.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            indices.graphics_family = Some(index);
        }

        if indices.present_family.is_none() && present(index)? {
            indices.present_family = Some(index);
        }

        if indices.is_complete() {
            break;
        }
    }

    Ok(indices)
}

/// The GPU we picked and the families we will create queues from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedDevice {
    pub physical_device: vk::PhysicalDevice,
    pub name: String,
    pub families: QueueFamilies,
}

/// Selects a physical device that can render to one surface
pub struct PhysicalDeviceSelector<'a, D: Driver> {
    driver: &'a D,
    instance: vk::Instance,
    surface: vk::SurfaceKHR,
}

impl<'a, D: Driver> PhysicalDeviceSelector<'a, D> {
    pub fn new(driver: &'a D, instance: vk::Instance, surface: vk::SurfaceKHR) -> Self {
        Self {
            driver,
            instance,
            surface,
        }
    }

    /// Candidates in driver order
    pub fn enumerate(&self) -> BootstrapResult<Vec<vk::PhysicalDevice>> {
        self.driver.physical_devices(self.instance).map_err(|e| {
            log::error!("Failed to enumerate physical devices: {}", e);
            BootstrapError::NoSuitableDevice
        })
    }

    pub fn find_queue_families(&self, device: vk::PhysicalDevice) -> VkResult<QueueFamilyIndices> {
        let families = self.driver.queue_family_properties(self.instance, device);
        find_queue_families_with(&families, |index| {
            self.driver
                .surface_support(self.instance, device, index, self.surface)
        })
    }

    /// A failed present query makes the device unsuitable rather than fatal
    pub fn is_suitable(&self, device: vk::PhysicalDevice) -> bool {
        self.suitable_families(device).is_some()
    }

    fn suitable_families(&self, device: vk::PhysicalDevice) -> Option<QueueFamilies> {
        match self.find_queue_families(device) {
            Ok(indices) => indices.complete(),
            Err(e) => {
                log::warn!(
                    "Skipping {}: present support query failed: {}",
                    self.driver.physical_device_name(self.instance, device),
                    e
                );
                None
            }
        }
    }

    /// First suitable candidate in the order given
    pub fn pick(&self, candidates: &[vk::PhysicalDevice]) -> BootstrapResult<SelectedDevice> {
        if candidates.is_empty() {
            log::error!("No Vulkan-capable GPU found");
            return Err(BootstrapError::NoSuitableDevice);
        }

        for &device in candidates {
            let name = self.driver.physical_device_name(self.instance, device);
            match self.suitable_families(device) {
                Some(families) => {
                    log::info!(
                        "Selected GPU: {} (graphics family {}, present family {})",
                        name,
                        families.graphics,
                        families.present
                    );
                    return Ok(SelectedDevice {
                        physical_device: device,
                        name,
                        families,
                    });
                }
                None => log::debug!("GPU {} is not suitable", name),
            }
        }

        Err(BootstrapError::NoSuitableDevice)
    }

    pub fn select(&self) -> BootstrapResult<SelectedDevice> {
        let candidates = self.enumerate()?;
        self.pick(&candidates)
    }
}
