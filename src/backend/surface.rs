// Surface - the window's presentation target
//
// Created right after the instance (and messenger), destroyed after the
// device and before the instance.

use ash::vk;

use super::driver::Driver;
use super::window::WindowTarget;
use super::{BootstrapError, BootstrapResult};

pub fn create_surface<D: Driver>(
    driver: &mut D,
    instance: vk::Instance,
    target: &WindowTarget,
) -> BootstrapResult<vk::SurfaceKHR> {
    let surface = driver
        .create_surface(instance, target)
        .map_err(BootstrapError::SurfaceCreation)?;
    log::info!("Window surface created");
    Ok(surface)
}

pub fn destroy_surface<D: Driver>(driver: &mut D, instance: vk::Instance, surface: vk::SurfaceKHR) {
    driver.destroy_surface(instance, surface);
}
