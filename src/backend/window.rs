// Window target - what the windowing side hands to the backend
//
// The native handles for surface creation and the instance extensions
// the platform needs to present to that window.

use ash::vk;
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle, RawDisplayHandle, RawWindowHandle};
use std::ffi::{CStr, CString};

use super::{BootstrapError, BootstrapResult};

/// Native window handles plus the platform-mandated instance extensions
#[derive(Debug, Clone)]
pub struct WindowTarget {
    pub display: RawDisplayHandle,
    pub window: RawWindowHandle,
    pub required_extensions: Vec<CString>,
}

impl WindowTarget {
    /// Capture handles and required extensions from a live window
    pub fn from_window<W>(window: &W) -> BootstrapResult<Self>
    where
        W: HasRawDisplayHandle + HasRawWindowHandle,
    {
        let display = window.raw_display_handle();
        let required_extensions = ash_window::enumerate_required_extensions(display)
            .map_err(|e: vk::Result| {
                BootstrapError::Initialization(format!(
                    "windowing system reported no surface extensions: {}",
                    e
                ))
            })?
            .iter()
            .map(|&name| unsafe { CStr::from_ptr(name) }.to_owned())
            .collect();

        Ok(Self {
            display,
            window: window.raw_window_handle(),
            required_extensions,
        })
    }
}
