// Layer/extension negotiation
//
// Runs before instance creation: what the driver offers versus what we ask
// for. The extension list computed here is final for the instance.

use ash::extensions::ext::DebugUtils;
use std::ffi::{CStr, CString};

use super::driver::Driver;
use super::{BootstrapError, BootstrapResult};

/// Snapshot of the layers and instance extensions the driver reports
#[derive(Debug, Clone, Default)]
pub struct Negotiator {
    available_layers: Vec<String>,
    available_extensions: Vec<String>,
}

impl Negotiator {
    /// Query the driver once. Extensions exposed by requested layers that are
    /// installed count as available too.
    pub fn probe<D: Driver>(driver: &D, requested_layers: &[CString]) -> BootstrapResult<Self> {
        let available_layers = driver.layer_names().map_err(|e| {
            BootstrapError::Initialization(format!("Failed to enumerate instance layers: {}", e))
        })?;

        let mut available_extensions = driver.instance_extension_names(None).map_err(|e| {
            BootstrapError::Initialization(format!("Failed to enumerate instance extensions: {}", e))
        })?;

        for layer in requested_layers {
            if !contains(&available_layers, layer) {
                continue;
            }
            match driver.instance_extension_names(Some(layer)) {
                Ok(names) => available_extensions.extend(names),
                Err(e) => log::warn!(
                    "Could not list extensions of layer {}: {}",
                    layer.to_string_lossy(),
                    e
                ),
            }
        }
        available_extensions.sort();
        available_extensions.dedup();

        Ok(Self::new(available_layers, available_extensions))
    }

    pub fn new(available_layers: Vec<String>, available_extensions: Vec<String>) -> Self {
        Self {
            available_layers,
            available_extensions,
        }
    }

    /// True iff every requested layer is installed (exact name match)
    pub fn check_support(&self, requested: &[CString]) -> bool {
        requested.iter().all(|layer| contains(&self.available_layers, layer))
    }

    pub fn missing_layers(&self, requested: &[CString]) -> Vec<String> {
        missing(&self.available_layers, requested)
    }

    pub fn missing_extensions(&self, required: &[CString]) -> Vec<String> {
        missing(&self.available_extensions, required)
    }

    pub fn available_extensions(&self) -> &[String] {
        &self.available_extensions
    }
}

/// Windowing-mandated extensions, plus debug utils when diagnostics are on
pub fn required_extensions(window_extensions: &[CString], diagnostics: bool) -> Vec<CString> {
    let mut extensions = window_extensions.to_vec();
    let debug_utils = DebugUtils::name();
    if diagnostics && !extensions.iter().any(|e| e.as_c_str() == debug_utils) {
        extensions.push(debug_utils.to_owned());
    }
    extensions
}

fn contains(available: &[String], name: &CStr) -> bool {
    available.iter().any(|a| a.as_bytes() == name.to_bytes())
}

fn missing(available: &[String], requested: &[CString]) -> Vec<String> {
    let mut missing: Vec<String> = requested
        .iter()
        .filter(|name| !contains(available, name))
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    missing.dedup();
    missing
}
