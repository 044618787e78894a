// Debug messenger - VK_EXT_debug_utils plumbing
//
// The create/destroy entry points are extension functions, so they are looked
// up through vkGetInstanceProcAddr and kept as optional function pointers.
// The callback may fire on any driver thread; it only appends to the sink.

use ash::vk;
use parking_lot::Mutex;
use std::ffi::{c_void, CStr};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::driver::Driver;
use super::{BootstrapError, BootstrapResult};

const CREATE_FN: &CStr = c"vkCreateDebugUtilsMessengerEXT";
const DESTROY_FN: &CStr = c"vkDestroyDebugUtilsMessengerEXT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Verbose,
    Info,
    Warning,
    Error,
}

impl Severity {
    fn from_flags(flags: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            Severity::Error
        } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            Severity::Warning
        } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            Severity::Info
        } else {
            Severity::Verbose
        }
    }
}

/// One message delivered by the validation layers
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticMessage {
    pub severity: Severity,
    pub kind: vk::DebugUtilsMessageTypeFlagsEXT,
    pub text: String,
}

/// Thread-safe record of every diagnostic the driver reported
///
/// Everything recorded is also forwarded to the `log` facade.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    messages: Mutex<Vec<DiagnosticMessage>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, message: DiagnosticMessage) {
        log_message(&message);
        self.messages.lock().push(message);
    }

    /// Snapshot of everything recorded so far
    pub fn messages(&self) -> Vec<DiagnosticMessage> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.severity == severity)
            .count()
    }
}

/// Which messages the messenger subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessengerConfig {
    pub severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    pub types: vk::DebugUtilsMessageTypeFlagsEXT,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            severity: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            types: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        }
    }
}

/// Create info routed to `sink`
///
/// The sink must stay alive for as long as the driver may call back, which
/// includes instance destruction when this is chained into instance creation.
pub fn messenger_create_info(
    sink: &Arc<DiagnosticSink>,
    config: &MessengerConfig,
) -> vk::DebugUtilsMessengerCreateInfoEXT {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(config.severity)
        .message_type(config.types)
        .pfn_user_callback(Some(debug_callback))
        .user_data(Arc::as_ptr(sink) as *mut c_void)
        .build()
}

/// Debug-utils entry points resolved from an instance
#[derive(Clone, Copy, Default)]
pub struct DebugMessengerBridge {
    create: Option<vk::PFN_vkCreateDebugUtilsMessengerEXT>,
    destroy: Option<vk::PFN_vkDestroyDebugUtilsMessengerEXT>,
}

impl DebugMessengerBridge {
    pub fn resolve<D: Driver>(driver: &D, instance: vk::Instance) -> Self {
        let create = driver.instance_proc_addr(instance, CREATE_FN).map(|f| unsafe {
            std::mem::transmute::<unsafe extern "system" fn(), vk::PFN_vkCreateDebugUtilsMessengerEXT>(f)
        });
        let destroy = driver.instance_proc_addr(instance, DESTROY_FN).map(|f| unsafe {
            std::mem::transmute::<unsafe extern "system" fn(), vk::PFN_vkDestroyDebugUtilsMessengerEXT>(f)
        });

        if create.is_none() || destroy.is_none() {
            log::warn!(
                "VK_EXT_debug_utils entry points missing (create: {}, destroy: {})",
                create.is_some(),
                destroy.is_some()
            );
        }
        Self { create, destroy }
    }

    pub fn is_available(&self) -> bool {
        self.create.is_some()
    }

    pub fn setup(
        &self,
        instance: vk::Instance,
        create_info: &vk::DebugUtilsMessengerCreateInfoEXT,
    ) -> BootstrapResult<vk::DebugUtilsMessengerEXT> {
        let create = self
            .create
            .ok_or(BootstrapError::ExtensionNotPresent("vkCreateDebugUtilsMessengerEXT"))?;

        let mut messenger = vk::DebugUtilsMessengerEXT::null();
        let result = unsafe { create(instance, create_info, std::ptr::null(), &mut messenger) };
        match result {
            vk::Result::SUCCESS => {
                log::info!("Debug messenger attached");
                Ok(messenger)
            }
            err => Err(BootstrapError::Initialization(format!(
                "Failed to set up debug messenger: {}",
                err
            ))),
        }
    }

    /// Never fails: a null messenger or an unresolved destroy entry point
    /// makes this a no-op
    pub fn teardown(&self, instance: vk::Instance, messenger: vk::DebugUtilsMessengerEXT) {
        if messenger == vk::DebugUtilsMessengerEXT::null() {
            return;
        }
        match self.destroy {
            Some(destroy) => unsafe { destroy(instance, messenger, std::ptr::null()) },
            None => log::debug!("vkDestroyDebugUtilsMessengerEXT not present, skipping"),
        }
    }
}

fn log_message(message: &DiagnosticMessage) {
    match message.severity {
        Severity::Error => log::error!("[Vulkan] {:?} - {}", message.kind, message.text),
        Severity::Warning => log::warn!("[Vulkan] {:?} - {}", message.kind, message.text),
        Severity::Info => log::info!("[Vulkan] {:?} - {}", message.kind, message.text),
        Severity::Verbose => log::debug!("[Vulkan] {:?} - {}", message.kind, message.text),
    }
}

/// Debug callback for validation layers
///
/// `p_user_data` is either null or points at a live `DiagnosticSink`.
/// Always returns `vk::FALSE` so the triggering call is never aborted.
pub(crate) unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    p_user_data: *mut c_void,
) -> vk::Bool32 {
    // Nothing may unwind into the driver
    let _ = panic::catch_unwind(AssertUnwindSafe(|| {
        let text = match unsafe { p_callback_data.as_ref() } {
            Some(data) if !data.p_message.is_null() => unsafe { CStr::from_ptr(data.p_message) }
                .to_string_lossy()
                .into_owned(),
            _ => String::from("<no message>"),
        };
        let message = DiagnosticMessage {
            severity: Severity::from_flags(message_severity),
            kind: message_type,
            text,
        };

        match unsafe { (p_user_data as *const DiagnosticSink).as_ref() } {
            Some(sink) => sink.record(message),
            None => log_message(&message),
        }
    }));

    vk::FALSE
}
