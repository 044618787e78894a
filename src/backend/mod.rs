// Backend module - Vulkan bring-up and teardown
//
// Design: every stage talks to the driver through the `Driver` trait,
// `Lifecycle` owns the handles and orders their creation and destruction.

pub mod debug;
pub mod device;
pub mod driver;
pub mod error;
pub mod instance;
pub mod lifecycle;
pub mod negotiate;
pub mod physical;
pub mod surface;
pub mod window;

#[cfg(test)]
pub(crate) mod mock;

pub use driver::AshDriver;
pub use error::{BootstrapError, BootstrapResult};
pub use lifecycle::{BootstrapOptions, Lifecycle};
pub use window::WindowTarget;
