// =============================================================================
// VULKAN BOOTSTRAP - instance, debug messenger, surface, device, queues
// =============================================================================
//
// Brings a Vulkan backend up in dependency order and tears it down in
// reverse, including after a failure halfway through.
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  winit event loop (window, close events)                        │
// │    └── Lifecycle (owns every Vulkan handle)                     │
// │          ├── Instance (+ validation layers)                     │
// │          │     └── Debug messenger (optional)                   │
// │          └── Surface                                            │
// │                └── Physical device -> Logical device + queues   │
// └─────────────────────────────────────────────────────────────────┘
//
// TEARDOWN (reverse): device -> surface -> messenger -> instance -> window
//
// =============================================================================

mod backend;
mod config;

use anyhow::Result;
use backend::{AshDriver, Lifecycle, WindowTarget};
use config::Config;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes},
};

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    // Load configuration from config.toml
    let config = Config::load();

    // Initialize logging
    init_logging(&config);
    log::info!("Starting Vulkan bootstrap");
    log::info!(
        "Window: {}x{}, validation {}, device {}",
        config.window.width,
        config.window.height,
        if config.debug.validation_layers { "on" } else { "off" },
        if config.device.enabled { "on" } else { "off" }
    );

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    // Tear Vulkan down and close the window before reporting anything
    let failure = app.failure.take();
    drop(app);

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Initialize logging; RUST_LOG still wins over the configured level
fn init_logging(config: &Config) {
    use env_logger::Builder;

    let mut builder = Builder::new();
    builder.filter_level(config.get_log_level());
    builder.parse_default_env();
    builder.init();
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Main application struct.
///
/// IMPORTANT: Field order matters for Drop! The lifecycle releases every
/// Vulkan handle before the window it presents to goes away.
struct App {
    config: Config,
    lifecycle: Option<Lifecycle<AshDriver>>,
    window: Option<Window>,
    /// First bring-up error, reported once the event loop returns
    failure: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            lifecycle: None,
            window: None,
            failure: None,
        }
    }

    /// Run the Vulkan bring-up against a freshly created window.
    fn init_vulkan(&mut self, window: &Window) -> Result<Lifecycle<AshDriver>> {
        let options = self.config.bootstrap_options()?;
        let target = WindowTarget::from_window(window)?;
        let driver = AshDriver::load()?;

        let mut lifecycle = Lifecycle::bootstrap(driver, options, Some(&target))?;
        lifecycle.start();
        Ok(lifecycle)
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    /// Called when the application is ready to create windows.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_resizable(self.config.window.resizable)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(w) => w,
            Err(e) => {
                log::error!("Failed to create window: {:?}", e);
                self.failure = Some(anyhow::anyhow!("Failed to create window: {}", e));
                event_loop.exit();
                return;
            }
        };

        match self.init_vulkan(&window) {
            Ok(lifecycle) => self.lifecycle = Some(lifecycle),
            Err(e) => {
                log::error!("Failed to initialize Vulkan: {:#}", e);
                self.failure = Some(e);
                event_loop.exit();
            }
        }

        self.window = Some(window);
    }

    /// Handle window events.
    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                event_loop.exit();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if event.state.is_pressed() && event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    log::info!("ESC pressed, exiting...");
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }
}

// =============================================================================
// CLEANUP
// =============================================================================

impl Drop for App {
    fn drop(&mut self) {
        // Vulkan first (reverse creation order inside), then the window
        if let Some(mut lifecycle) = self.lifecycle.take() {
            lifecycle.teardown();
            let diagnostics = lifecycle.diagnostics();
            if !diagnostics.is_empty() {
                log::info!("Validation layers reported {} message(s)", diagnostics.len());
            }
        }
        self.window = None;
    }
}
