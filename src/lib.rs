//! RAC console - remote access session controller
//!
//! This library drives one remote access session against a gateway:
//! - A WebSocket tunnel to the gateway with an idle-receive timeout
//! - A remote-display protocol client bound to the tunnel (external, behind traits)
//! - Bounded reconnection with linear backoff
//! - Bidirectional clipboard synchronization without echo loops
//! - Mouse and keyboard forwarding with zoom-aware pointer scaling
//! - Mounting the rendered display surface into a host container
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use rac_console::{
//!     clipboard::SystemClipboard,
//!     config::ConfigManager,
//!     display::DisplayHost,
//!     logging,
//!     protocol::ProtocolFactory,
//!     session::{SessionController, SessionSettings},
//! };
//!
//! # async fn run(factory: Box<dyn ProtocolFactory>, host: Box<dyn DisplayHost>) -> rac_console::Result<()> {
//! logging::init_default_logging();
//!
//! let config = ConfigManager::new()?.load_or_create_default()?;
//! let settings = SessionSettings::from_config(&config, "connection-token", None);
//!
//! let (controller, handle) =
//!     SessionController::new(settings, factory, host, Arc::new(SystemClipboard::new()));
//! let session = tokio::spawn(controller.run());
//!
//! // Feed input, resize and focus notifications through `handle`...
//! handle.shutdown()?;
//! let _final_state = session.await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clipboard;
pub mod config;
pub mod display;
pub mod error;
pub mod input;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod timer;
pub mod tunnel;

// Re-export commonly used types at crate root
pub use error::{RacError, Result};
