//! Render dispatch subsystem.
//!
//! [`handle`] owns the singleton lifecycle, [`protocol`] defines the wire
//! shape of outgoing messages, [`service`] assembles payloads and checks
//! renderer health, and [`watcher`] waits for exported images.

pub mod handle;
pub mod protocol;
pub mod service;
pub mod watcher;

pub use handle::{ensure_handle, global_registry, DispatcherState, HandleRegistry, RendererHandle};
pub use protocol::{OutgoingMessage, WindowSpec};
pub use service::HealthStatus;
pub use watcher::{ExportResult, ExportWatch};
