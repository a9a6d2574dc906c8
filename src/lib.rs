//! # plotlink - Out-of-Process Chart Rendering Dispatch
//!
//! Forwards chart figures, data tables, and URLs to an external desktop
//! rendering helper process, and waits for side-effect image exports.
//!
//! ## Features
//!
//! - **Singleton handle**: one renderer connection per process, created
//!   lazily through an idempotent get-or-create registry
//! - **Silent degradation**: a missing or outdated renderer never crashes
//!   dispatch callers; messages are dropped instead
//! - **Capability negotiation**: version-gated renderer behavior resolved
//!   once at handle creation
//! - **Export watching**: bounded async polling for exported images, with an
//!   optional platform-opener hook
//!
//! ## Architecture
//!
//! The library is organized into focused modules following modern Rust patterns:
//!
//! - [`error`] - Centralized error types and handling
//! - [`settings`] - Display configuration supplied by the host application
//! - [`assets`] - Bundled renderer pages and the plotly.js bundle
//! - [`figure`] / [`table`] - Thin payload models
//! - [`renderer`] - Seam to the external rendering helper
//! - [`dispatch`] - Handle lifecycle, wire protocol, dispatch operations,
//!   and the export watcher

// Core modules
pub mod assets;
pub mod error;
pub mod settings;

// Payload models
pub mod figure;
pub mod table;

// Renderer seam and dispatch subsystem
pub mod dispatch;
pub mod renderer;

// Re-export commonly used types for convenience
pub use error::{PlotlinkError, Result};

// Public API surface for external usage
pub use assets::{fetch_plotly_js, AssetStore};
pub use dispatch::{
    ensure_handle, global_registry, DispatcherState, ExportResult, ExportWatch, HandleRegistry,
    HealthStatus, OutgoingMessage, RendererHandle, WindowSpec,
};
pub use figure::Figure;
pub use renderer::{RendererCapabilities, RendererTransport, RendererVersion};
pub use settings::{RenderSettings, Theme};
pub use table::{CellValue, DataTable};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
