//! Renderer handle lifecycle and the one-per-process guarantee.
//!
//! A [`RendererHandle`] owns the queue of pending [`OutgoingMessage`] values
//! and the capability record negotiated with the external renderer. Handles
//! are held in a [`HandleRegistry`], an explicitly passable get-or-create
//! arena that enforces at most one live handle at a time; a process-global
//! registry backs the common [`ensure_handle`] entry point.
//!
//! Lifecycle: `Active` on successful creation, `Degraded` when the renderer
//! is missing or too old, `Closed` on explicit close. A degraded handle only
//! leaves that state through `Closed`; `close(reset: true)` restores the
//! retry budget so a later `ensure` can build a fresh handle.

use crate::assets::AssetStore;
use crate::dispatch::protocol::OutgoingMessage;
use crate::renderer::{NoopTransport, ProcessTransport, RendererCapabilities, RendererTransport};
use crate::settings::RenderSettings;
use log::{debug, warn};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Retry budget a freshly created handle starts with.
pub const INITIAL_RETRY_BUDGET: u32 = 30;

/// Retry budget restored by `close(reset: true)`.
pub const RESET_RETRY_BUDGET: u32 = 50;

/// Dispatcher lifecycle state.
///
/// `Uninitialized` is represented by an empty registry slot rather than a
/// variant; the first successful `ensure` produces `Active` (or `Degraded`
/// when no renderer could be located).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Active,
    Degraded,
    Closed,
}

/// Process-wide connection to the external renderer.
pub struct RendererHandle {
    settings: RenderSettings,
    assets: AssetStore,
    transport: Box<dyn RendererTransport>,
    capabilities: RendererCapabilities,
    interactive: bool,
    state: Mutex<DispatcherState>,
    outgoing: Mutex<Vec<OutgoingMessage>>,
    retry_budget: AtomicU32,
    identity_sent: AtomicBool,
    reset_requested: AtomicBool,
}

impl RendererHandle {
    fn new(
        settings: RenderSettings,
        assets: AssetStore,
        transport: Box<dyn RendererTransport>,
        interactive: bool,
        state: DispatcherState,
    ) -> Self {
        let capabilities = RendererCapabilities::negotiate(transport.version());
        debug!(
            "renderer handle created: version={:?}, proc_name={}, probe={:?}, state={state:?}",
            capabilities.version, capabilities.supports_proc_name, capabilities.probe_mode
        );
        Self {
            settings,
            assets,
            transport,
            capabilities,
            interactive,
            state: Mutex::new(state),
            outgoing: Mutex::new(Vec::new()),
            retry_budget: AtomicU32::new(INITIAL_RETRY_BUDGET),
            identity_sent: AtomicBool::new(false),
            reset_requested: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn capabilities(&self) -> &RendererCapabilities {
        &self.capabilities
    }

    /// Whether this process can actually show windows (attached to a tty).
    pub fn interactive(&self) -> bool {
        self.interactive
    }

    pub fn state(&self) -> DispatcherState {
        *self.state.lock()
    }

    /// Dispatch operations enqueue only while the handle is `Active`.
    pub fn dispatch_allowed(&self) -> bool {
        self.state() == DispatcherState::Active
    }

    pub fn retry_budget(&self) -> u32 {
        self.retry_budget.load(Ordering::SeqCst)
    }

    /// Number of messages waiting for the renderer to drain.
    pub fn queued(&self) -> usize {
        self.outgoing.lock().len()
    }

    /// Queue a message for the external renderer. Once queued a message is
    /// never mutated and cannot be withdrawn.
    pub fn enqueue(&self, message: OutgoingMessage) {
        self.outgoing.lock().push(message);
    }

    /// Drain the messages that have not been sent to the renderer yet.
    pub fn pending(&self) -> Vec<OutgoingMessage> {
        std::mem::take(&mut *self.outgoing.lock())
    }

    /// Tear down the renderer connection.
    ///
    /// With `reset` the retry budget returns to [`RESET_RETRY_BUDGET`], which
    /// lets a subsequent `ensure` on the owning registry build a new handle.
    pub fn close(&self, reset: bool) {
        {
            let mut state = self.state.lock();
            if *state != DispatcherState::Closed {
                self.transport.shutdown();
            }
            *state = DispatcherState::Closed;
        }
        if reset {
            self.retry_budget.store(RESET_RETRY_BUDGET, Ordering::SeqCst);
            self.reset_requested.store(true, Ordering::SeqCst);
        }
    }

    pub(crate) fn transport(&self) -> &dyn RendererTransport {
        self.transport.as_ref()
    }

    pub(crate) fn mark_degraded(&self) {
        let mut state = self.state.lock();
        if *state == DispatcherState::Active {
            *state = DispatcherState::Degraded;
        }
    }

    pub(crate) fn zero_retry_budget(&self) {
        self.retry_budget.store(0, Ordering::SeqCst);
    }

    /// True exactly once per handle; used to attach the user identity to the
    /// first telemetry block only.
    pub(crate) fn first_identity_use(&self) -> bool {
        !self.identity_sent.swap(true, Ordering::SeqCst)
    }
}

/// Arena holding at most one live [`RendererHandle`].
#[derive(Default)]
pub struct HandleRegistry {
    slot: Mutex<Option<Arc<RendererHandle>>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent get-or-create: an existing live handle is returned as-is
    /// (the settings argument is ignored in that case).
    ///
    /// When the renderer helper cannot be located the handle is built on a
    /// no-op transport in the `Degraded` state, so dispatch callers never
    /// crash; their messages are silently dropped.
    pub fn ensure(&self, settings: RenderSettings) -> Arc<RendererHandle> {
        let mut slot = self.slot.lock();
        if let Some(handle) = reusable(&slot) {
            return handle;
        }

        let interactive = std::io::stdin().is_terminal();
        let handle = match ProcessTransport::discover() {
            Ok(transport) => Arc::new(RendererHandle::new(
                settings,
                AssetStore::default_location(),
                Box::new(transport),
                interactive,
                DispatcherState::Active,
            )),
            Err(err) => {
                warn!("external renderer unavailable, dispatches will be dropped: {err}");
                Arc::new(RendererHandle::new(
                    settings,
                    AssetStore::default_location(),
                    Box::new(NoopTransport),
                    interactive,
                    DispatcherState::Degraded,
                ))
            }
        };
        *slot = Some(Arc::clone(&handle));
        handle
    }

    /// Get-or-create with explicit collaborators. Test seam and embedding
    /// hook; the singleton semantics are identical to [`ensure`].
    ///
    /// [`ensure`]: HandleRegistry::ensure
    pub fn ensure_with(
        &self,
        settings: RenderSettings,
        assets: AssetStore,
        transport: Box<dyn RendererTransport>,
        interactive: bool,
    ) -> Arc<RendererHandle> {
        let mut slot = self.slot.lock();
        if let Some(handle) = reusable(&slot) {
            return handle;
        }
        let handle = Arc::new(RendererHandle::new(
            settings,
            assets,
            transport,
            interactive,
            DispatcherState::Active,
        ));
        *slot = Some(Arc::clone(&handle));
        handle
    }

    /// The current handle, if one has been created.
    pub fn current(&self) -> Option<Arc<RendererHandle>> {
        self.slot.lock().clone()
    }

    /// Close the current handle, if any. See [`RendererHandle::close`].
    pub fn close(&self, reset: bool) {
        if let Some(handle) = self.slot.lock().as_ref() {
            handle.close(reset);
        }
    }
}

/// A slot entry is reused unless `close(reset: true)` marked it, which is
/// the only signal that lets the next `ensure` retry fresh. A plain close
/// keeps the handle in place as a terminal no-op.
fn reusable(slot: &Option<Arc<RendererHandle>>) -> Option<Arc<RendererHandle>> {
    let handle = slot.as_ref()?;
    if handle.state() == DispatcherState::Closed
        && handle.reset_requested.load(Ordering::SeqCst)
    {
        None
    } else {
        Some(Arc::clone(handle))
    }
}

static GLOBAL_REGISTRY: Lazy<HandleRegistry> = Lazy::new(HandleRegistry::new);

/// Process-global registry backing [`ensure_handle`].
pub fn global_registry() -> &'static HandleRegistry {
    &GLOBAL_REGISTRY
}

/// Get or create the process-wide renderer handle.
pub fn ensure_handle(settings: RenderSettings) -> Arc<RendererHandle> {
    global_registry().ensure(settings)
}
