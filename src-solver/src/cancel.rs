//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is a shared atomic flag read by `solve` at every
//! generation boundary. Ctrl-C support goes through a single process-wide
//! `ctrlc` handler that cancels every registered token; it never exits the
//! process.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::error::{Result, SolverError};

/// Shared interrupt flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the owning solver stops at the next generation boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Read and clear the flag in one step.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

type Registry = Mutex<Vec<(u64, CancellationToken)>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(Vec::new()))
}

fn install_handler() -> Result<()> {
    static INSTALLED: OnceLock<std::result::Result<(), String>> = OnceLock::new();
    INSTALLED
        .get_or_init(|| {
            ctrlc::set_handler(|| {
                let tokens = registry().lock();
                log::warn!("Interrupt received, cancelling {} running solver(s)", tokens.len());
                for (_, token) in tokens.iter() {
                    token.cancel();
                }
            })
            .map_err(|e| e.to_string())
        })
        .clone()
        .map_err(SolverError::SignalHandler)
}

/// A solver's entry in the process-wide interrupt registry; unregisters on drop.
#[derive(Debug, Default)]
pub struct SignalRegistration {
    id: Option<u64>,
}

impl SignalRegistration {
    /// Route Ctrl-C to `token`, installing the process handler on first use.
    pub fn enable(&mut self, token: &CancellationToken) -> Result<()> {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        install_handler()?;
        if self.id.is_none() {
            let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
            registry().lock().push((id, token.clone()));
            self.id = Some(id);
        }
        Ok(())
    }

    pub fn disable(&mut self) {
        if let Some(id) = self.id.take() {
            registry().lock().retain(|(other, _)| *other != id);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.id.is_some()
    }
}

impl Drop for SignalRegistration {
    fn drop(&mut self) {
        self.disable();
    }
}
