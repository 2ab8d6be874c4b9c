//! Address-based telegram dispatch.
//!
//! Handlers are registered per [`Address`]. For every inbound telegram the
//! dispatcher resolves the distinct set of handlers to call, takes a snapshot
//! of that set under the lock, releases the lock and calls each handler once.
//! Handlers may therefore register or unregister from inside `on_telegram`.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{trace, warn};

use buspro_core::{Address, Telegram};

use crate::error::HandlerError;

/// Consumer of decoded telegrams.
///
/// Identity is the `Arc` allocation: registering the same `Arc` twice is a
/// no-op, and unregistering needs a clone of the registered `Arc`.
pub trait TelegramHandler: Send + Sync {
    fn on_telegram(&self, telegram: &Telegram) -> Result<(), HandlerError>;
}

impl<F> TelegramHandler for F
where
    F: Fn(&Telegram) -> Result<(), HandlerError> + Send + Sync,
{
    fn on_telegram(&self, telegram: &Telegram) -> Result<(), HandlerError> {
        self(telegram)
    }
}

pub type SharedHandler = Arc<dyn TelegramHandler>;

/// Wrap a closure as a shareable handler.
pub fn handler_fn<F>(f: F) -> SharedHandler
where
    F: Fn(&Telegram) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn same_handler(a: &SharedHandler, b: &SharedHandler) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Per-address handlers that returned `Ok`. The observer is not counted.
    pub delivered: usize,
    /// The all-messages observer ran and returned `Ok`.
    pub observed: bool,
    /// Handlers that returned an error or panicked, observer included.
    pub failed: usize,
    /// Per-address delivery was skipped for a time broadcast.
    pub suppressed: bool,
}

/// Address to handler routing table.
pub struct Dispatcher {
    routes: RwLock<HashMap<Address, Vec<SharedHandler>>>,
    all_messages: RwLock<Option<SharedHandler>>,
    match_target: AtomicBool,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
            all_messages: RwLock::new(None),
            match_target: AtomicBool::new(false),
        }
    }

    /// Also deliver to handlers registered under the target address.
    pub fn with_match_target(self, enabled: bool) -> Self {
        self.set_match_target(enabled);
        self
    }

    pub fn set_match_target(&self, enabled: bool) {
        self.match_target.store(enabled, Ordering::Relaxed);
    }

    pub fn match_target(&self) -> bool {
        self.match_target.load(Ordering::Relaxed)
    }

    /// Register `handler` for `address`. Returns `false` if it was already
    /// registered there.
    pub fn register(&self, address: Address, handler: SharedHandler) -> bool {
        let mut routes = self.routes.write();
        let handlers = routes.entry(address).or_default();
        if handlers.iter().any(|h| same_handler(h, &handler)) {
            return false;
        }
        handlers.push(handler);
        trace!(category = "dispatch", address = %address, count = handlers.len(), "Handler registered");
        true
    }

    /// Remove one registration. The address entry is dropped with its last
    /// handler.
    pub fn unregister(&self, address: Address, handler: &SharedHandler) -> bool {
        let mut routes = self.routes.write();
        let Some(handlers) = routes.get_mut(&address) else {
            return false;
        };

        let before = handlers.len();
        handlers.retain(|h| !same_handler(h, handler));
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            routes.remove(&address);
        }
        removed
    }

    /// Install the diagnostic observer that sees every telegram, replacing
    /// any previous one.
    pub fn register_all_messages(&self, handler: SharedHandler) {
        *self.all_messages.write() = Some(handler);
    }

    pub fn clear_all_messages(&self) {
        *self.all_messages.write() = None;
    }

    pub fn handler_count(&self, address: Address) -> usize {
        self.routes.read().get(&address).map_or(0, Vec::len)
    }

    pub fn addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.routes.read().keys().copied().collect();
        addresses.sort();
        addresses
    }

    /// Distinct handlers for `telegram`, in registration order.
    fn resolve(&self, telegram: &Telegram) -> Vec<SharedHandler> {
        let routes = self.routes.read();
        let mut selected: Vec<SharedHandler> = Vec::new();

        let mut keys = vec![telegram.source_address];
        if self.match_target() && telegram.target_address != telegram.source_address {
            keys.push(telegram.target_address);
        }

        for key in keys {
            for handler in routes.get(&key).into_iter().flatten() {
                if !selected.iter().any(|h| same_handler(h, handler)) {
                    selected.push(handler.clone());
                }
            }
        }
        selected
    }

    /// Deliver one telegram.
    ///
    /// The all-messages observer is called first and sees everything. Time
    /// broadcasts are then withheld from per-address handlers.
    pub fn on_telegram(&self, telegram: &Telegram) -> DispatchReport {
        let mut report = DispatchReport::default();

        let observer = self.all_messages.read().clone();
        if let Some(observer) = observer {
            let ok = record(&mut report, invoke(&observer, telegram), telegram);
            report.observed = ok;
        }

        if telegram.operate_code.is_time_broadcast() {
            trace!(category = "dispatch", from = %telegram.source_address, "Time broadcast not routed");
            report.suppressed = true;
            return report;
        }

        for handler in self.resolve(telegram) {
            if record(&mut report, invoke(&handler, telegram), telegram) {
                report.delivered += 1;
            }
        }
        report
    }
}

fn invoke(handler: &SharedHandler, telegram: &Telegram) -> Result<(), HandlerError> {
    match catch_unwind(AssertUnwindSafe(|| handler.on_telegram(telegram))) {
        Ok(result) => result,
        Err(panic) => Err(HandlerError::Panicked(panic_message(panic.as_ref()))),
    }
}

/// Count a failure; returns whether the handler succeeded.
fn record(
    report: &mut DispatchReport,
    result: Result<(), HandlerError>,
    telegram: &Telegram,
) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            report.failed += 1;
            warn!(
                category = "dispatch",
                from = %telegram.source_address,
                operate_code = %telegram.operate_code,
                error = %e,
                "Telegram handler failed"
            );
            false
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregister_frees_address() {
        let dispatcher = Dispatcher::new();
        let handler = handler_fn(|_| Ok(()));

        assert!(dispatcher.register(Address::new(1, 10), handler.clone()));
        assert!(!dispatcher.register(Address::new(1, 10), handler.clone()));
        assert_eq!(dispatcher.handler_count(Address::new(1, 10)), 1);

        assert!(dispatcher.unregister(Address::new(1, 10), &handler));
        assert!(dispatcher.addresses().is_empty());
        assert!(!dispatcher.unregister(Address::new(1, 10), &handler));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
