//! Dispatcher routing tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use buspro_bus::{handler_fn, Dispatcher, HandlerError, SharedHandler, TelegramHandler};
use buspro_core::{Address, OperateCode, Telegram};

fn from(source: Address, code: OperateCode) -> Telegram {
    Telegram::new(Address::CONTROLLER, code, vec![1, 100]).with_source(source)
}

fn counting() -> (SharedHandler, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let handler = handler_fn(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    (handler, count)
}

#[test]
fn test_duplicate_registration_invokes_once() {
    let dispatcher = Dispatcher::new();
    let (handler, count) = counting();
    let dimmer = Address::new(1, 10);

    dispatcher.register(dimmer, handler.clone());
    dispatcher.register(dimmer, handler.clone());

    let report = dispatcher.on_telegram(&from(dimmer, OperateCode::SINGLE_CHANNEL_CONTROL_RESPONSE));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(report.delivered, 1);
}

#[test]
fn test_failing_handler_does_not_block_others() {
    let dispatcher = Dispatcher::new();
    let dimmer = Address::new(1, 10);

    let failing = handler_fn(|_| Err(HandlerError::failed("bad payload")));
    let panicking = handler_fn(|_| panic!("handler exploded"));
    let (healthy, count) = counting();

    dispatcher.register(dimmer, failing);
    dispatcher.register(dimmer, panicking);
    dispatcher.register(dimmer, healthy);

    let report = dispatcher.on_telegram(&from(dimmer, OperateCode::SINGLE_CHANNEL_CONTROL_RESPONSE));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 2);
}

#[test]
fn test_registration_order_is_call_order() {
    let dispatcher = Dispatcher::new();
    let dimmer = Address::new(1, 10);
    let calls = Arc::new(Mutex::new(Vec::new()));

    for tag in ["first", "second", "third"] {
        let calls = calls.clone();
        dispatcher.register(
            dimmer,
            handler_fn(move |_| {
                calls.lock().push(tag);
                Ok(())
            }),
        );
    }

    dispatcher.on_telegram(&from(dimmer, OperateCode::READ_STATUS_OF_CHANNELS_RESPONSE));
    assert_eq!(*calls.lock(), vec!["first", "second", "third"]);
}

#[test]
fn test_routes_by_source_only_by_default() {
    let dispatcher = Dispatcher::new();
    let (handler, count) = counting();
    dispatcher.register(Address::new(1, 20), handler);

    // Telegram from 1.10 addressed to 1.20.
    let telegram = Telegram::new(Address::new(1, 20), OperateCode::SINGLE_CHANNEL_CONTROL, vec![])
        .with_source(Address::new(1, 10));
    dispatcher.on_telegram(&telegram);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_match_target_delivers_union_once() {
    let dispatcher = Dispatcher::new().with_match_target(true);
    let (shared, shared_count) = counting();
    let (target_only, target_count) = counting();

    dispatcher.register(Address::new(1, 10), shared.clone());
    dispatcher.register(Address::new(1, 20), shared);
    dispatcher.register(Address::new(1, 20), target_only);

    let telegram = Telegram::new(Address::new(1, 20), OperateCode::SINGLE_CHANNEL_CONTROL, vec![])
        .with_source(Address::new(1, 10));
    let report = dispatcher.on_telegram(&telegram);

    assert_eq!(shared_count.load(Ordering::SeqCst), 1);
    assert_eq!(target_count.load(Ordering::SeqCst), 1);
    assert_eq!(report.delivered, 2);
}

#[test]
fn test_time_broadcast_only_reaches_observer() {
    let dispatcher = Dispatcher::new();
    let clock = Address::new(1, 100);
    let (handler, count) = counting();
    let (observer, observed) = counting();

    dispatcher.register(clock, handler);
    dispatcher.register_all_messages(observer);

    let report = dispatcher.on_telegram(&from(clock, OperateCode::BROADCAST_SYSTEM_DATE_TIME));
    assert!(report.suppressed);
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(observed.load(Ordering::SeqCst), 1);

    dispatcher.on_telegram(&from(clock, OperateCode::SINGLE_CHANNEL_CONTROL_RESPONSE));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(observed.load(Ordering::SeqCst), 2);
}

#[test]
fn test_observer_sees_unregistered_addresses() {
    let dispatcher = Dispatcher::new();
    let (observer, observed) = counting();
    dispatcher.register_all_messages(observer);

    let report = dispatcher.on_telegram(&from(Address::new(9, 9), OperateCode::new(0x1234)));
    assert_eq!(observed.load(Ordering::SeqCst), 1);
    assert!(report.observed);
    assert_eq!(report.delivered, 0);

    dispatcher.clear_all_messages();
    dispatcher.on_telegram(&from(Address::new(9, 9), OperateCode::new(0x1234)));
    assert_eq!(observed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_observer_not_counted_as_delivery() {
    let dispatcher = Dispatcher::new();
    let dimmer = Address::new(1, 10);
    let (handler, count) = counting();
    let (observer, observed) = counting();
    dispatcher.register(dimmer, handler);
    dispatcher.register_all_messages(observer);

    let report = dispatcher.on_telegram(&from(dimmer, OperateCode::SINGLE_CHANNEL_CONTROL_RESPONSE));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(observed.load(Ordering::SeqCst), 1);
    assert_eq!(report.delivered, 1);
    assert!(report.observed);
    assert_eq!(report.failed, 0);
}

#[test]
fn test_failing_observer_counts_as_failure() {
    let dispatcher = Dispatcher::new();
    dispatcher.register_all_messages(handler_fn(|_| Err(HandlerError::failed("observer down"))));

    let report = dispatcher.on_telegram(&from(Address::new(1, 10), OperateCode::new(0x1234)));
    assert!(!report.observed);
    assert_eq!(report.delivered, 0);
    assert_eq!(report.failed, 1);
}

struct SelfRemoving {
    dispatcher: Arc<Dispatcher>,
    me: Mutex<Option<SharedHandler>>,
    calls: AtomicUsize,
}

impl TelegramHandler for SelfRemoving {
    fn on_telegram(&self, telegram: &Telegram) -> Result<(), HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(me) = self.me.lock().take() {
            self.dispatcher.unregister(telegram.source_address, &me);
        }
        Ok(())
    }
}

#[test]
fn test_handler_can_unregister_itself() {
    let dispatcher = Arc::new(Dispatcher::new());
    let dimmer = Address::new(1, 10);
    let handler = Arc::new(SelfRemoving {
        dispatcher: dispatcher.clone(),
        me: Mutex::new(None),
        calls: AtomicUsize::new(0),
    });
    let shared: SharedHandler = handler.clone();
    *handler.me.lock() = Some(shared.clone());
    dispatcher.register(dimmer, shared);

    dispatcher.on_telegram(&from(dimmer, OperateCode::SINGLE_CHANNEL_CONTROL_RESPONSE));
    dispatcher.on_telegram(&from(dimmer, OperateCode::SINGLE_CHANNEL_CONTROL_RESPONSE));

    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    assert_eq!(dispatcher.handler_count(dimmer), 0);
}
