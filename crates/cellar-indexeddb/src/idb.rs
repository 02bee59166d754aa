//! Low-level IndexedDB helpers using web-sys
//!
//! Bridges the callback-based IndexedDB API into Rust futures. Each host
//! request settles a `futures-channel` oneshot exactly once from exactly
//! one of its terminal events (success/error, plus blocked for open and
//! delete requests). The event closures are owned by the awaiting future,
//! unhooked and dropped once the request settles; nothing is leaked and
//! nothing can fire twice.

use std::cell::RefCell;
use std::rc::Rc;

use futures_channel::oneshot;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    IdbDatabase, IdbFactory, IdbObjectStore, IdbOpenDbRequest, IdbRequest, IdbTransaction,
    IdbTransactionMode, IdbVersionChangeEvent,
};

use crate::error::{js_message, Error, Result};

type EventClosure = Closure<dyn FnMut(web_sys::Event)>;
type Settle<T> = Rc<RefCell<Option<oneshot::Sender<T>>>>;

/// Get the global IndexedDB factory.
///
/// Resolved off the JS global via `Reflect` so the same lookup works in
/// windows and workers; a missing or disabled factory is an
/// [`Error::Environment`].
pub(crate) fn factory() -> Result<IdbFactory> {
    let global = js_sys::global();

    let idb: JsValue = js_sys::Reflect::get(&global, &"indexedDB".into())
        .map_err(|_| Error::Environment("no indexedDB on global".into()))?;

    if idb.is_undefined() || idb.is_null() {
        return Err(Error::Environment("indexedDB is null/undefined".into()));
    }

    idb.dyn_into::<IdbFactory>()
        .map_err(|_| Error::Environment("indexedDB is not an IDBFactory".into()))
}

fn settle<T>(slot: &Settle<T>, value: T) {
    if let Some(tx) = slot.borrow_mut().take() {
        let _ = tx.send(value);
    }
}

fn request_error_message(req: &IdbRequest) -> String {
    req.error()
        .ok()
        .flatten()
        .map(|e| e.message())
        .unwrap_or_else(|| "unknown IndexedDB error".to_string())
}

/// Await an IdbRequest, resolving to its result JsValue.
pub(crate) async fn await_request(req: &IdbRequest) -> Result<JsValue> {
    let (tx, rx) = oneshot::channel::<std::result::Result<JsValue, String>>();
    let slot: Settle<std::result::Result<JsValue, String>> = Rc::new(RefCell::new(Some(tx)));

    let req_success = req.clone();
    let slot_success = slot.clone();
    let on_success: EventClosure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
        let result = req_success.result().unwrap_or(JsValue::UNDEFINED);
        settle(&slot_success, Ok(result));
    }) as Box<dyn FnMut(web_sys::Event)>);

    let req_error = req.clone();
    let slot_error = slot.clone();
    let on_error: EventClosure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
        settle(&slot_error, Err(request_error_message(&req_error)));
    }) as Box<dyn FnMut(web_sys::Event)>);

    req.set_onsuccess(Some(on_success.as_ref().unchecked_ref()));
    req.set_onerror(Some(on_error.as_ref().unchecked_ref()));

    let outcome = rx.await;

    req.set_onsuccess(None);
    req.set_onerror(None);
    drop(on_success);
    drop(on_error);

    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(msg)) => Err(Error::Storage(msg)),
        Err(_) => Err(Error::Storage("request dropped before settling".into())),
    }
}

/// Await an IdbTransaction until it completes, errors, or aborts.
pub(crate) async fn await_transaction(tx: &IdbTransaction) -> Result<()> {
    let (sender, rx) = oneshot::channel::<std::result::Result<(), String>>();
    let slot: Settle<std::result::Result<(), String>> = Rc::new(RefCell::new(Some(sender)));

    let slot_complete = slot.clone();
    let on_complete: EventClosure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
        settle(&slot_complete, Ok(()));
    }) as Box<dyn FnMut(web_sys::Event)>);

    let tx_error = tx.clone();
    let slot_error = slot.clone();
    let on_error: EventClosure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
        let msg = tx_error
            .error()
            .map(|e| e.message())
            .unwrap_or_else(|| "transaction error".to_string());
        settle(&slot_error, Err(msg));
    }) as Box<dyn FnMut(web_sys::Event)>);

    let tx_abort = tx.clone();
    let slot_abort = slot.clone();
    let on_abort: EventClosure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
        let msg = tx_abort
            .error()
            .map(|e| e.message())
            .unwrap_or_else(|| "transaction aborted".to_string());
        settle(&slot_abort, Err(msg));
    }) as Box<dyn FnMut(web_sys::Event)>);

    tx.set_oncomplete(Some(on_complete.as_ref().unchecked_ref()));
    tx.set_onerror(Some(on_error.as_ref().unchecked_ref()));
    tx.set_onabort(Some(on_abort.as_ref().unchecked_ref()));

    let outcome = rx.await;

    tx.set_oncomplete(None);
    tx.set_onerror(None);
    tx.set_onabort(None);
    drop(on_complete);
    drop(on_error);
    drop(on_abort);

    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(msg)) => Err(Error::Storage(msg)),
        Err(_) => Err(Error::Storage("transaction dropped before settling".into())),
    }
}

/// Open (or create) a database at a specific version.
///
/// `upgrade` runs inside the host's upgrade transaction when the requested
/// version exceeds the stored one. A blocked open is surfaced as
/// [`Error::OpenBlocked`] and never retried here.
pub(crate) async fn open_with_version(
    name: &str,
    version: u32,
    mut upgrade: impl FnMut(IdbVersionChangeEvent) + 'static,
) -> Result<IdbDatabase> {
    let factory = factory()?;

    let open_req: IdbOpenDbRequest = factory
        .open_with_u32(name, version)
        .map_err(|e| Error::Storage(js_message(&e)))?;

    let (tx, rx) = oneshot::channel::<Result<JsValue>>();
    let slot: Settle<Result<JsValue>> = Rc::new(RefCell::new(Some(tx)));

    let req_success: IdbRequest = open_req.clone().unchecked_into();
    let slot_success = slot.clone();
    let on_success: EventClosure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
        let result = req_success.result().unwrap_or(JsValue::UNDEFINED);
        settle(&slot_success, Ok(result));
    }) as Box<dyn FnMut(web_sys::Event)>);

    let req_error: IdbRequest = open_req.clone().unchecked_into();
    let slot_error = slot.clone();
    let on_error: EventClosure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
        settle(
            &slot_error,
            Err(Error::Storage(request_error_message(&req_error))),
        );
    }) as Box<dyn FnMut(web_sys::Event)>);

    let name_blocked = name.to_string();
    let slot_blocked = slot.clone();
    let on_blocked: EventClosure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
        settle(
            &slot_blocked,
            Err(Error::OpenBlocked(format!(
                "database `{name_blocked}` is held open at an older version"
            ))),
        );
    }) as Box<dyn FnMut(web_sys::Event)>);

    let on_upgrade: Closure<dyn FnMut(IdbVersionChangeEvent)> =
        Closure::wrap(Box::new(move |event: IdbVersionChangeEvent| {
            upgrade(event);
        }) as Box<dyn FnMut(IdbVersionChangeEvent)>);

    open_req.set_onsuccess(Some(on_success.as_ref().unchecked_ref()));
    open_req.set_onerror(Some(on_error.as_ref().unchecked_ref()));
    open_req.set_onblocked(Some(on_blocked.as_ref().unchecked_ref()));
    open_req.set_onupgradeneeded(Some(on_upgrade.as_ref().unchecked_ref()));

    let outcome = rx.await;

    open_req.set_onsuccess(None);
    open_req.set_onerror(None);
    open_req.set_onblocked(None);
    open_req.set_onupgradeneeded(None);
    drop(on_success);
    drop(on_error);
    drop(on_blocked);
    drop(on_upgrade);

    let value = match outcome {
        Ok(result) => result?,
        Err(_) => return Err(Error::Storage("open request dropped before settling".into())),
    };

    value
        .dyn_into::<IdbDatabase>()
        .map_err(|_| Error::Storage("open result is not an IDBDatabase".into()))
}

/// Delete a database by name, resolving with a confirmation message.
pub(crate) async fn delete_database(name: &str) -> Result<String> {
    let factory = factory()?;

    let req: IdbOpenDbRequest = factory
        .delete_database(name)
        .map_err(|e| Error::Storage(js_message(&e)))?;

    let (tx, rx) = oneshot::channel::<Result<()>>();
    let slot: Settle<Result<()>> = Rc::new(RefCell::new(Some(tx)));

    let slot_success = slot.clone();
    let on_success: EventClosure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
        settle(&slot_success, Ok(()));
    }) as Box<dyn FnMut(web_sys::Event)>);

    let req_error: IdbRequest = req.clone().unchecked_into();
    let slot_error = slot.clone();
    let on_error: EventClosure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
        settle(
            &slot_error,
            Err(Error::Storage(request_error_message(&req_error))),
        );
    }) as Box<dyn FnMut(web_sys::Event)>);

    let name_blocked = name.to_string();
    let slot_blocked = slot.clone();
    let on_blocked: EventClosure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
        settle(
            &slot_blocked,
            Err(Error::OpenBlocked(format!(
                "database `{name_blocked}` cannot be deleted while connections are open"
            ))),
        );
    }) as Box<dyn FnMut(web_sys::Event)>);

    req.set_onsuccess(Some(on_success.as_ref().unchecked_ref()));
    req.set_onerror(Some(on_error.as_ref().unchecked_ref()));
    req.set_onblocked(Some(on_blocked.as_ref().unchecked_ref()));

    let outcome = rx.await;

    req.set_onsuccess(None);
    req.set_onerror(None);
    req.set_onblocked(None);
    drop(on_success);
    drop(on_error);
    drop(on_blocked);

    match outcome {
        Ok(Ok(())) => Ok(format!("database `{name}` removed")),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(Error::Storage(
            "delete request dropped before settling".into(),
        )),
    }
}

/// Start a single-store transaction and open its object store.
pub(crate) fn transaction(
    db: &IdbDatabase,
    store_name: &str,
    mode: IdbTransactionMode,
) -> Result<(IdbTransaction, IdbObjectStore)> {
    let tx = db
        .transaction_with_str_and_mode(store_name, mode)
        .map_err(|e| Error::Storage(js_message(&e)))?;
    let store = tx
        .object_store(store_name)
        .map_err(|e| Error::Storage(js_message(&e)))?;
    Ok((tx, store))
}
