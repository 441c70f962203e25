//! Integration test: error-scope pop correlation

mod common;

use common::{drain_returns, harness, Harness, DEVICE};
use gpuwire_core::error::LookupError;
use gpuwire_protocol::commands::ReturnCommand;
use gpuwire_protocol::handle::{ObjectHandle, RequestSerial};
use gpuwire_protocol::status::ErrorType;
use gpuwire_server::ServerError;

#[test]
fn test_pop_reports_type_and_message() {
    let h = harness();
    h.gpu.push_error_scope();

    h.server
        .do_device_pop_error_scope(DEVICE, RequestSerial(42))
        .expect("pop accepted");
    assert!(drain_returns(&h.frames).is_empty());

    h.gpu.complete_error_scope(ErrorType::Validation, "bad arg");

    let returns = drain_returns(&h.frames);
    assert_eq!(
        returns,
        vec![ReturnCommand::DevicePopErrorScopeCallback {
            request_serial: RequestSerial(42),
            error_type: ErrorType::Validation,
            message: "bad arg".to_string(),
        }]
    );
}

#[test]
fn test_pop_without_scope_is_rejected_and_released() {
    let h = harness();

    let result = h.server.do_device_pop_error_scope(DEVICE, RequestSerial(1));
    assert!(matches!(
        result,
        Err(ServerError::NativeRejected { operation: "pop_error_scope" })
    ));
    assert_eq!(h.gpu.pending_error_scopes(), 0);
    assert!(drain_returns(&h.frames).is_empty());

    let stats = h.server.stats().snapshot();
    assert_eq!(stats.requests_accepted, 0);
    assert_eq!(stats.requests_rejected, 1);
}

#[test]
fn test_pop_on_stale_device_is_rejected() {
    let h = harness();
    h.gpu.push_error_scope();

    let result = h
        .server
        .do_device_pop_error_scope(ObjectHandle::new(DEVICE.id, 1), RequestSerial(1));
    assert!(matches!(
        result,
        Err(ServerError::Lookup(LookupError::StaleGeneration { current: 0, .. }))
    ));
    assert_eq!(h.gpu.native_calls(), 0);
}

#[test]
fn test_nested_pops_resolve_independently() {
    let h = harness();
    h.gpu.push_error_scope();
    h.gpu.push_error_scope();

    h.server
        .do_device_pop_error_scope(DEVICE, RequestSerial(1))
        .expect("first pop accepted");
    h.server
        .do_device_pop_error_scope(DEVICE, RequestSerial(2))
        .expect("second pop accepted");

    h.gpu.complete_error_scope(ErrorType::NoError, "");
    h.gpu.complete_error_scope(ErrorType::OutOfMemory, "allocation too large");

    let returns = drain_returns(&h.frames);
    assert_eq!(returns.len(), 2);
    assert_eq!(
        returns[1],
        ReturnCommand::DevicePopErrorScopeCallback {
            request_serial: RequestSerial(2),
            error_type: ErrorType::OutOfMemory,
            message: "allocation too large".to_string(),
        }
    );
}

#[test]
fn test_pop_completed_after_teardown_is_dropped() {
    let Harness { server, gpu, frames } = harness();
    gpu.push_error_scope();
    server
        .do_device_pop_error_scope(DEVICE, RequestSerial(8))
        .expect("pop accepted");

    let stats = server.stats();
    drop(server);
    gpu.complete_error_scope(ErrorType::Validation, "late");

    assert!(drain_returns(&frames).is_empty());
    assert_eq!(stats.snapshot().completions_dropped, 1);
}
