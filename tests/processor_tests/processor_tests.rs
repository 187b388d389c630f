//! Tests for the Command Processor
//!
//! These tests verify:
//! - Permission failures never reach storage
//! - Wrong argument counts never reach storage
//! - Unknown commands are rejected for every identity
//! - Anonymous callers are denied before any existence check
//! - Values round-trip byte for byte
//! - Storage failures are reported without poisoning the processor

use std::sync::Arc;

use kvgate::auth::{Capability, User};
use kvgate::protocol::{Command, Reply};
use kvgate::storage::{MemoryStorage, SledStorage, Storage};
use kvgate::{CommandError, CommandProcessor};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_processor() -> (Arc<MemoryStorage>, CommandProcessor) {
    let storage = Arc::new(MemoryStorage::new());
    let processor = CommandProcessor::new(storage.clone());
    (storage, processor)
}

fn cmd(name: &str, args: &[&str]) -> Command {
    Command::from_parts(name, args.iter().copied())
}

/// One well-formed command per capability
fn commands_requiring(capability: Capability) -> Vec<Command> {
    match capability {
        Capability::Read => vec![cmd("GET", &["k"]), cmd("get", &["other"])],
        Capability::Write => vec![cmd("SET", &["k", "v"]), cmd("Set", &["x", "y"])],
        Capability::Delete => vec![cmd("DELETE", &["k"]), cmd("delete", &["x"])],
    }
}

// =============================================================================
// Permission Gate
// =============================================================================

#[test]
fn test_missing_capability_is_denied_without_storage_call() {
    for missing in Capability::ALL {
        let granted: Vec<_> = Capability::ALL
            .into_iter()
            .filter(|c| *c != missing)
            .collect();
        let user = User::new("partial", granted);

        for command in commands_requiring(missing) {
            let (storage, processor) = setup_processor();
            let result = processor.execute(Some(&user), &command);

            match result {
                Err(CommandError::PermissionDenied { capability, .. }) => {
                    assert_eq!(capability, missing)
                }
                other => panic!("expected PermissionDenied for {:?}, got {:?}", command, other),
            }
            assert_eq!(storage.call_count(), 0, "storage touched by {:?}", command);
        }
    }
}

#[test]
fn test_write_does_not_imply_read_or_delete() {
    let (storage, processor) = setup_processor();
    let writer = User::new("writer", [Capability::Write]);

    assert_eq!(
        processor.execute(Some(&writer), &cmd("SET", &["k", "v"])).unwrap(),
        Reply::Ok
    );
    assert!(matches!(
        processor.execute(Some(&writer), &cmd("GET", &["k"])),
        Err(CommandError::PermissionDenied { .. })
    ));
    assert!(matches!(
        processor.execute(Some(&writer), &cmd("DELETE", &["k"])),
        Err(CommandError::PermissionDenied { .. })
    ));
    assert_eq!(storage.call_count(), 1);
}

#[test]
fn test_anonymous_get_is_denied_not_not_found() {
    let (storage, processor) = setup_processor();
    storage.set(b"exists", b"secret").unwrap();
    let calls_before = storage.call_count();

    for key in ["exists", "missing"] {
        let err = processor.execute(None, &cmd("GET", &[key])).unwrap_err();
        assert_eq!(err.kind(), "PermissionDenied");
    }
    assert_eq!(storage.call_count(), calls_before);
}

#[test]
fn test_anonymous_is_denied_everything() {
    let (storage, processor) = setup_processor();

    for capability in Capability::ALL {
        for command in commands_requiring(capability) {
            assert!(matches!(
                processor.execute(None, &command),
                Err(CommandError::PermissionDenied { .. })
            ));
        }
    }
    assert_eq!(storage.call_count(), 0);
}

// =============================================================================
// Argument Validation
// =============================================================================

#[test]
fn test_wrong_arity_is_malformed_without_storage_call() {
    let admin = User::admin();
    let malformed = [
        cmd("SET", &[]),
        cmd("SET", &["k"]),
        cmd("SET", &["k", "v", "extra"]),
        cmd("GET", &[]),
        cmd("GET", &["a", "b"]),
        cmd("DELETE", &[]),
        cmd("DELETE", &["a", "b"]),
        cmd("PING", &["hello"]),
    ];

    for command in &malformed {
        let (storage, processor) = setup_processor();
        let err = processor.execute(Some(&admin), command).unwrap_err();
        assert_eq!(err.kind(), "MalformedCommand", "for {:?}", command);
        assert_eq!(storage.call_count(), 0);
    }
}

#[test]
fn test_arity_is_checked_before_permission() {
    let (_storage, processor) = setup_processor();

    let err = processor.execute(None, &cmd("GET", &[])).unwrap_err();
    assert_eq!(err.kind(), "MalformedCommand");
}

#[test]
fn test_unsendable_arguments_are_malformed_without_storage_call() {
    let admin = User::admin();
    let malformed = [
        cmd("SET", &["k", ""]),
        cmd("SET", &["k", "two words"]),
        cmd("SET", &["k", "line1\nPermissionDenied: forged"]),
        cmd("SET", &["k\r", "v"]),
        cmd("GET", &["tab\tkey"]),
        cmd("DELETE", &[""]),
    ];

    for command in &malformed {
        let (storage, processor) = setup_processor();
        let err = processor.execute(Some(&admin), command).unwrap_err();
        assert_eq!(err.kind(), "MalformedCommand", "for {:?}", command);
        assert_eq!(storage.call_count(), 0);
    }
}

#[test]
fn test_argument_tokens_are_checked_before_permission() {
    let (_storage, processor) = setup_processor();

    let err = processor.execute(None, &cmd("SET", &["k", "a b"])).unwrap_err();
    assert_eq!(err.kind(), "MalformedCommand");
}

#[test]
fn test_malformed_message_names_usage() {
    let (_storage, processor) = setup_processor();

    let err = processor
        .execute(Some(&User::admin()), &cmd("SET", &["k"]))
        .unwrap_err();
    assert!(err.to_string().contains("SET key value"), "{}", err);
}

// =============================================================================
// Unknown Commands
// =============================================================================

#[test]
fn test_unknown_command_for_any_identity() {
    let reader = User::new("reader", [Capability::Read]);
    let admin = User::admin();

    for identity in [None, Some(&reader), Some(&admin)] {
        let (storage, processor) = setup_processor();
        match processor.execute(identity, &cmd("FROBNICATE", &["k"])) {
            Err(CommandError::UnsupportedCommand(name)) => assert_eq!(name, "FROBNICATE"),
            other => panic!("expected UnsupportedCommand, got {:?}", other),
        }
        assert_eq!(storage.call_count(), 0);
    }
}

// =============================================================================
// Dispatch
// =============================================================================

#[test]
fn test_set_then_get_round_trip() {
    let (_storage, processor) = setup_processor();
    let user = User::new("rw", [Capability::Read, Capability::Write]);
    let value: Vec<u8> = vec![0x00, 0x7f, 0x80, 0xff, b'v'];

    let set = Command::from_parts("SET", [&b"bin"[..], &value[..]]);
    assert_eq!(processor.execute(Some(&user), &set).unwrap(), Reply::Ok);

    let get = Command::from_parts("GET", [&b"bin"[..]]);
    assert_eq!(
        processor.execute(Some(&user), &get).unwrap(),
        Reply::Value(value)
    );
}

#[test]
fn test_get_missing_key_is_not_found() {
    let (_storage, processor) = setup_processor();
    let reader = User::new("reader", [Capability::Read]);

    assert_eq!(
        processor.execute(Some(&reader), &cmd("GET", &["nope"])).unwrap(),
        Reply::NotFound
    );
}

#[test]
fn test_delete_absent_key_succeeds_twice() {
    let (storage, processor) = setup_processor();
    let deleter = User::new("deleter", [Capability::Delete]);

    for _ in 0..2 {
        assert_eq!(
            processor.execute(Some(&deleter), &cmd("DELETE", &["ghost"])).unwrap(),
            Reply::Ok
        );
    }
    assert_eq!(storage.call_count(), 2);
}

#[test]
fn test_delete_then_get() {
    let (_storage, processor) = setup_processor();
    let admin = User::admin();

    processor.execute(Some(&admin), &cmd("SET", &["k", "v"])).unwrap();
    processor.execute(Some(&admin), &cmd("DELETE", &["k"])).unwrap();
    assert_eq!(
        processor.execute(Some(&admin), &cmd("GET", &["k"])).unwrap(),
        Reply::NotFound
    );
}

#[test]
fn test_names_are_case_insensitive() {
    let (_storage, processor) = setup_processor();
    let admin = User::admin();

    processor.execute(Some(&admin), &cmd("sEt", &["k", "v"])).unwrap();
    assert_eq!(
        processor.execute(Some(&admin), &cmd("get", &["k"])).unwrap(),
        Reply::Value(b"v".to_vec())
    );
}

#[test]
fn test_ping_needs_no_identity_or_storage() {
    let (storage, processor) = setup_processor();

    assert_eq!(processor.execute(None, &cmd("ping", &[])).unwrap(), Reply::Pong);
    assert_eq!(storage.call_count(), 0);
}

// =============================================================================
// Storage Failures
// =============================================================================

#[test]
fn test_storage_failure_is_reported_and_recoverable() {
    let (storage, processor) = setup_processor();
    let admin = User::admin();

    storage.set_failing(true);
    let err = processor
        .execute(Some(&admin), &cmd("SET", &["k", "v"]))
        .unwrap_err();
    assert_eq!(err.kind(), "StorageError");
    assert!(matches!(err, CommandError::Storage(_)));

    storage.set_failing(false);
    assert_eq!(
        processor.execute(Some(&admin), &cmd("SET", &["k", "v"])).unwrap(),
        Reply::Ok
    );
}

#[test]
fn test_sled_backed_processor() {
    let storage = SledStorage::temporary().unwrap();
    let processor = CommandProcessor::new(Arc::new(storage));
    let admin = User::admin();

    processor.execute(Some(&admin), &cmd("SET", &["durable", "value"])).unwrap();
    assert_eq!(
        processor.execute(Some(&admin), &cmd("GET", &["durable"])).unwrap(),
        Reply::Value(b"value".to_vec())
    );
    processor.storage().close().unwrap();
}
