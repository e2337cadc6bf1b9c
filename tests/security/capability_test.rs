/*!
 * Capability Gate Integration Tests
 */

use ai_os_sandbox::runtime::GlobalNamespace;
use ai_os_sandbox::security::{CallError, CapabilityGate};
use ai_os_sandbox::ViolationLogger;
use std::sync::Arc;

#[test]
fn test_disabled_names_refuse_every_call() {
    let namespace = GlobalNamespace::with_default_bindings();
    namespace.bind("eval", |args| Ok(args.join(""))).unwrap();

    CapabilityGate::disable(
        &namespace,
        ["exec", "eval", "open"],
        Arc::new(ViolationLogger::disabled()),
    )
    .unwrap();

    for _ in 0..3 {
        for name in ["exec", "eval", "open"] {
            assert_eq!(
                namespace.call(name, &["1 + 1"]),
                Err(CallError::CapabilityDisabled { name: name.into() })
            );
        }
    }
}

#[test]
fn test_disabled_names_stay_disabled() {
    let namespace = GlobalNamespace::with_default_bindings();
    CapabilityGate::disable(&namespace, ["open"], Arc::new(ViolationLogger::disabled())).unwrap();

    assert_eq!(
        namespace.bind("open", |_| Ok("reopened".into())),
        Err(CallError::CapabilityDisabled {
            name: "open".into()
        })
    );
    assert!(namespace.call("open", &[]).is_err());
    assert_eq!(namespace.disabled_names(), vec!["open"]);
}

#[test]
fn test_other_bindings_untouched() {
    let namespace = GlobalNamespace::with_default_bindings();
    namespace.bind("len", |args| Ok(args.len().to_string())).unwrap();
    CapabilityGate::disable(&namespace, ["open"], Arc::new(ViolationLogger::disabled())).unwrap();

    assert_eq!(namespace.call("len", &["a", "b"]), Ok("2".into()));
    assert_eq!(
        namespace.call("missing", &[]),
        Err(CallError::UnknownName("missing".into()))
    );
}

#[test]
fn test_each_disabled_call_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.log");
    let logger = Arc::new(ViolationLogger::new(&path));
    let namespace = GlobalNamespace::with_default_bindings();
    CapabilityGate::disable(&namespace, ["exec", "eval"], Arc::clone(&logger)).unwrap();

    let _ = namespace.call("exec", &["rm -rf /"]);
    let _ = namespace.call("eval", &["1"]);

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("Attempted call of disabled capability: exec"));
    assert!(lines[1].ends_with("Attempted call of disabled capability: eval"));
    assert_eq!(logger.records_written(), 2);
}
