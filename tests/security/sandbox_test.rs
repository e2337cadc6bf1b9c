/*!
 * Sandbox Activation Integration Tests
 * Verifies the activated sandbox end to end against a host runtime
 */

use ai_os_sandbox::runtime::{BuiltinFinder, ModuleFinder, Runtime, SourceFinder};
use ai_os_sandbox::security::{
    CallError, DeadlineEnforcer, PolicyConfig, PolicyMode, Sandbox, SandboxConfig,
    GUARD_FINDER_NAME,
};
use ai_os_sandbox::ViolationLogger;
use std::sync::Arc;

fn runtime_with_sources(root: &std::path::Path) -> Runtime {
    Runtime::with_finders([
        Arc::new(BuiltinFinder::new(["math", "socket", "http", "http.client"]))
            as Arc<dyn ModuleFinder>,
        Arc::new(SourceFinder::new([root.to_path_buf()])) as Arc<dyn ModuleFinder>,
    ])
    .with_script_path(root.join("main.mod"))
}

#[test]
fn test_activate_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("sandbox_blocked_imports.log");
    let runtime = runtime_with_sources(dir.path());

    // 0 keeps the process-wide deadline disarmed for the test binary
    let config = SandboxConfig::default()
        .with_timeout(0)
        .with_log_path(&log_path);
    let sandbox = Sandbox::activate(&runtime, config).unwrap();

    assert_eq!(sandbox.policy().mode(), PolicyMode::Denylist);
    assert_eq!(runtime.chain().head_name().as_deref(), Some(GUARD_FINDER_NAME));
    assert!(sandbox.remaining().is_none());

    assert!(runtime.import("math").is_ok());
    assert!(runtime.import("http.client").is_err());
    assert!(runtime.import("socket").is_err());
    assert_eq!(
        runtime.call("open", &["/etc/passwd"]),
        Err(CallError::CapabilityDisabled {
            name: "open".into()
        })
    );

    let contents = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("Attempted import of restricted module: http.client in file: "));
    assert!(lines[1].contains("Attempted import of restricted module: socket in file: "));
    assert!(lines[2].ends_with("Attempted call of disabled capability: open"));
}

#[test]
fn test_source_modules_follow_policy() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("helpers.mod"), "fn helper() {}").unwrap();
    std::fs::write(dir.path().join("secrets.mod"), "token").unwrap();

    let runtime = runtime_with_sources(dir.path());
    let logger = Arc::new(ViolationLogger::disabled());
    let config = SandboxConfig::default()
        .with_policy(PolicyConfig::allowlist(["math", "helpers"]))
        .with_timeout(0);
    Sandbox::activate_with(
        &runtime,
        config,
        Arc::clone(&logger),
        DeadlineEnforcer::with_expiry_action(logger, || {}),
    )
    .unwrap();

    let helpers = runtime.import("helpers").unwrap();
    assert_eq!(helpers.source(), Some("fn helper() {}"));
    assert!(runtime.import("secrets").is_err());
    assert!(runtime.import("socket").is_err());
}

#[test]
fn test_custom_capabilities() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = runtime_with_sources(dir.path());
    runtime
        .namespace()
        .bind("spawn", |_| Ok("spawned".into()))
        .unwrap();

    let logger = Arc::new(ViolationLogger::disabled());
    let config = SandboxConfig::default()
        .with_disabled_capabilities(["spawn"])
        .with_timeout(0);
    let sandbox = Sandbox::activate_with(
        &runtime,
        config,
        Arc::clone(&logger),
        DeadlineEnforcer::with_expiry_action(logger, || {}),
    )
    .unwrap();

    assert!(sandbox.gate().is_disabled("spawn"));
    assert!(runtime.call("spawn", &[]).is_err());
    assert!(runtime.namespace().contains("open"));
    assert!(!runtime.namespace().is_disabled("open"));
}
