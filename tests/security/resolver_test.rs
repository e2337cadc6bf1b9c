/*!
 * Resolution Guard Integration Tests
 * Verifies denial, delegation, reentrancy and state restoration
 */

use ai_os_sandbox::runtime::{
    BuiltinFinder, FindOutcome, ModuleFinder, ModuleOrigin, ModuleSpec, ResolutionChain,
    ResolutionRequest, Runtime,
};
use ai_os_sandbox::security::{
    ImportError, PolicySet, ResolutionGuard, SandboxError, GUARD_FINDER_NAME,
};
use ai_os_sandbox::ViolationLogger;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::thread;

const BUILTINS: &[&str] = &["math", "json", "socket", "os", "os.path", "xml", "xml.etree"];

fn guarded_runtime(policy: PolicySet, logger: Arc<ViolationLogger>) -> (Runtime, Arc<ResolutionGuard>) {
    let runtime = Runtime::with_finders([
        Arc::new(BuiltinFinder::new(BUILTINS.iter().copied())) as Arc<dyn ModuleFinder>
    ])
    .with_script_path("/srv/guest/main.mod");
    let guard = Arc::new(ResolutionGuard::new(Arc::new(policy), logger));
    guard.install(runtime.chain()).unwrap();
    (runtime, guard)
}

/// Finder that panics for one name
struct Exploding;

impl ModuleFinder for Exploding {
    fn name(&self) -> &str {
        "exploding"
    }

    fn find_spec(&self, request: &ResolutionRequest<'_>, _chain: &ResolutionChain) -> FindOutcome {
        if request.fullname == "boom" {
            panic!("finder failure");
        }
        FindOutcome::Pass
    }
}

/// Finder that resolves `app` only if its dependency resolves through the chain
struct WithDependency {
    dependency: &'static str,
}

impl ModuleFinder for WithDependency {
    fn name(&self) -> &str {
        "with_dependency"
    }

    fn find_spec(&self, request: &ResolutionRequest<'_>, chain: &ResolutionChain) -> FindOutcome {
        if request.fullname != "app" {
            return FindOutcome::Pass;
        }
        if chain.resolve(self.dependency, request.requesting_path).is_none() {
            return FindOutcome::NotFound;
        }
        FindOutcome::Found(ModuleSpec {
            name: "app".into(),
            origin: ModuleOrigin::Builtin,
            finder: self.name().into(),
            is_package: false,
        })
    }
}

#[test]
fn test_restricted_import_logs_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("blocked.log");
    let (runtime, guard) = guarded_runtime(
        PolicySet::denylist(["socket", "os"]).unwrap(),
        Arc::new(ViolationLogger::new(&log_path)),
    );

    let err = runtime.import("socket").unwrap_err();
    assert_eq!(err.to_string(), "No module named 'socket'");

    let contents = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with(
        " - WARNING - Attempted import of restricted module: socket in file: /srv/guest/main.mod"
    ));
    assert!(guard.state().is_active());
}

#[test]
fn test_submodule_of_restricted_prefix_denied() {
    let (runtime, _guard) = guarded_runtime(
        PolicySet::denylist(["os"]).unwrap(),
        Arc::new(ViolationLogger::disabled()),
    );

    assert!(runtime.import("os.path").is_err());
    assert!(runtime.import("math").is_ok());
}

#[test]
fn test_allowlisted_import_is_cached_and_restores_state() {
    let (runtime, guard) = guarded_runtime(
        PolicySet::allowlist(["math", "xml.etree"]).unwrap(),
        Arc::new(ViolationLogger::disabled()),
    );

    let first = runtime.import("math").unwrap();
    let second = runtime.import("math").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(guard.state().is_active());

    assert!(runtime.import("xml.etree").is_ok());
    assert!(matches!(
        runtime.import("xml"),
        Err(ImportError::ModuleNotFound { .. })
    ));
    assert!(runtime.import("json").is_err());
}

#[test]
fn test_allowlist_miss_writes_no_audit_line() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("blocked.log");
    let logger = Arc::new(ViolationLogger::new(&log_path));
    let (runtime, _guard) =
        guarded_runtime(PolicySet::allowlist(["math"]).unwrap(), Arc::clone(&logger));

    assert!(runtime.import("socket").is_err());
    assert_eq!(logger.records_written(), 0);
    assert!(!log_path.exists());
}

#[test]
fn test_permitted_names_resolve_as_without_guard() {
    let bare = ResolutionChain::with_finders([
        Arc::new(BuiltinFinder::new(BUILTINS.iter().copied())) as Arc<dyn ModuleFinder>
    ]);
    let (runtime, _guard) = guarded_runtime(
        PolicySet::denylist(["socket"]).unwrap(),
        Arc::new(ViolationLogger::disabled()),
    );

    for name in ["math", "json", "os", "os.path", "xml", "xml.etree", "missing"] {
        let path = Path::new("/srv/guest/main.mod");
        assert_eq!(
            runtime.chain().resolve(name, path),
            bare.resolve(name, path),
            "{name} should resolve identically"
        );
    }
}

#[test]
fn test_panicking_finder_restores_state() {
    let (runtime, guard) = guarded_runtime(
        PolicySet::denylist(["socket"]).unwrap(),
        Arc::new(ViolationLogger::disabled()),
    );
    runtime.chain().push(Arc::new(Exploding));

    let outcome = catch_unwind(AssertUnwindSafe(|| runtime.import("boom")));
    assert!(outcome.is_err());

    assert!(guard.state().is_active());
    assert_eq!(runtime.chain().head_name().as_deref(), Some(GUARD_FINDER_NAME));
    assert!(runtime.import("math").is_ok());
    assert!(runtime.import("socket").is_err());
}

#[test]
fn test_dependencies_are_checked_separately() {
    let (runtime, _guard) = guarded_runtime(
        PolicySet::denylist(["socket"]).unwrap(),
        Arc::new(ViolationLogger::disabled()),
    );
    runtime
        .chain()
        .push(Arc::new(WithDependency { dependency: "socket" }));
    assert!(runtime.import("app").is_err());

    let (runtime, guard) = guarded_runtime(
        PolicySet::denylist(["socket"]).unwrap(),
        Arc::new(ViolationLogger::disabled()),
    );
    runtime
        .chain()
        .push(Arc::new(WithDependency { dependency: "math" }));
    assert_eq!(runtime.import("app").unwrap().spec().finder, "with_dependency");
    assert!(guard.state().is_active());
}

#[test]
fn test_guard_cannot_be_bypassed() {
    let (runtime, _guard) = guarded_runtime(
        PolicySet::denylist(["socket"]).unwrap(),
        Arc::new(ViolationLogger::disabled()),
    );

    assert_eq!(
        runtime.chain().remove(GUARD_FINDER_NAME).err(),
        Some(SandboxError::GuardPinned(GUARD_FINDER_NAME.into()))
    );

    runtime
        .chain()
        .insert_head(Arc::new(BuiltinFinder::named("smuggler", ["socket"])));
    assert_eq!(
        runtime.chain().finder_names(),
        vec![GUARD_FINDER_NAME, "smuggler", "builtin"]
    );
    assert!(runtime.import("socket").is_err());

    let second = Arc::new(ResolutionGuard::new(
        Arc::new(PolicySet::denylist(Vec::<String>::new()).unwrap()),
        Arc::new(ViolationLogger::disabled()),
    ));
    assert_eq!(
        second.install(runtime.chain()),
        Err(SandboxError::GuardAlreadyInstalled)
    );
}

#[test]
fn test_concurrent_imports_keep_per_thread_state() {
    let (runtime, guard) = guarded_runtime(
        PolicySet::denylist(["socket", "os"]).unwrap(),
        Arc::new(ViolationLogger::disabled()),
    );
    let runtime = Arc::new(runtime);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let runtime = Arc::clone(&runtime);
            let guard = Arc::clone(&guard);
            thread::spawn(move || {
                for _ in 0..200 {
                    let name = if i % 2 == 0 { "math" } else { "json" };
                    assert!(runtime.import(name).is_ok());
                    assert!(runtime.import("socket").is_err());
                    assert!(guard.state().is_active());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let stats = guard.stats();
    assert_eq!(stats.denied, 8 * 200);
    assert_eq!(stats.delegated, 8 * 200);
}
