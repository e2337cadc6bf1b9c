/*!
 * AI-OS Sandbox - Demonstration Entry Point
 *
 * Activates the sandbox from the environment, then imports each module
 * named on the command line and reports the outcome.
 *
 * Usage: sandbox [--spin] [MODULE]...
 *
 * `--spin` busy-loops after the imports, leaving the deadline to end the
 * process.
 */

use ai_os_sandbox::{
    init_tracing, BuiltinFinder, ModuleFinder, Runtime, Sandbox, SandboxConfig, SourceFinder,
};
use std::sync::Arc;
use tracing::info;

/// Modules the demo host pretends to have compiled in
const DEMO_BUILTINS: &[&str] = &[
    "collections",
    "http",
    "http.client",
    "json",
    "math",
    "os",
    "os.path",
    "re",
    "socket",
    "subprocess",
    "xml",
    "xml.etree",
    "xml.etree.ElementTree",
];

fn main() -> miette::Result<()> {
    init_tracing();

    let mut spin = false;
    let mut modules = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--spin" => spin = true,
            _ => modules.push(arg),
        }
    }

    let config = SandboxConfig::from_env()?;

    let mut finders: Vec<Arc<dyn ModuleFinder>> =
        vec![Arc::new(BuiltinFinder::new(DEMO_BUILTINS.iter().copied())) as Arc<dyn ModuleFinder>];
    if let Ok(cwd) = std::env::current_dir() {
        finders.push(Arc::new(SourceFinder::new([cwd])));
    }
    let runtime = Runtime::with_finders(finders);

    let sandbox = Sandbox::activate(&runtime, config)?;
    info!(finders = ?runtime.chain().finder_names(), "host runtime ready");

    for name in &modules {
        match runtime.import(name) {
            Ok(module) => println!("imported {} via {}", module.name(), module.spec().finder),
            Err(e) => println!("blocked {name}: {e}"),
        }
    }

    if spin {
        info!(remaining = ?sandbox.remaining(), "spinning until the deadline");
        loop {
            std::hint::spin_loop();
        }
    }

    let stats = sandbox.guard().stats();
    info!(
        intercepted = stats.intercepted,
        denied = stats.denied,
        audit_records = sandbox.logger().records_written(),
        "done"
    );
    Ok(())
}
