/*!
 * Sandbox Limits and Constants
 *
 * Centralized location for sandbox-wide defaults, environment variable names
 * and audit message templates.
 *
 * - Security-critical constants are marked with [SECURITY]
 * - Values read from the environment are marked with [ENV]
 */

use std::time::Duration;

// =============================================================================
// DEADLINE
// =============================================================================

/// Default wall-clock budget for guest code (60 seconds)
pub const DEFAULT_DEADLINE_SECS: u64 = 60;

/// Environment variable holding the deadline in whole seconds
/// [ENV] Invalid or absent values fall back to DEFAULT_DEADLINE_SECS
pub const DEADLINE_ENV_VAR: &str = "AI_OS_SANDBOX_TIMEOUT";

/// Exit status used when the deadline terminates the process
pub const DEADLINE_EXIT_STATUS: i32 = 1;

/// Name of the watchdog thread that enforces the deadline
pub const DEADLINE_THREAD_NAME: &str = "sandbox-deadline";

/// Upper bound on a single watchdog park, so a lost wakeup cannot stall expiry
pub const DEADLINE_MAX_PARK: Duration = Duration::from_secs(1);

// =============================================================================
// AUDIT
// =============================================================================

/// Default audit sink, relative to the working directory
pub const DEFAULT_AUDIT_LOG: &str = "sandbox_blocked_imports.log";

/// [ENV] Override for the audit sink path
pub const AUDIT_LOG_ENV_VAR: &str = "AI_OS_SANDBOX_LOG";

/// [ENV] Optional JSON policy file
pub const POLICY_ENV_VAR: &str = "AI_OS_SANDBOX_POLICY";

/// [ENV] Switches tracing output to JSON
pub const TRACE_JSON_ENV_VAR: &str = "AI_OS_SANDBOX_TRACE_JSON";

/// Audit message emitted by the deadline watchdog
pub const DEADLINE_EXCEEDED_MESSAGE: &str = "Execution stopped due to possible infinite loop!";

// =============================================================================
// CAPABILITIES & POLICY
// =============================================================================

/// Capabilities disabled when no configuration says otherwise
/// [SECURITY] Dynamic evaluation and direct file access
pub const DEFAULT_DISABLED_CAPABILITIES: &[&str] = &["exec", "eval", "open"];

/// Module prefixes denied when no policy is configured
/// [SECURITY] Submodules of every entry are denied as well
pub const DEFAULT_RESTRICTED_MODULES: &[&str] = &[
    // OS & system-level access
    "os", "subprocess", "sys", "threading", "socket", "multiprocessing", "ctypes", "resource",
    // File & directory access
    "shutil", "pathlib", "tempfile",
    // Network & internet access
    "http", "urllib", "ftplib", "smtplib", "poplib", "imaplib", "nntplib", "telnetlib",
    "asyncio", "select", "ssl",
    // Code execution & serialization
    "pickle", "cPickle", "marshal", "shelve", "py_compile", "compileall", "zipimport",
    // Database & external storage
    "sqlite3", "dbm", "anydbm", "dumbdbm", "whichdb", "bz2", "lzma", "zlib",
    // Terminal & input control
    "tkinter", "curses", "readline",
    // Debugging & profiling
    "trace", "tracemalloc", "pdb", "cProfile",
];

/// Default extension searched by the source finder
pub const DEFAULT_SOURCE_EXTENSION: &str = "mod";

/// File stem that marks a package directory for the source finder
pub const PACKAGE_INIT_STEM: &str = "mod";
