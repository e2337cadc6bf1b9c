/*!
 * Sandbox
 *
 * Activation of the in-process sandbox:
 * - Capability gate over the global namespace
 * - Configuration from defaults, JSON and the environment
 * - The activation sequence itself
 */

pub mod capability;
pub mod config;
pub mod manager;

pub use capability::CapabilityGate;
pub use config::{parse_timeout, PolicyConfig, SandboxConfig};
pub use manager::Sandbox;
