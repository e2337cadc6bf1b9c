/*!
 * Monitoring
 * Violation audit trail and structured tracing
 */

mod audit;
mod tracer;

pub use audit::{AuditRecord, AuditSeverity, AuditStats, ViolationLogger};
pub use tracer::{init_tracing, span_resolution, ResolutionSpan};
