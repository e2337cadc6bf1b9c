/*!
 * Host Runtime Model
 *
 * The lookup and binding machinery the sandbox is inserted into:
 * - Resolution chain: ordered module finders consulted for every import
 * - Global namespace: named operations callable by guest code
 * - Module cache: loaded modules shared across imports
 */

pub mod finders;
pub mod host;
pub mod module;
pub mod namespace;
pub mod resolution;

pub use finders::{BuiltinFinder, SourceFinder};
pub use host::Runtime;
pub use module::{Module, ModuleCache};
pub use namespace::{Callable, GlobalNamespace};
pub use resolution::{
    FindOutcome, ModuleFinder, ModuleOrigin, ModuleSpec, ResolutionChain, ResolutionRequest,
};
