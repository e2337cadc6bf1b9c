/*!
 * Module Finders
 * Default finders shipped with the host runtime
 */

use super::resolution::{
    FindOutcome, ModuleFinder, ModuleOrigin, ModuleSpec, ResolutionChain, ResolutionRequest,
};
use crate::core::limits::{DEFAULT_SOURCE_EXTENSION, PACKAGE_INIT_STEM};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Finder for modules compiled into the host
pub struct BuiltinFinder {
    name: String,
    modules: BTreeSet<String>,
}

impl BuiltinFinder {
    pub fn new<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::named("builtin", modules)
    }

    /// Builtin finder registered under a custom name
    pub fn named<I, S>(name: impl Into<String>, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            modules: modules.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, fullname: &str) -> bool {
        self.modules.contains(fullname)
    }

    /// A builtin is a package when another builtin lives under it
    fn is_package(&self, fullname: &str) -> bool {
        let prefix = format!("{fullname}.");
        self.modules
            .range(prefix.clone()..)
            .next()
            .is_some_and(|next| next.starts_with(&prefix))
    }
}

impl ModuleFinder for BuiltinFinder {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_spec(&self, request: &ResolutionRequest<'_>, _chain: &ResolutionChain) -> FindOutcome {
        if !self.contains(request.fullname) {
            return FindOutcome::Pass;
        }

        FindOutcome::Found(ModuleSpec {
            name: request.fullname.to_string(),
            origin: ModuleOrigin::Builtin,
            finder: self.name.clone(),
            is_package: self.is_package(request.fullname),
        })
    }
}

/// Finder for modules stored as source files under a set of roots
///
/// `a.b` resolves to `<root>/a/b.<ext>` or, for packages,
/// `<root>/a/b/mod.<ext>`. Roots are searched in order.
pub struct SourceFinder {
    roots: Vec<PathBuf>,
    extension: String,
}

impl SourceFinder {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
            extension: DEFAULT_SOURCE_EXTENSION.to_string(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Relative path for a dotted name, or `None` when a component could
    /// escape the root
    fn relative_path(fullname: &str) -> Option<PathBuf> {
        let mut relative = PathBuf::new();
        for component in fullname.split('.') {
            let valid = !component.is_empty()
                && component
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return None;
            }
            relative.push(component);
        }
        Some(relative)
    }
}

impl ModuleFinder for SourceFinder {
    fn name(&self) -> &str {
        "source"
    }

    fn find_spec(&self, request: &ResolutionRequest<'_>, _chain: &ResolutionChain) -> FindOutcome {
        self.locate(request.fullname).into()
    }
}

impl SourceFinder {
    fn locate(&self, fullname: &str) -> Option<ModuleSpec> {
        let relative = Self::relative_path(fullname)?;

        for root in &self.roots {
            let base = root.join(&relative);

            let module_file = base.with_extension(&self.extension);
            if module_file.is_file() {
                return Some(ModuleSpec {
                    name: fullname.to_string(),
                    origin: ModuleOrigin::Source(module_file),
                    finder: self.name().to_string(),
                    is_package: false,
                });
            }

            let package_file = base.join(PACKAGE_INIT_STEM).with_extension(&self.extension);
            if package_file.is_file() {
                return Some(ModuleSpec {
                    name: fullname.to_string(),
                    origin: ModuleOrigin::Source(package_file),
                    finder: self.name().to_string(),
                    is_package: true,
                });
            }
        }

        None
    }
}
