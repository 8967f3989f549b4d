//! `InterpreterBuilder` for creating interpreters with non-default
//! configuration.

use super::{universe, Interpreter, Shared};
use crate::environment::Environment;
use crate::packages::PackageRegistry;
use crate::print_handler::{stdout_handler, SharedPrintHandler};
use crate::value::Precision;
use std::sync::Arc;

/// Default bound on macro rewrites while expanding one form.
pub const DEFAULT_MAX_MACRO_EXPANSIONS: usize = 1024;

/// Default bound on nested calls in one goroutine.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Builder for [`Interpreter`].
///
/// Defaults: approximate constants, stdout output, the built-in package
/// set, and a REPL scope in which `:=` and declarations may redefine names.
pub struct InterpreterBuilder {
    max_macro_expansions: usize,
    max_call_depth: usize,
    repl_redefinition: bool,
    print_handler: Option<SharedPrintHandler>,
    packages: Option<PackageRegistry>,
    precision: Precision,
}

impl Default for InterpreterBuilder {
    fn default() -> Self {
        InterpreterBuilder::new()
    }
}

impl InterpreterBuilder {
    pub fn new() -> Self {
        InterpreterBuilder {
            max_macro_expansions: DEFAULT_MAX_MACRO_EXPANSIONS,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            repl_redefinition: true,
            print_handler: None,
            packages: None,
            precision: Precision::Approx,
        }
    }

    /// Bound the number of macro rewrites per expanded form. Exceeding it
    /// is a `MacroExpansionOverflow` error.
    #[must_use]
    pub fn max_macro_expansions(mut self, limit: usize) -> Self {
        self.max_macro_expansions = limit;
        self
    }

    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Whether top-level declarations and `:=` may rebind existing names.
    ///
    /// When disabled the REPL scope behaves like any block scope: `:=`
    /// needs a new name and a duplicate declaration is an error.
    #[must_use]
    pub fn repl_redefinition(mut self, enabled: bool) -> Self {
        self.repl_redefinition = enabled;
        self
    }

    /// Set where `print`, `println` and `fmt` write.
    #[must_use]
    pub fn print_handler(mut self, handler: SharedPrintHandler) -> Self {
        self.print_handler = Some(handler);
        self
    }

    /// Replace the importable packages.
    #[must_use]
    pub fn packages(mut self, packages: PackageRegistry) -> Self {
        self.packages = Some(packages);
        self
    }

    /// Representation of untyped float constants. The tree-walking
    /// interpreter defaults to [`Precision::Approx`].
    #[must_use]
    pub fn precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn build(self) -> Interpreter {
        let universe = universe();
        let globals = if self.repl_redefinition {
            Environment::new_top_level(&universe)
        } else {
            universe.child()
        };
        let shared = Shared {
            universe,
            packages: self.packages.unwrap_or_else(PackageRegistry::with_defaults),
            print: self.print_handler.unwrap_or_else(stdout_handler),
            max_macro_expansions: self.max_macro_expansions,
            max_call_depth: self.max_call_depth,
            repl_redefinition: self.repl_redefinition,
        };
        tracing::debug!(
            precision = ?self.precision,
            repl_redefinition = self.repl_redefinition,
            "interpreter built"
        );
        Interpreter {
            globals,
            shared: Arc::new(shared),
            frames: Vec::new(),
            precision: self.precision,
            next_call_deferred: false,
        }
    }
}
