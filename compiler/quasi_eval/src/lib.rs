//! Quasi Eval - evaluation engine of the Quasi interpreter.
//!
//! Runs parsed syntax trees of a Go-like language extended with Lisp-style
//! macros. Two strategies share one value model and environment:
//! - [`Interpreter`]: tree-walking, macro-expanding each top-level
//!   statement just before it runs, with approximate untyped float
//!   constants;
//! - [`Compiler`]: expands a whole form once and lowers it to closures,
//!   keeping untyped constants exact until their first typed use.
//!
//! # Architecture
//!
//! - `value` / `types`: the [`Value`] sum type, [`Type`] descriptors and
//!   exact untyped [`Constant`]s
//! - `environment`: reference-counted lexical scopes
//! - `macros`: the macro expander and quasiquote evaluation
//! - `interpreter`: statements, expressions, calls, `defer`/`panic`/`recover`,
//!   goroutines and `select`
//! - `fast`: the compiling evaluator
//! - `operators` / `unary_operators` / `convert`: value-level arithmetic
//!   and conversions
//! - `builtins` / `packages`: predeclared functions and host packages
//!
//! # Example
//!
//! ```ignore
//! let block = quasi_parse::parse_source("x := 6; x * 7")?;
//! let mut interp = quasi_eval::Interpreter::new();
//! let values = interp.eval_ast(block.into_node())?;
//! ```

pub mod builtins;
pub mod convert;
mod environment;
pub mod errors;
pub mod fast;
pub mod interpreter;
mod literal;
mod macros;
mod operators;
pub mod packages;
mod print_handler;
pub mod types;
mod unary_operators;
pub mod value;

use std::sync::Once;

pub use environment::{Binding, BindingKind, Environment};
pub use errors::{ControlAction, EvalError, EvalErrorKind, EvalResult};
pub use fast::{CompiledForm, Compiler};
pub use interpreter::{Interpreter, InterpreterBuilder};
pub use operators::evaluate_binary;
pub use packages::{Package, PackageRegistry};
pub use print_handler::{
    buffer_handler, silent_handler, stdout_handler, BufferPrintHandler, PrintHandlerImpl,
    SharedPrintHandler, StdoutPrintHandler,
};
pub use types::Type;
pub use unary_operators::evaluate_unary;
pub use value::{Constant, Precision, Value, Values};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=quasi_eval=debug` or `RUST_LOG=quasi_eval=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
