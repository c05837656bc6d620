//! Minimal boolean expression language for policy markers
//!
//! Covers the surface policy authors need: dotted variable access, string
//! and integer literals, `==`/`!=`, `&&`/`||`/`!` and named function calls.
//! Compiled programs are cached by expression text since marker expressions
//! are fixed at declaration time.

mod engine;
mod error;
mod functions;
mod parser;
mod scope;

pub use engine::{CacheStats, Engine};
pub use error::{ExprError, Result};
pub use parser::{parse, Expr};
pub use scope::{EvalScope, ExprFunction};
