//! Grammar productions, split by syntactic category.
//!
//! - `stmt.rs`: statements, blocks and control clauses
//! - `decl.rs`: `var`, `const`, `type`, `import`, `func` and `~macro`
//! - `expr.rs`: operators, operands, postfix forms and composite literals
//! - `ty.rs`: type expressions and signatures

mod decl;
mod expr;
mod stmt;
mod ty;
