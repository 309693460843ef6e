//! Sort-checked SMT expressions on top of Z3's C API.
//!
//! Every Z3 term is wrapped in a [`Node`] that carries its sort as a type
//! parameter ([`sorts::Bool`], [`sorts::Int`], [`sorts::BitVec`],
//! [`sorts::Float`]). The usual Rust operators are implemented for nodes (see
//! [`ops`]), so adding a Boolean to a bit-vector is a compile error instead of
//! a Z3 error at runtime. Native literals on one side of an operator are
//! converted using the sort of the node on the other side ([`ops::Coerce`]).
//!
//! All handles live inside a [`Context`], which is created and torn down by
//! [`with_context`]. Errors reported by Z3 itself are recorded by an error
//! handler installed on the context and returned as [`SmtError`] from the next
//! fallible operation (see [`context`]).
//!
//! Constraints are checked with a [`Solver`] (with scoped backtracking frames
//! via [`Solver::push`]) or an [`Optimizer`]. A satisfiable check yields a
//! [`Model`] that evaluates nodes to concrete values.
//!
//! ```no_run
//! use typed_z3::{with_default_context, orders::SmtEq, Solver};
//!
//! let (x, y) = with_default_context(|ctx| {
//!     let x = ctx.int_const("x")?;
//!     let y = ctx.int_const("y")?;
//!     let mut solver = Solver::new(ctx)?;
//!     solver.assert(&(&x + &y).smt_eq(10))?;
//!     solver.check_model(|model| Ok((model.eval_int(&x)?, model.eval_int(&y)?)))
//! })
//! .unwrap();
//! assert_eq!(x + y, 10);
//! ```

#[macro_use]
pub mod util;
pub mod context;
pub mod error;
pub mod logging;
pub mod model;
pub mod node;
pub mod ops;
pub mod optimize;
pub mod orders;
pub mod params;
pub mod quantifiers;
pub mod solver;
pub mod sorts;
pub mod version;

pub mod demos;

#[cfg(test)]
mod test;

pub use context::{with_context, with_default_context, Context, SmtConfig};
pub use error::{SmtError, SmtResult};
pub use model::Model;
pub use node::{Ast, Node};
pub use optimize::{Objective, Optimizer};
pub use solver::{SatResult, Solver};
