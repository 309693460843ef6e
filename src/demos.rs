//! Small end-to-end scenarios that exercise the public API. They are run by the
//! `typed-z3` binary and double as integration tests.

use std::{fmt, str::FromStr};

use tracing::info;

use crate::{
    context::{with_context, Context, SmtConfig},
    error::{SmtError, SmtResult},
    optimize::Optimizer,
    orders::{SmtEq, SmtPartialOrd},
    solver::Solver,
};

/// The available scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demo {
    /// Two positive integers that sum up to ten.
    Sum,
    /// Two numbers whose sum is ten and difference is zero.
    Puzzle,
    /// A finite float that absorbs an added one.
    Float,
    /// Contradicting constraints.
    Unsat,
    /// A small integer linear program.
    Optimize,
    /// The multiplicative inverse of three modulo 256.
    Bits,
}

impl Demo {
    pub const ALL: [Demo; 6] = [
        Demo::Sum,
        Demo::Puzzle,
        Demo::Float,
        Demo::Unsat,
        Demo::Optimize,
        Demo::Bits,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Demo::Sum => "sum",
            Demo::Puzzle => "puzzle",
            Demo::Float => "float",
            Demo::Unsat => "unsat",
            Demo::Optimize => "optimize",
            Demo::Bits => "bits",
        }
    }
}

impl fmt::Display for Demo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Demo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Demo::ALL
            .into_iter()
            .find(|demo| demo.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Demo::ALL.iter().map(|demo| demo.name()).collect();
                format!("unknown demo `{}`, expected one of {}", s, names.join(", "))
            })
    }
}

/// Run `demo` in a fresh context created from `config`. Returns the printable
/// result. With `print_smt`, the parameters as `set-option` commands and the
/// SMT-LIB text of the solver state are prepended.
pub fn run(demo: Demo, config: &SmtConfig, print_smt: bool) -> SmtResult<String> {
    info!(%demo, "running demo");
    with_context(config, |ctx| {
        let mut out = String::new();
        if print_smt {
            out.push_str(&config.params().to_string());
        }
        let res = match demo {
            Demo::Sum => sum(ctx, &mut out, print_smt),
            Demo::Puzzle => puzzle(ctx, &mut out, print_smt),
            Demo::Float => float(ctx, &mut out, print_smt),
            Demo::Unsat => unsat(ctx, &mut out, print_smt),
            Demo::Optimize => optimize(ctx, &mut out, print_smt),
            Demo::Bits => bits(ctx, &mut out, print_smt),
        }?;
        out.push_str(&res);
        Ok(out)
    })
}

fn smt_text(out: &mut String, print_smt: bool, state: &dyn fmt::Display) {
    if print_smt {
        out.push_str(&state.to_string());
        out.push('\n');
    }
}

fn sum(ctx: &Context, out: &mut String, print_smt: bool) -> SmtResult<String> {
    let x = ctx.int_const("x")?;
    let y = ctx.int_const("y")?;
    let mut solver = Solver::new(ctx)?;
    solver.assert(&(&x + &y).smt_eq(10))?;
    solver.assert(&x.gt(0))?;
    solver.assert(&y.gt(0))?;
    smt_text(out, print_smt, &solver);
    solver.check_model(|model| {
        Ok(format!(
            "x = {}, y = {}",
            model.eval_int(&x)?,
            model.eval_int(&y)?
        ))
    })
}

fn puzzle(ctx: &Context, out: &mut String, print_smt: bool) -> SmtResult<String> {
    let a = ctx.int_const("a")?;
    let b = ctx.int_const("b")?;
    let mut solver = Solver::new(ctx)?;
    solver.assert(&smt_and!((&a + &b).smt_eq(10), (&a - &b).smt_eq(0)))?;
    smt_text(out, print_smt, &solver);
    solver.check_model(|model| {
        Ok(format!(
            "a = {}, b = {}",
            model.eval_int(&a)?,
            model.eval_int(&b)?
        ))
    })
}

fn float(ctx: &Context, out: &mut String, print_smt: bool) -> SmtResult<String> {
    let f = ctx.float_const("f")?;
    let mut solver = Solver::new(ctx)?;
    solver.assert(&(&f + 1.0).fp_eq(&f))?;
    solver.assert(&f.gt(1.0))?;
    solver.assert(&!f.is_infinite())?;
    smt_text(out, print_smt, &solver);
    solver.check_model(|model| Ok(format!("f = {:e}", model.eval_float(&f)?)))
}

fn unsat(ctx: &Context, out: &mut String, print_smt: bool) -> SmtResult<String> {
    let x = ctx.int_const("x")?;
    let y = ctx.int_const("y")?;
    let mut solver = Solver::new(ctx)?;
    solver.assert(&x.gt(&y))?;
    solver.assert(&y.gt(&x))?;
    smt_text(out, print_smt, &solver);
    match solver.check_model(|_| Ok(())) {
        Err(SmtError::Unsat) => Ok("unsat".to_owned()),
        Err(err) => Err(err),
        Ok(()) => Ok("sat".to_owned()),
    }
}

fn optimize(ctx: &Context, out: &mut String, print_smt: bool) -> SmtResult<String> {
    let x = ctx.int_const("x")?;
    let y = ctx.int_const("y")?;
    let mut opt = Optimizer::new(ctx)?;
    opt.assert(&(&x + &y).le(4))?;
    opt.assert(&(&x + 3 * &y).le(6))?;
    opt.assert(&x.ge(0))?;
    opt.assert(&y.ge(0))?;
    let objective = opt.maximize(&(3 * &x + 2 * &y))?;
    smt_text(out, print_smt, &opt);
    let (x, y) = opt.check_model(|model| Ok((model.eval_int(&x)?, model.eval_int(&y)?)))?;
    let best = opt.upper(objective)?.simplify();
    Ok(format!("x = {}, y = {}, objective = {}", x, y, best))
}

fn bits(ctx: &Context, out: &mut String, print_smt: bool) -> SmtResult<String> {
    let x = ctx.bv_const("x", 8)?;
    let mut solver = Solver::new(ctx)?;
    solver.assert(&(&x * 3).smt_eq(1))?;
    smt_text(out, print_smt, &solver);
    solver.check_model(|model| {
        let inverse = model.eval_int(&x)?;
        let halved = model.eval_int(&(&x >> 1))?;
        Ok(format!("x = {}, x >> 1 = {}", inverse, halved))
    })
}
