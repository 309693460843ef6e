//! Satisfying assignments and evaluation of nodes under them.

use std::{
    fmt::{self, Display, Formatter},
    marker::PhantomData,
    os::raw::c_int,
};

use num::BigInt;
use z3_sys::{
    Z3_ast, Z3_context, Z3_fpa_get_numeral_exponent_int64, Z3_fpa_get_numeral_exponent_string,
    Z3_fpa_get_numeral_sign, Z3_fpa_get_numeral_significand_string,
    Z3_fpa_get_numeral_significand_uint64, Z3_get_bool_value, Z3_get_numeral_int64,
    Z3_get_numeral_string, Z3_inc_ref, Z3_is_numeral_ast, Z3_lbool, Z3_model, Z3_model_dec_ref,
    Z3_model_eval, Z3_model_inc_ref, Z3_model_to_string,
};

use crate::{
    context::Context,
    error::{SmtError, SmtResult},
    node::{Ast, Node},
    sorts::{Bool, Float, IntegerSort, Sort},
    util::z3_string,
};

/// A model produced by a satisfiable check.
///
/// The model borrows the session that produced it (lifetime `'s`), so the
/// session cannot be changed while the model is alive.
pub struct Model<'s, 'ctx> {
    ctx: &'ctx Context,
    model: Z3_model,
    _session: PhantomData<&'s ()>,
}

impl<'s, 'ctx> Model<'s, 'ctx> {
    /// Take a new reference to `model`. A null model is an error.
    pub(crate) fn new(ctx: &'ctx Context, model: Z3_model) -> SmtResult<Self> {
        if model.is_null() {
            ctx.status()?;
            return Err(SmtError::ModelUnavailable);
        }
        ctx.call(|z3| unsafe { Z3_model_inc_ref(z3, model) })?;
        Ok(Model {
            ctx,
            model,
            _session: PhantomData,
        })
    }

    /// Evaluate `node` with model completion, i.e. constants the model does
    /// not mention get an arbitrary value of their sort.
    pub fn eval<S: Sort>(&self, node: &Node<'ctx, S>) -> SmtResult<Node<'ctx, S>> {
        self.eval_with(node, true)
    }

    /// Evaluate `node`. Without `completion`, the result may still contain
    /// uninterpreted constants.
    pub fn eval_with<S: Sort>(
        &self,
        node: &Node<'ctx, S>,
        completion: bool,
    ) -> SmtResult<Node<'ctx, S>> {
        let (model, ast) = (self.model, node.get_z3_ast());
        self.ctx.claim(node.get_ctx());
        let mut out: Z3_ast = std::ptr::null_mut();
        let ok = self
            .ctx
            .call(|z3| unsafe { Z3_model_eval(z3, model, ast, completion, &mut out) })?;
        if !ok || out.is_null() {
            return Err(SmtError::EvalFailed);
        }
        self.ctx.call(|z3| unsafe { Z3_inc_ref(z3, out) })?;
        Ok(Node::from_raw(self.ctx, out))
    }

    pub fn eval_bool(&self, node: &Node<'ctx, Bool>) -> SmtResult<bool> {
        let value = self.eval(node)?;
        let ast = value.get_z3_ast();
        match self.ctx.call(|z3| unsafe { Z3_get_bool_value(z3, ast) })? {
            z3_sys::Z3_L_TRUE => Ok(true),
            z3_sys::Z3_L_FALSE => Ok(false),
            z3_sys::Z3_L_UNDEF => Err(SmtError::ConversionFailed {
                value: value.to_string(),
                target: "bool",
            }),
            other => unreachable!("invalid Z3_lbool value {}", other),
        }
    }

    /// Evaluate to a machine integer. Bit-vectors are read as unsigned.
    pub fn eval_int<S: IntegerSort>(&self, node: &Node<'ctx, S>) -> SmtResult<i64> {
        let value = self.eval(node)?;
        let ast = value.get_z3_ast();
        let mut out: i64 = 0;
        let ok = self.ctx.call(|z3| unsafe {
            Z3_is_numeral_ast(z3, ast) && Z3_get_numeral_int64(z3, ast, &mut out)
        })?;
        if !ok {
            return Err(SmtError::ConversionFailed {
                value: value.to_string(),
                target: "i64",
            });
        }
        Ok(out)
    }

    /// Evaluate to an integer of any size. Bit-vectors are read as unsigned.
    pub fn eval_bigint<S: IntegerSort>(&self, node: &Node<'ctx, S>) -> SmtResult<BigInt> {
        let value = self.eval(node)?;
        let ast = value.get_z3_ast();
        let text = self.ctx.call(|z3| unsafe {
            if Z3_is_numeral_ast(z3, ast) {
                Some(z3_string(Z3_get_numeral_string(z3, ast)))
            } else {
                None
            }
        })?;
        text.and_then(|text| text.parse().ok())
            .ok_or_else(|| SmtError::ConversionFailed {
                value: value.to_string(),
                target: "BigInt",
            })
    }

    /// Evaluate to a double. Special values are recognized first. For other
    /// numerals the bits are read directly. If that is not possible, the
    /// numeral's significand and exponent are parsed from their decimal
    /// representations.
    pub fn eval_float(&self, node: &Node<'ctx, Float>) -> SmtResult<f64> {
        let value = self.eval(node)?;
        let ast = value.get_z3_ast();
        let conversion_failed = || SmtError::ConversionFailed {
            value: value.to_string(),
            target: "f64",
        };

        if !self.ctx.call(|z3| unsafe { Z3_is_numeral_ast(z3, ast) })? {
            return Err(conversion_failed());
        }
        // NaN has no sign, exponent or significand
        if self.eval_bool(&value.is_nan())? {
            return Ok(f64::NAN);
        }
        let sign = if self.eval_bool(&value.is_negative())? {
            -1.0
        } else {
            1.0
        };
        if self.eval_bool(&value.is_infinite())? {
            return Ok(sign * f64::INFINITY);
        }
        if self.eval_bool(&value.is_zero())? {
            return Ok(sign * 0.0);
        }

        let bits = self.ctx.call(|z3| unsafe { float_bits(z3, ast) })?;
        if let Some(bits) = bits {
            return Ok(sign * f64::from_bits(bits));
        }
        let text = self.ctx.call(|z3| unsafe { float_text(z3, ast) })?;
        text.as_deref()
            .and_then(parse_float_numeral)
            .ok_or_else(conversion_failed)
    }
}

/// The magnitude bits of a finite, non-zero double numeral.
unsafe fn float_bits(z3: Z3_context, ast: Z3_ast) -> Option<u64> {
    let mut exponent: i64 = 0;
    let mut significand: u64 = 0;
    let ok = Z3_fpa_get_numeral_exponent_int64(z3, ast, &mut exponent, true)
        && Z3_fpa_get_numeral_significand_uint64(z3, ast, &mut significand);
    if !ok || !(0..0x7ff).contains(&exponent) || significand >> 52 != 0 {
        return None;
    }
    Some((exponent as u64) << 52 | significand)
}

/// The numeral as `mantissa exponent` text, with the sign on the mantissa.
unsafe fn float_text(z3: Z3_context, ast: Z3_ast) -> Option<String> {
    let mut sign: c_int = 0;
    if !Z3_fpa_get_numeral_sign(z3, ast, &mut sign) {
        return None;
    }
    let mantissa = z3_string(Z3_fpa_get_numeral_significand_string(z3, ast));
    let exponent = z3_string(Z3_fpa_get_numeral_exponent_string(z3, ast, false));
    let sign = if sign != 0 { "-" } else { "" };
    Some(format!("{}{} {}", sign, mantissa, exponent))
}

/// Parse a whitespace-separated `mantissa exponent` pair into
/// `mantissa * 2^exponent`.
pub(crate) fn parse_float_numeral(text: &str) -> Option<f64> {
    let mut fields = text.split_whitespace();
    let mantissa: f64 = fields.next()?.parse().ok()?;
    let exponent: i32 = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some(mantissa * 2f64.powi(exponent))
}

impl<'s, 'ctx> Display for Model<'s, 'ctx> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = z3_string(unsafe { Z3_model_to_string(self.ctx.z3(), self.model) });
        f.write_str(&s)
    }
}

impl<'s, 'ctx> fmt::Debug for Model<'s, 'ctx> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Model")
            .field(&format_args!("{}", self))
            .finish()
    }
}

impl<'s, 'ctx> Drop for Model<'s, 'ctx> {
    fn drop(&mut self) {
        unsafe { Z3_model_dec_ref(self.ctx.z3(), self.model) };
    }
}
