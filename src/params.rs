//! Z3 parameters and where they are applied.
//!
//! Z3 takes a small, fixed set of _context_ parameters when a context is
//! created, e.g. `timeout`, `proof` or `rlimit`. Everything else belongs to a
//! solver or an optimizer, e.g. `smt.random_seed` or `opt.priority`, and is
//! ignored with nothing but a warning if it is given to the context.
//!
//! [`SmtParams`] holds both kinds in insertion order. When a context is
//! created, the session parameters are resolved once against the parameter
//! descriptions of a fresh solver and a fresh optimizer ([`SessionParams`]).
//! Each [`Solver`](crate::Solver) and [`Optimizer`](crate::Optimizer) made on
//! the context then receives the parameters it accepts. A key that neither
//! accepts, or a value that does not parse as the parameter's type, is an
//! [`SmtError::Library`] error of the context.

use std::{
    ffi::{CStr, CString},
    fmt::{self, Display, Formatter},
};

use indexmap::IndexMap;
use tracing::trace;
use z3_sys::{
    ErrorCode, ParamKind, Z3_context, Z3_mk_optimize, Z3_mk_params, Z3_mk_solver,
    Z3_mk_string_symbol, Z3_optimize_dec_ref, Z3_optimize_get_param_descrs, Z3_optimize_inc_ref,
    Z3_param_descrs, Z3_param_descrs_dec_ref, Z3_param_descrs_get_kind, Z3_param_descrs_inc_ref,
    Z3_params, Z3_params_dec_ref, Z3_params_inc_ref, Z3_params_set_bool, Z3_params_set_double,
    Z3_params_set_symbol, Z3_params_set_uint, Z3_solver_dec_ref, Z3_solver_get_param_descrs,
    Z3_solver_inc_ref,
};

use crate::{
    context::Context,
    error::{SmtError, SmtResult},
    solver::null_handle,
};

/// Parameters Z3 accepts on a context configuration, with their types.
const CONTEXT_PARAMS: &[(&str, ParamKind)] = &[
    ("auto_config", ParamKind::Bool),
    ("debug_ref_count", ParamKind::Bool),
    ("dot_proof_file", ParamKind::String),
    ("dump_models", ParamKind::Bool),
    ("model", ParamKind::Bool),
    ("model_validate", ParamKind::Bool),
    ("proof", ParamKind::Bool),
    ("rlimit", ParamKind::UInt),
    ("smtlib2_compliant", ParamKind::Bool),
    ("stats", ParamKind::Bool),
    ("timeout", ParamKind::UInt),
    ("trace", ParamKind::Bool),
    ("trace_file_name", ParamKind::String),
    ("type_check", ParamKind::Bool),
    ("unsat_core", ParamKind::Bool),
    ("well_sorted_check", ParamKind::Bool),
];

fn context_param_kind(key: &str) -> Option<ParamKind> {
    CONTEXT_PARAMS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, kind)| *kind)
}

/// SMT parameters that we set, preserving insertion order of keys.
#[derive(Debug, Default, Clone)]
pub struct SmtParams {
    /// The parameter settings, from key to value.
    params: IndexMap<String, String>,
}

impl SmtParams {
    /// Set a parameter. Setting a key again replaces the value but keeps the
    /// key's position.
    pub fn set_param(&mut self, key: &str, value: &str) {
        self.params.insert(key.to_owned(), value.to_owned());
    }

    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(|value| value.as_str())
    }

    /// Iterate over the parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Whether `key` is set on the context configuration instead of on
    /// sessions.
    pub fn is_context_param(key: &str) -> bool {
        context_param_kind(key).is_some()
    }

    /// The context parameters, checked against their types.
    pub(crate) fn context_entries(&self) -> SmtResult<Vec<(CString, CString)>> {
        self.iter()
            .filter_map(|(key, value)| Some((key, value, context_param_kind(key)?)))
            .map(|(key, value, kind)| {
                parse_value(key, value, kind)?;
                Ok((c_string(key)?, c_string(value)?))
            })
            .collect()
    }

    fn session_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(key, _)| !Self::is_context_param(key))
    }
}

/// Prints the params as SMT-LIB `set-option` commands. Note that this Display
/// impl will not do any escaping.
impl Display for SmtParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (key, value) in self.iter() {
            writeln!(f, "(set-option :{} {})", key, value)?;
        }
        Ok(())
    }
}

fn c_string(text: &str) -> SmtResult<CString> {
    CString::new(text).map_err(|_| SmtError::InvalidName(text.to_owned()))
}

fn invalid_param(message: String) -> SmtError {
    SmtError::Library {
        code: ErrorCode::InvalidArg,
        message,
    }
}

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParamValue {
    UInt(u32),
    Bool(bool),
    Double(f64),
    Symbol(CString),
}

fn parse_value(key: &str, value: &str, kind: ParamKind) -> SmtResult<ParamValue> {
    let parsed = match kind {
        ParamKind::UInt => value.parse().ok().map(ParamValue::UInt),
        ParamKind::Bool => value.parse().ok().map(ParamValue::Bool),
        ParamKind::Double => value.parse().ok().map(ParamValue::Double),
        ParamKind::Symbol | ParamKind::String => CString::new(value).ok().map(ParamValue::Symbol),
        ParamKind::Other | ParamKind::Invalid => None,
    };
    parsed.ok_or_else(|| {
        invalid_param(format!(
            "invalid value '{}' for {:?} parameter '{}'",
            value, kind, key
        ))
    })
}

/// A native parameter set, released on drop.
pub(crate) struct ParamSet<'ctx> {
    ctx: &'ctx Context,
    params: Z3_params,
}

impl<'ctx> ParamSet<'ctx> {
    pub(crate) fn new(ctx: &'ctx Context) -> SmtResult<Self> {
        let params = ctx.call(|z3| unsafe {
            let params = Z3_mk_params(z3);
            if !params.is_null() {
                Z3_params_inc_ref(z3, params);
            }
            params
        })?;
        if params.is_null() {
            return Err(null_handle("parameter set"));
        }
        Ok(ParamSet { ctx, params })
    }

    pub(crate) fn set(&mut self, name: &CStr, value: &ParamValue) -> SmtResult<()> {
        let params = self.params;
        self.ctx.call(|z3| unsafe {
            let key = Z3_mk_string_symbol(z3, name.as_ptr());
            match value {
                ParamValue::UInt(value) => Z3_params_set_uint(z3, params, key, *value),
                ParamValue::Bool(value) => Z3_params_set_bool(z3, params, key, *value),
                ParamValue::Double(value) => Z3_params_set_double(z3, params, key, *value),
                ParamValue::Symbol(value) => {
                    let value = Z3_mk_string_symbol(z3, value.as_ptr());
                    Z3_params_set_symbol(z3, params, key, value)
                }
            }
        })
    }

    /// Hand the parameters to a session.
    pub(crate) fn apply(&self, set: impl FnOnce(Z3_context, Z3_params)) -> SmtResult<()> {
        let params = self.params;
        self.ctx.call(|z3| set(z3, params))
    }
}

impl<'ctx> Drop for ParamSet<'ctx> {
    fn drop(&mut self) {
        unsafe { Z3_params_dec_ref(self.ctx.z3(), self.params) };
    }
}

/// Parameter descriptions of a solver or an optimizer.
struct Descriptions<'ctx> {
    ctx: &'ctx Context,
    descrs: Z3_param_descrs,
}

impl<'ctx> Descriptions<'ctx> {
    fn wrap(ctx: &'ctx Context, descrs: Z3_param_descrs) -> SmtResult<Self> {
        if descrs.is_null() {
            return Err(null_handle("parameter descriptions"));
        }
        Ok(Descriptions { ctx, descrs })
    }

    fn of_solver(ctx: &'ctx Context) -> SmtResult<Self> {
        let descrs = ctx.call(|z3| unsafe {
            let solver = Z3_mk_solver(z3);
            if solver.is_null() {
                return std::ptr::null_mut();
            }
            Z3_solver_inc_ref(z3, solver);
            let descrs = Z3_solver_get_param_descrs(z3, solver);
            if !descrs.is_null() {
                Z3_param_descrs_inc_ref(z3, descrs);
            }
            Z3_solver_dec_ref(z3, solver);
            descrs
        })?;
        Descriptions::wrap(ctx, descrs)
    }

    fn of_optimizer(ctx: &'ctx Context) -> SmtResult<Self> {
        let descrs = ctx.call(|z3| unsafe {
            let optimize = Z3_mk_optimize(z3);
            if optimize.is_null() {
                return std::ptr::null_mut();
            }
            Z3_optimize_inc_ref(z3, optimize);
            let descrs = Z3_optimize_get_param_descrs(z3, optimize);
            if !descrs.is_null() {
                Z3_param_descrs_inc_ref(z3, descrs);
            }
            Z3_optimize_dec_ref(z3, optimize);
            descrs
        })?;
        Descriptions::wrap(ctx, descrs)
    }

    fn kind(&self, name: &CStr) -> SmtResult<ParamKind> {
        let descrs = self.descrs;
        self.ctx.call(|z3| unsafe {
            let symbol = Z3_mk_string_symbol(z3, name.as_ptr());
            Z3_param_descrs_get_kind(z3, descrs, symbol)
        })
    }
}

impl<'ctx> Drop for Descriptions<'ctx> {
    fn drop(&mut self) {
        unsafe { Z3_param_descrs_dec_ref(self.ctx.z3(), self.descrs) };
    }
}

/// A session parameter resolved to the name the sessions know it by.
#[derive(Debug, Clone)]
struct SessionParam {
    name: CString,
    value: ParamValue,
    for_solver: bool,
    for_optimizer: bool,
}

/// The session parameters of a context, resolved against the parameter
/// descriptions of Z3's solver and optimizer.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionParams {
    params: Vec<SessionParam>,
}

impl SessionParams {
    /// Resolve the session entries of `params`.
    ///
    /// Sessions list module parameters without the module, e.g. `random_seed`
    /// for `smt.random_seed`. A key is looked up as given first, then with
    /// its first component removed.
    pub(crate) fn resolve(ctx: &Context, params: &SmtParams) -> SmtResult<Self> {
        let mut entries = params.session_entries().peekable();
        if entries.peek().is_none() {
            return Ok(SessionParams::default());
        }
        let solver = Descriptions::of_solver(ctx)?;
        let optimizer = Descriptions::of_optimizer(ctx)?;

        let mut resolved = Vec::new();
        for (key, value) in entries {
            let mut candidates = vec![key];
            if let Some((_module, rest)) = key.split_once('.') {
                candidates.push(rest);
            }
            let mut found = None;
            for name in candidates {
                let c_name = c_string(name)?;
                let for_solver = solver.kind(&c_name)?;
                let for_optimizer = optimizer.kind(&c_name)?;
                if for_solver != ParamKind::Invalid || for_optimizer != ParamKind::Invalid {
                    let kind = if for_solver != ParamKind::Invalid {
                        for_solver
                    } else {
                        for_optimizer
                    };
                    found = Some(SessionParam {
                        name: c_name,
                        value: parse_value(key, value, kind)?,
                        for_solver: for_solver != ParamKind::Invalid,
                        for_optimizer: for_optimizer != ParamKind::Invalid,
                    });
                    break;
                }
            }
            match found {
                Some(param) => {
                    trace!(
                        key,
                        name = ?param.name,
                        for_solver = param.for_solver,
                        for_optimizer = param.for_optimizer,
                        "resolved parameter"
                    );
                    resolved.push(param);
                }
                None => return Err(invalid_param(format!("unknown parameter '{}'", key))),
            }
        }
        Ok(SessionParams { params: resolved })
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The parameters a solver accepts.
    pub(crate) fn for_solver<'ctx>(&self, ctx: &'ctx Context) -> SmtResult<ParamSet<'ctx>> {
        self.collect(ctx, |param| param.for_solver)
    }

    /// The parameters an optimizer accepts.
    pub(crate) fn for_optimizer<'ctx>(&self, ctx: &'ctx Context) -> SmtResult<ParamSet<'ctx>> {
        self.collect(ctx, |param| param.for_optimizer)
    }

    fn collect<'ctx>(
        &self,
        ctx: &'ctx Context,
        accepts: impl Fn(&SessionParam) -> bool,
    ) -> SmtResult<ParamSet<'ctx>> {
        let mut set = ParamSet::new(ctx)?;
        for param in self.params.iter().filter(|param| accepts(param)) {
            set.set(&param.name, &param.value)?;
        }
        Ok(set)
    }
}

#[cfg(test)]
mod test {
    use std::ffi::CString;

    use super::{parse_value, ParamValue, SmtParams};
    use crate::{
        context::{with_context, SmtConfig},
        error::SmtError,
    };
    use z3_sys::ParamKind;

    #[test]
    fn test_params_keep_order() {
        let mut params = SmtParams::default();
        params.set_param("smt.random_seed", "42");
        params.set_param("model.completion", "true");
        params.set_param("smt.random_seed", "7");
        let keys: Vec<_> = params.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["smt.random_seed", "model.completion"]);
        assert_eq!(params.get_param("smt.random_seed"), Some("7"));
    }

    #[test]
    fn test_display_set_options() {
        let mut params = SmtParams::default();
        params.set_param("timeout", "100");
        params.set_param("opt.priority", "box");
        assert_eq!(
            params.to_string(),
            "(set-option :timeout 100)\n(set-option :opt.priority box)\n"
        );
    }

    #[test]
    fn test_context_entries_are_typed() {
        let mut params = SmtParams::default();
        params.set_param("smt.random_seed", "3");
        params.set_param("proof", "true");
        let entries = params.context_entries().unwrap();
        assert_eq!(
            entries,
            vec![(CString::new("proof").unwrap(), CString::new("true").unwrap())]
        );

        params.set_param("rlimit", "lots");
        assert!(matches!(params.context_entries(), Err(SmtError::Library { .. })));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("k", "7", ParamKind::UInt).unwrap(), ParamValue::UInt(7));
        assert_eq!(parse_value("k", "false", ParamKind::Bool).unwrap(), ParamValue::Bool(false));
        assert_eq!(parse_value("k", "0.5", ParamKind::Double).unwrap(), ParamValue::Double(0.5));
        assert!(parse_value("k", "-1", ParamKind::UInt).is_err());
        assert!(parse_value("k", "yes", ParamKind::Bool).is_err());
    }

    #[test]
    fn test_unknown_session_param_is_an_error() {
        let config = SmtConfig::new().param("definitely.not_a_param", "1");
        let res = with_context(&config, |_ctx| Ok(()));
        match res {
            Err(SmtError::Library { message, .. }) => {
                assert!(message.contains("definitely.not_a_param"), "{}", message)
            }
            other => panic!("expected a library error, got {:?}", other),
        }
    }

    #[test]
    fn test_ill_typed_session_param_is_an_error() {
        let config = SmtConfig::new().param("smt.random_seed", "seven");
        let res = with_context(&config, |_ctx| Ok(()));
        assert!(matches!(res, Err(SmtError::Library { .. })));
    }

    #[test]
    fn test_module_prefix_is_resolved() {
        let config = SmtConfig::new()
            .param("smt.random_seed", "7")
            .param("opt.priority", "box");
        let res = with_context(&config, |ctx| Ok(ctx.session_params().is_empty()));
        assert!(!res.unwrap());
    }
}
