use std::{
    ffi::{CStr, CString},
    fmt::{Display, Formatter},
    os::raw::c_char,
    str::FromStr,
};

use crate::error::{SmtError, SmtResult};

/// Build a conjunction of Boolean nodes.
#[macro_export]
macro_rules! smt_and {
    ($first:expr, $( $x:expr, )*) => {
        {
            use $crate::node::Ast;
            let first = $first;
            first.get_ctx().and(&[first.clone(), $($x.clone(),)*])
        }
    };
    ($( $x:expr ),*) => { $crate::smt_and!($($x,)*) }
}

/// Build a disjunction of Boolean nodes.
#[macro_export]
macro_rules! smt_or {
    ($first:expr, $( $x:expr, )*) => {
        {
            use $crate::node::Ast;
            let first = $first;
            first.get_ctx().or(&[first.clone(), $($x.clone(),)*])
        }
    };
    ($( $x:expr ),*) => { $crate::smt_or!($($x,)*) }
}

/// Create forwarding trait implementations for a binary operator that use an
/// existing trait implementation on the borrowed node type, providing the
/// implementation on the owned node type.
///
/// The right-hand side stays generic over [`crate::ops::Coerce`], so the
/// forwarded implementation accepts nodes and native literals alike.
///
/// The macro parameters `forward_binary_op!(bound, op_trait, op_fn)` are:
///
///   - `bound`: the sort trait the node's sort must implement,
///   - `op_trait`: the name of the operator trait (e.g. `Add`),
///   - `op_fn`: the name of the trait method (e.g. `add`).
#[macro_export]
macro_rules! forward_binary_op {
    ($bound:path, $op_trait:ident, $op_fn:ident) => {
        impl<'ctx, S, R> $op_trait<R> for $crate::node::Node<'ctx, S>
        where
            S: $bound,
            R: $crate::ops::Coerce<'ctx, S>,
        {
            type Output = $crate::node::Node<'ctx, S>;

            fn $op_fn(self, rhs: R) -> Self::Output {
                (&self).$op_fn(rhs)
            }
        }
    };
}

/// A type to represent the `:reason-unknown` values from Z3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasonUnknown {
    Interrupted,
    Timeout,
    Other(String),
}

impl FromStr for ReasonUnknown {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interrupted from keyboard" | "canceled" => Ok(ReasonUnknown::Interrupted),
            "timeout" => Ok(ReasonUnknown::Timeout),
            other => Ok(ReasonUnknown::Other(other.to_owned())),
        }
    }
}

impl Display for ReasonUnknown {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReasonUnknown::Interrupted => f.write_str("interrupted from keyboard"),
            ReasonUnknown::Timeout => f.write_str("timeout"),
            ReasonUnknown::Other(reason) => f.write_str(reason),
        }
    }
}

/// Copy a string returned by Z3. Z3 reuses the buffer on the next API call, so
/// the contents must be copied right away. A null pointer yields an empty
/// string.
pub(crate) fn z3_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Turn a user-provided constant name into a C string. Names must be non-empty
/// and must not contain NUL bytes.
pub(crate) fn symbol_name(name: &str) -> SmtResult<CString> {
    if name.is_empty() {
        return Err(SmtError::InvalidName(name.to_owned()));
    }
    CString::new(name).map_err(|_| SmtError::InvalidName(name.to_owned()))
}

#[cfg(test)]
mod test {
    use super::{symbol_name, z3_string, ReasonUnknown};
    use crate::error::SmtError;

    #[test]
    fn test_reason_unknown_parse_fmt() {
        let values = [
            ReasonUnknown::Interrupted,
            ReasonUnknown::Timeout,
            ReasonUnknown::Other("(incomplete quantifiers)".to_owned()),
        ];
        for value in &values {
            let parsed_fmt = format!("{}", value).parse::<ReasonUnknown>().unwrap();
            assert_eq!(value, &parsed_fmt);
        }
        assert_eq!(
            "canceled".parse::<ReasonUnknown>().unwrap(),
            ReasonUnknown::Interrupted
        );
    }

    #[test]
    fn test_symbol_name() {
        assert_eq!(symbol_name("x1").unwrap().to_str().unwrap(), "x1");
        assert!(matches!(symbol_name(""), Err(SmtError::InvalidName(_))));
        assert!(matches!(symbol_name("a\0b"), Err(SmtError::InvalidName(_))));
    }

    #[test]
    fn test_null_string() {
        assert_eq!(z3_string(std::ptr::null()), "");
    }
}
