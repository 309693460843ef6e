//! The single error type of this crate.

use thiserror::Error;
use z3_sys::ErrorCode;

use crate::util::ReasonUnknown;

/// Everything that can go wrong when talking to Z3 through this crate.
///
/// [`SmtError::Library`] comes from Z3's error handler. All other variants are
/// raised by the binding itself.
#[derive(Debug, Clone, Error)]
pub enum SmtError {
    #[error("Z3 error ({code:?}): {message}")]
    Library { code: ErrorCode, message: String },
    #[error("UNSAT")]
    Unsat,
    #[error("unknown (reason: {0})")]
    Unknown(ReasonUnknown),
    #[error("eval failed")]
    EvalFailed,
    #[error("{}: can not convert `{}` to {}", conversion_source(.target), .value, .target)]
    ConversionFailed { value: String, target: &'static str },
    #[error("no model available, the last check was not sat")]
    ModelUnavailable,
    #[error("objective rejected: {0}")]
    ObjectiveRejected(Box<SmtError>),
    #[error("invalid constant name {0:?}")]
    InvalidName(String),
    #[error("invalid bit-vector width {0}")]
    InvalidWidth(u32),
}

pub type SmtResult<T> = Result<T, SmtError>;

/// The evaluation helper that reports a failed conversion to `target`.
fn conversion_source(target: &str) -> &'static str {
    match target {
        "i64" | "BigInt" => "evalInt",
        _ => "eval",
    }
}

#[cfg(test)]
mod test {
    use z3_sys::ErrorCode;

    use super::SmtError;
    use crate::util::ReasonUnknown;

    #[test]
    fn test_fixed_messages() {
        assert_eq!(SmtError::Unsat.to_string(), "UNSAT");
        assert_eq!(SmtError::EvalFailed.to_string(), "eval failed");
        let err = SmtError::ConversionFailed {
            value: "1/2".to_owned(),
            target: "i64",
        };
        assert_eq!(err.to_string(), "evalInt: can not convert `1/2` to i64");
    }

    #[test]
    fn test_conversion_message_names_target() {
        let err = SmtError::ConversionFailed {
            value: "b".to_owned(),
            target: "bool",
        };
        assert_eq!(err.to_string(), "eval: can not convert `b` to bool");
        let err = SmtError::ConversionFailed {
            value: "(fp #b0 #b11111111111 #x8000000000000)".to_owned(),
            target: "f64",
        };
        assert!(err.to_string().starts_with("eval: can not convert"));
        let err = SmtError::ConversionFailed {
            value: "x".to_owned(),
            target: "BigInt",
        };
        assert_eq!(err.to_string(), "evalInt: can not convert `x` to BigInt");
    }

    #[test]
    fn test_wrapped_messages() {
        let err = SmtError::Unknown(ReasonUnknown::Timeout);
        assert_eq!(err.to_string(), "unknown (reason: timeout)");
        let err = SmtError::ObjectiveRejected(Box::new(SmtError::Library {
            code: ErrorCode::SortError,
            message: "Sort mismatch".to_owned(),
        }));
        assert_eq!(
            err.to_string(),
            "objective rejected: Z3 error (SortError): Sort mismatch"
        );
    }
}
