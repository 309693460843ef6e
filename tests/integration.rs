//! Integration tests for the `typed-z3` binary.
//!
//! Each case is a command line (with `@typed-z3` substituted by the path of the
//! binary, split with `shellwords`) and the expected outcome. `Run` cases must
//! exit successfully and print the given text on stdout, `Xfail` cases must
//! exit with a non-zero status code.

use std::process::{Command, Output};

const BIN_PATH: &str = env!("CARGO_BIN_EXE_typed-z3");

#[derive(Debug)]
enum Expect {
    Run(&'static str),
    Xfail,
}

fn run(command: &str) -> Output {
    let command = command.replace("@typed-z3", BIN_PATH);
    let args = shellwords::split(&command).unwrap();
    Command::new(&args[0])
        .args(&args[1..])
        .output()
        .unwrap()
}

fn check(command: &str, expect: Expect) {
    let output = run(command);
    let stdout = String::from_utf8(output.stdout).unwrap();
    let stderr = String::from_utf8(output.stderr).unwrap();
    match expect {
        Expect::Run(expected) => {
            assert!(
                output.status.success(),
                "Failed RUN: {}.\n\nStdout:\n{}\n\nStderr:\n{}",
                command,
                stdout,
                stderr
            );
            assert!(
                stdout.contains(expected),
                "RUN {}: expected {:?} in stdout:\n{}",
                command,
                expected,
                stdout
            );
        }
        Expect::Xfail => {
            assert_eq!(
                output.status.code(),
                Some(1),
                "XFAIL command did not fail with 1: {}\n\nStderr:\n{}",
                command,
                stderr
            );
        }
    }
}

#[test]
fn test_demos() {
    check("@typed-z3 puzzle", Expect::Run("a = 5, b = 5"));
    check("@typed-z3 unsat", Expect::Run("unsat"));
    check("@typed-z3 bits --timeout 10000", Expect::Run("x = 171"));
    check(
        "@typed-z3 optimize --param smt.random_seed=7",
        Expect::Run("objective = 12"),
    );
    check(
        "@typed-z3 sum --print-smt",
        Expect::Run("(declare-fun x () Int)"),
    );
    check(
        "@typed-z3 puzzle --print-smt --param smt.random_seed=7",
        Expect::Run("(set-option :smt.random_seed 7)"),
    );
}

#[test]
fn test_usage_errors() {
    check("@typed-z3 nope", Expect::Xfail);
    check("@typed-z3 sum --param missing_equals", Expect::Xfail);
    check("@typed-z3 sum --timeout soon", Expect::Xfail);
}

#[test]
fn test_invalid_params() {
    check("@typed-z3 sum --param definitely.not_a_param=1", Expect::Xfail);
    check("@typed-z3 sum --param smt.random_seed=seven", Expect::Xfail);
    check("@typed-z3 sum --param rlimit=-1", Expect::Xfail);
}

#[test]
fn test_debug_prints_versions() {
    let output = run("@typed-z3 --debug puzzle");
    assert!(output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("typed-z3 version: "));
    assert!(stderr.contains("Z3 version: "));
}
