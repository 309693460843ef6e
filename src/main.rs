use std::{
    collections::HashMap,
    io::{self, Write},
    process::ExitCode,
    time::Duration,
};

use structopt::StructOpt;
use tracing::{error, info_span};

use typed_z3::{
    demos::{self, Demo},
    logging::{init_tracing, DispatchBuilder, TimingLayer},
    version::{self_version_info, write_detailed_version_info},
    SmtConfig,
};

#[derive(StructOpt, Debug)]
#[structopt(
    name = "typed-z3",
    about = "Runs small scenarios against Z3 through sort-checked expressions."
)]
pub struct Options {
    /// The scenario to run: sum, puzzle, float, unsat, optimize or bits.
    #[structopt(name = "DEMO", default_value = "sum")]
    pub demo: Demo,

    /// Time limit for each check in milliseconds.
    #[structopt(long)]
    pub timeout: Option<u64>,

    /// Set a Z3 parameter, e.g. `--param smt.random_seed=7` or
    /// `--param opt.priority=box`. Unknown parameters are an error. Can be
    /// given multiple times.
    #[structopt(long = "param", parse(try_from_str = parse_param))]
    pub params: Vec<(String, String)>,

    /// Emit tracing events as json instead of (ANSI) text.
    #[structopt(long)]
    pub json: bool,

    /// Emit timing information from tracing events. The tracing events need to
    /// be enabled for this to work.
    #[structopt(long)]
    pub timing: bool,

    /// Print the SMT-LIB text of the solver state before the result.
    #[structopt(long)]
    pub print_smt: bool,

    /// Print version information to standard error.
    #[structopt(short, long)]
    pub debug: bool,
}

fn parse_param(param: &str) -> Result<(String, String), String> {
    match param.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected `key=value`, got `{}`", param)),
    }
}

fn main() -> ExitCode {
    let options = Options::from_args();

    if options.debug {
        let mut stderr = io::stderr().lock();
        if write_detailed_version_info(&mut stderr).is_err() {
            return ExitCode::from(1);
        }
    }

    setup_tracing(&options);

    let mut config = SmtConfig::new();
    if let Some(timeout) = options.timeout {
        config = config.timeout(Duration::from_millis(timeout));
    }
    for (key, value) in &options.params {
        config = config.param(key, value);
    }

    let res = {
        let _span = info_span!("demo", version = %self_version_info()).entered();
        demos::run(options.demo, &config, options.print_smt)
    };

    if options.timing {
        print_timings();
    }

    match res {
        Ok(out) => {
            let mut stdout = io::stdout().lock();
            if writeln!(stdout, "{}", out).is_err() {
                return ExitCode::from(1);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(demo = %options.demo, "{}", err);
            eprintln!("Error: {}", err);
            ExitCode::from(1)
        }
    }
}

fn setup_tracing(options: &Options) {
    init_tracing(
        DispatchBuilder::default()
            .json(options.json)
            .timing(options.timing),
    )
}

fn print_timings() {
    let Some(timings) = TimingLayer::read_active() else {
        return;
    };
    let timings: HashMap<&'static str, String> = timings
        .iter()
        .map(|(key, value)| (*key, format!("{}", value.as_nanos())))
        .collect();
    eprintln!("Timings: {:?}", timings);
}

#[cfg(test)]
mod test {
    use super::{parse_param, Options};
    use structopt::StructOpt;
    use typed_z3::demos::Demo;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("smt.random_seed=7"),
            Ok(("smt.random_seed".to_owned(), "7".to_owned()))
        );
        assert_eq!(parse_param("a=b=c"), Ok(("a".to_owned(), "b=c".to_owned())));
        assert!(parse_param("noequals").is_err());
        assert!(parse_param("=1").is_err());
    }

    #[test]
    fn test_options() {
        let options = Options::from_iter([
            "typed-z3",
            "bits",
            "--timeout",
            "500",
            "--param",
            "smt.random_seed=3",
            "--print-smt",
        ]);
        assert_eq!(options.demo, Demo::Bits);
        assert_eq!(options.timeout, Some(500));
        assert_eq!(options.params.len(), 1);
        assert!(options.print_smt);
        assert!(!options.json);
    }
}
