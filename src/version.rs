//! Version information of this crate and of the linked Z3 library.

use std::{
    env,
    io::{self, Write},
};

use crate::{context::Context, util::z3_string};

mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Return a String that describes this crate's version, including a Git commit hash.
pub fn self_version_info() -> String {
    if let Some(git_version) = built_info::GIT_VERSION {
        let mut git_version = git_version.to_string();
        if built_info::GIT_DIRTY.unwrap_or(false) {
            git_version.push_str("-dirty");
        }
        format!("{} ({})", env!("CARGO_PKG_VERSION"), git_version)
    } else {
        // shallow checkouts and machines without git have no GIT_VERSION
        env!("CARGO_PKG_VERSION").to_string()
    }
}

/// Full version string of the linked Z3 library, e.g. `4.12.2.0`.
pub fn z3_version() -> String {
    z3_string(unsafe { z3_sys::Z3_get_full_version() })
}

impl Context {
    /// See [`z3_version`]. Does not require the context, but is often more
    /// convenient to reach.
    pub fn z3_version(&self) -> String {
        z3_version()
    }
}

/// Write the command line, the version of this crate and build, and the Z3
/// version.
pub fn write_detailed_version_info<W>(w: &mut W) -> io::Result<()>
where
    W: Write,
{
    let command: String = {
        let args_strings: Vec<String> = env::args().collect();
        let args_strs: Vec<&str> = args_strings.iter().map(|s| s.as_str()).collect();
        shellwords::join(&args_strs)
    };
    writeln!(w, "Command: {}", command)?;
    writeln!(w, "typed-z3 version: {}", self_version_info())?;
    writeln!(
        w,
        "Profile: {}. Features: {}. Target: {}",
        built_info::PROFILE,
        built_info::FEATURES_STR,
        built_info::TARGET
    )?;
    writeln!(w, "Z3 version: {}", z3_version())?;
    writeln!(w)
}

#[cfg(test)]
mod test {
    use super::{self_version_info, write_detailed_version_info, z3_version};
    use crate::context::with_default_context;

    #[test]
    fn test_versions() {
        assert!(self_version_info().starts_with(env!("CARGO_PKG_VERSION")));
        let version = z3_version();
        assert!(version.starts_with('4'), "unexpected Z3 version {}", version);
        with_default_context(|ctx| {
            assert_eq!(ctx.z3_version(), version);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_detailed_version_info() {
        let mut out = Vec::new();
        write_detailed_version_info(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("typed-z3 version: "));
        assert!(out.contains(&format!("Z3 version: {}", z3_version())));
    }
}
