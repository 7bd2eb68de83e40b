use std::ffi::OsString;

use clap::Parser;

/// bootlaunch - provisions an isolated Python environment on first run, then runs the payload
///
/// The launcher has no flags of its own: every argument is forwarded to the payload.
#[derive(Parser, Debug)]
#[command(name = "bootlaunch")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Arguments forwarded verbatim to the payload
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<OsString>,
}

impl Cli {
    /// Parse a raw argv. An escape `--` is inserted after the program name so
    /// that a leading `--` or `-h` typed by the user reaches the payload too.
    pub fn from_argv<I>(argv: I) -> Self
    where
        I: IntoIterator<Item = OsString>,
    {
        let mut argv = argv.into_iter();
        let program = argv.next().unwrap_or_else(|| OsString::from("bootlaunch"));
        let escaped = std::iter::once(program)
            .chain(std::iter::once(OsString::from("--")))
            .chain(argv);
        Self::parse_from(escaped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Vec<OsString> {
        Cli::from_argv(
            std::iter::once("bootlaunch")
                .chain(args.iter().copied())
                .map(OsString::from),
        )
        .args
    }

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_arguments_pass_through_unchanged() {
        assert_eq!(parse(&["--foo", "bar baz"]), os(&["--foo", "bar baz"]));
        assert_eq!(parse(&[]), Vec::<OsString>::new());
    }

    #[test]
    fn test_launcher_does_not_claim_any_flag() {
        assert_eq!(
            parse(&["--help", "-V", "--", "-x", "--version"]),
            os(&["--help", "-V", "--", "-x", "--version"])
        );
        assert_eq!(parse(&["--", "tail"]), os(&["--", "tail"]));
    }
}
