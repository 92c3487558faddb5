//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "scalescout")]
#[command(version, about = "Find, screen and organize robot-empathy literature for scale design", long_about = None)]
pub struct Cli {
    /// ResearchContext JSON produced by the interview stage
    pub context: PathBuf,

    /// Probe every literature source and log its status before the run
    #[arg(long)]
    pub check_sources: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_context_and_flag() {
        let cli = Cli::try_parse_from(["scalescout", "ctx.json", "--check-sources"]).unwrap();
        assert_eq!(cli.context, PathBuf::from("ctx.json"));
        assert!(cli.check_sources);

        let cli = Cli::try_parse_from(["scalescout", "ctx.json"]).unwrap();
        assert!(!cli.check_sources);
    }

    #[test]
    fn test_help_is_not_a_context_path() {
        for flag in ["-h", "--help"] {
            let err = Cli::try_parse_from(["scalescout", flag]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }

    #[test]
    fn test_bad_invocations_are_rejected() {
        let err = Cli::try_parse_from(["scalescout"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        assert!(Cli::try_parse_from(["scalescout", "a.json", "b.json"]).is_err());

        let err = Cli::try_parse_from(["scalescout", "a.json", "--verbose"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }
}
