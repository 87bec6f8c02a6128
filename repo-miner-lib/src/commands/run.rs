//! Command dispatch logic for repo-miner

use super::{CatalogArgs, InitArgs, MineArgs, init_config, process_catalog, process_mine};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "repo-miner", author, version, long_about = None)]
#[command(about = "Mine popular repositories and summarize their class-level design metrics")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: MinerSubcommand,
}

#[derive(Subcommand, Debug)]
enum MinerSubcommand {
    /// Clone and analyze catalog repositories, appending results to the ledger
    Mine(Box<MineArgs>),
    /// Fetch the ranked catalog and write it to a table
    Catalog(Box<CatalogArgs>),
    /// Generate a default configuration file
    Init(InitArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// # Arguments
///
/// * `args` - An iterator of command-line arguments (typically from `std::env::args()`)
///
/// # Errors
///
/// Returns an error if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    match &Cli::parse_from(args).command {
        MinerSubcommand::Mine(mine_args) => process_mine(host, mine_args).await,
        MinerSubcommand::Catalog(catalog_args) => process_catalog(host, catalog_args).await,
        MinerSubcommand::Init(init_args) => init_config(host, init_args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_mine_flags_parse() {
        let cli = Cli::try_parse_from([
            "repo-miner",
            "mine",
            "--ledger",
            "out.csv",
            "--pages",
            "2",
            "--clone-attempts",
            "5",
            "--no-resume",
            "--log-level",
            "debug",
            "--color",
            "never",
        ])
        .unwrap();

        let MinerSubcommand::Mine(args) = cli.command else {
            panic!("expected the mine subcommand");
        };
        assert_eq!(args.ledger.as_deref().map(camino::Utf8Path::as_str), Some("out.csv"));
        assert_eq!(args.common.pages, Some(2));
        assert_eq!(args.clone_attempts, Some(5));
        assert!(args.no_resume);
    }

    #[test]
    fn test_init_takes_optional_path() {
        let cli = Cli::try_parse_from(["repo-miner", "init"]).unwrap();
        assert!(matches!(cli.command, MinerSubcommand::Init(InitArgs { output: None, .. })));
    }
}
