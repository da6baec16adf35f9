//! CLI argument definitions for tickref.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `canonicalize` | Print the sort key of each name |
//! | `sort` | Order names by sort key |
//! | `resolve` | Resolve tags against the stored catalog |
//! | `instrument-tags` | Tags covering an instrument |
//! | `spread-tags` | Tags covering a spread through its market-data name |
//! | `catalog` | Import or export the stored catalog |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, ndjson, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//! | `--db` | `$TICKREF_HOME/catalog/catalog.duckdb` | Catalog database file |
//!
//! # Examples
//!
//! ```bash
//! tickref sort EDZ23 EDH24 EDH23
//! tickref catalog import catalog.json
//! tickref resolve --tag rates --pretty
//! tickref spread-tags ED1_2
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Ticker canonicalization and tag resolution for reference data catalogs.
#[derive(Debug, Parser)]
#[command(
    name = "tickref",
    author,
    version,
    about = "Ticker canonicalization and tag resolution",
    long_about = "tickref orders instrument and strategy names by tenor and expiration, \
and resolves tags (explicit links plus regular-expression filters) against a DuckDB \
reference catalog.\n\
\n\
Use 'tickref <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    ///
    /// - json: Single JSON object (default)
    /// - ndjson: One JSON object per line
    /// - table: ASCII table format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Catalog database file; defaults to the file under `TICKREF_HOME`.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format for terminal display.
    Table,
    /// Single JSON object output.
    Json,
    /// Newline-delimited JSON (one object per line).
    Ndjson,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the sort key and naming convention of each name.
    Canonicalize(NamesArgs),

    /// Order names by sort key.
    Sort(NamesArgs),

    /// Resolve tags against the stored catalog.
    ///
    /// Invalid tag filters are reported as errors next to the partial result.
    Resolve(ResolveArgs),

    /// Tags covering an instrument.
    InstrumentTags(InstrumentTagsArgs),

    /// Tags covering a spread, looked up through its market-data instrument name.
    SpreadTags(SpreadTagsArgs),

    /// Import or export the stored catalog.
    Catalog(CatalogArgs),
}

#[derive(Debug, Args)]
pub struct NamesArgs {
    /// Instrument or strategy names.
    #[arg(required = true, num_args = 1..)]
    pub names: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Only report these tags (repeatable); all tags when omitted.
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Debug, Args)]
pub struct InstrumentTagsArgs {
    /// Instrument name, e.g. `EDH23`.
    pub instrument: String,

    /// Also index resolved strategies and custom instruments.
    #[arg(long, default_value_t = false)]
    pub synthetic: bool,
}

#[derive(Debug, Args)]
pub struct SpreadTagsArgs {
    /// Spread name, e.g. `ED1_2`.
    pub spread: String,
}

#[derive(Debug, Args)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommand,
}

#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    /// Load a JSON catalog document into the database.
    Import(CatalogImportArgs),

    /// Dump the stored catalog as a JSON document.
    Export,
}

#[derive(Debug, Args)]
pub struct CatalogImportArgs {
    /// Path to the catalog document.
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_repeated_tags_and_global_flags() {
        let cli = Cli::try_parse_from([
            "tickref", "resolve", "--tag", "rates", "--tag", "fx", "--pretty", "--db", "/tmp/c.duckdb",
        ])
        .expect("parse");

        assert!(cli.pretty);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/c.duckdb")));
        match cli.command {
            Command::Resolve(args) => assert_eq!(args.tags, vec!["rates", "fx"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn sort_requires_names() {
        assert!(Cli::try_parse_from(["tickref", "sort"]).is_err());
    }
}
