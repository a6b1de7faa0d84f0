use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context};
use ariadne::Source;
use arenajson::{Document, Error, Options, Style};
use clap::Parser as ClapParser;
use tracing::*;

mod logging;

#[derive(Debug, ClapParser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path to a JSON file.
    input: PathBuf,

    /// Print without any insignificant whitespace.
    #[arg(long)]
    compact: bool,

    /// Only check that the file parses, print nothing on success.
    #[arg(long)]
    check: bool,

    /// A TOML file overriding the default arena and printer options.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    logging::setup_logging();

    let cli = Args::parse();

    debug!(input = ?cli.input);

    let options = Options::load(cli.config.as_deref()).context("failed to load options")?;
    debug!(?options);

    let json_string = match std::fs::read_to_string(&cli.input) {
        Ok(file) => file,
        Err(e) => {
            error!(path = ?cli.input, "failed to read input");
            return Err(e)
                .with_context(|| format!("failed to read file `{}`", cli.input.display()));
        }
    };

    let path = cli.input.display().to_string();

    let doc = match Document::parse_with_options(&json_string, options) {
        Ok(doc) => doc,
        Err(Error::Parse(e)) => {
            e.report(&path)
                .print((&path, Source::from(&json_string)))?;
            bail!("failed to parse `{path}`");
        }
        Err(e) => return Err(e).context("failed to load document"),
    };

    let stats = doc.stats();
    debug!(
        values = stats.values,
        pages = stats.pages,
        dedicated_pages = stats.dedicated_pages,
        "arena usage"
    );

    if cli.check {
        return Ok(());
    }

    if doc.root().is_none() {
        warn!("`{path}` is empty, nothing to print");
        return Ok(());
    }

    let style = if cli.compact {
        Style::Compact
    } else {
        doc.options().pretty()
    };
    doc.write_to(io::stdout().lock(), style)
        .context("failed to print document")?;

    Ok(())
}
