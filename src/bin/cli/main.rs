mod app;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "blockdeck-cli",
    about = "Convert Notion pages and databases into flashcard decks",
    version
)]
struct Cli {
    /// Conversion config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a page (or database) into a deck bundle
    Convert {
        /// Page or database id, or its Notion URL
        id: String,
        /// Treat the id as a database
        #[arg(long)]
        collection: bool,
        /// Directory the bundle is written to
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Add a reversed copy of every basic card
        #[arg(long)]
        reversed: bool,
        /// Follow pagination when listing children
        #[arg(long)]
        unlimited: bool,
        /// Override the top-level deck name
        #[arg(long)]
        deck_name: Option<String>,
        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Print the resolved conversion rules as TOML
    Rules,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let app = app::App::new(cli.config.as_deref())?;

    match cli.command {
        Command::Convert {
            id,
            collection,
            out,
            reversed,
            unlimited,
            deck_name,
            timeout,
        } => {
            let args = commands::convert::ConvertArgs {
                id,
                collection,
                out,
                reversed,
                unlimited,
                deck_name,
                timeout,
            };
            commands::convert::run(&app, args).await?;
        }
        Command::Rules => {
            commands::rules::run(&app)?;
        }
    }

    Ok(())
}
