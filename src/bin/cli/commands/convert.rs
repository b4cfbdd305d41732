use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use blockdeck_lib::convert::{convert, NodeRole};
use blockdeck_lib::package::{bundle_file_name, BundleWriter, DeckSink};

use crate::app::App;

pub struct ConvertArgs {
    pub id: String,
    pub collection: bool,
    pub out: PathBuf,
    pub reversed: bool,
    pub unlimited: bool,
    pub deck_name: Option<String>,
    pub timeout: Option<u64>,
}

/// Accept a bare id or a Notion URL ending in one
fn node_id(input: &str) -> String {
    let path = input.split(['?', '#']).next().unwrap_or(input);
    let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
    let compact: String = segment.chars().filter(|c| *c != '-').collect();
    if let Some(tail) = compact.get(compact.len().saturating_sub(32)..) {
        if tail.len() == 32 && tail.chars().all(|c| c.is_ascii_hexdigit()) {
            return tail.to_string();
        }
    }
    segment.to_string()
}

fn cancel_on_interrupt(cancel: &CancellationToken, timeout: Option<u64>) {
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling conversion");
            on_signal.cancel();
        }
    });
    if let Some(secs) = timeout {
        let on_timeout = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            log::warn!("Timed out after {}s, cancelling conversion", secs);
            on_timeout.cancel();
        });
    }
}

pub async fn run(app: &App, args: ConvertArgs) -> Result<()> {
    let mut config = app.config.clone();
    config.options.basic_reversed |= args.reversed;
    config.rules.unlimited |= args.unlimited;
    if args.deck_name.is_some() {
        config.options.deck_name = args.deck_name;
    }

    let client = app.notion_client(config.options.page_size)?;
    let assets = app.asset_fetcher()?;
    let id = node_id(&args.id);
    let role = if args.collection {
        NodeRole::Collection
    } else {
        NodeRole::Page
    };

    let cancel = CancellationToken::new();
    cancel_on_interrupt(&cancel, args.timeout);

    let conversion = convert(&client, &assets, &config, &id, role, &cancel)
        .await
        .with_context(|| format!("Failed to convert {}", id))?;

    for deck in &conversion.decks {
        println!("{:<40} {} notes", deck.name, deck.notes.len());
    }

    let file_name = bundle_file_name(
        config.options.deck_name.as_deref(),
        conversion.first_page_title.as_deref(),
        &id,
    );
    let path = BundleWriter::new(file_name)
        .package(&conversion.decks, &args.out)
        .await
        .context("Failed to write deck bundle")?;

    println!(
        "\n{} decks, {} notes written to {}",
        conversion.decks.len(),
        conversion.note_count(),
        path.display()
    );
    Ok(())
}
