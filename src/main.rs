//! plotlink - Out-of-Process Chart Rendering Dispatch
//!
//! Small CLI for smoke-testing the dispatch pipeline against a local renderer
//! helper: send a figure JSON file or a URL, or install the plotly.js bundle.

use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use log::info;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging for development
    env_logger::init();

    // Parse command-line arguments
    let matches = Command::new("plotlink")
        .version(plotlink::VERSION)
        .about("Dispatch charts and URLs to an external webview renderer")
        .long_about(
            "plotlink forwards chart figures, tables, and URLs to an external \
             desktop rendering helper process. The helper is located via the \
             PLOTLINK_RENDERER environment variable or a PATH lookup of \
             plotlink-renderer.",
        )
        .arg(
            Arg::new("figure")
                .long("figure")
                .value_name("FILE")
                .help("Figure JSON file to dispatch"),
        )
        .arg(
            Arg::new("table")
                .long("table")
                .value_name("FILE")
                .help("Table JSON file (split orientation) to dispatch"),
        )
        .arg(
            Arg::new("url")
                .long("url")
                .value_name("URL")
                .help("URL to open in a renderer window"),
        )
        .arg(
            Arg::new("export")
                .long("export")
                .value_name("PATH")
                .help("Export the dispatched figure to this image path"),
        )
        .arg(
            Arg::new("location")
                .long("location")
                .value_name("ROUTE")
                .help("Command location shown in the window title"),
        )
        .arg(
            Arg::new("title")
                .long("title")
                .value_name("TEXT")
                .help("Title for --table and --url dispatches"),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .value_name("FILE")
                .help("JSON settings file (defaults apply when omitted)"),
        )
        .arg(
            Arg::new("assets")
                .long("assets")
                .value_name("DIR")
                .help("Asset directory used by --init-assets"),
        )
        .arg(
            Arg::new("init-assets")
                .long("init-assets")
                .action(ArgAction::SetTrue)
                .help("Download the plotly.js bundle into the asset directory and exit"),
        )
        .get_matches();

    let settings = match matches.get_one::<String>("settings") {
        Some(path) => plotlink::RenderSettings::load(Path::new(path))?,
        None => plotlink::RenderSettings::default(),
    };

    if matches.get_flag("init-assets") {
        let store = matches
            .get_one::<String>("assets")
            .map(plotlink::AssetStore::new)
            .unwrap_or_else(plotlink::AssetStore::default_location);
        plotlink::fetch_plotly_js(&store).await?;
        println!("plotly.js installed in {}", store.base().display());
        return Ok(());
    }

    let figure_path = matches.get_one::<String>("figure").map(PathBuf::from);
    let table_path = matches.get_one::<String>("table").map(PathBuf::from);
    let url = matches.get_one::<String>("url");
    if figure_path.is_none() && table_path.is_none() && url.is_none() {
        anyhow::bail!("nothing to dispatch: pass --figure, --table, --url, or --init-assets");
    }

    let handle = plotlink::ensure_handle(settings);
    let status = handle.check_health().await;
    info!("renderer health: {status:?}");

    if let Some(path) = figure_path {
        if !path.exists() {
            anyhow::bail!("Figure file does not exist: {}", path.display());
        }
        let text = std::fs::read_to_string(&path)?;
        let mut figure = plotlink::Figure::from_json(&text)?;
        let export = matches.get_one::<String>("export").map(PathBuf::from);
        let location = matches.get_one::<String>("location").map(String::as_str);
        handle
            .dispatch_figure(&mut figure, export.as_deref(), location)
            .await?;
    }

    if let Some(path) = table_path {
        if !path.exists() {
            anyhow::bail!("Table file does not exist: {}", path.display());
        }
        let text = std::fs::read_to_string(&path)?;
        let table = plotlink::DataTable::from_json(&text)?;
        let title = matches.get_one::<String>("title").map(String::as_str);
        let location = matches.get_one::<String>("location").map(String::as_str);
        handle.dispatch_table(&table, title, None, None, location)?;
    }

    if let Some(url) = url {
        let title = matches.get_one::<String>("title").map(String::as_str);
        handle.dispatch_url(url, title, None, None)?;
    }

    info!("queued {} message(s) for the renderer", handle.queued());
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_version_constant() {
        // Ensure version is accessible
        assert!(!plotlink::VERSION.is_empty());
    }
}
