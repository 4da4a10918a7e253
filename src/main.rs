use anyhow::{Context as _, Result};
use clap::{Arg, ArgAction, Command};
use slimleaf::browser::ChromeDriver;
use slimleaf::core::{Config, Locator};
use slimleaf::page::{Page, WebPage};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let matches = Command::new("slimleaf")
        .about("Open a page in Chrome, confirm it, and print one node from its markup")
        .arg(Arg::new("url").required(true).help("Page to open"))
        .arg(
            Arg::new("selector")
                .long("selector")
                .short('s')
                .default_value("body")
                .help("CSS selector that identifies the page; must match exactly one node"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("JSON configuration file"),
        )
        .arg(
            Arg::new("headed")
                .long("headed")
                .action(ArgAction::SetTrue)
                .help("Show the browser window"),
        )
        .get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(path).with_context(|| format!("loading {}", path))?,
        None => Config::default(),
    };
    if matches.get_flag("headed") {
        config.browser.headless = false;
    }
    let url = matches
        .get_one::<String>("url")
        .context("a url is required")?;
    config.base_url = Some(url.clone());
    config.validate()?;

    let selector = matches
        .get_one::<String>("selector")
        .map(String::as_str)
        .unwrap_or("body");
    let locator = Locator::css(selector)?;

    let driver = Arc::new(ChromeDriver::launch(&config.browser)?);
    let page = WebPage::from_config(driver, &config, "", locator.clone())?
        .go()
        .await?;
    info!(title = %page.title().await?, url = %page.current_url().await?, "page confirmed");

    let node = page.html_tree().await?.find_unique(&locator)?;
    println!("{}", serde_json::to_string_pretty(&node)?);
    Ok(())
}
