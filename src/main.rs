use newsdesk::bridge::CommandRouter;
use newsdesk::commands::Backend;
use newsdesk::config::Config;
use newsdesk::db::DB;
use newsdesk::error::Result;
use newsdesk::http::ReqwestClient;
use newsdesk::loader::LayoutLoader;
use newsdesk::ui::{Shell, UI};
use newsdesk::utils;
use std::fs;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

fn run() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from(&path)?,
        None => Config::load()?,
    };
    fs::create_dir_all(utils::get_config_dir())?;
    utils::init_logging(config.log_level())?;
    info!(
        "Starting newsdesk (prerender: {}, ssr: {})",
        config.route.prerender, config.route.ssr
    );

    let db = DB::open(&config.db_path())?;
    db.create_db()?;

    let http = ReqwestClient::new(config.http_timeout_secs)?;
    let backend = Arc::new(Backend::new(db, Box::new(http)));
    let bridge = Arc::new(CommandRouter::new(backend));

    let runtime = tokio::runtime::Runtime::new()?;
    let loader = LayoutLoader::new(config.load_categories);
    let layout = runtime.block_on(loader.load_typed(bridge.as_ref()))?;
    info!("Loaded {} feeds", layout.feeds.len());

    let mut ui = UI::new();
    ui.create(
        layout,
        Shell {
            bridge,
            runtime: runtime.handle().clone(),
            loader,
            browser: config.browser.clone(),
        },
    );
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("{}", e);
        eprintln!("newsdesk: {}", e);
        process::exit(1);
    }
}
