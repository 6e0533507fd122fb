use std::sync::Arc;

use api_dispatch::assets::{AssetStage, NoAssets, StaticDir};
use api_dispatch::config::Config;
use api_dispatch::dispatch::Dispatcher;
use api_dispatch::logger::{self, AccessLogFormat};
use api_dispatch::{api, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg.logging)?;

    // Worker count from config, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;
    let dispatcher = Arc::new(build_dispatcher(&cfg)?);

    logger::log_server_start(&addr, &cfg, dispatcher.routes());

    let options = server::ServerOptions::from_config(&cfg.performance, &cfg.logging);

    // Connections are served with spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::serve(listener, dispatcher, options, shutdown_signal()))
        .await?;
    Ok(())
}

fn build_dispatcher(cfg: &Config) -> Result<Dispatcher, url::ParseError> {
    let assets: Arc<dyn AssetStage> = if cfg.assets.enabled {
        Arc::new(
            StaticDir::new(&cfg.assets.dir)
                .with_index_files(cfg.assets.index_files.clone())
                .with_cache(cfg.assets.max_age, cfg.assets.immutable),
        )
    } else {
        Arc::new(NoAssets)
    };

    let access_log = cfg
        .logging
        .access_log
        .then(|| AccessLogFormat::from(cfg.logging.access_log_format.as_str()));

    Ok(Dispatcher::new(assets, api::routes(), cfg.origin()?).with_access_log(access_log))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        logger::log_error(&format!("Failed to listen for shutdown signal: {e}"));
        // Without a signal handler, keep serving
        std::future::pending::<()>().await;
    }
}
