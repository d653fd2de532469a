use clap::Parser;
use std::sync::Arc;
use wa_relay::core::{ConfigProvider, Transport};
use wa_relay::http::server;
use wa_relay::utils::{logger, validation::Validate};
use wa_relay::{router, AppState, BridgeTransport, CliArgs, RelayConfig, SessionMonitor, UploadStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_logger(args.verbose);
    }

    tracing::info!("Starting wa-relay");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    // 載入並驗證配置
    let mut config = match RelayConfig::load_or_default(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };
    config.apply_overrides(&args);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let addr = config.bind_addr()?;
    let uploads = UploadStore::from_config(&config)?;
    let transport = Arc::new(BridgeTransport::from_config(&config));

    // 啟動 session，失敗即結束程序
    if let Err(e) = transport.initialize(config.client_id()).await {
        tracing::error!("❌ Failed to initialize WhatsApp session: {}", e);
        eprintln!("❌ Could not reach the messaging bridge at {}", config.bridge_url());
        std::process::exit(1);
    }
    tracing::info!("Session '{}' initializing on {}", config.client_id(), config.bridge_url());

    let (monitor, session_rx) = SessionMonitor::new(Arc::clone(&transport), config.poll_interval());
    tokio::spawn(monitor.run());

    let app = router(AppState::new(transport, uploads, session_rx));
    server::serve(addr, app).await?;

    Ok(())
}
