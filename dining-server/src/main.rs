use dining_server::{ServerState, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 配置, 日志)
    let config = setup_environment();

    tracing::info!(database = %config.database_path, "Dining server starting...");

    // 2. 初始化服务器状态
    let state = ServerState::initialize(&config).await?;

    tracing::info!("Dining server ready, press Ctrl-C to stop");

    // 3. 等待退出信号
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }

    // 4. Graceful shutdown
    state.shutdown().await;
    Ok(())
}
