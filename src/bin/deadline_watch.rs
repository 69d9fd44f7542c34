use questflow::{
    init_logging, log_app_start, logging_config_from_env, run_watch, watch_config_from_env,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env();
    init_logging(&logging_cfg)?;
    log_app_start(&logging_cfg);

    let config = watch_config_from_env()?;
    run_watch(config).await?;

    Ok(())
}
