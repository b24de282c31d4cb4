use super::var_service::get_log_level;
use crate::prelude::*;

pub async fn set_logging() -> Result<()> {
    let level = get_log_level().await?;
    tracing_subscriber::fmt().with_max_level(level).init();
    tracing::debug!("Logging at {}", level);

    Ok(())
}
