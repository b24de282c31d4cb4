mod db {
    pub mod geo_store;
    pub mod import;
    pub mod model;
    pub mod util;
}
mod join {
    pub mod multiply;
    pub mod partition;
}
mod record {
    pub mod builder;
}
mod region {
    pub mod countries;
    pub mod matcher;
    pub mod resolver;
}
mod scrape {
    pub mod aor_page;
    pub mod util;
}
mod service {
    pub mod pipeline_service;
}
mod util {
    pub mod log_service;
    pub mod var_service;
}
mod error;
mod prelude;

use dotenv::dotenv;
use prelude::*;
use service::pipeline_service::run_pipeline;
use util::{log_service::set_logging, var_service::get_pipeline_config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    set_logging().await?;

    let config = get_pipeline_config().await?;
    tracing::debug!("{:?}", config);

    let summary = run_pipeline(&config).await?;
    tracing::info!(
        "Wrote {} partitions to {} in {}",
        summary.partitions,
        config.output_dataset,
        config.geo_store_path.display()
    );

    Ok(())
}
