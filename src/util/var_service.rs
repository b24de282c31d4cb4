use crate::error::PipelineError;
use crate::prelude::*;
use crate::scrape::aor_page::DEFAULT_SOURCE_LINK;
use crate::service::pipeline_service::PipelineConfig;
use std::{env::var, path::PathBuf, str::FromStr};

pub async fn get_optional_var(name: &str) -> Option<String> {
    match var(name) {
        Ok(value) => match value.is_empty() {
            true => {
                tracing::info!("{} is empty", name);
                None
            }
            false => Some(value),
        },
        Err(_) => None,
    }
}

pub async fn get_var_or(name: &str, default: &str) -> String {
    match get_optional_var(name).await {
        Some(value) => value,
        None => {
            tracing::debug!("{} not set, using {}", name, default);
            default.to_string()
        }
    }
}

pub async fn get_bool_var(name: &str, default: bool) -> Result<bool> {
    match get_optional_var(name).await {
        Some(value) => match value.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => {
                let err = format!("Failed to parse {} as a boolean: {}", name, value);
                tracing::error!(err);
                Err(PipelineError::Config(err).into())
            }
        },
        None => Ok(default),
    }
}

pub async fn get_log_level() -> Result<tracing::Level> {
    let level = get_var_or("LOG_LEVEL", "info").await;
    match tracing::Level::from_str(&level) {
        Ok(level) => Ok(level),
        Err(e) => Err(PipelineError::Config(format!("Failed to parse LOG_LEVEL {}: {}", level, e)).into()),
    }
}

pub async fn get_pipeline_config() -> Result<PipelineConfig> {
    Ok(PipelineConfig {
        aor_page: get_optional_var("AOR_PAGE").await,
        source_link: get_var_or("AOR_SOURCE_LINK", DEFAULT_SOURCE_LINK).await,
        csv_path: PathBuf::from(get_var_or("AOR_CSV_PATH", "wfb_t_orgs_geolocated.csv").await),
        geo_store_path: PathBuf::from(get_var_or("GEO_STORE_PATH", "country_mult.sqlite").await),
        reference_geojson: get_optional_var("REFERENCE_GEOJSON").await.map(PathBuf::from),
        reference_collection: get_var_or("REFERENCE_COLLECTION", "countries").await,
        attribute_table: get_var_or("ATTRIBUTE_TABLE", "wfb_t_orgs_geolocated").await,
        reference_join_field: get_var_or("REFERENCE_JOIN_FIELD", "ISO_CC").await,
        table_join_field: get_var_or("TABLE_JOIN_FIELD", "country_aor").await,
        group_field: get_var_or("GROUP_FIELD", "entity_name").await,
        multiplied_collection: get_var_or("MULTIPLIED_COLLECTION", "countries_multiplied").await,
        output_dataset: get_var_or("OUTPUT_DATASET", "individual_fc").await,
        overwrite_output: get_bool_var("OVERWRITE_OUTPUT", false).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unset_variables_fall_back() {
        assert_eq!(get_var_or("AOR_MAPPER_TEST_UNSET", "fallback").await, "fallback");
        assert!(!get_bool_var("AOR_MAPPER_TEST_UNSET", false).await.unwrap());
        assert_eq!(get_optional_var("AOR_MAPPER_TEST_UNSET").await, None);
    }

    #[tokio::test]
    async fn booleans_parse_common_spellings() {
        std::env::set_var("AOR_MAPPER_TEST_BOOL", "Yes");
        assert!(get_bool_var("AOR_MAPPER_TEST_BOOL", false).await.unwrap());
        std::env::set_var("AOR_MAPPER_TEST_BOOL", "maybe");
        assert!(get_bool_var("AOR_MAPPER_TEST_BOOL", false).await.is_err());
        std::env::remove_var("AOR_MAPPER_TEST_BOOL");
    }
}
