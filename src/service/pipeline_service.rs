use crate::db::geo_store::GeoStore;
use crate::db::import::{import_csv_table, import_geojson};
use crate::db::model::{CollectionKind, Field, FieldType, SHAPE_FIELD};
use crate::error::PipelineError;
use crate::join::multiply::{merge_schema, multiply};
use crate::join::partition::{assign_group_index, partition_with_index, GroupIndex, GROUP_INDEX_FIELD};
use crate::prelude::*;
use crate::record::builder::{build, explode, export_csv, no_match_count, to_export_rows};
use crate::scrape::aor_page::{load_document, parse_aor_document};
use anyhow::Context;
use std::path::PathBuf;

/// Everything a run needs; read from the environment by
/// `util::var_service::get_pipeline_config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Page path or URL. Without it the attribute table must already exist.
    pub aor_page: Option<String>,
    pub source_link: String,
    pub csv_path: PathBuf,
    pub geo_store_path: PathBuf,
    /// Imported as the reference collection when set.
    pub reference_geojson: Option<PathBuf>,
    pub reference_collection: String,
    pub attribute_table: String,
    pub reference_join_field: String,
    pub table_join_field: String,
    pub group_field: String,
    pub multiplied_collection: String,
    pub output_dataset: String,
    pub overwrite_output: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub entities: usize,
    pub exported_rows: usize,
    pub no_match_rows: usize,
    pub joined_records: usize,
    pub partitions: usize,
}

pub async fn run_pipeline(config: &PipelineConfig) -> Result<RunSummary> {
    let store = GeoStore::open(&config.geo_store_path)
        .await
        .with_context(|| format!("store: opening {}", config.geo_store_path.display()))?;
    let mut summary = RunSummary::default();

    if let Some(page) = &config.aor_page {
        resolve_entities(&store, config, page, &mut summary).await?;
    }

    if let Some(geojson) = &config.reference_geojson {
        clear_collection(&store, &config.reference_collection, config.overwrite_output).await?;
        import_geojson(&store, geojson, &config.reference_collection)
            .await
            .context("reference import")?;
    }

    multiply_and_partition(&store, config, &mut summary).await?;
    tracing::info!(
        "Run complete: {} entities, {} exported rows ({} without a country), {} joined records, {} partitions",
        summary.entities,
        summary.exported_rows,
        summary.no_match_rows,
        summary.joined_records,
        summary.partitions
    );

    Ok(summary)
}

async fn resolve_entities(
    store: &GeoStore,
    config: &PipelineConfig,
    page: &str,
    summary: &mut RunSummary,
) -> Result<()> {
    let html = load_document(page).await?;
    let entities = parse_aor_document(&html, &config.source_link).context("scrape")?;
    let resolved = build(&entities);
    let rows = to_export_rows(&explode(&resolved));
    export_csv(&rows, &config.csv_path)?;

    summary.entities = resolved.len();
    summary.exported_rows = rows.len();
    summary.no_match_rows = no_match_count(&resolved);
    if summary.no_match_rows > 0 {
        tracing::warn!("{} entities resolved to no country", summary.no_match_rows);
    }

    clear_collection(store, &config.attribute_table, config.overwrite_output).await?;
    import_csv_table(store, &config.csv_path, &config.attribute_table)
        .await
        .context("attribute import")?;

    Ok(())
}

/// Deletes an existing collection when overwriting is allowed.
async fn clear_collection(store: &GeoStore, name: &str, overwrite: bool) -> Result<()> {
    if !store.collection_exists(name).await? {
        return Ok(());
    }

    match overwrite {
        true => store.delete_collection(name).await,
        false => {
            let err = PipelineError::CollectionExists(name.to_string());
            tracing::error!("{}", err);
            Err(err.into())
        }
    }
}

/// Checks the multiplied collection and the output dataset together, so a
/// refused overwrite leaves both untouched.
async fn clear_outputs(store: &GeoStore, config: &PipelineConfig) -> Result<()> {
    let multiplied = store.collection_exists(&config.multiplied_collection).await?;
    let dataset = store.dataset_exists(&config.output_dataset).await?;

    if !config.overwrite_output {
        let existing = match (multiplied, dataset) {
            (true, _) => Some(&config.multiplied_collection),
            (false, true) => Some(&config.output_dataset),
            (false, false) => None,
        };
        if let Some(name) = existing {
            let err = PipelineError::CollectionExists(name.clone());
            tracing::error!("{}", err);
            return Err(err.into());
        }
    }

    if multiplied {
        store.delete_collection(&config.multiplied_collection).await?;
    }
    if dataset {
        store.delete_dataset(&config.output_dataset).await?;
    }

    Ok(())
}

fn require_field(fields: &[Field], collection: &str, field: &str) -> Result<()> {
    match fields.iter().any(|f| f.name == field) {
        true => Ok(()),
        false => {
            let err = PipelineError::SchemaMismatch {
                stage: "validate",
                collection: collection.to_string(),
                field: field.to_string(),
            };
            tracing::error!("{}", err);
            Err(err.into())
        }
    }
}

fn attribute_names(fields: &[Field]) -> Vec<String> {
    fields
        .iter()
        .filter(|f| !f.is_geometry())
        .map(|f| f.name.clone())
        .collect()
}

async fn multiply_and_partition(
    store: &GeoStore,
    config: &PipelineConfig,
    summary: &mut RunSummary,
) -> Result<()> {
    let reference = store.describe(&config.reference_collection).await?;
    let geo_fields = store.list_fields(&config.reference_collection).await?;
    let attr_fields = store.list_fields(&config.attribute_table).await?;
    if reference.kind != CollectionKind::FeatureClass {
        let err = PipelineError::SchemaMismatch {
            stage: "validate",
            collection: config.reference_collection.clone(),
            field: SHAPE_FIELD.to_string(),
        };
        tracing::error!("{}", err);
        return Err(err.into());
    }
    require_field(&geo_fields, &config.reference_collection, &config.reference_join_field)?;
    require_field(&attr_fields, &config.attribute_table, &config.table_join_field)?;
    require_field(&attr_fields, &config.attribute_table, &config.group_field)?;

    let geo_records = store
        .read_records(&config.reference_collection, &attribute_names(&geo_fields))
        .await?;
    let attr_records = store
        .read_records(&config.attribute_table, &attribute_names(&attr_fields))
        .await?;

    // The index comes from the attribute table; every joined record must find
    // its group in it before anything is written.
    let index = GroupIndex::from_records(&attr_records, &config.group_field);
    let mut joined = multiply(
        &geo_records,
        &config.reference_join_field,
        &attr_records,
        &config.table_join_field,
    );
    assign_group_index(&mut joined, &config.group_field, &index)?;
    let partitions = partition_with_index(&joined, &config.group_field, &index)?;
    tracing::info!(
        "Many-to-many replication produced {} records in {} groups",
        joined.len(),
        partitions.len()
    );

    let merged = merge_schema(&geo_fields, &attr_fields);
    let group_index_field = Field::new(GROUP_INDEX_FIELD, FieldType::Integer);
    let geometry_type = reference.geometry_type.as_deref();
    let spatial_reference = reference.spatial_reference.as_deref();

    clear_outputs(store, config).await?;
    store
        .create_collection(&config.multiplied_collection, &geo_fields, geometry_type, spatial_reference)
        .await?;
    for field in merged.added.iter().chain(std::iter::once(&group_index_field)) {
        store.add_field(&config.multiplied_collection, field).await?;
    }
    store
        .write_records(&config.multiplied_collection, &joined)
        .await
        .context("multiply: writing joined records")?;

    store.create_dataset(&config.output_dataset, spatial_reference).await?;

    let mut output_fields = merged.output;
    output_fields.push(group_index_field);
    for (name, group) in &partitions {
        let collection = format!("{}/{}", config.output_dataset, name);
        store
            .create_collection(&collection, &output_fields, geometry_type, spatial_reference)
            .await?;
        store
            .write_records(&collection, &group.records)
            .await
            .with_context(|| format!("partition: writing group {} ({})", group.index, group.key))?;
        tracing::debug!("Exported {} records for {}", group.records.len(), group.key);
    }

    summary.joined_records = joined.len();
    summary.partitions = partitions.len();

    Ok(())
}
