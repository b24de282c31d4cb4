use thiserror::Error;

/// Fatal conditions that stop a run. Unmatched tokens are not errors; they
/// travel through the data as `CountryMatch::NoMatch`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage}: collection '{collection}' has no field '{field}'")]
    SchemaMismatch {
        stage: &'static str,
        collection: String,
        field: String,
    },
    #[error("{stage}: record {record_index} has group value {value:?} absent from the group index")]
    JoinIntegrityViolation {
        stage: &'static str,
        record_index: usize,
        value: Option<String>,
    },
    #[error("partition: group value {value:?} sanitizes to unusable name '{name}'")]
    PartitionName { value: String, name: String },
    #[error("collection '{0}' already exists")]
    CollectionExists(String),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    #[error("configuration: {0}")]
    Config(String),
}
