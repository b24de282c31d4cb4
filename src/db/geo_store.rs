use super::model::{
    CollectionInfo, CollectionKind, Field, FieldType, FieldValue, Geometry, Record, SHAPE_FIELD,
};
use super::util::{get_db_pool, quote_ident};
use crate::error::PipelineError;
use crate::prelude::*;
use anyhow::anyhow;
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqliteRow},
    Executor, Row, Sqlite, SqlitePool,
};
use std::path::Path;

/// Single-file geodatabase: feature classes, plain tables and the feature
/// datasets that group them, all inside one SQLite file.
pub struct GeoStore {
    pool: SqlitePool,
}

impl GeoStore {
    pub async fn open(db_path: &Path) -> Result<GeoStore> {
        let pool = get_db_pool(db_path).await?;
        pool.execute(
            "CREATE TABLE IF NOT EXISTS gdb_datasets (
                name TEXT PRIMARY KEY,
                spatial_reference TEXT
            )",
        )
        .await?;
        pool.execute(
            "CREATE TABLE IF NOT EXISTS gdb_collections (
                name TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                dataset TEXT,
                geometry_type TEXT,
                spatial_reference TEXT
            )",
        )
        .await?;
        pool.execute(
            "CREATE TABLE IF NOT EXISTS gdb_fields (
                collection TEXT NOT NULL,
                name TEXT NOT NULL,
                field_type TEXT NOT NULL,
                precision INTEGER NOT NULL,
                scale INTEGER NOT NULL,
                length INTEGER NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (collection, name)
            )",
        )
        .await?;
        tracing::debug!("Opened geodatabase at {}", db_path.display());

        Ok(GeoStore { pool })
    }

    pub async fn dataset_exists(&self, name: &str) -> Result<bool> {
        let row: Option<(String,)> = sqlx::query_as("SELECT name FROM gdb_datasets WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    pub async fn create_dataset(&self, name: &str, spatial_reference: Option<&str>) -> Result<()> {
        if self.dataset_exists(name).await? || self.collection_exists(name).await? {
            return Err(PipelineError::CollectionExists(name.to_string()).into());
        }

        sqlx::query("INSERT INTO gdb_datasets (name, spatial_reference) VALUES (?, ?)")
            .bind(name)
            .bind(spatial_reference)
            .execute(&self.pool)
            .await?;
        tracing::info!("Created feature dataset {}", name);

        Ok(())
    }

    /// Drops the dataset and every collection it contains.
    pub async fn delete_dataset(&self, name: &str) -> Result<()> {
        let members: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM gdb_collections WHERE dataset = ?")
                .bind(name)
                .fetch_all(&self.pool)
                .await?;
        for (member,) in members {
            self.delete_collection(&member).await?;
        }

        sqlx::query("DELETE FROM gdb_datasets WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        tracing::info!("Deleted feature dataset {}", name);

        Ok(())
    }

    pub async fn collection_exists(&self, name: &str) -> Result<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM gdb_collections WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.is_some())
    }

    /// Creates a collection from a field template. A `geometry_type` makes it
    /// a feature class with a `SHAPE` column; geometry fields in the template
    /// are ignored. Names of the form `dataset/name` place the collection in
    /// an existing feature dataset.
    pub async fn create_collection(
        &self,
        name: &str,
        template: &[Field],
        geometry_type: Option<&str>,
        spatial_reference: Option<&str>,
    ) -> Result<CollectionInfo> {
        if self.collection_exists(name).await? {
            return Err(PipelineError::CollectionExists(name.to_string()).into());
        }

        let dataset = match name.rsplit_once('/') {
            Some((dataset, _)) => {
                if !self.dataset_exists(dataset).await? {
                    let err = format!("Feature dataset {} does not exist", dataset);
                    tracing::error!(err);
                    return Err(anyhow!(err));
                }
                Some(dataset.to_string())
            }
            None => None,
        };

        let mut fields: Vec<Field> = template.iter().filter(|f| !f.is_geometry()).cloned().collect();
        let kind = match geometry_type {
            Some(_) => {
                fields.push(Field::new(SHAPE_FIELD, FieldType::Geometry));
                CollectionKind::FeatureClass
            }
            None => CollectionKind::Table,
        };

        let columns = fields
            .iter()
            .map(|f| format!("{} {}", quote_ident(&f.name), f.field_type.column_type()))
            .collect::<Vec<String>>();
        let ddl = match columns.is_empty() {
            true => format!("CREATE TABLE {} (rowid_alias INTEGER PRIMARY KEY)", quote_ident(name)),
            false => format!("CREATE TABLE {} ({})", quote_ident(name), columns.join(", ")),
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query(&ddl).execute(&mut *tx).await?;
        sqlx::query(
            "INSERT INTO gdb_collections (name, kind, dataset, geometry_type, spatial_reference)
            VALUES (?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(kind.as_str())
        .bind(dataset.clone())
        .bind(geometry_type)
        .bind(spatial_reference)
        .execute(&mut *tx)
        .await?;
        for (position, field) in fields.iter().enumerate() {
            insert_field_row(&mut tx, name, field, position as i64).await?;
        }
        tx.commit().await?;
        tracing::info!("Created {} {} with {} fields", kind.as_str(), name, fields.len());

        Ok(CollectionInfo {
            name: name.to_string(),
            kind,
            dataset,
            geometry_type: geometry_type.map(|g| g.to_string()),
            spatial_reference: spatial_reference.map(|s| s.to_string()),
        })
    }

    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM gdb_fields WHERE collection = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM gdb_collections WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::debug!("Deleted collection {}", name);

        Ok(())
    }

    pub async fn describe(&self, name: &str) -> Result<CollectionInfo> {
        let row: Option<(String, Option<String>, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT kind, dataset, geometry_type, spatial_reference FROM gdb_collections WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let (kind, dataset, geometry_type, spatial_reference) = match row {
            Some(row) => row,
            None => {
                let err = format!("Collection {} does not exist", name);
                tracing::error!(err);
                return Err(anyhow!(err));
            }
        };

        let kind = match kind.as_str() {
            "feature_class" => CollectionKind::FeatureClass,
            _ => CollectionKind::Table,
        };

        Ok(CollectionInfo {
            name: name.to_string(),
            kind,
            dataset,
            geometry_type,
            spatial_reference,
        })
    }

    pub async fn list_fields(&self, collection: &str) -> Result<Vec<Field>> {
        self.describe(collection).await?;
        let rows: Vec<(String, String, i32, i32, i32)> = sqlx::query_as(
            "SELECT name, field_type, precision, scale, length FROM gdb_fields
            WHERE collection = ? ORDER BY position",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(name, field_type, precision, scale, length)| {
                let field_type = match FieldType::parse(&field_type) {
                    Some(field_type) => field_type,
                    None => {
                        let err = format!("Unknown field type {} on {}.{}", field_type, collection, name);
                        tracing::error!(err);
                        return Err(anyhow!(err));
                    }
                };

                Ok(Field {
                    name,
                    field_type,
                    precision,
                    scale,
                    length,
                })
            })
            .collect()
    }

    /// Adds a field to an existing collection. Field names compare without
    /// case, as SQLite columns do; adding one that already exists leaves the
    /// collection untouched.
    pub async fn add_field(&self, collection: &str, field: &Field) -> Result<()> {
        let existing = self.list_fields(collection).await?;
        if existing.iter().any(|f| f.name.eq_ignore_ascii_case(&field.name)) {
            tracing::warn!("Field {} already exists on {}", field.name, collection);
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            quote_ident(collection),
            quote_ident(&field.name),
            field.field_type.column_type()
        ))
        .execute(&mut *tx)
        .await?;
        insert_field_row(&mut tx, collection, field, existing.len() as i64).await?;
        tx.commit().await?;
        tracing::debug!("Added field {} to {}", field.name, collection);

        Ok(())
    }

    /// Reads the named attribute fields, plus the geometry of feature
    /// classes, in insertion order.
    pub async fn read_records(&self, collection: &str, fields: &[String]) -> Result<Vec<Record>> {
        let schema = self.list_fields(collection).await?;
        let mut selected: Vec<&Field> = Vec::with_capacity(fields.len());
        for name in fields {
            match schema.iter().find(|f| &f.name == name && !f.is_geometry()) {
                Some(field) => selected.push(field),
                None => {
                    let err = PipelineError::SchemaMismatch {
                        stage: "read",
                        collection: collection.to_string(),
                        field: name.to_string(),
                    };
                    tracing::error!("{}", err);
                    return Err(err.into());
                }
            }
        }

        let shape = schema.iter().find(|f| f.is_geometry());
        let mut columns: Vec<String> = selected.iter().map(|f| quote_ident(&f.name)).collect();
        if let Some(shape) = shape {
            columns.push(quote_ident(&shape.name));
        }
        if columns.is_empty() {
            columns.push("NULL".to_string());
        }

        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            columns.join(", "),
            quote_ident(collection)
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut record = Record::default();
            for (i, field) in selected.iter().enumerate() {
                record
                    .attributes
                    .insert(field.name.clone(), decode_value(row, i, field.field_type)?);
            }
            if shape.is_some() {
                let geometry: Option<String> = row.try_get(selected.len())?;
                record.geometry = geometry.map(Geometry);
            }
            records.push(record);
        }
        tracing::debug!("Read {} records from {}", records.len(), collection);

        Ok(records)
    }

    /// Appends records, writing every attribute field of the collection's
    /// schema. Attributes outside the schema are not written.
    pub async fn write_records(&self, collection: &str, records: &[Record]) -> Result<usize> {
        let schema = self.list_fields(collection).await?;
        if schema.is_empty() {
            let err = format!("Collection {} has no fields to write", collection);
            tracing::error!(err);
            return Err(anyhow!(err));
        }

        let columns: Vec<String> = schema.iter().map(|f| quote_ident(&f.name)).collect();
        let placeholders = vec!["?"; schema.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(collection),
            columns.join(", "),
            placeholders
        );

        let mut tx = self.pool.begin().await?;
        for record in records {
            let mut query = sqlx::query(&sql);
            for field in &schema {
                query = match field.is_geometry() {
                    true => query.bind(record.geometry.as_ref().map(|g| g.0.clone())),
                    false => bind_value(query, record.get(&field.name)),
                };
            }
            query.execute(&mut *tx).await?;
        }
        tx.commit().await?;
        tracing::debug!("Wrote {} records to {}", records.len(), collection);

        Ok(records.len())
    }

    pub async fn count_records(&self, collection: &str) -> Result<i64> {
        self.describe(collection).await?;
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", quote_ident(collection)))
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn list_collections(&self, dataset: Option<&str>) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = match dataset {
            Some(dataset) => {
                sqlx::query_as("SELECT name FROM gdb_collections WHERE dataset = ? ORDER BY name")
                    .bind(dataset)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT name FROM gdb_collections ORDER BY name")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}

async fn insert_field_row(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    collection: &str,
    field: &Field,
    position: i64,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO gdb_fields (collection, name, field_type, precision, scale, length, position)
        VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(collection)
    .bind(&field.name)
    .bind(field.field_type.as_str())
    .bind(field.precision)
    .bind(field.scale)
    .bind(field.length)
    .bind(position)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &FieldValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        FieldValue::Null => query.bind(None::<String>),
        FieldValue::Integer(i) => query.bind(*i),
        FieldValue::Double(d) => query.bind(*d),
        FieldValue::Text(s) => query.bind(s.clone()),
    }
}

fn decode_value(row: &SqliteRow, index: usize, field_type: FieldType) -> Result<FieldValue> {
    let value = match field_type {
        FieldType::Integer => row
            .try_get::<Option<i64>, _>(index)?
            .map(FieldValue::Integer),
        FieldType::Double => row
            .try_get::<Option<f64>, _>(index)?
            .map(FieldValue::Double),
        FieldType::Text | FieldType::Date | FieldType::Geometry => row
            .try_get::<Option<String>, _>(index)?
            .map(FieldValue::Text),
    };

    Ok(value.unwrap_or(FieldValue::Null))
}
