//! Persistent vector store over a local LanceDB directory.
//!
//! One table holds the passage entries, a second key/value `meta` table
//! holds the ingest completion marker. Reopening the same directory reuses
//! existing data; ingestion gates on the marker so a crash between batches
//! is never mistaken for a finished index.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use arrow_array::{
    FixedSizeListArray, Float32Array, Int32Array, Int64Array, RecordBatch, RecordBatchIterator,
    StringArray, TimestampMillisecondArray,
};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType};

use versed_core::error::{Error, Result};
use versed_core::traits::VectorIndex;
use versed_core::types::{Chunk, IndexEntry, ScoredChunk};

use crate::schema::{build_meta_schema, build_passages_schema};

const META_TABLE: &str = "meta";

pub struct VectorStore {
    db: Connection,
    collection: String,
    dim: usize,
    max_batch: usize,
}

impl VectorStore {
    /// Connect to (or create) the LanceDB directory at `db_dir`.
    /// `dim` and `max_batch_size` are fixed for the lifetime of the store.
    pub async fn open(
        db_dir: &Path,
        collection: &str,
        dim: usize,
        max_batch_size: usize,
    ) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("store dim must be > 0".to_string()));
        }
        if max_batch_size == 0 {
            return Err(Error::InvalidConfig("store max_batch_size must be > 0".to_string()));
        }
        std::fs::create_dir_all(db_dir)
            .with_context(|| format!("failed to create store directory {}", db_dir.display()))?;
        let db = connect(db_dir.to_string_lossy().as_ref())
            .execute()
            .await
            .map_err(store_err)?;
        Ok(Self {
            db,
            collection: collection.to_string(),
            dim,
            max_batch: max_batch_size,
        })
    }

    fn marker_key(&self) -> String {
        format!("ingest_complete:{}", self.collection)
    }

    async fn table_exists(&self, name: &str) -> Result<bool> {
        let names = self.db.table_names().execute().await.map_err(store_err)?;
        Ok(names.contains(&name.to_string()))
    }

    /// First id from `ids` that is already present in the collection, if any.
    async fn find_existing_id(&self, ids: &[&str]) -> Result<Option<String>> {
        if !self.table_exists(&self.collection).await? {
            return Ok(None);
        }
        let list = ids
            .iter()
            .map(|id| format!("'{}'", id.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(", ");
        let table = self.db.open_table(&self.collection).execute().await.map_err(store_err)?;
        let mut stream = table
            .query()
            .only_if(format!("id IN ({list})"))
            .limit(1)
            .execute()
            .await
            .map_err(store_err)?;
        while let Some(batch) = stream.try_next().await.map_err(store_err)? {
            if batch.num_rows() == 0 {
                continue;
            }
            return Ok(Some(string_at(&batch, "id", 0)?));
        }
        Ok(None)
    }

    fn entries_to_record_batch(&self, entries: &[IndexEntry]) -> Result<RecordBatch> {
        let schema = build_passages_schema(self.dim);
        let mut ids = Vec::new();
        let mut indices = Vec::new();
        let mut texts = Vec::new();
        let mut starts = Vec::new();
        let mut ends = Vec::new();
        let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::new();
        for entry in entries {
            ids.push(entry.chunk.id.clone());
            indices.push(entry.chunk.index as i32);
            texts.push(entry.chunk.text.clone());
            starts.push(entry.chunk.start as i64);
            ends.push(entry.chunk.end as i64);
            vectors.push(Some(entry.vector.iter().map(|&x| Some(x)).collect()));
        }
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(Int32Array::from(indices)),
                Arc::new(StringArray::from(texts)),
                Arc::new(Int64Array::from(starts)),
                Arc::new(Int64Array::from(ends)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
                    vectors.into_iter(),
                    self.dim as i32,
                )),
            ],
        )
        .map_err(store_err)
    }

    async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let schema = build_meta_schema();
        if !self.table_exists(META_TABLE).await? {
            let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
            self.db
                .create_table(META_TABLE, Box::new(iter))
                .execute()
                .await
                .map_err(store_err)?;
        }
        let table = self.db.open_table(META_TABLE).execute().await.map_err(store_err)?;
        let rb = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![key.to_string()])),
                Arc::new(StringArray::from(vec![value.to_string()])),
                Arc::new(TimestampMillisecondArray::from(vec![Utc::now().timestamp_millis()])),
            ],
        )
        .map_err(store_err)?;
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), schema));
        // Upsert: key is unique
        let mut mi = table.merge_insert(&["key"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        let _ = mi.execute(reader).await.map_err(store_err)?;
        Ok(())
    }

    async fn get_meta(&self, key: &str) -> Result<Option<String>> {
        if !self.table_exists(META_TABLE).await? {
            return Ok(None);
        }
        let table = self.db.open_table(META_TABLE).execute().await.map_err(store_err)?;
        let mut stream = table
            .query()
            .only_if(format!("key = '{}'", key.replace('\'', "''")))
            .execute()
            .await
            .map_err(store_err)?;
        while let Some(batch) = stream.try_next().await.map_err(store_err)? {
            if batch.num_rows() == 0 {
                continue;
            }
            return Ok(Some(string_at(&batch, "value", 0)?));
        }
        Ok(None)
    }
}

#[async_trait]
impl VectorIndex for VectorStore {
    fn dim(&self) -> usize {
        self.dim
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch
    }

    async fn is_empty(&self) -> Result<bool> {
        if !self.table_exists(&self.collection).await? {
            return Ok(true);
        }
        let table = self.db.open_table(&self.collection).execute().await.map_err(store_err)?;
        let rows = table.count_rows(None).await.map_err(store_err)?;
        Ok(rows == 0)
    }

    async fn is_complete(&self) -> Result<bool> {
        Ok(self.get_meta(&self.marker_key()).await?.is_some())
    }

    async fn insert_batch(&self, entries: &[IndexEntry]) -> Result<()> {
        if entries.len() > self.max_batch {
            return Err(Error::BatchTooLarge { got: entries.len(), max: self.max_batch });
        }
        if entries.is_empty() {
            return Ok(());
        }
        let mut seen = HashSet::new();
        for entry in entries {
            if entry.vector.len() != self.dim {
                return Err(Error::DimensionMismatch { got: entry.vector.len(), want: self.dim });
            }
            if !seen.insert(entry.chunk.id.as_str()) {
                return Err(Error::DuplicateEntry(entry.chunk.id.clone()));
            }
        }
        let ids: Vec<&str> = entries.iter().map(|e| e.chunk.id.as_str()).collect();
        if let Some(id) = self.find_existing_id(&ids).await? {
            return Err(Error::DuplicateEntry(id));
        }

        // One RecordBatch per call: the insert lands whole or not at all.
        let rb = self.entries_to_record_batch(entries)?;
        let schema = rb.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), schema));
        if self.table_exists(&self.collection).await? {
            let table = self.db.open_table(&self.collection).execute().await.map_err(store_err)?;
            let _ = table.add(reader).execute().await.map_err(store_err)?;
        } else {
            self.db
                .create_table(&self.collection, reader)
                .execute()
                .await
                .map_err(store_err)?;
        }
        tracing::debug!(entries = entries.len(), collection = %self.collection, "inserted batch");
        Ok(())
    }

    async fn mark_complete(&self) -> Result<()> {
        self.set_meta(&self.marker_key(), "1").await
    }

    async fn clear(&self) -> Result<()> {
        if self.table_exists(&self.collection).await? {
            let table = self.db.open_table(&self.collection).execute().await.map_err(store_err)?;
            let _ = table.delete("true").await.map_err(store_err)?;
        }
        if self.table_exists(META_TABLE).await? {
            let table = self.db.open_table(META_TABLE).execute().await.map_err(store_err)?;
            let key = self.marker_key().replace('\'', "''");
            let _ = table.delete(&format!("key = '{key}'")).await.map_err(store_err)?;
        }
        tracing::info!(collection = %self.collection, "cleared collection");
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(Error::InvalidConfig("k must be > 0".to_string()));
        }
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch { got: vector.len(), want: self.dim });
        }
        if !self.table_exists(&self.collection).await? {
            return Ok(Vec::new());
        }
        let table = self.db.open_table(&self.collection).execute().await.map_err(store_err)?;
        let mut stream = table
            .vector_search(vector.to_vec())
            .map_err(store_err)?
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(store_err)?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(store_err)? {
            for row in 0..batch.num_rows() {
                let chunk = Chunk {
                    id: string_at(&batch, "id", row)?,
                    index: i32_at(&batch, "chunk_index", row)? as usize,
                    text: string_at(&batch, "text", row)?,
                    start: i64_at(&batch, "start", row)? as usize,
                    end: i64_at(&batch, "end", row)? as usize,
                };
                // LanceDB reports cosine distance; similarity = 1 - distance.
                let distance = f32_at(&batch, "_distance", row)?;
                hits.push(ScoredChunk { chunk, score: 1.0 - distance });
            }
        }
        hits.truncate(k);
        Ok(hits)
    }
}

fn store_err(e: impl Into<anyhow::Error>) -> Error {
    Error::Other(e.into())
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| Error::Other(anyhow!("column '{name}' missing or mistyped")))
}

fn string_at(batch: &RecordBatch, name: &str, row: usize) -> Result<String> {
    Ok(column::<StringArray>(batch, name)?.value(row).to_string())
}

fn i32_at(batch: &RecordBatch, name: &str, row: usize) -> Result<i32> {
    Ok(column::<Int32Array>(batch, name)?.value(row))
}

fn i64_at(batch: &RecordBatch, name: &str, row: usize) -> Result<i64> {
    Ok(column::<Int64Array>(batch, name)?.value(row))
}

fn f32_at(batch: &RecordBatch, name: &str, row: usize) -> Result<f32> {
    Ok(column::<Float32Array>(batch, name)?.value(row))
}
