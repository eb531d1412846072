//! Asset table access: the tabular store the batch reads and writes

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config;
use crate::error::{AltgenError, AltgenResult};

/// Sheet row number of the first data row; rows 1-2 are the upstream
/// report's header rows. `--start-row` values and all row numbers in logs
/// use this numbering so they match the source sheet.
pub const FIRST_DATA_ROW: u32 = 3;

/// One data row of the asset table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetRow {
    #[serde(default)]
    pub performance_label: String,
    #[serde(default)]
    pub asset_type: String,
    #[serde(default)]
    pub source_text: String,
    #[serde(default)]
    pub alternatives: [Option<String>; 3],
}

/// Tabular store contract: snapshot rows, write or clear one alternative
/// slot, reset all alternatives, locate the resume point.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetTable: Send + Sync {
    /// All data rows, paired with their sheet row numbers (starting at 3).
    async fn snapshot(&self) -> AltgenResult<Vec<(u32, AssetRow)>>;

    async fn write_alternative(&mut self, row: u32, slot: usize, text: &str) -> AltgenResult<()>;

    async fn clear_alternative(&mut self, row: u32, slot: usize) -> AltgenResult<()>;

    /// Clear every alternative cell while keeping source data intact.
    async fn clear_all_alternatives(&mut self) -> AltgenResult<()>;

    /// First row whose alternative slots are all empty, or one past the last
    /// row when every row has output.
    async fn first_unfilled_row(&self) -> AltgenResult<u32>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TableFile {
    rows: Vec<AssetRow>,
}

/// JSON-file-backed [`AssetTable`]. Writes go through to disk immediately,
/// so every slot outcome is durable before the next request fires.
pub struct JsonAssetTable {
    path: PathBuf,
    rows: Vec<AssetRow>,
}

impl JsonAssetTable {
    pub async fn open(path: impl AsRef<Path>) -> AltgenResult<Self> {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path).await.map_err(|_| AltgenError::TableError {
            operation: "read".to_string(),
            path: path.display().to_string(),
        })?;
        let file: TableFile = serde_json::from_slice(&bytes)?;
        Ok(Self {
            path,
            rows: file.rows,
        })
    }

    /// Create a table file from rows; used by tooling and tests.
    pub async fn create(path: impl AsRef<Path>, rows: Vec<AssetRow>) -> AltgenResult<Self> {
        let table = Self {
            path: path.as_ref().to_path_buf(),
            rows,
        };
        table.persist().await?;
        Ok(table)
    }

    fn index_for(&self, row: u32, slot: usize) -> AltgenResult<usize> {
        let index = row
            .checked_sub(FIRST_DATA_ROW)
            .map(|i| i as usize)
            .filter(|i| *i < self.rows.len());
        match index {
            Some(i) if slot < config::ALTERNATIVE_SLOTS => Ok(i),
            _ => Err(AltgenError::TableError {
                operation: format!("address row {row} slot {slot}"),
                path: self.path.display().to_string(),
            }),
        }
    }

    async fn persist(&self) -> AltgenResult<()> {
        let file = TableFile {
            rows: self.rows.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&file)?;
        fs::write(&self.path, bytes)
            .await
            .map_err(|_| AltgenError::TableError {
                operation: "write".to_string(),
                path: self.path.display().to_string(),
            })
    }
}

#[async_trait]
impl AssetTable for JsonAssetTable {
    async fn snapshot(&self) -> AltgenResult<Vec<(u32, AssetRow)>> {
        Ok(self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i as u32 + FIRST_DATA_ROW, row.clone()))
            .collect())
    }

    async fn write_alternative(&mut self, row: u32, slot: usize, text: &str) -> AltgenResult<()> {
        let index = self.index_for(row, slot)?;
        self.rows[index].alternatives[slot] = Some(text.to_string());
        self.persist().await
    }

    async fn clear_alternative(&mut self, row: u32, slot: usize) -> AltgenResult<()> {
        let index = self.index_for(row, slot)?;
        self.rows[index].alternatives[slot] = None;
        self.persist().await
    }

    async fn clear_all_alternatives(&mut self) -> AltgenResult<()> {
        for row in &mut self.rows {
            row.alternatives = Default::default();
        }
        self.persist().await
    }

    async fn first_unfilled_row(&self) -> AltgenResult<u32> {
        for (i, row) in self.rows.iter().enumerate() {
            if row.alternatives.iter().all(Option::is_none) {
                return Ok(i as u32 + FIRST_DATA_ROW);
            }
        }
        Ok(self.rows.len() as u32 + FIRST_DATA_ROW)
    }
}
