//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use altgen::error::{AltgenError, AltgenResult};
use altgen::providers::GenerationClient;
use altgen::services::store::{PropertyStore, RUN_STATUS};
use altgen::services::table::{AssetRow, AssetTable, FIRST_DATA_ROW};
use altgen::types::{ProviderFailure, ProviderId};

/// Eligible row builder
pub fn low_row(asset_type: &str, source_text: &str) -> AssetRow {
    AssetRow {
        performance_label: "LOW".to_string(),
        asset_type: asset_type.to_string(),
        source_text: source_text.to_string(),
        alternatives: Default::default(),
    }
}

pub fn labeled_row(label: &str, asset_type: &str, source_text: &str) -> AssetRow {
    AssetRow {
        performance_label: label.to_string(),
        asset_type: asset_type.to_string(),
        source_text: source_text.to_string(),
        alternatives: Default::default(),
    }
}

/// In-memory property store; `stop()` flips the run-control flag from test
/// code without awaiting.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.map
            .lock()
            .unwrap()
            .insert(RUN_STATUS.to_string(), "STOP".to_string());
    }

}

#[async_trait]
impl PropertyStore for MemoryStore {
    async fn get(&self, key: &str) -> AltgenResult<Option<String>> {
        Ok(self.map.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> AltgenResult<()> {
        self.map
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> AltgenResult<()> {
        self.map.lock().unwrap().remove(key);
        Ok(())
    }
}

/// In-memory asset table
pub struct MemoryTable {
    pub rows: Vec<AssetRow>,
}

impl MemoryTable {
    pub fn new(rows: Vec<AssetRow>) -> Self {
        Self { rows }
    }

    pub fn alternatives(&self, row: u32) -> &[Option<String>; 3] {
        &self.rows[(row - FIRST_DATA_ROW) as usize].alternatives
    }

    fn index(&self, row: u32, slot: usize) -> AltgenResult<usize> {
        row.checked_sub(FIRST_DATA_ROW)
            .map(|i| i as usize)
            .filter(|i| *i < self.rows.len() && slot < 3)
            .ok_or_else(|| AltgenError::TableError {
                operation: format!("address row {row} slot {slot}"),
                path: "memory".to_string(),
            })
    }
}

#[async_trait]
impl AssetTable for MemoryTable {
    async fn snapshot(&self) -> AltgenResult<Vec<(u32, AssetRow)>> {
        Ok(self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i as u32 + FIRST_DATA_ROW, row.clone()))
            .collect())
    }

    async fn write_alternative(&mut self, row: u32, slot: usize, text: &str) -> AltgenResult<()> {
        let index = self.index(row, slot)?;
        self.rows[index].alternatives[slot] = Some(text.to_string());
        Ok(())
    }

    async fn clear_alternative(&mut self, row: u32, slot: usize) -> AltgenResult<()> {
        let index = self.index(row, slot)?;
        self.rows[index].alternatives[slot] = None;
        Ok(())
    }

    async fn clear_all_alternatives(&mut self) -> AltgenResult<()> {
        for row in &mut self.rows {
            row.alternatives = Default::default();
        }
        Ok(())
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

/// Client that replays a fixed script of provider results and records every
/// prompt it was sent.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, ProviderFailure>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<String, ProviderFailure>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

/// Script helpers
pub fn ok(text: &str) -> Result<String, ProviderFailure> {
    Ok(text.to_string())
}

pub fn repeat(
    failure: ProviderFailure,
    times: usize,
) -> impl Iterator<Item = Result<String, ProviderFailure>> {
    std::iter::repeat_with(move || Err(failure.clone())).take(times)
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(
        &self,
        _provider: ProviderId,
        _model: &str,
        prompt: &str,
        _max_chars: usize,
    ) -> Result<String, ProviderFailure> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderFailure::ServerError("script exhausted".to_string())))
    }
}
