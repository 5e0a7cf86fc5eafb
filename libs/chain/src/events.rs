//! Ordered event log

use crate::errors::ChainError;
use crate::types::Address;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// One emitted event. The payload is kept as JSON text so 128-bit amounts
/// survive unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub emitter: Address,
    pub name: &'static str,
    pub data: String,
    pub block: u64,
}

impl LogRecord {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ChainError> {
        serde_json::from_str(&self.data).map_err(|e| ChainError::EventEncoding(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    records: Vec<LogRecord>,
}

impl EventLog {
    pub fn emit<T: Serialize>(
        &mut self,
        emitter: Address,
        name: &'static str,
        payload: &T,
        block: u64,
    ) -> Result<(), ChainError> {
        let data =
            serde_json::to_string(payload).map_err(|e| ChainError::EventEncoding(e.to_string()))?;
        self.records.push(LogRecord {
            emitter,
            name,
            data,
            block,
        });
        Ok(())
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Records emitted by `emitter` under `name`, oldest first
    pub fn filter<'a>(
        &'a self,
        emitter: Address,
        name: &'a str,
    ) -> impl Iterator<Item = &'a LogRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.emitter == emitter && r.name == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
