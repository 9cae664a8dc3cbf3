//! Test helpers.

use std::collections::VecDeque;

use gpframe_error::{DbError, Result};
use parking_lot::Mutex;

use crate::gateway::{Gateway, TextRow};

/// A gateway that records every statement and replays scripted responses.
///
/// Statements that expect rows pop the next queued result set, or get an empty
/// result set if nothing is queued.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    statements: Mutex<Vec<String>>,
    params: Mutex<Vec<Vec<String>>>,
    responses: Mutex<VecDeque<Vec<TextRow>>>,
    failures: Mutex<Vec<(String, String)>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result set where each row is a single JSON text column.
    pub fn push_json_rows<I, S>(&self, rows: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = rows.into_iter().map(|r| vec![Some(r.into())]).collect();
        self.responses.lock().push_back(rows);
    }

    /// Queue an arbitrary result set.
    pub fn push_rows(&self, rows: Vec<TextRow>) {
        self.responses.lock().push_back(rows);
    }

    /// Fail any statement containing `needle` with the given message.
    pub fn fail_when_contains(&self, needle: impl Into<String>, msg: impl Into<String>) {
        self.failures.lock().push((needle.into(), msg.into()));
    }

    /// All statements executed so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    pub fn last_statement(&self) -> Option<String> {
        self.statements.lock().last().cloned()
    }

    pub fn params(&self) -> Vec<Vec<String>> {
        self.params.lock().clone()
    }
}

impl Gateway for RecordingGateway {
    fn execute(
        &self,
        sql: &str,
        params: &[String],
        expects_rows: bool,
    ) -> Result<Option<Vec<TextRow>>> {
        self.statements.lock().push(sql.to_string());
        self.params.lock().push(params.to_vec());

        if let Some((_, msg)) = self
            .failures
            .lock()
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
        {
            return Err(DbError::new(msg.clone()));
        }

        if !expects_rows {
            return Ok(None);
        }

        Ok(Some(self.responses.lock().pop_front().unwrap_or_default()))
    }
}
