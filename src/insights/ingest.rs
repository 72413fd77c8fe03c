//! # Streaming Report Ingestion
//!
//! Reads a report line by line, maps every row and hands fixed-size batches to
//! the record store. At most one batch of records is held in memory; reading
//! stops while a batch is being written.

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, instrument, warn};

use super::csv::{RecordAssembler, RowError, split_record};
use super::header::HeaderLayout;
use super::mapper::map_row;
use super::record::PerformanceRecord;
use super::ReportGrain;
use crate::error::{IngestError, MappingError};
use crate::repositories::PerformanceRecordStore;

/// Totals for one ingested report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Data rows seen, excluding the header and blank lines
    pub rows: u64,
    /// Records written by the store
    pub saved: u64,
    /// Rows skipped because they could not be parsed or mapped
    pub parse_errors: u64,
    /// Store round trips
    pub batches: u64,
}

#[derive(Debug, thiserror::Error)]
enum RowFailure {
    #[error(transparent)]
    Csv(#[from] RowError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

pub struct ReportIngestor {
    store: Arc<dyn PerformanceRecordStore>,
    batch_size: usize,
    grain: ReportGrain,
}

impl ReportIngestor {
    pub fn new(store: Arc<dyn PerformanceRecordStore>, batch_size: usize, grain: ReportGrain) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            grain,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn grain(&self) -> ReportGrain {
        self.grain
    }

    /// Ingest one report for `account_id`.
    ///
    /// Row failures are counted and never abort the stream. Read and storage
    /// failures do; batches already written stay written and a re-run is
    /// idempotent.
    #[instrument(skip_all, fields(account_id = %account_id, grain = %self.grain))]
    pub async fn ingest<R>(&self, account_id: &str, mut reader: R) -> Result<IngestSummary, IngestError>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let mut summary = IngestSummary::default();
        let mut layout: Option<HeaderLayout> = None;
        let mut assembler = RecordAssembler::default();
        let mut batch: Vec<PerformanceRecord> = Vec::with_capacity(self.batch_size);
        let mut line_buf = Vec::new();
        let mut line_no: u64 = 0;

        loop {
            line_buf.clear();
            if reader.read_until(b'\n', &mut line_buf).await? == 0 {
                break;
            }
            line_no += 1;

            let decoded = String::from_utf8_lossy(&line_buf);
            let line = decoded.trim_end_matches(['\n', '\r']);
            let Some(record) = assembler.push_line(line) else {
                continue;
            };
            if record.trim().is_empty() {
                continue;
            }

            let Some(header) = layout.as_ref() else {
                let headers = split_record(&record)
                    .map_err(|err| IngestError::MalformedHeader(err.to_string()))?;
                let parsed = HeaderLayout::from_raw(headers);
                debug!(columns = ?parsed.keys().collect::<Vec<_>>(), "Resolved report header");
                layout = Some(parsed);
                continue;
            };

            summary.rows += 1;
            match self.parse_row(header, &record, account_id) {
                Ok(mapped) => {
                    batch.push(mapped);
                    if batch.len() >= self.batch_size {
                        self.flush(&mut batch, &mut summary).await?;
                    }
                }
                Err(err) => {
                    summary.parse_errors += 1;
                    debug!(line = line_no, error = %err, "Skipping report row");
                }
            }
        }

        if assembler.finish().is_some() {
            summary.rows += 1;
            summary.parse_errors += 1;
            debug!(line = line_no, "Report ended inside a quoted field");
        }

        if !batch.is_empty() {
            self.flush(&mut batch, &mut summary).await?;
        }

        counter!("ingest_rows_total").increment(summary.rows);
        counter!("ingest_parse_errors_total").increment(summary.parse_errors);

        if summary.parse_errors > 0 {
            warn!(
                rows = summary.rows,
                parse_errors = summary.parse_errors,
                "Report contained rows that could not be ingested"
            );
        }
        info!(
            rows = summary.rows,
            saved = summary.saved,
            batches = summary.batches,
            "Report ingested"
        );

        Ok(summary)
    }

    fn parse_row(
        &self,
        layout: &HeaderLayout,
        record: &str,
        account_id: &str,
    ) -> Result<PerformanceRecord, RowFailure> {
        let fields = split_record(record)?;
        if fields.len() != layout.width() {
            return Err(RowError::ColumnCount {
                expected: layout.width(),
                found: fields.len(),
            }
            .into());
        }
        let row = layout.row(fields);
        Ok(map_row(&row, account_id, self.grain)?)
    }

    async fn flush(
        &self,
        batch: &mut Vec<PerformanceRecord>,
        summary: &mut IngestSummary,
    ) -> Result<(), IngestError> {
        let records = std::mem::replace(batch, Vec::with_capacity(self.batch_size));
        let count = records.len();
        let saved = self.store.save_batch(records).await?;
        summary.saved += saved;
        summary.batches += 1;
        debug!(records = count, saved, "Flushed record batch");
        Ok(())
    }
}
