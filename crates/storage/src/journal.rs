// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL journal of list operations.
//!
//! Each entry is a single line of JSON: `{"seq":N,"op":{...}}\n`, written
//! and fsynced before the operation is applied in memory. Opening the
//! journal returns every valid op for replay. A corrupt tail is rotated to
//! `.bak` and the journal is rewritten with the entries that preceded it.

use crate::bak::rotate_bak_path;
use crate::lists::ListOp;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct RecordRef<'a> {
    seq: u64,
    op: &'a ListOp,
}

#[derive(Deserialize)]
struct Record {
    seq: u64,
    op: ListOp,
}

pub struct Journal {
    file: File,
    path: PathBuf,
    /// Highest sequence number written
    seq: u64,
    /// Entries written since open or the last compaction
    appended: u64,
}

impl Journal {
    /// Open or create the journal, returning the ops to replay.
    pub fn open(path: &Path) -> Result<(Self, Vec<ListOp>), JournalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let (records, corrupt) = read_records(&file)?;

        if corrupt {
            drop(file);
            let bak_path = rotate_bak_path(path);
            warn!(
                path = %path.display(),
                bak = %bak_path.display(),
                valid_entries = records.len(),
                "corrupt journal, rotating to .bak and keeping valid entries",
            );
            std::fs::rename(path, &bak_path)?;
            write_lines(path, records.iter().map(|(_, line)| line.as_str()))?;
            file = OpenOptions::new()
                .create(true)
                .read(true)
                .append(true)
                .open(path)?;
        }

        let mut seq = 0;
        let mut ops = Vec::with_capacity(records.len());
        for (record, _) in records {
            seq = seq.max(record.seq);
            ops.push(record.op);
        }

        let journal = Self {
            file,
            path: path.to_owned(),
            seq,
            appended: ops.len() as u64,
        };
        Ok((journal, ops))
    }

    /// Durably append `op`. Returns its sequence number.
    pub fn append(&mut self, op: &ListOp) -> Result<u64, JournalError> {
        let seq = self.seq + 1;
        let mut line = serde_json::to_vec(&RecordRef { seq, op })?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.sync_data()?;
        self.seq = seq;
        self.appended += 1;
        Ok(seq)
    }

    pub fn appended(&self) -> u64 {
        self.appended
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Replace the journal with `ops`, which must rebuild the current state.
    ///
    /// Written to a temp file and renamed into place. Sequence numbers keep
    /// increasing across compactions.
    pub fn compact(&mut self, ops: &[ListOp]) -> Result<(), JournalError> {
        let tmp_path = self.path.with_extension("tmp");
        let mut seq = self.seq;
        let mut lines = Vec::with_capacity(ops.len());
        for op in ops {
            seq += 1;
            lines.push(serde_json::to_string(&RecordRef { seq, op })?);
        }
        write_lines(&tmp_path, lines.iter().map(String::as_str))?;
        std::fs::rename(&tmp_path, &self.path)?;

        self.file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        self.seq = seq;
        self.appended = ops.len() as u64;
        Ok(())
    }
}

/// Read records up to the first unparseable line.
///
/// Returns the parsed records with their raw lines, and whether a corrupt
/// line was hit before EOF.
fn read_records(file: &File) -> Result<(Vec<(Record, String)>, bool), JournalError> {
    let mut reader = BufReader::new(file.try_clone()?);
    reader.seek(SeekFrom::Start(0))?;

    let mut records = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => return Ok((records, false)),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::InvalidData => return Ok((records, true)),
            Err(e) => return Err(e.into()),
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(trimmed) {
            Ok(record) => records.push((record, trimmed.to_string())),
            Err(_) => return Ok((records, true)),
        }
    }
}

fn write_lines<'a>(path: &Path, lines: impl Iterator<Item = &'a str>) -> Result<(), JournalError> {
    let mut file = File::create(path)?;
    for line in lines {
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
    }
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
