//! Record/replay backend over paired JSONL files.
//!
//! In record mode every formatted prompt is appended to the prompts file
//! and empty completions are returned; a later harness run fills in the
//! responses file out of band. In replay mode both files are walked in
//! lockstep and the current run's prompts must match the recorded ones
//! exactly, otherwise completions would be attributed to the wrong
//! prompts.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Lines, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use swarmgen_core::{Prompt, PromptFormatter, PromptRecord, ResponseRecord};

use crate::backend::{GeneratorError, TextGenerator};

/// Forward-only reader over a line-delimited JSON file.
///
/// Exhaustion is an explicit `None`, not an error: the caller decides
/// whether running out of records is fatal.
pub struct RecordCursor<T> {
    lines: Lines<BufReader<File>>,
    path: PathBuf,
    _record: PhantomData<T>,
}

impl<T: DeserializeOwned> RecordCursor<T> {
    /// Open a cursor positioned at the first record.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GeneratorError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            path,
            _record: PhantomData,
        })
    }

    /// Advance to the next record, or `None` once the file is exhausted.
    pub fn next_record(&mut self) -> Result<Option<T>, GeneratorError> {
        match self.lines.next() {
            None => Ok(None),
            Some(line) => {
                let line = line?;
                let record = serde_json::from_str(&line).map_err(|e| {
                    GeneratorError::Parse(format!("{}: {}", self.path.display(), e))
                })?;
                Ok(Some(record))
            }
        }
    }
}

enum Mode {
    Record,
    Replay(Mutex<ReplayCursors>),
}

struct ReplayCursors {
    prompts: RecordCursor<PromptRecord>,
    responses: RecordCursor<ResponseRecord>,
    /// Records consumed so far, for error reporting.
    position: usize,
}

/// Dual-mode batch generator backed by two append-only JSONL files.
///
/// Mode is fixed at open: if the responses file exists the store replays,
/// otherwise it records. The replay cursors advance sequentially; the
/// store is a single-caller API and `generate` must not be invoked
/// concurrently with itself on one instance.
pub struct RecordReplayStore {
    prompts_path: PathBuf,
    formatter: PromptFormatter,
    mode: Mode,
}

impl RecordReplayStore {
    /// Open a store in record mode (no responses file configured).
    pub fn record(prompts_path: impl Into<PathBuf>) -> Result<Self, GeneratorError> {
        Self::open(prompts_path, None::<PathBuf>, None)
    }

    /// Open a store, selecting the mode from the responses file.
    ///
    /// A responses path that does not exist yet is a warning, not an
    /// error: the store falls back to record mode so a first pass can
    /// produce the prompts file.
    pub fn open(
        prompts_path: impl Into<PathBuf>,
        responses_path: Option<impl Into<PathBuf>>,
        system_prompt: Option<String>,
    ) -> Result<Self, GeneratorError> {
        let prompts_path = prompts_path.into();
        let responses_path = responses_path.map(Into::into);

        create_parent_dirs(&prompts_path)?;
        if let Some(path) = &responses_path {
            create_parent_dirs(path)?;
        }

        let formatter = match system_prompt {
            Some(system) => PromptFormatter::with_system_prompt(system),
            None => PromptFormatter::new(),
        };

        let mode = match &responses_path {
            Some(path) if path.exists() => {
                let cursors = ReplayCursors {
                    prompts: RecordCursor::open(&prompts_path)?,
                    responses: RecordCursor::open(path)?,
                    position: 0,
                };
                Mode::Replay(Mutex::new(cursors))
            }
            Some(path) => {
                tracing::warn!(
                    path = %path.display(),
                    "responses path configured but does not exist, recording instead"
                );
                Mode::Record
            }
            None => Mode::Record,
        };

        Ok(Self {
            prompts_path,
            formatter,
            mode,
        })
    }

    /// Whether the store replays cached completions.
    pub fn is_replaying(&self) -> bool {
        matches!(self.mode, Mode::Replay(_))
    }

    fn record_batch(&self, prompts: &[Prompt]) -> Result<Vec<String>, GeneratorError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.prompts_path)?;

        for prompt in prompts {
            let record = PromptRecord::new(self.formatter.format(prompt));
            let line = serde_json::to_string(&record)
                .map_err(|e| GeneratorError::Parse(e.to_string()))?;
            writeln!(file, "{line}")?;
        }

        tracing::debug!(
            batch = prompts.len(),
            path = %self.prompts_path.display(),
            "recorded prompt batch"
        );

        // A recorder produces no completions.
        Ok(vec![String::new(); prompts.len()])
    }

    fn replay_batch(
        &self,
        cursors: &Mutex<ReplayCursors>,
        prompts: &[Prompt],
    ) -> Result<Vec<String>, GeneratorError> {
        let mut cursors = cursors.lock();
        let batch_start = cursors.position;
        let mut completions = Vec::with_capacity(prompts.len());

        for prompt in prompts {
            let index = cursors.position;
            let (recorded, response) =
                match (cursors.prompts.next_record()?, cursors.responses.next_record()?) {
                    (Some(recorded), Some(response)) => (recorded, response),
                    _ => {
                        return Err(GeneratorError::StarvedCursor {
                            needed: prompts.len(),
                            available: index - batch_start,
                        })
                    }
                };
            cursors.position += 1;

            let formatted = self.formatter.format(prompt);
            if formatted != recorded.messages {
                return Err(GeneratorError::Consistency {
                    index,
                    expected: summarize(&recorded.messages),
                    actual: summarize(&formatted),
                });
            }

            completions.push(response.completion().to_string());
        }

        Ok(completions)
    }
}

#[async_trait]
impl TextGenerator for RecordReplayStore {
    async fn generate(
        &self,
        prompts: &[Prompt],
        _max_out_len: u32,
    ) -> Result<Vec<String>, GeneratorError> {
        match &self.mode {
            Mode::Record => self.record_batch(prompts),
            Mode::Replay(cursors) => self.replay_batch(cursors, prompts),
        }
    }

    fn name(&self) -> &str {
        match self.mode {
            Mode::Record => "record",
            Mode::Replay(_) => "replay",
        }
    }
}

fn create_parent_dirs(path: &Path) -> Result<(), GeneratorError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn summarize(messages: &[swarmgen_core::Message]) -> String {
    serde_json::to_string(messages).unwrap_or_else(|_| format!("{messages:?}"))
}
