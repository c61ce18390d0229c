//! In-memory transfer engine
//!
//! Serves a flat file store kept in process memory and records every request
//! it receives. Useful for exercising code built on the client without a
//! server.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::engine::request::{ConnectionOptions, TransferRequest};
use crate::engine::{EngineProvider, TransferEngine};
use crate::error::{EngineError, NO_NATIVE_CODE, OptionKey};

const FILE_UNAVAILABLE: i32 = 550;

/// Snapshot of a request as the engine received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub list_only: bool,
    pub quote: Vec<String>,
    pub upload_len: Option<u64>,
    pub options: ConnectionOptions,
}

#[derive(Default)]
struct MemoryState {
    files: BTreeMap<String, Vec<u8>>,
    requests: Vec<RecordedRequest>,
    scripted: VecDeque<Result<Vec<u8>, EngineError>>,
    refuse_acquire: bool,
    acquired: usize,
    released: usize,
}

/// Provider sharing one store between all engines it hands out.
#[derive(Clone, Default)]
pub struct MemoryProvider {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `content` under `path` (leading slashes are ignored).
    pub fn insert_file(&self, path: &str, content: impl Into<Vec<u8>>) {
        self.lock().files.insert(store_key(path), content.into());
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(&store_key(path)).cloned()
    }

    /// Every request performed so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Answers the next request with `response` instead of the store.
    pub fn push_response(&self, response: Result<Vec<u8>, EngineError>) {
        self.lock().scripted.push_back(response);
    }

    /// Makes every later `acquire` fail.
    pub fn refuse_acquire(&self) {
        self.lock().refuse_acquire = true;
    }

    pub fn acquired(&self) -> usize {
        self.lock().acquired
    }

    pub fn released(&self) -> usize {
        self.lock().released
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EngineProvider for MemoryProvider {
    type Engine = MemoryEngine;

    fn acquire(&self) -> Result<MemoryEngine, EngineError> {
        let mut state = self.lock();
        if state.refuse_acquire {
            return Err(EngineError::Init("memory engine refused the handle".into()));
        }
        state.acquired += 1;

        Ok(MemoryEngine {
            state: Arc::clone(&self.state),
        })
    }
}

/// Engine handle backed by a [`MemoryProvider`] store.
pub struct MemoryEngine {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryEngine {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransferEngine for MemoryEngine {
    fn perform(&mut self, request: TransferRequest<'_>) -> Result<Vec<u8>, EngineError> {
        let mut state = self.lock();
        state.requests.push(RecordedRequest {
            url: request.url.clone(),
            list_only: request.list_only,
            quote: request.quote.clone(),
            upload_len: request.upload.as_ref().map(|upload| upload.len()),
            options: request.options.clone(),
        });
        debug!("memory engine: {}", request.url);

        if let Some(response) = state.scripted.pop_front() {
            return response;
        }

        request.options.validate()?;
        let target = request.target()?;

        for command in &request.quote {
            run_quote(&mut state.files, command)?;
        }

        if request.list_only {
            return Ok(list_directory(&state.files, &target.path).into_bytes());
        }

        let key = store_key(&target.path);
        match request.upload {
            Some(upload) => {
                let mut content = Vec::new();
                upload
                    .into_reader()
                    .read_to_end(&mut content)
                    .map_err(|e| EngineError::Transfer {
                        code: e.raw_os_error().unwrap_or(NO_NATIVE_CODE),
                        message: e.to_string(),
                    })?;
                state.files.insert(key, content);
                Ok(Vec::new())
            }
            None => state
                .files
                .get(&key)
                .cloned()
                .ok_or_else(|| unavailable(&target.path)),
        }
    }
}

impl Drop for MemoryEngine {
    fn drop(&mut self) {
        self.lock().released += 1;
    }
}

fn store_key(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

fn unavailable(path: &str) -> EngineError {
    EngineError::Transfer {
        code: FILE_UNAVAILABLE,
        message: format!("{path}: No such file or directory"),
    }
}

fn run_quote(files: &mut BTreeMap<String, Vec<u8>>, command: &str) -> Result<(), EngineError> {
    let (verb, arg) = command
        .split_once(' ')
        .map(|(verb, arg)| (verb, arg.trim()))
        .unwrap_or((command, ""));

    match verb.to_ascii_uppercase().as_str() {
        "DELE" if !arg.is_empty() => files
            .remove(&store_key(arg))
            .map(|_| ())
            .ok_or_else(|| unavailable(arg)),
        "NOOP" => Ok(()),
        _ => Err(EngineError::Option {
            option: OptionKey::Quote,
            code: NO_NATIVE_CODE,
            message: format!("unsupported pre-transfer command: {command}"),
        }),
    }
}

/// Names directly below `dir`, one per line.
fn list_directory(files: &BTreeMap<String, Vec<u8>>, dir: &str) -> String {
    let dir = dir.trim_matches('/');
    let prefix = if dir.is_empty() {
        String::new()
    } else {
        format!("{dir}/")
    };

    let names: BTreeSet<&str> = files
        .keys()
        .filter_map(|key| key.strip_prefix(prefix.as_str()))
        .filter_map(|rest| rest.split('/').next())
        .filter(|name| !name.is_empty())
        .collect();

    names.into_iter().collect::<Vec<_>>().join("\n")
}
