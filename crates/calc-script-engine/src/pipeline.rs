//! Debounced, single-flight background validation.
//!
//! Two threads connected by `std::sync::mpsc` channels:
//!
//! ```text
//! host --Command--> debouncer --Job--> runner --ValidationEvent--> host
//! ```
//!
//! - The debouncer keeps the latest text and parameter set. Every command restarts the quiet
//!   period; when it elapses without another command a job is handed to the runner.
//! - Only one pass runs at a time. If the quiet period elapses while a pass is running, the
//!   request is dropped (`Skipped { reason: Busy }`), not queued; the next edit triggers a new
//!   pass.
//! - A pass is never cancelled. When newer edits arrived while it ran, its report is still
//!   published with `stale: true`.
//! - A failing pass leaves the previously published report in place and switches the status to
//!   `"Unable to validate: ..."`.

use crate::error::PipelineError;
use crate::validator::{Validator, panic_message};
use calc_script::Diagnostic;
use calc_script_lang::ParameterSet;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Diagnostics published for one edit generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Generation of the text that was analyzed.
    pub generation: u64,
    /// Final diagnostics.
    pub diagnostics: Vec<Diagnostic>,
    /// Status summary, e.g. `"1 error, 2 warnings"`.
    pub status: String,
    /// Newer edits arrived while this pass ran.
    pub stale: bool,
}

/// Why a debounced request did not produce a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Another pass was still running.
    Busy,
    /// Text and parameters match the last published pass.
    Unchanged,
}

/// Notifications delivered to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationEvent {
    /// A pass started for `generation`.
    Started {
        /// Edit generation being analyzed.
        generation: u64,
    },
    /// A pass finished.
    Published(ValidationReport),
    /// A debounced request was dropped.
    Skipped {
        /// Edit generation of the dropped request.
        generation: u64,
        /// Why it was dropped.
        reason: SkipReason,
    },
    /// A pass could not complete.
    Failed {
        /// Edit generation of the failed pass.
        generation: u64,
        /// Error description.
        error: String,
    },
}

enum Command {
    Edit { text: String, generation: u64 },
    Parameters { parameters: ParameterSet, generation: u64 },
    Shutdown,
}

struct Job {
    text: String,
    parameters: ParameterSet,
    generation: u64,
}

struct Published {
    report: Option<ValidationReport>,
    status: String,
    last_input: Option<(String, ParameterSet)>,
}

struct Shared {
    generation: AtomicU64,
    running: AtomicBool,
    published: Mutex<Published>,
}

impl Shared {
    fn published(&self) -> MutexGuard<'_, Published> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Background validation for one document.
pub struct ValidationPipeline {
    tx: mpsc::Sender<Command>,
    rx: mpsc::Receiver<ValidationEvent>,
    shared: Arc<Shared>,
    debouncer: Option<JoinHandle<()>>,
    runner: Option<JoinHandle<()>>,
}

impl ValidationPipeline {
    /// Start the worker threads. The debounce delay comes from the validator's config.
    pub fn spawn(validator: Validator, parameters: ParameterSet) -> Self {
        let debounce = validator.config().debounce();
        let shared = Arc::new(Shared {
            generation: AtomicU64::new(0),
            running: AtomicBool::new(false),
            published: Mutex::new(Published {
                report: None,
                status: "Not validated".to_string(),
                last_input: None,
            }),
        });

        let (tx_cmd, rx_cmd) = mpsc::channel::<Command>();
        let (tx_job, rx_job) = mpsc::channel::<Job>();
        let (tx_event, rx_event) = mpsc::channel::<ValidationEvent>();

        let debouncer = {
            let shared = Arc::clone(&shared);
            let tx_event = tx_event.clone();
            thread::spawn(move || {
                debounce_loop(rx_cmd, tx_job, tx_event, shared, parameters, debounce)
            })
        };
        let runner = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || run_loop(validator, rx_job, tx_event, shared))
        };

        Self {
            tx: tx_cmd,
            rx: rx_event,
            shared,
            debouncer: Some(debouncer),
            runner: Some(runner),
        }
    }

    /// Report a new document text. Returns its generation.
    pub fn notify_edit(&self, text: impl Into<String>) -> Result<u64, PipelineError> {
        let generation = self.next_generation();
        self.send(Command::Edit {
            text: text.into(),
            generation,
        })?;
        Ok(generation)
    }

    /// Replace the calculator parameters. Re-validates the current text after the quiet period.
    pub fn set_parameters(&self, parameters: ParameterSet) -> Result<u64, PipelineError> {
        parameters.validate()?;
        let generation = self.next_generation();
        self.send(Command::Parameters {
            parameters,
            generation,
        })?;
        Ok(generation)
    }

    /// Next event, without blocking.
    pub fn try_recv(&self) -> Option<ValidationEvent> {
        self.rx.try_recv().ok()
    }

    /// Next event, waiting at most `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ValidationEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Wait for the next published report, discarding other events.
    pub fn wait_for_report(&self, timeout: Duration) -> Option<ValidationReport> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match self.rx.recv_timeout(remaining).ok()? {
                ValidationEvent::Published(report) => return Some(report),
                other => debug!(?other, "waiting for report"),
            }
        }
    }

    /// The last successfully published report.
    pub fn latest(&self) -> Option<ValidationReport> {
        self.shared.published().report.clone()
    }

    /// Current status line.
    pub fn status(&self) -> String {
        self.shared.published().status.clone()
    }

    /// Whether a pass is running right now.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Generation of the most recent edit or parameter change.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    fn next_generation(&self) -> u64 {
        self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn send(&self, command: Command) -> Result<(), PipelineError> {
        self.tx.send(command).map_err(|_| PipelineError::Stopped)
    }
}

impl Drop for ValidationPipeline {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        for handle in [self.debouncer.take(), self.runner.take()]
            .into_iter()
            .flatten()
        {
            if handle.join().is_err() {
                error!("validation thread panicked");
            }
        }
    }
}

fn debounce_loop(
    rx: mpsc::Receiver<Command>,
    tx_job: mpsc::Sender<Job>,
    tx_event: mpsc::Sender<ValidationEvent>,
    shared: Arc<Shared>,
    mut parameters: ParameterSet,
    debounce: Duration,
) {
    let mut text: Option<String> = None;
    let mut generation = 0;
    let mut pending = false;

    loop {
        let command = if pending {
            match rx.recv_timeout(debounce) {
                Ok(command) => command,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    pending = false;
                    let Some(text) = &text else { continue };
                    if shared
                        .running
                        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                        .is_err()
                    {
                        debug!(generation, "pass in flight; request dropped");
                        let _ = tx_event.send(ValidationEvent::Skipped {
                            generation,
                            reason: SkipReason::Busy,
                        });
                        continue;
                    }
                    let job = Job {
                        text: text.clone(),
                        parameters: parameters.clone(),
                        generation,
                    };
                    if tx_job.send(job).is_err() {
                        shared.running.store(false, Ordering::SeqCst);
                        break;
                    }
                    continue;
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match rx.recv() {
                Ok(command) => command,
                Err(_) => break,
            }
        };

        match command {
            Command::Edit {
                text: new_text,
                generation: new_generation,
            } => {
                text = Some(new_text);
                generation = new_generation;
                pending = true;
            }
            Command::Parameters {
                parameters: new_parameters,
                generation: new_generation,
            } => {
                parameters = new_parameters;
                generation = new_generation;
                pending = text.is_some();
            }
            Command::Shutdown => break,
        }
    }
    debug!("debouncer stopped");
}

fn run_loop(
    validator: Validator,
    rx: mpsc::Receiver<Job>,
    tx_event: mpsc::Sender<ValidationEvent>,
    shared: Arc<Shared>,
) {
    for job in rx {
        let event = run_job(&validator, &shared, &tx_event, job);
        shared.running.store(false, Ordering::SeqCst);
        if tx_event.send(event).is_err() {
            break;
        }
    }
    debug!("runner stopped");
}

fn run_job(
    validator: &Validator,
    shared: &Shared,
    tx_event: &mpsc::Sender<ValidationEvent>,
    job: Job,
) -> ValidationEvent {
    let generation = job.generation;
    {
        let published = shared.published();
        if let Some((text, parameters)) = &published.last_input
            && *text == job.text
            && *parameters == job.parameters
        {
            debug!(generation, "text and parameters unchanged; pass skipped");
            return ValidationEvent::Skipped {
                generation,
                reason: SkipReason::Unchanged,
            };
        }
    }

    debug!(generation, bytes = job.text.len(), "validation pass started");
    // The host may have dropped its receiver; `latest()` is still updated.
    let _ = tx_event.send(ValidationEvent::Started { generation });

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        validator.validate(&job.text, &job.parameters)
    }));
    let stale = shared.generation.load(Ordering::SeqCst) != generation;

    let mut published = shared.published();
    match outcome {
        Ok(Ok(validation)) => {
            let report = ValidationReport {
                generation,
                diagnostics: validation.diagnostics,
                status: validation.status,
                stale,
            };
            published.status = report.status.clone();
            published.report = Some(report.clone());
            published.last_input = Some((job.text, job.parameters));
            ValidationEvent::Published(report)
        }
        Ok(Err(err)) => fail(&mut published, generation, err.to_string()),
        Err(payload) => fail(
            &mut published,
            generation,
            format!("validation panicked: {}", panic_message(payload.as_ref())),
        ),
    }
}

fn fail(published: &mut Published, generation: u64, error: String) -> ValidationEvent {
    error!(generation, %error, "validation pass failed");
    published.status = format!("Unable to validate: {error}");
    ValidationEvent::Failed { generation, error }
}
