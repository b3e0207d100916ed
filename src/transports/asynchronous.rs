//! Asynchronous transport adapter
//!
//! Wraps a blocking delivery routine in a dedicated worker thread fed by an
//! unbounded channel, giving every concrete transport the same guarantees:
//! accepted entries deliver one at a time in acceptance order, delivery
//! failures and panics are escalated back into the pipeline, and pending
//! deliveries are tracked for graceful shutdown.

use crate::core::entry::LogEntry;
use crate::core::error::{LoggerError, Result};
use crate::core::ident::TransportId;
use crate::core::logger::Logger;
use crate::core::shutdown::{DrainToken, DEFAULT_SHUTDOWN_TIMEOUT};
use crate::transports::transport::{Transport, TransportCore, TransportOptions};
use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A blocking delivery routine run on the transport's worker thread.
pub trait Deliver: Send {
    fn deliver(&mut self, entry: &LogEntry) -> Result<()>;
}

impl<F> Deliver for F
where
    F: FnMut(&LogEntry) -> Result<()> + Send,
{
    fn deliver(&mut self, entry: &LogEntry) -> Result<()> {
        self(entry)
    }
}

pub struct AsyncTransportOptions {
    pub transport: TransportOptions,
    /// Cap on how long process exit waits for this transport's pending
    /// deliveries.
    pub max_wait: Option<Duration>,
}

impl Default for AsyncTransportOptions {
    fn default() -> Self {
        Self {
            transport: TransportOptions::new(),
            max_wait: Some(DEFAULT_SHUTDOWN_TIMEOUT),
        }
    }
}

struct Job {
    entry: LogEntry,
    logger: Logger,
    token: DrainToken,
}

/// Serializes deliveries of a [`Deliver`] routine onto one worker thread.
pub struct AsyncTransport {
    core: TransportCore,
    max_wait: Option<Duration>,
    tx: Mutex<Option<Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncTransport {
    pub fn new<D: Deliver + 'static>(
        default_name: &str,
        mut delivery: D,
        options: AsyncTransportOptions,
    ) -> Result<Self> {
        let core = TransportCore::new(default_name, options.transport);
        let id = core.id();
        let name = core.name().to_string();

        let (tx, rx) = unbounded::<Job>();
        let worker = thread::Builder::new()
            .name(format!("fanlog-{name}"))
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    let Job { entry, logger, token } = job;
                    let outcome =
                        match catch_unwind(AssertUnwindSafe(|| delivery.deliver(&entry))) {
                            Ok(result) => result,
                            Err(payload) => {
                                Err(LoggerError::delivery_panic(&name, panic_message(payload.as_ref())))
                            }
                        };
                    if let Err(err) = outcome {
                        if let Err(report_err) =
                            logger.report_transport_failure(id, &name, &entry, err)
                        {
                            eprintln!("[LOGGER ERROR] failed to report delivery failure of '{name}': {report_err}");
                        }
                    }
                    drop(token);
                }
            })
            .map_err(|e| LoggerError::io_operation("spawning transport worker", e))?;

        Ok(Self {
            core,
            max_wait: options.max_wait,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.core.is_enabled()
    }

    pub fn enable(&self) {
        self.core.enable();
    }

    pub fn disable(&self) {
        self.core.disable();
    }

    pub fn set_min_level(&self, level: i32) {
        self.core.set_min_level(level);
    }

    /// Stop accepting entries and wait for the worker to drain its queue.
    ///
    /// Returns `false` if the worker did not finish within `timeout`.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.tx.lock().take();
        let handle = self.worker.lock().take();
        let Some(handle) = handle else {
            return true;
        };

        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        let _ = handle.join();
        true
    }
}

impl Transport for AsyncTransport {
    fn id(&self) -> TransportId {
        self.core.id()
    }

    fn name(&self) -> &str {
        self.core.name()
    }

    fn write(&self, entry: &LogEntry, logger: &Logger) -> Result<()> {
        let prepared = match self.core.prepare(entry, logger)? {
            Some(entry) => entry,
            None => return Ok(()),
        };

        let token = logger.shutdown_registry().register(self.max_wait);
        let tx = self.tx.lock();
        match tx.as_ref() {
            Some(tx) => tx
                .send(Job {
                    entry: prepared,
                    logger: logger.clone(),
                    token,
                })
                .map_err(|_| LoggerError::transport_stopped(self.core.name())),
            None => Err(LoggerError::transport_stopped(self.core.name())),
        }
    }
}

impl Drop for AsyncTransport {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
