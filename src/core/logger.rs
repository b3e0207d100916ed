//! The logger: gating, entry construction, the transformer pipeline and
//! transport fan-out
//!
//! A [`Logger`] is a cheaply clonable handle over shared state, so transport
//! workers can re-enter the pipeline from their own threads to report
//! delivery failures.

use crate::core::entry::{CapturedError, EntryPatch, LogArg, LogEntry, Message};
use crate::core::error::{LoggerError, Result};
use crate::core::filter::{Filter, FilterContext};
use crate::core::ident::{FilterId, TransformerId, TransportId};
use crate::core::level::{default_resolver, Level, LevelResolver, LevelSpec, UNRESOLVED_LEVEL};
use crate::core::shutdown::ShutdownRegistry;
use crate::core::transform::{apply_chain, Transformer};
use crate::render::{RenderOptions, Renderer};
use crate::transports::Transport;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

type Stream = Arc<Mutex<Box<dyn Write + Send>>>;

fn stream(w: impl Write + Send + 'static) -> Stream {
    Arc::new(Mutex::new(Box::new(w)))
}

/// Panic payload recognized by the panic hook installed with
/// [`Logger::handle_panics`]; sets the process exit code.
pub struct ExitCode(pub i32);

struct LoggerInner {
    name: Option<String>,
    resolver: LevelResolver,
    fatal_level: i32,
    /// Severities routed to the error stream instead of the primary stream.
    error_levels: BTreeSet<i32>,
    enabled: AtomicBool,
    level: AtomicI32,
    filters: RwLock<Vec<Filter>>,
    transformers: RwLock<Vec<Transformer>>,
    transports: RwLock<Vec<Arc<dyn Transport>>>,
    timers: Mutex<HashMap<String, Instant>>,
    timer_seq: AtomicU64,
    renderer: Renderer,
    out: Stream,
    err: Stream,
    shutdown: ShutdownRegistry,
}

/// Cheaply clonable handle to a logging pipeline.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn fatal_level(&self) -> i32 {
        self.inner.fatal_level
    }

    /// Resolve a level argument to its numeric severity. Total by contract:
    /// unresolvable inputs come back as [`UNRESOLVED_LEVEL`].
    pub fn resolve_level(&self, level: impl Into<LevelSpec>) -> i32 {
        (self.inner.resolver)(&level.into())
    }

    /// The current minimum-severity threshold.
    pub fn level(&self) -> i32 {
        self.inner.level.load(Ordering::Relaxed)
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Relaxed)
    }

    pub fn enable(&self) -> &Self {
        self.inner.enabled.store(true, Ordering::Relaxed);
        self
    }

    pub fn disable(&self) -> &Self {
        self.inner.enabled.store(false, Ordering::Relaxed);
        self
    }

    pub fn set_level(&self, level: impl Into<LevelSpec>) -> &Self {
        self.inner
            .level
            .store(self.resolve_level(level), Ordering::Relaxed);
        self
    }

    pub fn add_filter(&self, filter: Filter) -> &Self {
        let mut filters = self.inner.filters.write();
        if !filters.iter().any(|f| f.id() == filter.id()) {
            filters.push(filter);
        }
        self
    }

    /// Remove a registered filter. Removing an unknown id is a no-op.
    pub fn remove_filter(&self, id: FilterId) -> &Self {
        self.inner.filters.write().retain(|f| f.id() != id);
        self
    }

    pub fn add_transformer(&self, transformer: Transformer) -> &Self {
        let mut transformers = self.inner.transformers.write();
        if !transformers.iter().any(|t| t.id() == transformer.id()) {
            transformers.push(transformer);
        }
        self
    }

    pub fn remove_transformer(&self, id: TransformerId) -> &Self {
        self.inner.transformers.write().retain(|t| t.id() != id);
        self
    }

    pub fn add_transport(&self, transport: Arc<dyn Transport>) -> &Self {
        let mut transports = self.inner.transports.write();
        if !transports.iter().any(|t| t.id() == transport.id()) {
            transports.push(transport);
        }
        self
    }

    pub fn remove_transport(&self, id: TransportId) -> &Self {
        self.inner.transports.write().retain(|t| t.id() != id);
        self
    }

    /// Whether a call at this severity would pass the threshold gate.
    pub fn is_level_enabled(&self, level: impl Into<LevelSpec>) -> bool {
        self.is_enabled() && self.resolve_level(level) >= self.level()
    }

    /// Full gate check for a pending call: enabled, threshold, then every
    /// registered filter.
    pub fn is_loggable(&self, level: i32, message: &Message, args: &[LogArg]) -> bool {
        if !self.is_enabled() || level < self.level() {
            return false;
        }
        let filters = self.inner.filters.read().clone();
        let ctx = FilterContext {
            logger: self,
            level,
            message,
            args,
        };
        filters.iter().all(|f| f.check(&ctx))
    }

    /// Log a message with no extra context arguments.
    pub fn log(&self, level: impl Into<LevelSpec>, message: impl Into<Message>) -> Result<()> {
        self.log_with(level, message.into(), Vec::new())
    }

    /// The full pipeline: gate, build the entry, run the logger-wide
    /// transformer chain, render to the primary stream, then fan out to
    /// every eligible transport.
    ///
    /// Transform faults abort the dispatch and propagate to the caller.
    /// Transport faults never do: each is reported back through the
    /// pipeline as a fatal entry that excludes the failing transport.
    pub fn log_with(
        &self,
        level: impl Into<LevelSpec>,
        message: Message,
        args: Vec<LogArg>,
    ) -> Result<()> {
        let level = self.resolve_level(level);
        if !self.is_loggable(level, &message, &args) {
            return Ok(());
        }

        let entry = LogEntry::build(level, message, args, self.inner.name.clone());

        let chain = self.inner.transformers.read().clone();
        let entry = match self.transform_entry(&chain, entry)? {
            Some(entry) => entry,
            None => return Ok(()),
        };

        self.write_primary(&entry);

        let transports: Vec<Arc<dyn Transport>> = self.inner.transports.read().clone();
        for transport in transports {
            if entry.exclude.transports.contains(&transport.id()) {
                continue;
            }
            if let Err(err) = transport.write(&entry, self) {
                self.report_transport_failure(transport.id(), transport.name(), &entry, err)?;
            }
        }

        Ok(())
    }

    /// Run a transformer chain over an entry on behalf of the pipeline or a
    /// transport's local chain.
    pub fn transform_entry(
        &self,
        chain: &[Transformer],
        entry: LogEntry,
    ) -> Result<Option<LogEntry>> {
        apply_chain(chain, entry, self)
    }

    /// Report a failed delivery as a fatal entry that excludes the failing
    /// transport. The failed entry's existing exclusions are carried
    /// forward so two broken transports cannot report each other forever.
    pub(crate) fn report_transport_failure(
        &self,
        id: TransportId,
        name: &str,
        entry: &LogEntry,
        err: LoggerError,
    ) -> Result<()> {
        let wrapped = match err {
            wrapped @ LoggerError::Transport { .. } => wrapped,
            other => LoggerError::transport(name, id, entry.clone(), other),
        };

        let mut patch = EntryPatch::new();
        patch.exclude = entry.exclude.clone();
        patch.exclude.transports.insert(id);

        self.log_with(
            self.inner.fatal_level,
            Message::None,
            vec![
                LogArg::captured(CapturedError::from(&wrapped)),
                LogArg::patch(patch),
            ],
        )
    }

    fn write_primary(&self, entry: &LogEntry) {
        let rendered = self.inner.renderer.entry(entry);
        let target = if self.uses_error_stream(entry.level) {
            &self.inner.err
        } else {
            &self.inner.out
        };
        let mut stream = target.lock();
        let _ = writeln!(stream, "{rendered}");
        let _ = stream.flush();
    }

    /// Whether entries at this severity go to the error stream.
    pub fn uses_error_stream(&self, level: i32) -> bool {
        self.inner.error_levels.contains(&level)
    }

    /// Start a named timer. With no label a unique `timer-N` id is assigned.
    pub fn create_timer(&self, label: Option<&str>) -> String {
        let id = match label {
            Some(label) => label.to_string(),
            None => format!(
                "timer-{}",
                self.inner.timer_seq.fetch_add(1, Ordering::Relaxed)
            ),
        };
        self.inner.timers.lock().insert(id.clone(), Instant::now());
        id
    }

    /// Stop a timer and return the elapsed duration. An unknown id yields
    /// zero elapsed time.
    pub fn stop_timer(&self, id: &str) -> Duration {
        self.inner
            .timers
            .lock()
            .remove(id)
            .map(|start| start.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Stop a timer and log the elapsed duration with the given message.
    pub fn stop_timer_log(
        &self,
        id: &str,
        level: impl Into<LevelSpec>,
        message: impl Into<Message>,
        mut args: Vec<LogArg>,
    ) -> Result<Duration> {
        let elapsed = self.stop_timer(id);
        args.insert(0, LogArg::patch(EntryPatch::new().with_timer(elapsed)));
        self.log_with(level, message.into(), args)?;
        Ok(elapsed)
    }

    pub fn trace(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Level::Trace, message)
    }

    pub fn debug(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Level::Debug, message)
    }

    pub fn info(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Level::Info, message)
    }

    pub fn warn(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Level::Warn, message)
    }

    pub fn error(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Level::Error, message)
    }

    pub fn fatal(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Level::Fatal, message)
    }

    pub fn notice(&self, message: impl Into<Message>) -> Result<()> {
        self.log(Level::Notice, message)
    }

    /// Derive a child logger named `parent:name` sharing streams and the
    /// shutdown registry; filters, transformers and transports are copied
    /// at this point and evolve independently afterwards.
    pub fn child(&self, name: &str) -> Logger {
        let joined = match &self.inner.name {
            Some(parent) => format!("{parent}:{name}"),
            None => name.to_string(),
        };
        Logger {
            inner: Arc::new(LoggerInner {
                name: Some(joined),
                resolver: self.inner.resolver.clone(),
                fatal_level: self.inner.fatal_level,
                error_levels: self.inner.error_levels.clone(),
                enabled: AtomicBool::new(self.is_enabled()),
                level: AtomicI32::new(self.level()),
                filters: RwLock::new(self.inner.filters.read().clone()),
                transformers: RwLock::new(self.inner.transformers.read().clone()),
                transports: RwLock::new(self.inner.transports.read().clone()),
                timers: Mutex::new(HashMap::new()),
                timer_seq: AtomicU64::new(1),
                renderer: self.inner.renderer.clone(),
                out: self.inner.out.clone(),
                err: self.inner.err.clone(),
                shutdown: self.inner.shutdown.clone(),
            }),
        }
    }

    pub fn shutdown_registry(&self) -> &ShutdownRegistry {
        &self.inner.shutdown
    }

    /// Drain pending asynchronous deliveries, then terminate the process.
    ///
    /// The wait is bounded by `max_wait` when given, otherwise by the
    /// largest per-transport bound among the pending deliveries, falling
    /// back to [`crate::DEFAULT_SHUTDOWN_TIMEOUT`]; exit is never blocked
    /// indefinitely.
    pub fn exit(&self, code: i32, max_wait: Option<Duration>) -> ! {
        self.inner.shutdown.wait_idle(max_wait);
        std::process::exit(code);
    }

    /// Install a panic hook that logs the panic at fatal level, drains
    /// pending deliveries and exits. A panic payload of [`ExitCode`] sets
    /// the process exit code; anything else exits with 1.
    pub fn handle_panics(&self) {
        let logger = self.clone();
        std::panic::set_hook(Box::new(move |info| {
            let payload = info.payload();
            let (code, message) = if let Some(exit) = payload.downcast_ref::<ExitCode>() {
                (exit.0, format!("process exiting with code {}", exit.0))
            } else if let Some(s) = payload.downcast_ref::<&str>() {
                (1, (*s).to_string())
            } else if let Some(s) = payload.downcast_ref::<String>() {
                (1, s.clone())
            } else {
                (1, "panic with non-string payload".to_string())
            };
            let _ = logger.log(logger.fatal_level(), message);
            logger.exit(code, None);
        }));
    }
}

/// Configures and constructs a [`Logger`].
pub struct LoggerBuilder {
    name: Option<String>,
    enabled: bool,
    level: Option<LevelSpec>,
    fatal_level: Level,
    error_levels: Option<BTreeSet<i32>>,
    resolver: LevelResolver,
    filters: Vec<Filter>,
    transformers: Vec<Transformer>,
    transports: Vec<Arc<dyn Transport>>,
    render: RenderOptions,
    out: Option<Stream>,
    err: Option<Stream>,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            enabled: true,
            level: None,
            fatal_level: Level::Fatal,
            error_levels: None,
            resolver: default_resolver(),
            filters: Vec::new(),
            transformers: Vec::new(),
            transports: Vec::new(),
            render: RenderOptions::default(),
            out: None,
            err: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Minimum-severity threshold. Unset means everything passes.
    pub fn level(mut self, level: impl Into<LevelSpec>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Severity used for pipeline-reported failures.
    pub fn fatal_level(mut self, level: Level) -> Self {
        self.fatal_level = level;
        self
    }

    /// Severities routed to the error stream. Defaults to ERROR and FATAL.
    pub fn error_levels(mut self, levels: impl IntoIterator<Item = i32>) -> Self {
        self.error_levels = Some(levels.into_iter().collect());
        self
    }

    pub fn level_resolver(mut self, resolver: LevelResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn transformer(mut self, transformer: Transformer) -> Self {
        self.transformers.push(transformer);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports.push(transport);
        self
    }

    pub fn renderer(mut self, options: RenderOptions) -> Self {
        self.render = options;
        self
    }

    pub fn out_stream(mut self, w: impl Write + Send + 'static) -> Self {
        self.out = Some(stream(w));
        self
    }

    pub fn err_stream(mut self, w: impl Write + Send + 'static) -> Self {
        self.err = Some(stream(w));
        self
    }

    pub fn build(self) -> Logger {
        let level = self
            .level
            .map(|spec| (self.resolver)(&spec))
            .unwrap_or(UNRESOLVED_LEVEL);

        let mut error_levels = self.error_levels.unwrap_or_else(|| {
            BTreeSet::from([Level::Error.value(), Level::Fatal.value()])
        });
        error_levels.insert(self.fatal_level.value());

        let mut filters: Vec<Filter> = Vec::new();
        for filter in self.filters {
            if !filters.iter().any(|f| f.id() == filter.id()) {
                filters.push(filter);
            }
        }
        let mut transformers: Vec<Transformer> = Vec::new();
        for transformer in self.transformers {
            if !transformers.iter().any(|t| t.id() == transformer.id()) {
                transformers.push(transformer);
            }
        }
        let mut transports: Vec<Arc<dyn Transport>> = Vec::new();
        for transport in self.transports {
            if !transports.iter().any(|t| t.id() == transport.id()) {
                transports.push(transport);
            }
        }

        Logger {
            inner: Arc::new(LoggerInner {
                name: self.name,
                resolver: self.resolver,
                fatal_level: self.fatal_level.value(),
                error_levels,
                enabled: AtomicBool::new(self.enabled),
                level: AtomicI32::new(level),
                filters: RwLock::new(filters),
                transformers: RwLock::new(transformers),
                transports: RwLock::new(transports),
                timers: Mutex::new(HashMap::new()),
                timer_seq: AtomicU64::new(1),
                renderer: Renderer::new(self.render),
                out: self.out.unwrap_or_else(|| stream(std::io::stdout())),
                err: self.err.unwrap_or_else(|| stream(std::io::stderr())),
                shutdown: ShutdownRegistry::new(),
            }),
        }
    }
}
