//! Core pipeline types: entries, levels, filters, transformers, the logger
//! and shutdown tracking.

pub mod entry;
pub mod error;
pub mod filter;
pub mod ident;
pub mod level;
pub mod logger;
pub mod shutdown;
pub mod transform;

pub use entry::{CapturedError, EntryPatch, Exclude, LogArg, LogEntry, Message, TIMER_METADATA_KEY};
pub use error::{LoggerError, Result};
pub use filter::{Filter, FilterContext};
pub use ident::{FilterId, TransformerId, TransportId};
pub use level::{
    default_resolver, level_name, Level, LevelResolver, LevelSpec, UNRESOLVED_LEVEL,
};
pub use logger::{ExitCode, Logger, LoggerBuilder};
pub use shutdown::{DrainToken, ShutdownRegistry, DEFAULT_SHUTDOWN_TIMEOUT};
pub use transform::{apply_chain, Transformer};
