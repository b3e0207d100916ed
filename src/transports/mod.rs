//! Transport implementations: the transport contract, the asynchronous
//! worker adapter and the concrete destinations built on it.

pub mod asynchronous;
pub mod file;
pub mod rotation;
#[cfg(feature = "telegram")]
pub mod telegram;
pub mod transport;

pub use asynchronous::{AsyncTransport, AsyncTransportOptions, Deliver};
pub use file::{FileTransport, FileTransportOptions};
pub use rotation::{Frequency, LogRotator, RotatorOptions};
#[cfg(feature = "telegram")]
pub use telegram::{TelegramTransport, TelegramTransportOptions};
pub use transport::{Transport, TransportCore, TransportOptions};
