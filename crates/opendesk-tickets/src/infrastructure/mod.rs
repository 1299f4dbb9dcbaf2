//! Infrastructure layer
//!
//! In-memory adapters for every outbound port.

pub mod directory;
pub mod persistence;
pub mod storage;

pub use directory::{InMemoryUserDirectory, ManualClock, SystemClock};
pub use persistence::{InMemoryTicketRepository, NoOpEventPublisher, RecordingEventPublisher};
pub use storage::InMemoryAttachmentStore;
