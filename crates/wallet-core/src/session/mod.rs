// ── Session lifecycle ──
//
// Authenticated identity, its credentials, and where they are kept
// between runs.

mod manager;
pub mod storage;

pub use manager::{Session, SessionEvent, SessionManager};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
