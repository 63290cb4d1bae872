//! Abstractions over the engine collaborators the adapters in this crate talk to.
//!
//! Two decisions are already baked into this module:
//!
//! * Treat failures swallowed during cleanup by logging them with `log`.
//! * Address characters as UTF-16 code units, which is how the engine stores them.

mod call;
mod data_type;
mod diagnostics;
mod lob_session;
mod logging;
mod memory;

pub use {
    call::CallExecutor,
    data_type::SqlType,
    diagnostics::{SQLSTATE_SIZE, State},
    lob_session::{ClobId, LobSession, StorageError},
    logging::log_swallowed,
    memory::InMemoryLobs,
};
