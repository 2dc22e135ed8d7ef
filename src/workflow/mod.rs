pub mod entry_ctx;
pub mod entry_machine;

pub use entry_ctx::EntryContext;
pub use entry_machine::{EntryEvent, EntryStateMachine};
