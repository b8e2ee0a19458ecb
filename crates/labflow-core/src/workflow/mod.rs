//! Case workflow: the status engine and the material ledger.
//!
//! Both run each operation as one store transaction that re-reads current
//! state under the write lock, and both emit activity entries after commit.

mod ledger;
mod registry;
mod status;

pub use ledger::*;
pub use registry::*;
pub use status::*;
