//! Invoice reconciliation.
//!
//! The invoiced flag is a plain admin-controlled toggle with no coupling to
//! status. Aggregates split prices into pending and invoiced totals for the
//! reporting layer.

mod invoice;
mod summary;

pub use invoice::*;
pub use summary::*;
