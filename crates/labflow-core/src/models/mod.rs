//! Domain models for the LabFlow system.

mod activity;
mod case;
mod doctor;
mod material;
mod role;

pub use activity::*;
pub use case::*;
pub use doctor::*;
pub use material::*;
pub use role::*;
