//! Core type definitions for PatSim

mod assessment;
mod model;
mod persona;
mod record;

pub use assessment::*;
pub use model::*;
pub use persona::*;
pub use record::*;
