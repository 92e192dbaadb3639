//! Safety supervision.
//!
//! - [`thermal`] - Temperature classification and transition tracking
//! - [`supervisor`] - Periodic sensor sampling and the RF interlock

pub mod supervisor;
pub mod thermal;
