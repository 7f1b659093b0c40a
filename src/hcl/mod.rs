//! HCL2 module evaluation: classification, loading, variable/local extraction and resolution,
//! expression evaluation, and JSON serialization.

pub mod classify;
pub mod driver;
pub mod env;
pub mod eval;
pub mod functions;
pub mod load;
pub mod locals;
pub mod serialize;
pub mod variables;
