//! Rule engines behind the citizen-facing portal surfaces.

pub mod applications;
