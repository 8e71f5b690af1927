//! Editor domain model

pub mod entities;
pub mod validation;
