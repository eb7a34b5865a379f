//! Assertion model: the signed token itself, its confirmation metadata, and lifecycle states.

pub mod confirmation;
pub mod record;
pub mod signature;
pub mod status;
