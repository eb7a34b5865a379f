//! Federation-domain identifiers, audience restrictions, and the assertion model.

pub mod audience;
pub mod id;
pub mod token;

pub use audience::*;
pub use id::*;
pub use token::{confirmation::*, record::*, signature::*, status::*};
