//! Auth-domain token models, decoded identity, and the claims codec.

pub mod claims;
pub mod identity;
pub mod token;

pub use claims::*;
pub use identity::*;
pub use token::*;
