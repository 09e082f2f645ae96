//! Auth-domain token models: bearer tokens, the delegation chain, and the player identity.

pub mod chain;
pub mod identity;
pub mod token;

pub use chain::*;
pub use identity::*;
pub use token::{record::*, secret::*};
