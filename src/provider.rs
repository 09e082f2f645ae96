//! Provider-facing descriptors for the Microsoft account and Xbox Live services.
//!
//! [`ProviderDescriptor`] carries the four validated endpoints (token, user authentication,
//! XSTS authorization, profile) together with the [`ProviderQuirks`] that shape each request
//! (relying parties, sandbox, contract versions, requested settings).

pub mod descriptor;

pub use descriptor::*;
