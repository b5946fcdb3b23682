//! Shared utilities

pub mod cancel;
pub mod context;
pub mod diagnostic;
pub mod hash;
pub mod normalpath;

pub use cancel::CancellationToken;
pub use context::GlobalContext;
pub use diagnostic::Diagnostic;
