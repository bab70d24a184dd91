//! Append-only audit trail of harvest events.

pub mod logger;

pub use logger::AuditLogger;
