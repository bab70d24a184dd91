//! Domain events emitted by acquisition and extraction.
//!
//! Core logic never logs directly; it reports to an injected [`EventSink`].
//! [`TracingSink`] forwards events to `tracing`, the audit logger appends
//! them to a JSONL file, and [`MemorySink`] collects them for tests.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, info_span, warn, Span};

/// Something worth reporting, keyed by subject or account where relevant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HarvestEvent {
    LoginAttempt { account: String, attempt: u32 },
    LoginLanded { account: String, location: String, authenticated: bool },
    LoginFailed { account: String, attempts: u32 },
    CookiesLoaded { account: String, accepted: usize, offered: usize },
    SessionReady { account: String, session_id: String },
    Throttled { consumer: String, waited_ms: u64 },
    Captured { subject: String },
    NotFound { subject: String },
    Abandoned { subject: String, reason: String },
    AlreadyCaptured { subject: String },
    PageCollected { company: String, page: usize, rows: usize },
    RowSkipped { company: String, page: usize },
    FieldMissing { subject: String, field: String },
    MalformedDate { subject: String, raw: String },
    BlankImage { subject: String },
    ImageFailed { subject: String, reason: String },
    Extracted { subject: String },
}

impl HarvestEvent {
    /// Subject id the event concerns, if any.
    pub fn subject(&self) -> Option<&str> {
        match self {
            HarvestEvent::Captured { subject }
            | HarvestEvent::NotFound { subject }
            | HarvestEvent::Abandoned { subject, .. }
            | HarvestEvent::AlreadyCaptured { subject }
            | HarvestEvent::FieldMissing { subject, .. }
            | HarvestEvent::MalformedDate { subject, .. }
            | HarvestEvent::BlankImage { subject }
            | HarvestEvent::ImageFailed { subject, .. }
            | HarvestEvent::Extracted { subject } => Some(subject),
            _ => None,
        }
    }
}

/// Receiver for domain events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: HarvestEvent);
}

/// Forwards events to `tracing` at a level matching their severity.
///
/// Events about a subject are logged inside a `subject` span carrying its id.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: HarvestEvent) {
        let span = match event.subject() {
            Some(id) => info_span!("subject", id),
            None => Span::none(),
        };
        let _entered = span.enter();

        match &event {
            HarvestEvent::LoginAttempt { account, attempt } => {
                info!("login attempt {attempt} for account {account}")
            }
            HarvestEvent::LoginLanded {
                account,
                location,
                authenticated,
            } => {
                if *authenticated {
                    info!("account {account} authenticated");
                } else {
                    warn!("account {account} landed on unexpected location {location}");
                }
            }
            HarvestEvent::LoginFailed { account, attempts } => {
                warn!("account {account} failed to log in after {attempts} attempts")
            }
            HarvestEvent::CookiesLoaded {
                account,
                accepted,
                offered,
            } => {
                if accepted < offered {
                    warn!("cookies were only partly loaded for {account}: {accepted}/{offered}");
                } else {
                    debug!("loaded {accepted} trust cookies for {account}");
                }
            }
            HarvestEvent::SessionReady {
                account,
                session_id,
            } => info!("session {session_id} ready for account {account}"),
            HarvestEvent::Throttled {
                consumer,
                waited_ms,
            } => info!("rate governor held {consumer} for {waited_ms}ms"),
            HarvestEvent::Captured { subject } => debug!("captured {subject}"),
            HarvestEvent::NotFound { subject } => info!("{subject} not found, skipping"),
            HarvestEvent::Abandoned { subject, reason } => {
                warn!("something went wrong, please check {subject}: {reason}")
            }
            HarvestEvent::AlreadyCaptured { subject } => {
                debug!("{subject} already captured, skipping")
            }
            HarvestEvent::PageCollected {
                company,
                page,
                rows,
            } => info!("{company}: page {page} yielded {rows} rows"),
            HarvestEvent::RowSkipped { company, page } => {
                debug!("{company}: skipped decorative row on page {page}")
            }
            HarvestEvent::FieldMissing { subject, field } => {
                warn!("could not find {field} for {subject}")
            }
            HarvestEvent::MalformedDate { subject, raw } => {
                warn!("malformed date string for {subject}: {raw:?}")
            }
            HarvestEvent::BlankImage { subject } => {
                warn!("{subject} has a blank profile picture")
            }
            HarvestEvent::ImageFailed { subject, reason } => {
                warn!("headshot fetch failed for {subject}: {reason}")
            }
            HarvestEvent::Extracted { subject } => debug!("extracted {subject}"),
        }
    }
}

/// Collects events in memory.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<HarvestEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn events(&self) -> Vec<HarvestEvent> {
        match self.events.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: HarvestEvent) {
        match self.events.lock() {
            Ok(mut g) => g.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Fans each event out to several sinks.
pub struct Tee {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl Tee {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for Tee {
    fn emit(&self, event: HarvestEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tee_reaches_every_sink() {
        let a = Arc::new(MemorySink::new());
        let b = Arc::new(MemorySink::new());
        let sinks: Vec<Arc<dyn EventSink>> = vec![a.clone(), b.clone()];
        let tee = Tee::new(sinks);
        tee.emit(HarvestEvent::Captured {
            subject: "42".into(),
        });
        assert_eq!(a.events().len(), 1);
        assert_eq!(b.events(), a.events());
    }

    #[test]
    fn test_subject_key() {
        let e = HarvestEvent::Abandoned {
            subject: "9".into(),
            reason: "timeout".into(),
        };
        assert_eq!(e.subject(), Some("9"));
        assert_eq!(
            HarvestEvent::RowSkipped {
                company: "Acme".into(),
                page: 2
            }
            .subject(),
            None
        );
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(HarvestEvent::NotFound {
            subject: "3".into(),
        })
        .unwrap();
        assert_eq!(json["event"], "not_found");
        assert_eq!(json["subject"], "3");
    }
}
