//! An authenticated browsing session bound to one account.

use crate::error::HarvestResult;
use crate::model::Account;
use crate::renderer::NavigableBrowser;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// A browser context logged in as one account.
///
/// Reused across every subject of a chunk and closed without logging out.
pub struct Session {
    /// Unique session identifier.
    pub id: String,
    account: Account,
    browser: Box<dyn NavigableBrowser>,
    authenticated: bool,
    started_at: Instant,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("account", &self.account.id)
            .field("authenticated", &self.authenticated)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub(crate) fn established(account: Account, browser: Box<dyn NavigableBrowser>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            account,
            browser,
            authenticated: true,
            started_at: Instant::now(),
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// The browser context, for navigation on a subject's behalf.
    pub fn browser_mut(&mut self) -> &mut dyn NavigableBrowser {
        self.browser.as_mut()
    }

    pub fn browser(&self) -> &dyn NavigableBrowser {
        self.browser.as_ref()
    }

    /// Time since the session was established or last reset.
    pub fn time_active(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn reset_start_time(&mut self) {
        self.started_at = Instant::now();
    }

    /// Release the browser context.
    pub async fn close(self) -> HarvestResult<()> {
        self.browser.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::replay::ReplayHandle;

    fn account() -> Account {
        Account {
            id: "1".into(),
            username: "a@x.test".into(),
            password: "pw".into(),
            locale: "us".into(),
            server: "us-1".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_clock_and_reset() {
        let handle = ReplayHandle::new();
        let mut session = Session::established(account(), Box::new(handle.browser()));
        assert!(session.is_authenticated());

        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(session.time_active(), Duration::from_secs(90));
        session.reset_start_time();
        assert_eq!(session.time_active(), Duration::ZERO);

        session.close().await.unwrap();
        assert_eq!(handle.state().contexts_closed, 1);
    }

    #[test]
    fn test_debug_names_account_not_password() {
        let handle = ReplayHandle::new();
        let session = Session::established(account(), Box::new(handle.browser()));
        let shown = format!("{session:?}");
        assert!(shown.contains("account: \"1\""));
        assert!(shown.contains("authenticated: true"));
        assert!(!shown.contains("pw"));
    }
}
