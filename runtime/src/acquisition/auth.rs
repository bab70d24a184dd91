//! Session authentication: log one account in with human-like input.
//!
//! Opens a fresh browser context, seeds trust cookies, then types the
//! credentials key by key with jittered delays, a typo-then-backspace in
//! the username and a trailing junk run. A login is accepted only when the
//! browser lands on the one known post-login location; anything else is
//! retried after a long cooldown until the attempts run out.

use crate::acquisition::session::Session;
use crate::config::{LoginConfig, SiteConfig};
use crate::error::{HarvestError, HarvestResult};
use crate::events::{EventSink, HarvestEvent};
use crate::model::Account;
use crate::renderer::{NavigableBrowser, Renderer, TrustCookie};
use crate::stealth::behavior::{self, pause, DelayModel};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

// ---- Public types -----------------------------------------------------------

/// Where a login attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// Submitted, landing location not yet judged.
    LandedUnknown,
    Authenticated,
    Failed,
}

/// Establishes authenticated sessions with bounded retries.
pub struct SessionAuthenticator {
    renderer: Arc<dyn Renderer>,
    delays: Arc<dyn DelayModel>,
    sink: Arc<dyn EventSink>,
    site: SiteConfig,
    login: LoginConfig,
    cookies: Vec<TrustCookie>,
}

// ---- Public async API -------------------------------------------------------

impl SessionAuthenticator {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        delays: Arc<dyn DelayModel>,
        sink: Arc<dyn EventSink>,
        site: SiteConfig,
        login: LoginConfig,
    ) -> Self {
        Self {
            renderer,
            delays,
            sink,
            site,
            login,
            cookies: Vec::new(),
        }
    }

    /// Seed every new context with these cookies before logging in.
    pub fn with_cookies(mut self, cookies: Vec<TrustCookie>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Log `account` in, returning a ready session.
    ///
    /// Fails with `HarvestError::Auth` once `max_tries` attempts have landed
    /// anywhere but the post-login location.
    pub async fn acquire(&self, account: &Account) -> HarvestResult<Session> {
        let mut browser = self.renderer.new_context().await?;

        if let Err(e) = self.open_login_form(browser.as_mut(), account).await {
            let _ = browser.close().await;
            return Err(e);
        }

        let max_tries = self.login.max_tries.max(1);
        let mut state = AuthState::Unauthenticated;
        for attempt in 1..=max_tries {
            self.sink.emit(HarvestEvent::LoginAttempt {
                account: account.id.clone(),
                attempt,
            });

            let location = match self.attempt(browser.as_mut(), account).await {
                Ok(location) => location,
                Err(e) => {
                    warn!("login attempt {attempt} for {} broke off: {e}", account.id);
                    browser.current_location().await.unwrap_or_default()
                }
            };
            state = transition(state, AuthState::LandedUnknown);

            let authenticated = location == self.site.landing_url;
            self.sink.emit(HarvestEvent::LoginLanded {
                account: account.id.clone(),
                location,
                authenticated,
            });

            if authenticated {
                transition(state, AuthState::Authenticated);
                pause(self.delays.as_ref(), self.login.after_login).await;
                let session = Session::established(account.clone(), browser);
                self.sink.emit(HarvestEvent::SessionReady {
                    account: account.id.clone(),
                    session_id: session.id.clone(),
                });
                return Ok(session);
            }

            if attempt < max_tries {
                state = transition(state, AuthState::Unauthenticated);
                pause(self.delays.as_ref(), self.login.retry_cooldown).await;
            }
        }

        transition(state, AuthState::Failed);
        self.sink.emit(HarvestEvent::LoginFailed {
            account: account.id.clone(),
            attempts: max_tries,
        });
        let _ = browser.close().await;
        Err(HarvestError::Auth {
            account: account.id.clone(),
            reason: format!("max tries ({max_tries}) exceeded, unable to log in"),
        })
    }

    // ---- Internal helpers ---------------------------------------------------

    fn form_timeout(&self) -> Duration {
        Duration::from_millis(self.login.form_timeout_ms)
    }

    async fn open_login_form(
        &self,
        browser: &mut dyn NavigableBrowser,
        account: &Account,
    ) -> HarvestResult<()> {
        browser.navigate(&self.site.login_url).await?;
        browser
            .wait_for(&self.site.username_field, self.form_timeout())
            .await
            .map_err(|e| HarvestError::Auth {
                account: account.id.clone(),
                reason: format!("login form never appeared: {e}"),
            })?;

        if !self.cookies.is_empty() {
            let accepted = browser.replace_cookies(&self.cookies).await?;
            self.sink.emit(HarvestEvent::CookiesLoaded {
                account: account.id.clone(),
                accepted,
                offered: self.cookies.len(),
            });
        }
        pause(self.delays.as_ref(), self.login.after_cookies).await;
        Ok(())
    }

    /// One full login attempt. Returns the location the browser landed on.
    async fn attempt(
        &self,
        browser: &mut dyn NavigableBrowser,
        account: &Account,
    ) -> HarvestResult<String> {
        browser.navigate(&self.site.login_url).await?;
        browser
            .wait_for(&self.site.username_field, self.form_timeout())
            .await?;

        let username = behavior::username_keystrokes(
            &account.username,
            self.login.junk_min,
            self.login.junk_max,
            self.delays.as_ref(),
        );
        behavior::human_type(
            browser,
            &self.site.username_field,
            &username,
            self.delays.as_ref(),
            self.login.keystroke,
        )
        .await?;
        pause(self.delays.as_ref(), self.login.after_username).await;

        let password = behavior::plain_keystrokes(&account.password);
        behavior::human_type(
            browser,
            &self.site.password_field,
            &password,
            self.delays.as_ref(),
            self.login.keystroke,
        )
        .await?;
        pause(self.delays.as_ref(), self.login.after_password).await;

        pause(self.delays.as_ref(), self.login.before_submit).await;
        browser.click(&self.site.submit_button).await?;
        pause(self.delays.as_ref(), self.login.after_submit).await;

        browser.current_location().await
    }
}

fn transition(from: AuthState, to: AuthState) -> AuthState {
    debug!("auth state {from:?} -> {to:?}");
    to
}

// ---- Tests ------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use crate::renderer::replay::ReplayHandle;
    use crate::stealth::behavior::FixedDelay;

    const LOGIN_FORM: &str = r#"<form>
        <input id="session_key"><input id="session_password" type="password">
        <button type="submit">Sign in</button></form>"#;

    fn account() -> Account {
        Account {
            id: "7".into(),
            username: "jane@x.test".into(),
            password: "hunter2".into(),
            locale: "us".into(),
            server: "us-3".into(),
        }
    }

    fn authenticator(handle: &ReplayHandle, sink: Arc<MemorySink>) -> SessionAuthenticator {
        SessionAuthenticator::new(
            Arc::new(handle.renderer()),
            Arc::new(FixedDelay),
            sink,
            SiteConfig::default(),
            LoginConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_matching_landing_succeeds() {
        let site = SiteConfig::default();
        let handle = ReplayHandle::new();
        handle
            .page(&site.login_url, LOGIN_FORM)
            .on_click(&site.submit_button, &site.landing_url);
        let sink = Arc::new(MemorySink::new());

        let session = authenticator(&handle, sink.clone())
            .acquire(&account())
            .await
            .unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.account().id, "7");

        let state = handle.state();
        assert_eq!(state.field_text(&site.username_field), "jane@x.test");
        assert_eq!(state.field_text(&site.password_field), "hunter2");
        assert_eq!(state.clicks.len(), 1);
        drop(state);
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, HarvestEvent::SessionReady { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_tries() {
        let site = SiteConfig::default();
        let handle = ReplayHandle::new();
        handle.page(&site.login_url, LOGIN_FORM);
        for _ in 0..3 {
            handle.on_click(&site.submit_button, "https://www.linkedin.com/checkpoint/");
        }
        let sink = Arc::new(MemorySink::new());

        let err = authenticator(&handle, sink.clone())
            .acquire(&account())
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::Auth { .. }));
        assert_eq!(handle.state().clicks.len(), 3);
        assert_eq!(handle.state().contexts_closed, 1);
        assert!(sink
            .events()
            .contains(&HarvestEvent::LoginFailed {
                account: "7".into(),
                attempts: 3
            }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_last_try_is_not_an_error() {
        let site = SiteConfig::default();
        let handle = ReplayHandle::new();
        handle
            .page(&site.login_url, LOGIN_FORM)
            .on_click(&site.submit_button, "https://www.linkedin.com/checkpoint/")
            .on_click(&site.submit_button, "https://www.linkedin.com/checkpoint/")
            .on_click(&site.submit_button, &site.landing_url);

        let session = authenticator(&handle, Arc::new(MemorySink::new()))
            .acquire(&account())
            .await;
        assert!(session.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cookies_are_seeded() {
        let site = SiteConfig::default();
        let handle = ReplayHandle::new();
        handle
            .page(&site.login_url, LOGIN_FORM)
            .on_click(&site.submit_button, &site.landing_url);
        let cookie = TrustCookie {
            name: "li_at".into(),
            value: "v".into(),
            domain: ".linkedin.com".into(),
            path: "/".into(),
        };

        authenticator(&handle, Arc::new(MemorySink::new()))
            .with_cookies(vec![cookie.clone()])
            .acquire(&account())
            .await
            .unwrap();
        assert_eq!(handle.state().cookies, vec![cookie]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_login_form_is_auth_error() {
        let handle = ReplayHandle::new();
        handle.page(&SiteConfig::default().login_url, "<p>maintenance</p>");
        let err = authenticator(&handle, Arc::new(MemorySink::new()))
            .acquire(&account())
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::Auth { .. }));
    }
}
