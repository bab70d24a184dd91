//! Browser fingerprint patching to hide automation signals.

/// Desktop user agent presented by every browsing context.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Window size presented to the target.
pub const WINDOW_SIZE: (u32, u32) = (1440, 960);

/// JavaScript installed on every new document before page scripts run.
pub const STEALTH_SCRIPT: &str = r#"
(() => {
    Object.defineProperty(navigator, 'webdriver', {
        get: () => false,
        configurable: true,
    });

    if (!window.chrome) {
        window.chrome = {};
    }
    if (!window.chrome.runtime) {
        window.chrome.runtime = {
            connect: function() {},
            sendMessage: function() {},
        };
    }

    // Notification prompts are disabled in the profile; report that consistently.
    const originalQuery = window.navigator.permissions.query;
    window.navigator.permissions.query = (parameters) =>
        parameters.name === 'notifications'
            ? Promise.resolve({ state: 'denied' })
            : originalQuery(parameters);

    Object.defineProperty(navigator, 'plugins', {
        get: () => [1, 2, 3, 4, 5],
        configurable: true,
    });

    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en'],
        configurable: true,
    });
})();
"#;

/// Chromium launch flags matching the presented fingerprint.
pub fn launch_args(headless: bool) -> Vec<String> {
    let mut args = vec![
        "--disable-gpu".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-notifications".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        format!("--window-size={},{}", WINDOW_SIZE.0, WINDOW_SIZE.1),
        format!("--user-agent={DESKTOP_USER_AGENT}"),
    ];
    if headless {
        args.insert(0, "--headless=new".to_string());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_flag_only_when_requested() {
        assert!(launch_args(true).iter().any(|a| a == "--headless=new"));
        assert!(!launch_args(false).iter().any(|a| a.starts_with("--headless")));
    }

    #[test]
    fn test_user_agent_flag_present() {
        let args = launch_args(false);
        assert!(args.iter().any(|a| a.contains(DESKTOP_USER_AGENT)));
    }
}
