//! Input adapters: the subject roster, account credentials, trust cookies.

use crate::error::{HarvestError, HarvestResult};
use crate::model::{Account, Subject};
use crate::renderer::TrustCookie;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

/// Read the roster CSV, preserving row order.
///
/// Rows with an empty id or locator are skipped with a warning.
pub fn load_roster(path: &Path, id_col: &str, url_col: &str) -> HarvestResult<Vec<Subject>> {
    let file = File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            HarvestError::Config(format!(
                "roster {} has no `{name}` column",
                path.display()
            ))
        })
    };
    let id_idx = column(id_col)?;
    let url_idx = column(url_col)?;

    let mut subjects = Vec::new();
    for (line, row) in rdr.records().enumerate() {
        let row = row?;
        let id = row.get(id_idx).unwrap_or_default();
        let url = row.get(url_idx).unwrap_or_default();
        if id.is_empty() || url.is_empty() {
            warn!("roster row {} is missing an id or locator, skipping", line + 2);
            continue;
        }
        subjects.push(Subject::new(id, url));
    }

    info!("loaded {} subjects from {}", subjects.len(), path.display());
    Ok(subjects)
}

/// Read the credentials file (JSON array of accounts).
pub fn load_accounts(path: &Path) -> HarvestResult<Vec<Account>> {
    let raw = std::fs::read_to_string(path)?;
    let accounts: Vec<Account> = serde_json::from_str(&raw)?;
    if accounts.is_empty() {
        return Err(HarvestError::Config(format!(
            "no accounts in {}",
            path.display()
        )));
    }
    Ok(accounts)
}

/// Read a trust cookie set (JSON array of cookies).
pub fn load_trust_cookies(path: &Path) -> HarvestResult<Vec<TrustCookie>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_preserves_order_and_custom_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.csv");
        std::fs::write(
            &path,
            "name,pid,link\nA,30,https://x.test/in/a\nB,10,https://x.test/in/b\nC,,https://x.test/in/c\n",
        )
        .unwrap();

        let subjects = load_roster(&path, "pid", "link").unwrap();
        let ids: Vec<&str> = subjects.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["30", "10"]);
        assert_eq!(subjects[1].profile_url, "https://x.test/in/b");
        assert!(subjects[0].profile_document.is_none());
    }

    #[test]
    fn test_missing_column_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.csv");
        std::fs::write(&path, "id,url\n1,https://x.test\n").unwrap();
        let err = load_roster(&path, "id", "linkedin_url").unwrap_err();
        assert!(matches!(err, HarvestError::Config(_)));
    }

    #[test]
    fn test_accounts_and_cookies() {
        let dir = tempfile::tempdir().unwrap();
        let accounts = dir.path().join("profiles.json");
        std::fs::write(
            &accounts,
            r#"[{"profile_id": 1, "email": "a@x.test", "password": "p",
                 "vpn_location": "us", "vpn_server": "us-1"}]"#,
        )
        .unwrap();
        assert_eq!(load_accounts(&accounts).unwrap()[0].id, "1");

        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, "[]").unwrap();
        assert!(load_accounts(&empty).is_err());

        let cookies = dir.path().join("cookies.json");
        std::fs::write(
            &cookies,
            r#"[{"name": "li_at", "value": "v", "domain": ".x.test"}]"#,
        )
        .unwrap();
        let jar = load_trust_cookies(&cookies).unwrap();
        assert_eq!(jar[0].path, "/");
    }
}
