use super::IssueReference;
use crate::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredLink {
    Reference(IssueReference),
    Url(String),
}

impl From<StoredLink> for IssueReference {
    fn from(link: StoredLink) -> Self {
        match link {
            StoredLink::Reference(reference) => reference,
            StoredLink::Url(url) => {
                let key = url
                    .trim_end_matches('/')
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_string();
                IssueReference { key, url }
            }
        }
    }
}

/// JSON side file carrying one run's issue references to a later,
/// independent notification step.
#[derive(Debug, Clone)]
pub struct IssueLinkStore {
    path: PathBuf,
}

impl IssueLinkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the file with `issues`, creating parent directories.
    pub fn save(&self, issues: &[IssueReference]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(issues)?;
        fs::write(&self.path, data)?;
        info!(path = %self.path.display(), count = issues.len(), "saved issue links");
        Ok(())
    }

    /// Missing file means no issues were recorded.
    pub fn load(&self) -> Result<Vec<IssueReference>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)?;
        let links: Vec<StoredLink> = serde_json::from_str(&data)?;
        Ok(links.into_iter().map(IssueReference::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn reference(key: &str) -> IssueReference {
        IssueReference {
            key: key.to_string(),
            url: format!("https://jira.example.com/browse/{}", key),
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = IssueLinkStore::new(dir.path().join("reports/jira-links.json"));
        let issues = vec![reference("QA-1"), reference("QA-2")];

        store.save(&issues).unwrap();
        assert_eq!(store.load().unwrap(), issues);

        store.save(&[]).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = IssueLinkStore::new(dir.path().join("nope.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_accepts_plain_url_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.json");
        fs::write(&path, r#"["https://jira.example.com/browse/QA-7"]"#).unwrap();

        let loaded = IssueLinkStore::new(&path).load().unwrap();
        assert_eq!(loaded, vec![reference("QA-7")]);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.json");
        fs::write(&path, "{").unwrap();
        assert!(IssueLinkStore::new(&path).load().is_err());
    }
}
