//! YAML-backed principal directory.
//!
//! ```yaml
//! principals:
//!   - id: 1b4e28ba-2fa1-11d2-883f-0016d3cca427
//!     email: alice@example.org
//!     special_groups: [8f14e45f-ceea-467a-9a2b-5c4b9d2f1a11]
//! ```
//!
//! The file is rewritten whenever a revocation secret or last-active
//! timestamp changes.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tessera_core::{Principal, RequestContext};
use tessera_token::{GroupResolver, PrincipalStore};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DirectoryEntry {
    #[serde(flatten)]
    principal: Principal,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    special_groups: Vec<Uuid>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    principals: Vec<DirectoryEntry>,
}

/// Principals loaded from, and written back to, a YAML file.
#[derive(Debug)]
pub struct PrincipalDirectory {
    path: PathBuf,
    entries: RwLock<Vec<DirectoryEntry>>,
}

impl PrincipalDirectory {
    /// Load a directory file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read principal directory {}", path.display()))?;
        let file: DirectoryFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse principal directory {}", path.display()))?;

        Ok(Self {
            path,
            entries: RwLock::new(file.principals),
        })
    }

    /// Find a principal by identifier or email.
    pub fn find(&self, id_or_email: &str) -> anyhow::Result<Option<Principal>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| anyhow::anyhow!("failed to acquire read lock: {}", e))?;
        let id = Uuid::parse_str(id_or_email).ok();

        Ok(entries
            .iter()
            .map(|entry| &entry.principal)
            .find(|p| Some(p.id) == id || p.email.eq_ignore_ascii_case(id_or_email))
            .cloned())
    }

    /// Record a login.
    pub fn touch(&self, id: Uuid, at: DateTime<Utc>) -> anyhow::Result<()> {
        self.update(id, |principal| principal.last_active = Some(at))
    }

    fn update(&self, id: Uuid, change: impl FnOnce(&mut Principal)) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| anyhow::anyhow!("failed to acquire write lock: {}", e))?;
        let entry = entries
            .iter_mut()
            .find(|entry| entry.principal.id == id)
            .ok_or_else(|| anyhow::anyhow!("no principal {} in {}", id, self.path.display()))?;
        change(&mut entry.principal);
        self.save(&entries)
    }

    fn save(&self, entries: &[DirectoryEntry]) -> anyhow::Result<()> {
        let file = DirectoryFile {
            principals: entries.to_vec(),
        };
        let content = serde_yaml::to_string(&file)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write principal directory {}", self.path.display()))
    }
}

#[async_trait]
impl PrincipalStore for PrincipalDirectory {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Principal>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| anyhow::anyhow!("failed to acquire read lock: {}", e))?;
        Ok(entries
            .iter()
            .find(|entry| entry.principal.id == id)
            .map(|entry| entry.principal.clone()))
    }

    async fn set_revocation_secret(
        &self,
        id: Uuid,
        secret: Option<String>,
    ) -> anyhow::Result<()> {
        self.update(id, |principal| principal.revocation_secret = secret)
    }
}

#[async_trait]
impl GroupResolver for PrincipalDirectory {
    async fn special_groups(
        &self,
        principal: &Principal,
        _request: &RequestContext,
    ) -> anyhow::Result<Vec<Uuid>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| anyhow::anyhow!("failed to acquire read lock: {}", e))?;
        Ok(entries
            .iter()
            .find(|entry| entry.principal.id == principal.id)
            .map(|entry| entry.special_groups.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const ALICE: &str = "1b4e28ba-2fa1-11d2-883f-0016d3cca427";
    const GROUP: &str = "8f14e45f-ceea-467a-9a2b-5c4b9d2f1a11";

    fn write_directory(dir: &Path) -> PathBuf {
        let path = dir.join("principals.yaml");
        fs::write(
            &path,
            format!(
                "principals:\n  - id: {ALICE}\n    email: alice@example.org\n    special_groups: [{GROUP}]\n"
            ),
        )
        .unwrap();
        path
    }

    #[test]
    fn test_find_by_id_or_email() {
        let dir = tempdir().unwrap();
        let directory = PrincipalDirectory::load(write_directory(dir.path())).unwrap();

        let by_id = directory.find(ALICE).unwrap().unwrap();
        let by_email = directory.find("Alice@Example.org").unwrap().unwrap();
        assert_eq!(by_id, by_email);
        assert!(directory.find("bob@example.org").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_secret_changes_are_persisted() {
        let dir = tempdir().unwrap();
        let path = write_directory(dir.path());
        let directory = PrincipalDirectory::load(&path).unwrap();
        let id = Uuid::parse_str(ALICE).unwrap();

        directory
            .set_revocation_secret(id, Some("salt".to_string()))
            .await
            .unwrap();
        let reloaded = PrincipalDirectory::load(&path).unwrap();
        let principal = reloaded.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(principal.active_revocation_secret(), Some("salt"));

        let groups = reloaded
            .special_groups(&principal, &RequestContext::new())
            .await
            .unwrap();
        assert_eq!(groups, vec![Uuid::parse_str(GROUP).unwrap()]);

        reloaded.set_revocation_secret(id, None).await.unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("revocation_secret"));
    }

    #[test]
    fn test_touch_unknown_principal_fails() {
        let dir = tempdir().unwrap();
        let directory = PrincipalDirectory::load(write_directory(dir.path())).unwrap();
        assert!(directory.touch(Uuid::new_v4(), Utc::now()).is_err());
    }
}
