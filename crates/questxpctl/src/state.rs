//! State file - users, quests and daily pools persisted between invocations
//!
//! Location: --state, then $QUESTXP_STATE, then
//! $XDG_STATE_HOME/questxp/state.json (or ~/.local/state/questxp/state.json)

use anyhow::{Context, Result};
use questxp_common::{
    AwardLog, DailyPool, EngineConfig, InMemoryQuestStore, InMemoryUserStore, QuestInstance,
    SystemClock, UserId, UserProfile, XpEngine,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// State file name
pub const STATE_FILE: &str = "state.json";

/// On-disk state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    #[serde(default)]
    pub users: BTreeMap<UserId, UserProfile>,
    #[serde(default)]
    pub quests: BTreeMap<UserId, Vec<QuestInstance>>,
    #[serde(default)]
    pub pools: Vec<DailyPool>,
}

impl SavedState {
    /// Load state; a missing file is an empty state
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No state at {}, starting empty", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Write state through a temp file so a crash never leaves half a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize state")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

/// Resolve the state file path
pub fn state_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Ok(path) = std::env::var("QUESTXP_STATE") {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("questxp").join(STATE_FILE));
    }
    let home = std::env::var("HOME").context("Cannot determine home directory")?;
    Ok(Path::new(&home)
        .join(".local")
        .join("state")
        .join("questxp")
        .join(STATE_FILE))
}

/// Engine wired to the state file
///
/// A session loads the whole file on open and replaces it on save, so one
/// process must own the file at a time. Two overlapping runs both award against
/// the remainder they loaded and the later save wins; the earlier award then
/// survives only in the award log.
pub struct Session {
    pub path: PathBuf,
    pub engine: XpEngine,
    pub quests: Arc<InMemoryQuestStore>,
    pub users: Arc<InMemoryUserStore>,
}

impl Session {
    /// Load state and build an engine on the system clock
    ///
    /// Without a configured award log, awards go to `awards.jsonl` beside the state file.
    pub fn open(path: PathBuf, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let state = SavedState::load(&path)?;

        let quests = Arc::new(InMemoryQuestStore::from_quests(state.quests));
        let users = Arc::new(InMemoryUserStore::from_profiles(state.users));

        let award_log = match &config.audit.award_log {
            Some(log) => AwardLog::with_path(log),
            None => AwardLog::in_dir(path.parent().unwrap_or_else(|| Path::new("."))),
        };

        let engine = XpEngine::new(
            config,
            quests.clone(),
            users.clone(),
            Arc::new(SystemClock),
        )
        .with_award_log(award_log);
        let restored = engine.ledger().restore(state.pools);
        debug!("Restored {} pool(s) from {}", restored, path.display());

        Ok(Self {
            path,
            engine,
            quests,
            users,
        })
    }

    /// Current state, including every pool held by the ledger
    pub async fn snapshot(&self) -> SavedState {
        SavedState {
            users: self.users.export(),
            quests: self.quests.export(),
            pools: self.engine.ledger().snapshot_all().await,
        }
    }

    /// Prune each user's expired frozen pools and write the state file
    pub async fn save(&self) -> Result<()> {
        for user in self.users.export().keys() {
            let pruned = self.engine.prune_history(user).await?;
            if pruned > 0 {
                debug!("Pruned {} frozen pool(s) for {}", pruned, user);
            }
        }
        self.snapshot().await.save(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_state_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = SavedState::load(&dir.path().join("none.json")).unwrap();
        assert_eq!(state, SavedState::default());
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = state_path(Some(Path::new("/tmp/x.json"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/x.json"));
    }

    #[test]
    fn test_corrupt_state_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STATE_FILE);
        fs::write(&path, "{ not json").unwrap();
        assert!(SavedState::load(&path).is_err());
    }
}
