//! Clones submitted repositories into a deterministic folder layout:
//!
//! ```text
//! <bootcamp_path>/<bootcamp>/<week1>/entregas/<challenge-2>/<folder>
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, instrument};

use deliverybot_shared::{DeliveryBotError, Result};

/// What happened to one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeOutcome {
    /// `git clone` ran and succeeded.
    Cloned,
    /// The destination folder already existed; nothing was done.
    Skipped,
}

/// Clones repositories below a bootcamp root directory.
#[derive(Debug, Clone)]
pub struct RepoMaterializer {
    root: PathBuf,
    git_cmd: String,
}

impl RepoMaterializer {
    /// `root` is `<bootcamp_path>/<bootcamp>`.
    pub fn new(root: impl Into<PathBuf>, git_cmd: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            git_cmd: git_cmd.into(),
        }
    }

    /// Directory holding every delivery of one challenge channel.
    pub fn delivery_dir(&self, category: &str, channel: &str) -> PathBuf {
        let week_dir: String = category
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        self.root.join(week_dir).join("entregas").join(channel)
    }

    /// Clone `repo_url` into `<delivery_dir>/<folder>` unless it already exists.
    #[instrument(skip(self))]
    pub fn materialize(
        &self,
        repo_url: &str,
        channel: &str,
        category: &str,
        folder: &str,
    ) -> Result<MaterializeOutcome> {
        check_folder_name(folder)?;

        let dir = self.delivery_dir(category, channel);
        if !dir.exists() {
            debug!(dir = %dir.display(), "creating delivery folder");
            std::fs::create_dir_all(&dir).map_err(|e| DeliveryBotError::io(&dir, e))?;
        }

        if dir.join(folder).exists() {
            info!(folder, "repo already exists locally");
            return Ok(MaterializeOutcome::Skipped);
        }

        info!(repo_url, folder, "cloning repo");
        self.clone_into(&dir, repo_url, folder)?;
        Ok(MaterializeOutcome::Cloned)
    }

    fn clone_into(&self, dir: &Path, repo_url: &str, folder: &str) -> Result<()> {
        let output = Command::new(&self.git_cmd)
            .args(["clone", "--quiet", "--", repo_url, folder])
            .current_dir(dir)
            .output()
            .map_err(|e| {
                DeliveryBotError::clone_failed(repo_url, format!("failed to run {}: {e}", self.git_cmd))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeliveryBotError::clone_failed(
                repo_url,
                format!("{} ({})", stderr.trim(), output.status),
            ));
        }

        debug!(stdout = %String::from_utf8_lossy(&output.stdout).trim(), "git clone finished");
        Ok(())
    }
}

/// Folder names come from chat text; keep them to a single path segment.
fn check_folder_name(folder: &str) -> Result<()> {
    let bad = folder.is_empty()
        || folder == "."
        || folder == ".."
        || folder.contains(&['/', '\\'][..])
        || folder.starts_with('-');
    if bad {
        return Err(DeliveryBotError::validation(format!(
            "unusable folder name {folder:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("db_mat_test_{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn delivery_dir_layout() {
        let m = RepoMaterializer::new("/srv/bootcamps/2026", "git");
        assert_eq!(
            m.delivery_dir("Week 1", "challenge-2"),
            PathBuf::from("/srv/bootcamps/2026/week1/entregas/challenge-2")
        );
    }

    #[test]
    fn existing_destination_skips_clone() {
        let root = temp_root();
        // A git binary that cannot exist proves no clone is attempted.
        let m = RepoMaterializer::new(&root, "/nonexistent/git-binary");
        let existing = m.delivery_dir("Week 1", "challenge-2").join("ana");
        std::fs::create_dir_all(&existing).unwrap();

        let first = m
            .materialize("https://github.com/a/r", "challenge-2", "Week 1", "ana")
            .expect("skip must not error");
        let second = m
            .materialize("https://github.com/a/r", "challenge-2", "Week 1", "ana")
            .expect("re-run must not error");
        assert_eq!(first, MaterializeOutcome::Skipped);
        assert_eq!(second, MaterializeOutcome::Skipped);
    }

    #[test]
    fn missing_git_is_clone_failure_and_creates_dir() {
        let root = temp_root();
        let m = RepoMaterializer::new(&root, "/nonexistent/git-binary");

        let err = m
            .materialize("https://github.com/a/r", "challenge-1", "Week 3", "luis")
            .unwrap_err();
        assert!(matches!(err, DeliveryBotError::Clone { .. }));
        assert!(err.to_string().contains("could not clone the repo"));
        assert!(m.delivery_dir("Week 3", "challenge-1").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn failing_git_is_clone_failure() {
        let root = temp_root();
        let m = RepoMaterializer::new(&root, "false");
        let err = m
            .materialize("https://github.com/a/r", "challenge-1", "Week 3", "luis")
            .unwrap_err();
        assert!(matches!(err, DeliveryBotError::Clone { .. }));
    }

    #[test]
    fn rejects_path_like_folder_names() {
        let root = temp_root();
        let m = RepoMaterializer::new(&root, "git");
        for folder in ["", "..", "a/b", "-x"] {
            let err = m
                .materialize("https://github.com/a/r", "challenge-1", "Week 1", folder)
                .unwrap_err();
            assert!(matches!(err, DeliveryBotError::Validation { .. }), "{folder:?}");
        }
    }
}
