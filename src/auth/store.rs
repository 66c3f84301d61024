//! Durable persistence for the current token pair.
//! One JSON slot under the state directory, plus a sibling profile-cache
//! slot that logout also clears. Reads degrade to "absent" on any problem;
//! no error crosses this boundary on the load path.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

use super::tokens::TokenPair;

const TOKENS_FILE: &str = "tokens.json";
const PROFILE_FILE: &str = "profile.json";

pub struct TokenStore {
    dir: PathBuf,
}

impl TokenStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    fn tokens_path(&self) -> PathBuf { self.dir.join(TOKENS_FILE) }
    fn profile_path(&self) -> PathBuf { self.dir.join(PROFILE_FILE) }

    /// Read the persisted pair. Missing, unreadable or malformed state is
    /// all treated as "no session".
    pub fn load(&self) -> Option<TokenPair> {
        let path = self.tokens_path();
        let raw = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!("token store unreadable at {}: {}", path.display(), e);
                }
                return None;
            }
        };
        match serde_json::from_str::<TokenPair>(&raw) {
            Ok(pair) if !pair.access.is_empty() && !pair.refresh.is_empty() => Some(pair),
            Ok(_) => {
                warn!("token store at {} holds a partial pair; ignoring", path.display());
                None
            }
            Err(e) => {
                warn!("token store at {} is malformed ({}); ignoring", path.display(), e);
                None
            }
        }
    }

    /// Overwrite the persisted pair. Write-then-rename so a reader never
    /// observes a torn slot.
    pub fn save(&self, pair: &TokenPair) -> ApiResult<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| ApiError::storage(format!("create {}: {}", self.dir.display(), e)))?;
        let body = serde_json::to_string(pair)
            .map_err(|e| ApiError::storage(format!("serialize token pair: {}", e)))?;
        let path = self.tokens_path();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body)
            .map_err(|e| ApiError::storage(format!("write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| ApiError::storage(format!("rename into {}: {}", path.display(), e)))?;
        debug!("token pair persisted to {}", path.display());
        Ok(())
    }

    /// Remove the pair and the profile cache. Idempotent; never fails.
    pub fn clear(&self) {
        for path in [self.tokens_path(), self.profile_path()] {
            match fs::remove_file(&path) {
                Ok(()) => debug!("cleared {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("could not clear {}: {}", path.display(), e),
            }
        }
    }
}
