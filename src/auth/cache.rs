//! Per-endpoint token storage.
//!
//! Each endpoint gets one JSON file named after the SHA-256 of its base URL.
//! Writes go through a temp file in the same directory followed by a rename,
//! so a concurrent reader sees either the old or the new token, never a
//! truncated file.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use super::error::AuthError;
use super::token::{TokenSet, unix_now};

/// Cache file name for a base URL. The URL is hashed exactly as given.
pub fn cache_key(base_url: &str) -> String {
    hex::encode(Sha256::digest(base_url.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct TokenCache {
    dir: PathBuf,
}

impl TokenCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, base_url: &str) -> PathBuf {
        self.dir.join(cache_key(base_url))
    }

    /// Load the cached token for `base_url`.
    ///
    /// Expired tokens are reported as [`AuthError::Expired`] and never
    /// returned to the caller.
    pub fn load(&self, base_url: &str) -> Result<TokenSet, AuthError> {
        let path = self.path_for(base_url);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(AuthError::NotFound),
            Err(e) => return Err(AuthError::io(path, e)),
        };

        let token: TokenSet = serde_json::from_str(&contents)
            .map_err(|e| AuthError::parse(format!("token cache {}", path.display()), e))?;

        if !token.is_valid_at(unix_now()) {
            debug!(path = %path.display(), "cached token expired");
            return Err(AuthError::Expired {
                refresh_token: token.refresh_token,
            });
        }

        Ok(token)
    }

    /// Persist `token` for `base_url`, replacing any previous entry.
    pub fn store(&self, base_url: &str, token: &TokenSet) -> Result<(), AuthError> {
        let path = self.path_for(base_url);
        self.ensure_dir()?;

        let json = serde_json::to_vec_pretty(token)
            .map_err(|e| AuthError::parse("token for cache", e))?;

        // NamedTempFile is created owner-only (0600) on unix.
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| AuthError::io(&self.dir, e))?;
        tmp.write_all(&json)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| AuthError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| AuthError::io(&path, e.error))?;

        debug!(path = %path.display(), "stored token");
        Ok(())
    }

    /// Remove the cached token. Returns whether an entry existed.
    pub fn remove(&self, base_url: &str) -> Result<bool, AuthError> {
        let path = self.path_for(base_url);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AuthError::io(path, e)),
        }
    }

    /// Create the cache directory owner-only. An existing directory is left as is.
    fn ensure_dir(&self) -> Result<(), AuthError> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }

        builder
            .create(&self.dir)
            .map_err(|e| AuthError::io(&self.dir, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://console.example.com";

    fn token(expires_at: i64) -> TokenSet {
        TokenSet {
            access_token: "AT".into(),
            refresh_token: Some("RT".into()),
            expires_at,
        }
    }

    #[test]
    fn store_then_load_returns_same_token() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("credentials"));

        let stored = token(unix_now() + 3600);
        cache.store(URL, &stored).unwrap();

        assert_eq!(cache.load(URL).unwrap(), stored);
    }

    #[test]
    fn missing_entry_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path());

        assert!(matches!(cache.load(URL), Err(AuthError::NotFound)));
    }

    #[test]
    fn expired_token_is_never_returned() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path());

        for expires_at in [0, unix_now() - 10, unix_now()] {
            cache.store(URL, &token(expires_at)).unwrap();
            match cache.load(URL) {
                Err(AuthError::Expired { refresh_token }) => {
                    assert_eq!(refresh_token.as_deref(), Some("RT"))
                }
                other => panic!("expected Expired, got {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_file_reports_decoder_message() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path());
        fs::write(cache.path_for(URL), "{\"accessToken\": ").unwrap();

        let decode_error = serde_json::from_str::<TokenSet>("{\"accessToken\": ").unwrap_err();
        match cache.load(URL) {
            Err(err @ AuthError::Parse { .. }) => {
                assert!(err.to_string().contains(&decode_error.to_string()));
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn valid_json_with_wrong_shape_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path());
        fs::write(cache.path_for(URL), r#"{"accessToken": 42}"#).unwrap();

        assert!(matches!(cache.load(URL), Err(AuthError::Parse { .. })));
    }

    #[test]
    fn keys_are_deterministic_and_distinct() {
        assert_eq!(cache_key(URL), cache_key(URL));
        assert_ne!(cache_key(URL), cache_key("https://console.example.com/"));
        assert_ne!(cache_key(URL), cache_key("https://other.example.com"));
        assert_eq!(cache_key(URL).len(), 64);
    }

    #[test]
    fn endpoints_do_not_share_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path());

        cache.store(URL, &token(unix_now() + 60)).unwrap();
        assert!(matches!(
            cache.load("https://other.example.com"),
            Err(AuthError::NotFound)
        ));
    }

    #[test]
    fn store_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path());

        cache.store(URL, &token(unix_now() + 60)).unwrap();
        let newer = TokenSet {
            access_token: "AT2".into(),
            refresh_token: None,
            expires_at: unix_now() + 120,
        };
        cache.store(URL, &newer).unwrap();

        assert_eq!(cache.load(URL).unwrap(), newer);
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn remove_reports_whether_entry_existed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path());

        cache.store(URL, &token(unix_now() + 60)).unwrap();
        assert!(cache.remove(URL).unwrap());
        assert!(!cache.remove(URL).unwrap());
        assert!(matches!(cache.load(URL), Err(AuthError::NotFound)));
    }

    #[cfg(unix)]
    #[test]
    fn cache_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("credentials"));
        cache.store(URL, &token(unix_now() + 60)).unwrap();

        let mode = fs::metadata(cache.path_for(URL)).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn new_cache_dir_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("nested").join("credentials");
        TokenCache::new(&cache_dir)
            .store(URL, &token(unix_now() + 60))
            .unwrap();

        let mode = fs::metadata(&cache_dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[cfg(unix)]
    #[test]
    fn existing_cache_dir_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();

        let cache = TokenCache::new(dir.path());
        cache.store(URL, &token(unix_now() + 60)).unwrap();

        let mode = fs::metadata(dir.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(cache.load(URL).unwrap().access_token, "AT");
    }
}
