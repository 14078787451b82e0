//! Local filesystem storage for uploaded portraits and payment proofs.

use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("media root {path} is not usable: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid stored name: {0}")]
    InvalidName(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Profile,
    Payment,
}

impl MediaKind {
    fn dir(self) -> &'static str {
        match self {
            MediaKind::Profile => "profiles",
            MediaKind::Payment => "payments",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStore {
    /// Open the store and prove it is writable. Called once at start-up so
    /// request handlers never have to guess whether storage works.
    pub async fn open(root: impl Into<PathBuf>, url_prefix: &str) -> Result<Self, MediaError> {
        let root = root.into();
        let unavailable = |source| MediaError::Unavailable {
            path: root.clone(),
            source,
        };

        for kind in [MediaKind::Profile, MediaKind::Payment] {
            tokio::fs::create_dir_all(root.join(kind.dir()))
                .await
                .map_err(unavailable)?;
        }

        let write_check = root.join(format!(".write-check-{}", Uuid::now_v7()));
        tokio::fs::write(&write_check, b"ok").await.map_err(unavailable)?;
        tokio::fs::remove_file(&write_check).await.map_err(unavailable)?;

        Ok(Self {
            root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `bytes` and return the relative name kept in the database.
    pub async fn save(
        &self,
        kind: MediaKind,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        let name = format!(
            "{}/{}-{}",
            kind.dir(),
            Uuid::now_v7().simple(),
            sanitize_filename(original_name)
        );
        tokio::fs::write(self.root.join(&name), bytes)
            .await
            .map_err(|source| MediaError::Write {
                name: name.clone(),
                source,
            })?;
        Ok(name)
    }

    pub async fn read(&self, name: &str) -> Result<Vec<u8>, MediaError> {
        let path = self.resolve(name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|source| MediaError::Read {
                name: name.to_string(),
                source,
            })
    }

    pub fn url(&self, name: &str) -> String {
        format!("{}/{}", self.url_prefix, name.trim_start_matches('/'))
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, MediaError> {
        let relative = Path::new(name);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || name.is_empty() {
            return Err(MediaError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

/// Keep ASCII letters, digits, `.`, `-` and `_`; everything else becomes `_`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\photos\\my photo.jpg"), "my_photo.jpg");
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename(".."), "upload");
    }

    #[tokio::test]
    async fn save_read_and_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::open(dir.path(), "/media/").await.unwrap();

        let name = store
            .save(MediaKind::Payment, "proof.png", b"png-bytes")
            .await
            .unwrap();
        assert!(name.starts_with("payments/"));
        assert!(name.ends_with("-proof.png"));
        assert_eq!(store.read(&name).await.unwrap(), b"png-bytes");
        assert_eq!(store.url(&name), format!("/media/{name}"));
    }

    #[tokio::test]
    async fn traversal_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::open(dir.path(), "/media").await.unwrap();
        assert!(matches!(
            store.read("../secret").await,
            Err(MediaError::InvalidName(_))
        ));
    }
}
