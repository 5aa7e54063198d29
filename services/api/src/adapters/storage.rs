//! services/api/src/adapters/storage.rs
//!
//! Keeps audio (recorded answers and narrated questions) on local disk and hands
//! out URLs under the public base the router serves that directory from.

use async_trait::async_trait;
use interview_core::ports::{AudioStorage, PortError, PortResult};
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

const ALLOWED_EXTENSIONS: [&str; 6] = ["mp3", "wav", "webm", "ogg", "m4a", "mp4"];

/// Lower-cased extension if it is a recognised audio container.
pub fn audio_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[derive(Clone)]
pub struct LocalAudioStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalAudioStorage {
    pub fn new(root: PathBuf, public_base_url: impl Into<String>) -> Self {
        Self {
            root,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl AudioStorage for LocalAudioStorage {
    async fn save_audio(&self, audio_data: &[u8], extension: &str) -> PortResult<String> {
        let ext = audio_extension(&format!("upload.{}", extension)).ok_or_else(|| {
            PortError::Unexpected(format!("Unsupported audio format '{}'", extension))
        })?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))?;

        let file_name = format!("{}.{}", Uuid::new_v4(), ext);
        let path = self.root.join(&file_name);
        tokio::fs::write(&path, audio_data)
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))?;

        debug!("Stored {} bytes of audio at {}", audio_data.len(), path.display());
        Ok(format!("{}/{}", self.public_base_url, file_name))
    }

    async fn delete_audio(&self, url: &str) -> PortResult<()> {
        let Some(file_name) = url
            .strip_prefix(&self.public_base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| is_stored_file_name(name))
        else {
            debug!("Not deleting audio outside the storage root: {}", url);
            return Ok(());
        };

        match tokio::fs::remove_file(self.root.join(file_name)).await {
            Ok(()) => {
                debug!("Deleted stored audio {}", file_name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Unavailable(e.to_string())),
        }
    }
}

/// Only names this adapter hands out: `{uuid}.{ext}`, nothing that could climb out of the root.
fn is_stored_file_name(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) => {
            Uuid::parse_str(stem).is_ok() && ALLOWED_EXTENSIONS.contains(&ext)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_audio_extensions_are_accepted() {
        assert_eq!(audio_extension("answer.WEBM"), Some("webm".to_string()));
        assert_eq!(audio_extension("notes.txt"), None);
        assert_eq!(audio_extension("no-extension"), None);
    }

    #[tokio::test]
    async fn saved_audio_is_reachable_under_the_public_base() {
        let root = std::env::temp_dir().join(format!("interview-audio-{}", Uuid::new_v4()));
        let storage = LocalAudioStorage::new(root.clone(), "http://localhost:3000/audio/");

        let url = storage.save_audio(b"RIFF", "wav").await.unwrap();
        assert!(url.starts_with("http://localhost:3000/audio/"));
        assert!(url.ends_with(".wav"));

        let file_name = url.rsplit('/').next().unwrap();
        let stored = tokio::fs::read(root.join(file_name)).await.unwrap();
        assert_eq!(stored, b"RIFF");
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn deleting_removes_only_files_under_the_root() {
        let root = std::env::temp_dir().join(format!("interview-audio-{}", Uuid::new_v4()));
        let storage = LocalAudioStorage::new(root.clone(), "http://localhost:3000/audio");

        let url = storage.save_audio(b"OggS", "ogg").await.unwrap();
        storage.delete_audio(&url).await.unwrap();
        let mut entries = tokio::fs::read_dir(&root).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());

        // Already gone, foreign, or path-like URLs are ignored.
        storage.delete_audio(&url).await.unwrap();
        storage
            .delete_audio("http://elsewhere/audio/file.ogg")
            .await
            .unwrap();
        storage
            .delete_audio("http://localhost:3000/audio/../secrets.ogg")
            .await
            .unwrap();
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_formats_are_refused() {
        let storage = LocalAudioStorage::new(std::env::temp_dir(), "http://localhost/audio");
        assert!(storage.save_audio(b"x", "exe").await.is_err());
    }
}
