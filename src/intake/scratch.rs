//! Scratch staging for uploaded files.

use super::{IntakeError, MAX_UPLOAD_BYTES, UPLOAD_FIELD, accepted_mime, default_extension};
use futures_util::{Stream, StreamExt};
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Directory receiving uploads for the duration of a single request.
///
/// Many requests write here concurrently. Names are unique by construction and files are
/// opened with `create_new`, so no locking is required.
#[derive(Debug, Clone)]
pub struct ScratchStore {
    dir: PathBuf,
    max_bytes: u64,
}

impl ScratchStore {
    /// Scratch store rooted at `dir` with the default 10 MiB ceiling.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }

    /// Override the size ceiling.
    pub fn with_limit(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Directory holding staged files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Size ceiling in bytes.
    pub fn limit(&self) -> u64 {
        self.max_bytes
    }

    /// Create the scratch directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Validate and stream one upload into scratch storage.
    ///
    /// The MIME type is checked before anything touches disk. Bytes are then written chunk by
    /// chunk and the upload is abandoned as soon as the running total passes the ceiling; the
    /// partially written file is removed by the returned handle's drop guard. A stream error is
    /// returned as the caller classified it.
    pub async fn stage<S, B, E>(
        &self,
        original_name: &str,
        mime_type: Option<&str>,
        chunks: S,
    ) -> Result<UploadedFile, IntakeError>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Into<IntakeError>,
    {
        let Some(mime_type) = mime_type.and_then(accepted_mime) else {
            tracing::warn!(
                original_name,
                mime_type = mime_type.unwrap_or("(none)"),
                "Rejected upload with unsupported type"
            );
            return Err(IntakeError::InvalidType {
                mime_type: mime_type.map(str::to_string),
            });
        };

        let filename = scratch_name(original_name, &mime_type);
        let storage_path = self.dir.join(&filename);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&storage_path)
            .await?;

        let mut upload = UploadedFile {
            storage_path,
            filename,
            original_name: original_name.to_string(),
            mime_type,
            size_bytes: 0,
            discarded: false,
        };

        let mut chunks = std::pin::pin!(chunks);
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(Into::<IntakeError>::into)?;
            let bytes = chunk.as_ref();
            upload.size_bytes += bytes.len() as u64;
            if upload.size_bytes > self.max_bytes {
                tracing::warn!(
                    original_name,
                    limit = self.max_bytes,
                    "Rejected upload above size ceiling"
                );
                return Err(IntakeError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            file.write_all(bytes).await?;
        }
        file.flush().await?;

        tracing::info!(
            filename = %upload.filename,
            original_name = %upload.original_name,
            mime_type = %upload.mime_type,
            size_bytes = upload.size_bytes,
            "Upload staged"
        );
        Ok(upload)
    }
}

/// Handle to a staged upload.
///
/// The handle owns its scratch file. [`UploadedFile::discard`] removes it explicitly; if the
/// handle is dropped without being discarded the file is removed synchronously.
#[derive(Debug)]
pub struct UploadedFile {
    storage_path: PathBuf,
    filename: String,
    original_name: String,
    mime_type: String,
    size_bytes: u64,
    discarded: bool,
}

impl UploadedFile {
    /// Location of the staged bytes.
    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// Generated scratch file name.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Name supplied by the client.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Normalized MIME type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Size of the staged file in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Read the staged file into memory.
    pub async fn read_bytes(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.storage_path).await
    }

    /// Delete the scratch file. A file that is already gone counts as deleted.
    pub async fn discard(mut self) -> io::Result<()> {
        self.discarded = true;
        match tokio::fs::remove_file(&self.storage_path).await {
            Ok(()) => {
                tracing::debug!(filename = %self.filename, "Scratch file removed");
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error),
        }
    }
}

impl Drop for UploadedFile {
    fn drop(&mut self) {
        if self.discarded {
            return;
        }
        match std::fs::remove_file(&self.storage_path) {
            Ok(()) => tracing::debug!(filename = %self.filename, "Scratch file removed on drop"),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => tracing::warn!(
                path = %self.storage_path.display(),
                error = %error,
                "Failed to remove scratch file"
            ),
        }
    }
}

fn scratch_name(original_name: &str, mime_type: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let suffix = Uuid::new_v4().as_u128() % 1_000_000_000;
    format!(
        "{UPLOAD_FIELD}-{millis}-{suffix:09}{}",
        extension_for(original_name, mime_type)
    )
}

fn extension_for(original_name: &str, mime_type: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(OsStr::to_str)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_else(|| default_extension(mime_type).to_string())
}

#[cfg(test)]
pub(crate) async fn stage_bytes(
    store: &ScratchStore,
    original_name: &str,
    mime_type: &str,
    bytes: &[u8],
) -> Result<UploadedFile, IntakeError> {
    let chunks = futures_util::stream::iter(vec![Ok::<_, IntakeError>(bytes.to_vec())]);
    store.stage(original_name, Some(mime_type), chunks).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).expect("read dir").count()
    }

    #[tokio::test]
    async fn stages_every_accepted_type() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ScratchStore::new(dir.path());
        for (name, mime) in [
            ("report.pdf", "application/pdf"),
            ("scan.jpeg", "image/jpeg"),
            ("scan.jpg", "image/jpg"),
            ("photo.PNG", "image/png"),
        ] {
            let upload = stage_bytes(&store, name, mime, b"payload")
                .await
                .expect("accepted upload");
            assert!(upload.storage_path().exists());
            assert_eq!(upload.size_bytes(), 7);
            assert_eq!(upload.original_name(), name);
            assert_eq!(upload.mime_type(), mime);
            assert!(upload.filename().starts_with("document-"));
            upload.discard().await.expect("discard");
        }
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn generated_names_keep_lowercased_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ScratchStore::new(dir.path());
        let upload = stage_bytes(&store, "Photo.PNG", "image/png", b"x")
            .await
            .expect("upload");
        assert!(upload.filename().ends_with(".png"));

        let parts: Vec<&str> = upload
            .filename()
            .trim_end_matches(".png")
            .split('-')
            .collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "document");
        assert!(parts[1].parse::<u128>().is_ok());
        assert_eq!(parts[2].len(), 9);
    }

    #[tokio::test]
    async fn missing_extension_falls_back_to_mime() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ScratchStore::new(dir.path());
        let upload = stage_bytes(&store, "scan", "image/jpeg", b"x")
            .await
            .expect("upload");
        assert!(upload.filename().ends_with(".jpg"));
    }

    #[tokio::test]
    async fn concurrent_stages_never_collide() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ScratchStore::new(dir.path());
        let (a, b) = tokio::join!(
            stage_bytes(&store, "a.pdf", "application/pdf", b"a"),
            stage_bytes(&store, "a.pdf", "application/pdf", b"b"),
        );
        let (a, b) = (a.expect("first"), b.expect("second"));
        assert_ne!(a.filename(), b.filename());
        assert_eq!(entries(dir.path()), 2);
    }

    #[tokio::test]
    async fn invalid_type_leaves_no_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ScratchStore::new(dir.path());
        let error = stage_bytes(&store, "notes.txt", "text/plain", b"hello")
            .await
            .expect_err("text/plain rejected");
        assert!(matches!(error, IntakeError::InvalidType { mime_type: Some(ref m) } if m == "text/plain"));
        assert_eq!(error.to_string(), "Invalid file type");
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn missing_type_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ScratchStore::new(dir.path());
        let chunks = stream::iter(vec![Ok::<_, IntakeError>(b"x".to_vec())]);
        let error = store
            .stage("file.pdf", None, chunks)
            .await
            .expect_err("no type");
        assert!(matches!(error, IntakeError::InvalidType { mime_type: None }));
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_and_removed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ScratchStore::new(dir.path()).with_limit(8);
        let chunks = stream::iter(vec![
            Ok::<_, IntakeError>(b"12345".to_vec()),
            Ok(b"67890".to_vec()),
            Ok(b"never read".to_vec()),
        ]);
        let error = store
            .stage("big.pdf", Some("application/pdf"), chunks)
            .await
            .expect_err("too large");
        assert!(matches!(error, IntakeError::TooLarge { limit: 8 }));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn upload_at_ceiling_is_accepted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ScratchStore::new(dir.path()).with_limit(4);
        let upload = stage_bytes(&store, "edge.pdf", "application/pdf", b"1234")
            .await
            .expect("exactly at limit");
        assert_eq!(upload.size_bytes(), 4);
    }

    #[tokio::test]
    async fn stream_error_is_reported_and_file_removed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ScratchStore::new(dir.path());
        let chunks = stream::iter(vec![
            Ok(b"partial".to_vec()),
            Err(IntakeError::Malformed("client went away".into())),
        ]);
        let error = store
            .stage("a.pdf", Some("application/pdf"), chunks)
            .await
            .expect_err("stream failure");
        assert!(matches!(error, IntakeError::Malformed(ref message) if message.contains("client went away")));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn transport_limit_error_keeps_its_kind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ScratchStore::new(dir.path());
        let chunks = stream::iter(vec![
            Ok(b"partial".to_vec()),
            Err(IntakeError::TooLarge {
                limit: MAX_UPLOAD_BYTES,
            }),
        ]);
        let error = store
            .stage("a.pdf", Some("application/pdf"), chunks)
            .await
            .expect_err("body limit");
        assert!(matches!(error, IntakeError::TooLarge { limit } if limit == MAX_UPLOAD_BYTES));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn dropping_handle_removes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ScratchStore::new(dir.path());
        let upload = stage_bytes(&store, "a.png", "image/png", b"png")
            .await
            .expect("upload");
        let path = upload.storage_path().to_path_buf();
        assert!(path.exists());
        drop(upload);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn read_bytes_returns_staged_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ScratchStore::new(dir.path());
        let upload = stage_bytes(&store, "a.pdf", "application/pdf", b"%PDF-1.4")
            .await
            .expect("upload");
        assert_eq!(upload.read_bytes().await.expect("bytes"), b"%PDF-1.4");
    }
}
