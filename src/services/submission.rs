use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::{SubmissionError, ValidationError};
use crate::models::{ContestKey, Principal};
use crate::services::store::ContestantStore;

/// Packages a locally selected photo and sends it as a new contest entry.
#[derive(Clone)]
pub struct SubmissionFlow {
    contestants: Arc<dyn ContestantStore>,
}

impl SubmissionFlow {
    pub fn new(contestants: Arc<dyn ContestantStore>) -> Self {
        Self { contestants }
    }

    /// Issues exactly one `add_contestant` call when a file is selected and readable.
    /// The contestant list is not re-fetched afterwards.
    pub async fn submit(
        &self,
        identity: &Principal,
        key: &ContestKey,
        file: Option<&Path>,
    ) -> Result<(), SubmissionError> {
        let Some(path) = file else {
            warn!("Submission for contest {key} attempted without a file");
            return Err(ValidationError::NoFileSelected.into());
        };

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| SubmissionError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        info!(
            "Submitting {} ({} bytes) to contest {key} as {identity}",
            path.display(),
            bytes.len()
        );

        self.contestants
            .add_contestant(identity, key, bytes)
            .await
            .map_err(|err| {
                error!("Error adding contestant to contest {key}: {err}");
                SubmissionError::Rejected(err.to_string())
            })?;

        info!("Entry accepted for contest {key}");
        Ok(())
    }
}

/// Blocking message shown to the user after a submit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub success: bool,
    pub message: String,
}

impl Notice {
    pub fn from_outcome(outcome: &Result<(), SubmissionError>) -> Self {
        match outcome {
            Ok(()) => Notice {
                success: true,
                message: "Entry submitted".to_string(),
            },
            Err(err) => Notice {
                success: false,
                message: err.to_string(),
            },
        }
    }
}

/// Photo chosen in the file dialog, kept until the user submits or picks another.
#[derive(Debug, Clone, Default)]
pub struct SelectedPhoto {
    pub path: Option<PathBuf>,
}

impl SelectedPhoto {
    pub fn file_name(&self) -> Option<String> {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::FetchError;
    use crate::models::ContestantRecord;

    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<(Principal, ContestKey, usize)>>,
        reject: bool,
    }

    #[async_trait]
    impl ContestantStore for RecordingStore {
        async fn get_contestants_by_competition_id(
            &self,
            _key: &ContestKey,
        ) -> Result<Vec<ContestantRecord>, FetchError> {
            Ok(Vec::new())
        }

        async fn add_contestant(
            &self,
            identity: &Principal,
            key: &ContestKey,
            photo: Vec<u8>,
        ) -> Result<(), FetchError> {
            self.calls
                .lock()
                .unwrap()
                .push((identity.clone(), key.clone(), photo.len()));
            if self.reject {
                return Err(FetchError::Remote("insufficient cycles".to_string()));
            }
            Ok(())
        }
    }

    fn photo_file(len: usize) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![0xAB; len]).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn missing_file_is_validation_error_without_remote_call() {
        let store = Arc::new(RecordingStore::default());
        let flow = SubmissionFlow::new(store.clone());

        let err = flow
            .submit(&Principal::new("me"), &ContestKey::Id(7), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SubmissionError::Validation(ValidationError::NoFileSelected)
        ));
        assert!(store.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn selected_file_is_sent_once_with_its_full_length() {
        let store = Arc::new(RecordingStore::default());
        let flow = SubmissionFlow::new(store.clone());
        let file = photo_file(4096 + 17);

        flow.submit(&Principal::new("me"), &ContestKey::Id(7), Some(file.path()))
            .await
            .unwrap();

        let calls = store.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![(Principal::new("me"), ContestKey::Id(7), 4096 + 17)]
        );
    }

    #[tokio::test]
    async fn remote_rejection_is_generic_failure() {
        let store = Arc::new(RecordingStore {
            reject: true,
            ..RecordingStore::default()
        });
        let flow = SubmissionFlow::new(store.clone());
        let file = photo_file(8);

        let outcome = flow
            .submit(&Principal::new("me"), &ContestKey::Id(7), Some(file.path()))
            .await;

        assert!(matches!(outcome, Err(SubmissionError::Rejected(_))));
        assert_eq!(store.calls.lock().unwrap().len(), 1);
        let notice = Notice::from_outcome(&outcome);
        assert!(!notice.success);
        assert_eq!(notice.message, "Submission failed");
    }

    #[tokio::test]
    async fn unreadable_file_is_not_sent() {
        let store = Arc::new(RecordingStore::default());
        let flow = SubmissionFlow::new(store.clone());
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.png");

        let err = flow
            .submit(&Principal::new("me"), &ContestKey::Id(7), Some(&missing))
            .await
            .unwrap_err();

        assert!(matches!(err, SubmissionError::Read { .. }));
        assert!(store.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn success_notice() {
        assert_eq!(
            Notice::from_outcome(&Ok(())),
            Notice {
                success: true,
                message: "Entry submitted".to_string()
            }
        );
    }

    #[test]
    fn selected_photo_file_name() {
        let photo = SelectedPhoto {
            path: Some(PathBuf::from("/tmp/shots/dawn.jpg")),
        };
        assert_eq!(photo.file_name().as_deref(), Some("dawn.jpg"));
        assert_eq!(SelectedPhoto::default().file_name(), None);
    }
}
