use thiserror::Error;

/// Failures that can end a reading session before playback starts.
///
/// Seek clamping and engine self-pauses are recovered where they happen and
/// never show up here.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RsvpError {
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("cache corrupted: {0}")]
    CacheCorruption(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("an extraction is already running for this session")]
    ExtractionInProgress,
    #[error("reading session is closed")]
    SessionClosed,
}

impl RsvpError {
    pub fn storage(err: impl core::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    /// The persistent message shown in place of the reader.
    pub fn user_message(&self) -> String {
        match self {
            Self::Extraction(_) => {
                "Could not read text from this document. It may be corrupt, encrypted or image-only."
                    .to_owned()
            }
            Self::Validation(reason) => reason.clone(),
            Self::CacheCorruption(_) | Self::Storage(_) => {
                "Reading data could not be loaded. Try opening the document again.".to_owned()
            }
            Self::ExtractionInProgress => "This document is still being prepared.".to_owned(),
            Self::SessionClosed => "This reading session has ended.".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_reason_is_shown_verbatim() {
        let err = RsvpError::Validation("Very little readable text found in this document.".into());
        assert_eq!(err.user_message(), "Very little readable text found in this document.");
    }

    #[test]
    fn internal_details_stay_out_of_user_messages() {
        let err = RsvpError::storage("redb: table missing");
        assert!(!err.user_message().contains("redb"));
        assert!(err.to_string().contains("redb"));
    }
}
