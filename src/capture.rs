//! Photo-to-meal workflow.
//!
//! One upload at a time moves through `Idle -> Loading -> Review | Failed`
//! and back to `Idle`. Only [`MealCapture::confirm`] produces a [`Meal`];
//! every other exit discards the photo and its analysis.

use crate::models::{EncodedImage, Meal, MealAnalysis};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_MEAL_NAME: &str = "My Meal";
pub const ANALYSIS_FAILED_MESSAGE: &str = "Failed to analyze meal. Please try a clearer image.";

#[derive(Debug, Error, PartialEq)]
pub enum CaptureError {
    #[error("Please upload an image file.")]
    NotAnImage,
    #[error("No image was provided.")]
    EmptyUpload,
    #[error("An analysis is already in progress.")]
    Busy,
    #[error("No analyzed item at position {0}.")]
    UnknownItem(usize),
    #[error("Cannot {action} while {phase}.")]
    InvalidTransition { action: &'static str, phase: &'static str },
}

/// A file as received from the picker or a drop.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    fn mime_type(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .map(str::trim)
            .filter(|mime| mime.starts_with("image/"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MealReview {
    pub image: EncodedImage,
    pub analysis: MealAnalysis,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CapturePhase {
    /// Waiting for a photo; `notice` holds the last rejected upload's message.
    Idle { notice: Option<String> },
    Loading { image: EncodedImage },
    Review(MealReview),
    Failed { message: String },
}

impl CapturePhase {
    fn describe(&self) -> &'static str {
        match self {
            CapturePhase::Idle { .. } => "idle",
            CapturePhase::Loading { .. } => "analyzing",
            CapturePhase::Review(_) => "reviewing",
            CapturePhase::Failed { .. } => "showing an error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MealCapture {
    phase: CapturePhase,
}

impl Default for MealCapture {
    fn default() -> Self {
        Self {
            phase: CapturePhase::Idle { notice: None },
        }
    }
}

impl MealCapture {
    pub fn phase(&self) -> &CapturePhase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, CapturePhase::Loading { .. })
    }

    /// Takes a new photo. Non-images are turned away with a notice and the
    /// phase stays idle; on success the encoded image is returned for the
    /// caller to send off for analysis.
    pub fn accept(&mut self, upload: ImageUpload) -> Result<EncodedImage, CaptureError> {
        match self.phase {
            CapturePhase::Idle { .. } => {}
            CapturePhase::Loading { .. } => return Err(CaptureError::Busy),
            _ => return Err(self.invalid("upload a photo")),
        }

        let rejection = if upload.bytes.is_empty() {
            Some(CaptureError::EmptyUpload)
        } else if upload.mime_type().is_none() {
            Some(CaptureError::NotAnImage)
        } else {
            None
        };
        if let Some(err) = rejection {
            debug!(file = ?upload.file_name, content_type = ?upload.content_type, "upload rejected");
            self.phase = CapturePhase::Idle {
                notice: Some(err.to_string()),
            };
            return Err(err);
        }

        let mime_type = upload.mime_type().unwrap_or("image/*").to_string();
        let image = EncodedImage::from_bytes(mime_type, &upload.bytes);
        info!(file = ?upload.file_name, mime_type = %image.mime_type, bytes = upload.bytes.len(), "analyzing meal photo");
        self.phase = CapturePhase::Loading { image: image.clone() };
        Ok(image)
    }

    /// Applies the outcome of the analysis started by [`accept`](Self::accept).
    /// An outcome that arrives after the capture has left `Loading` is dropped.
    pub fn finish(&mut self, outcome: Result<MealAnalysis, String>) {
        let CapturePhase::Loading { image } = &self.phase else {
            warn!(phase = self.phase.describe(), "dropping stale analysis result");
            return;
        };
        let image = image.clone();

        self.phase = match outcome {
            Ok(analysis) => CapturePhase::Review(MealReview {
                image,
                analysis,
                name: DEFAULT_MEAL_NAME.to_string(),
            }),
            Err(message) => CapturePhase::Failed { message },
        };
    }

    pub fn remove_item(&mut self, index: usize) -> Result<&MealAnalysis, CaptureError> {
        let review = self.review_mut("remove an item")?;
        review
            .analysis
            .remove_item(index)
            .ok_or(CaptureError::UnknownItem(index))?;
        Ok(&review.analysis)
    }

    pub fn rename(&mut self, name: &str) -> Result<(), CaptureError> {
        let review = self.review_mut("rename the meal")?;
        review.name = name.to_string();
        Ok(())
    }

    /// Turns the reviewed analysis into a meal and returns to idle.
    pub fn confirm(&mut self, name: Option<&str>, now: DateTime<Utc>) -> Result<Meal, CaptureError> {
        let mut review = match std::mem::replace(&mut self.phase, CapturePhase::Idle { notice: None }) {
            CapturePhase::Review(review) => review,
            other => {
                let err = CaptureError::InvalidTransition {
                    action: "confirm",
                    phase: other.describe(),
                };
                self.phase = other;
                return Err(err);
            }
        };
        if let Some(name) = name {
            review.name = name.to_string();
        }

        let name = match review.name.trim() {
            "" => DEFAULT_MEAL_NAME.to_string(),
            trimmed => trimmed.to_string(),
        };
        Ok(Meal {
            id: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            name,
            calories: review.analysis.total_calories,
            image_url: Some(review.image.data_url()),
            analysis: Some(review.analysis),
            timestamp: now,
        })
    }

    pub fn cancel(&mut self) -> Result<(), CaptureError> {
        self.review_mut("cancel")?;
        self.phase = CapturePhase::Idle { notice: None };
        Ok(())
    }

    pub fn retry(&mut self) -> Result<(), CaptureError> {
        if !matches!(self.phase, CapturePhase::Failed { .. }) {
            return Err(self.invalid("retry"));
        }
        self.phase = CapturePhase::Idle { notice: None };
        Ok(())
    }

    fn review_mut(&mut self, action: &'static str) -> Result<&mut MealReview, CaptureError> {
        let phase = self.phase.describe();
        match &mut self.phase {
            CapturePhase::Review(review) => Ok(review),
            _ => Err(CaptureError::InvalidTransition { action, phase }),
        }
    }

    fn invalid(&self, action: &'static str) -> CaptureError {
        CaptureError::InvalidTransition {
            action,
            phase: self.phase.describe(),
        }
    }
}

/// JSON view of the capture phase.
#[derive(Debug, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum CaptureView {
    Idle {
        notice: Option<String>,
    },
    Loading,
    #[serde(rename_all = "camelCase")]
    Review {
        name: String,
        analysis: MealAnalysis,
        image_url: String,
    },
    Failed {
        message: String,
    },
}

impl From<&MealCapture> for CaptureView {
    fn from(capture: &MealCapture) -> Self {
        match capture.phase() {
            CapturePhase::Idle { notice } => CaptureView::Idle { notice: notice.clone() },
            CapturePhase::Loading { .. } => CaptureView::Loading,
            CapturePhase::Review(review) => CaptureView::Review {
                name: review.name.clone(),
                analysis: review.analysis.clone(),
                image_url: review.image.data_url(),
            },
            CapturePhase::Failed { message } => CaptureView::Failed {
                message: message.clone(),
            },
        }
    }
}
