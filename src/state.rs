use crate::capture::{ANALYSIS_FAILED_MESSAGE, CaptureView, ImageUpload, MealCapture};
use crate::errors::AppError;
use crate::gateway::DietAdvisor;
use crate::models::{AppData, Meal, ProfileCreatedResponse, ProfileForm, WeightLogResponse};
use crate::profile::{SetupError, setup_profile};
use crate::storage::{Slot, persist_slots};
use chrono::Utc;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;
use tracing::{error, info};

/// Owns everything the tracker knows: the persisted data, the in-progress
/// meal capture and the model client. Remote calls never run under a lock.
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub data: Arc<Mutex<AppData>>,
    pub capture: Arc<Mutex<MealCapture>>,
    pub advisor: Arc<dyn DietAdvisor>,
}

impl AppState {
    pub fn new(data_dir: PathBuf, data: AppData, advisor: Arc<dyn DietAdvisor>) -> Self {
        Self {
            data_dir,
            data: Arc::new(Mutex::new(data)),
            capture: Arc::new(Mutex::new(MealCapture::default())),
            advisor,
        }
    }

    pub async fn create_profile(&self, form: &ProfileForm) -> Result<ProfileCreatedResponse, AppError> {
        if self.data.lock().await.is_set_up() {
            return Err(SetupError::AlreadyExists.into());
        }

        let setup = setup_profile(self.advisor.as_ref(), form).await?;

        let mut data = self.data.lock().await;
        let previous = (data.profile.clone(), data.plan.clone(), data.weight_history.clone());
        data.install_profile(setup.clone(), Utc::now())?;
        if let Err(err) = persist_slots(&self.data_dir, &data, &[Slot::Profile, Slot::Plan, Slot::WeightHistory]).await {
            error!("profile not saved, keeping previous state: {err}");
            (data.profile, data.plan, data.weight_history) = previous;
            return Err(err.into());
        }

        Ok(ProfileCreatedResponse {
            profile: setup.profile,
            plan: setup.plan,
            weight_history: data.weight_history.clone(),
        })
    }

    pub async fn capture_view(&self) -> CaptureView {
        CaptureView::from(&*self.capture.lock().await)
    }

    /// Accepts a photo and waits for its analysis. The remote call runs on
    /// its own task and applies its outcome itself, so the capture leaves
    /// `Loading` even when the caller goes away mid-request.
    pub async fn analyze_upload(&self, upload: ImageUpload) -> Result<CaptureView, AppError> {
        if !self.data.lock().await.is_set_up() {
            return Err(AppError::conflict("Set up your profile before logging meals."));
        }

        let image = self.capture.lock().await.accept(upload)?;

        let advisor = Arc::clone(&self.advisor);
        let capture = Arc::clone(&self.capture);
        let analysis = tokio::spawn(async move {
            let outcome = advisor.analyze_meal(&image).await.map_err(|err| {
                error!("error analyzing meal image: {err}");
                ANALYSIS_FAILED_MESSAGE.to_string()
            });

            let mut capture = capture.lock().await;
            capture.finish(outcome);
            CaptureView::from(&*capture)
        });

        analysis.await.map_err(AppError::internal)
    }

    pub async fn remove_item(&self, index: usize) -> Result<CaptureView, AppError> {
        let mut capture = self.capture.lock().await;
        capture.remove_item(index)?;
        Ok(CaptureView::from(&*capture))
    }

    pub async fn rename_meal(&self, name: &str) -> Result<CaptureView, AppError> {
        let mut capture = self.capture.lock().await;
        capture.rename(name)?;
        Ok(CaptureView::from(&*capture))
    }

    pub async fn confirm_meal(&self, name: Option<&str>) -> Result<Meal, AppError> {
        let meal = self.capture.lock().await.confirm(name, Utc::now())?;

        let mut data = self.data.lock().await;
        data.meals.push(meal.clone());
        if let Err(err) = persist_slots(&self.data_dir, &data, &[Slot::Meals]).await {
            error!(name = %meal.name, "meal not saved, dropping it: {err}");
            data.meals.pop();
            return Err(err.into());
        }

        info!(name = %meal.name, calories = meal.calories, "meal logged");
        Ok(meal)
    }

    pub async fn cancel_meal(&self) -> Result<CaptureView, AppError> {
        let mut capture = self.capture.lock().await;
        capture.cancel()?;
        Ok(CaptureView::from(&*capture))
    }

    pub async fn retry_meal(&self) -> Result<CaptureView, AppError> {
        let mut capture = self.capture.lock().await;
        capture.retry()?;
        Ok(CaptureView::from(&*capture))
    }

    pub async fn log_weight(&self, weight_text: &str) -> Result<WeightLogResponse, AppError> {
        let mut data = self.data.lock().await;
        let previous = data.profile.clone();
        let entry = data.log_weight(weight_text, Utc::now());
        if entry.is_some() {
            if let Err(err) = persist_slots(&self.data_dir, &data, &[Slot::WeightHistory, Slot::Profile]).await {
                error!("weight not saved, keeping previous state: {err}");
                data.weight_history.pop();
                data.profile = previous;
                return Err(err.into());
            }
        }

        Ok(WeightLogResponse {
            entry,
            profile: data.profile.clone(),
        })
    }
}
