use crate::gateway::DietAdvisor;
use crate::metrics::{BmiCategory, calculate_bmi};
use crate::models::{AppData, DietPlan, ProfileForm, UserProfile, WeightEntry};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info};

pub const PLAN_FAILED_MESSAGE: &str = "Failed to generate diet plan. Please try again.";

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("All fields are required.")]
    MissingFields,
    #[error("Age, height and weight must be positive numbers.")]
    InvalidNumber,
    #[error("A profile already exists.")]
    AlreadyExists,
    #[error("{message}", message = PLAN_FAILED_MESSAGE)]
    PlanUnavailable,
}

/// A profile together with the plan generated for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSetup {
    pub profile: UserProfile,
    pub plan: DietPlan,
}

/// Checks the form and derives the profile without any remote call.
pub fn build_profile(form: &ProfileForm) -> Result<UserProfile, SetupError> {
    let name = form.name.trim();
    let fields = [name, form.age.trim(), form.height.trim(), form.weight.trim()];
    if fields.iter().any(|value| value.is_empty()) {
        return Err(SetupError::MissingFields);
    }

    let age = parse_positive(&form.age)?;
    let height = parse_positive(&form.height)?;
    let weight = parse_positive(&form.weight)?;

    let bmi = calculate_bmi(f64::from(weight), f64::from(height));
    Ok(UserProfile {
        name: name.to_string(),
        age,
        height,
        weight: f64::from(weight),
        bmi,
        bmi_category: BmiCategory::from_bmi(bmi),
    })
}

/// Validates the form, then asks the advisor for a plan. Nothing is returned
/// unless both the profile and its plan are available.
pub async fn setup_profile(advisor: &dyn DietAdvisor, form: &ProfileForm) -> Result<ProfileSetup, SetupError> {
    let profile = build_profile(form)?;

    match advisor.generate_plan(&profile).await {
        Ok(plan) => Ok(ProfileSetup { profile, plan }),
        Err(err) => {
            error!("error generating diet plan: {err}");
            Err(SetupError::PlanUnavailable)
        }
    }
}

impl AppData {
    /// Stores a freshly created profile and plan and restarts the weight
    /// history from a single entry.
    pub fn install_profile(&mut self, setup: ProfileSetup, now: DateTime<Utc>) -> Result<(), SetupError> {
        if self.is_set_up() {
            return Err(SetupError::AlreadyExists);
        }

        info!(name = %setup.profile.name, bmi = setup.profile.bmi, "profile created");
        self.weight_history = vec![WeightEntry {
            date: now,
            weight: setup.profile.weight,
            bmi: setup.profile.bmi,
        }];
        self.profile = Some(setup.profile);
        self.plan = Some(setup.plan);
        Ok(())
    }
}

/// Leading-integer parse: an optional sign followed by digits, anything
/// after the digits ignored ("72.9" reads as 72).
fn parse_int_prefix(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits: &str = &rest[..rest.bytes().take_while(u8::is_ascii_digit).count()];
    if digits.is_empty() {
        return None;
    }
    let value = digits.parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}

fn parse_positive(raw: &str) -> Result<u32, SetupError> {
    parse_int_prefix(raw)
        .filter(|value| *value > 0)
        .and_then(|value| u32::try_from(value).ok())
        .ok_or(SetupError::InvalidNumber)
}
