use crate::metrics::BmiCategory;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub age: u32,
    /// Centimetres.
    pub height: u32,
    /// Kilograms.
    pub weight: f64,
    pub bmi: f64,
    pub bmi_category: BmiCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DietPlan {
    pub daily_calorie_goal: f64,
    pub macro_breakdown: MacroBreakdown,
    pub meal_suggestions: MealSuggestions,
}

/// Grams per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroBreakdown {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealSuggestions {
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
    pub snacks: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealAnalysis {
    pub total_calories: f64,
    pub items: Vec<AnalyzedItem>,
}

impl MealAnalysis {
    /// Drops one item and resets the total to the sum of what is left.
    pub fn remove_item(&mut self, index: usize) -> Option<AnalyzedItem> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);
        self.total_calories = self.items.iter().map(|item| item.calories).sum();
        Some(removed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedItem {
    pub name: String,
    pub calories: f64,
    pub avoidable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: String,
    pub name: String,
    pub calories: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<MealAnalysis>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub date: DateTime<Utc>,
    pub weight: f64,
    pub bmi: f64,
}

/// An uploaded photo held as base64 until it is analyzed and logged.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub data: String,
}

impl EncodedImage {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    pub profile: Option<UserProfile>,
    pub plan: Option<DietPlan>,
    pub meals: Vec<Meal>,
    pub weight_history: Vec<WeightEntry>,
}

impl AppData {
    pub fn is_set_up(&self) -> bool {
        self.profile.is_some() && self.plan.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub height: String,
    #[serde(default)]
    pub weight: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeightForm {
    #[serde(default)]
    pub weight: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MealNameForm {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCreatedResponse {
    pub profile: UserProfile,
    pub plan: DietPlan,
    pub weight_history: Vec<WeightEntry>,
}

#[derive(Debug, Serialize)]
pub struct WeightLogResponse {
    pub entry: Option<WeightEntry>,
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub date: String,
    pub name: String,
    pub calories_consumed: f64,
    pub daily_calorie_goal: f64,
    pub calorie_progress: f64,
    pub display_progress: f64,
    pub meals: Vec<Meal>,
    pub meal_suggestions: MealSuggestions,
}
