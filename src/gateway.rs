//! Client for the hosted Gemini model.
//!
//! Both calls ask for a JSON reply constrained by a response schema and then
//! validate the reply again on arrival: a missing or mistyped field, or a
//! nonsensical number, is treated the same as a transport failure.

use crate::config::GeminiSettings;
use crate::models::{DietPlan, EncodedImage, MealAnalysis, UserProfile};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, instrument};

const ANALYSIS_PROMPT: &str = "Analyze the contents of this meal image. Estimate the total calories for the entire meal. For each distinct food item, provide its name, estimated calories, whether it's an item to avoid for a healthy diet (e.g., high in processed sugar or saturated fat), and suggest a healthier alternative if it is avoidable.";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model API error: {0}")]
    Api(String),
    #[error("no text content in model response")]
    EmptyResponse,
    #[error("model output does not match the expected shape: {0}")]
    Schema(#[from] serde_json::Error),
    #[error("model output failed validation: {0}")]
    Invalid(String),
}

/// The two remote operations the tracker depends on.
#[async_trait]
pub trait DietAdvisor: Send + Sync {
    async fn generate_plan(&self, profile: &UserProfile) -> Result<DietPlan, GatewayError>;

    async fn analyze_meal(&self, image: &EncodedImage) -> Result<MealAnalysis, GatewayError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiClient {
    pub fn new(settings: &GeminiSettings) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            api_base: settings.api_base.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    async fn generate<T: DeserializeOwned>(&self, parts: Vec<Part>, schema: Value) -> Result<T, GatewayError> {
        let request = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            },
        };

        debug!(model = %self.model, "sending generateContent request");
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = extract_text(&body)?;
        Ok(serde_json::from_str(text.trim())?)
    }
}

#[async_trait]
impl DietAdvisor for GeminiClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate_plan(&self, profile: &UserProfile) -> Result<DietPlan, GatewayError> {
        let parts = vec![Part::Text {
            text: plan_prompt(profile),
        }];
        let plan: DietPlan = self.generate(parts, diet_plan_schema()).await?;
        validate_plan(&plan)?;
        Ok(plan)
    }

    #[instrument(skip_all, fields(model = %self.model, mime_type = %image.mime_type))]
    async fn analyze_meal(&self, image: &EncodedImage) -> Result<MealAnalysis, GatewayError> {
        let parts = vec![
            Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: image.data.clone(),
                },
            },
            Part::Text {
                text: ANALYSIS_PROMPT.to_string(),
            },
        ];
        let analysis: MealAnalysis = self.generate(parts, meal_analysis_schema()).await?;
        validate_analysis(&analysis)?;
        Ok(analysis)
    }
}

fn extract_text(body: &str) -> Result<String, GatewayError> {
    let response: GenerateResponse = serde_json::from_str(body)?;
    if let Some(error) = response.error {
        return Err(GatewayError::Api(error.message));
    }
    response
        .candidates
        .into_iter()
        .flatten()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .find_map(|part| part.text)
        .ok_or(GatewayError::EmptyResponse)
}

pub fn plan_prompt(profile: &UserProfile) -> String {
    format!(
        "Based on the following user profile, generate a personalized diet plan. The user's name is {}, age {}, height {} cm, weight {} kg, with a BMI of {} which is categorized as '{}'. Create a balanced diet plan with a daily calorie goal, macro breakdown in grams (protein, carbs, fat), and concise, healthy meal suggestions for breakfast, lunch, dinner, and snacks.",
        profile.name, profile.age, profile.height, profile.weight, profile.bmi, profile.bmi_category
    )
}

fn diet_plan_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "dailyCalorieGoal": { "type": "NUMBER" },
            "macroBreakdown": {
                "type": "OBJECT",
                "properties": {
                    "protein": { "type": "NUMBER" },
                    "carbs": { "type": "NUMBER" },
                    "fat": { "type": "NUMBER" }
                },
                "required": ["protein", "carbs", "fat"]
            },
            "mealSuggestions": {
                "type": "OBJECT",
                "properties": {
                    "breakfast": { "type": "STRING" },
                    "lunch": { "type": "STRING" },
                    "dinner": { "type": "STRING" },
                    "snacks": { "type": "STRING" }
                },
                "required": ["breakfast", "lunch", "dinner", "snacks"]
            }
        },
        "required": ["dailyCalorieGoal", "macroBreakdown", "mealSuggestions"]
    })
}

fn meal_analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "totalCalories": {
                "type": "NUMBER",
                "description": "Total estimated calories for the entire meal."
            },
            "items": {
                "type": "ARRAY",
                "description": "List of food items identified in the meal.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING", "description": "Name of the food item." },
                        "calories": { "type": "NUMBER", "description": "Estimated calories for this item." },
                        "avoidable": {
                            "type": "BOOLEAN",
                            "description": "True if this item is generally unhealthy and should be avoided."
                        },
                        "alternative": {
                            "type": "STRING",
                            "description": "A healthier alternative suggestion if the item is avoidable."
                        }
                    },
                    "required": ["name", "calories", "avoidable"]
                }
            }
        },
        "required": ["totalCalories", "items"]
    })
}

fn check_amount(field: &str, value: f64) -> Result<(), GatewayError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(GatewayError::Invalid(format!("{field} must be a non-negative number, got {value}")))
    }
}

pub fn validate_plan(plan: &DietPlan) -> Result<(), GatewayError> {
    check_amount("dailyCalorieGoal", plan.daily_calorie_goal)?;
    check_amount("macroBreakdown.protein", plan.macro_breakdown.protein)?;
    check_amount("macroBreakdown.carbs", plan.macro_breakdown.carbs)?;
    check_amount("macroBreakdown.fat", plan.macro_breakdown.fat)
}

pub fn validate_analysis(analysis: &MealAnalysis) -> Result<(), GatewayError> {
    check_amount("totalCalories", analysis.total_calories)?;
    for (index, item) in analysis.items.iter().enumerate() {
        if item.name.trim().is_empty() {
            return Err(GatewayError::Invalid(format!("items[{index}].name is empty")));
        }
        check_amount(&format!("items[{index}].calories"), item.calories)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod stub {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Replays canned replies and counts how often each call was made.
    #[derive(Default)]
    pub struct StubAdvisor {
        pub plan: Mutex<Option<DietPlan>>,
        pub analysis: Mutex<Option<MealAnalysis>>,
        pub plan_calls: AtomicUsize,
        pub analysis_calls: AtomicUsize,
        /// When set, meal analysis waits for a permit before replying.
        pub analysis_gate: Option<Notify>,
    }

    impl StubAdvisor {
        pub fn with_plan(plan: DietPlan) -> Self {
            let stub = Self::default();
            *stub.plan.lock().unwrap() = Some(plan);
            stub
        }

        pub fn plan_calls(&self) -> usize {
            self.plan_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DietAdvisor for StubAdvisor {
        async fn generate_plan(&self, _profile: &UserProfile) -> Result<DietPlan, GatewayError> {
            self.plan_calls.fetch_add(1, Ordering::SeqCst);
            self.plan.lock().unwrap().clone().ok_or(GatewayError::EmptyResponse)
        }

        async fn analyze_meal(&self, _image: &EncodedImage) -> Result<MealAnalysis, GatewayError> {
            self.analysis_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.analysis_gate {
                gate.notified().await;
            }
            self.analysis.lock().unwrap().clone().ok_or(GatewayError::EmptyResponse)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::BmiCategory;
    use crate::models::{AnalyzedItem, MacroBreakdown, MealSuggestions};

    fn wrap(text: &str) -> String {
        json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }] }).to_string()
    }

    #[test]
    fn extracts_candidate_text() {
        let body = wrap("  {\"totalCalories\": 10, \"items\": []}  ");
        let text = extract_text(&body).unwrap();
        let analysis: MealAnalysis = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(analysis.total_calories, 10.0);
    }

    #[test]
    fn api_error_and_empty_candidates_are_errors() {
        let err = extract_text(r#"{"error": {"message": "quota"}}"#).unwrap_err();
        assert!(matches!(err, GatewayError::Api(message) if message == "quota"));

        let err = extract_text(r#"{"candidates": []}"#).unwrap_err();
        assert!(matches!(err, GatewayError::EmptyResponse));
    }

    #[test]
    fn missing_required_item_field_is_rejected() {
        let raw = r#"{"totalCalories": 300, "items": [{"name": "toast", "calories": 300}]}"#;
        assert!(serde_json::from_str::<MealAnalysis>(raw).is_err());
    }

    #[test]
    fn mistyped_plan_field_is_rejected() {
        let raw = r#"{"dailyCalorieGoal": "lots", "macroBreakdown": {"protein": 1, "carbs": 1, "fat": 1},
            "mealSuggestions": {"breakfast": "", "lunch": "", "dinner": "", "snacks": ""}}"#;
        assert!(serde_json::from_str::<DietPlan>(raw).is_err());
    }

    #[test]
    fn negative_values_fail_validation() {
        let plan = DietPlan {
            daily_calorie_goal: -1.0,
            macro_breakdown: MacroBreakdown {
                protein: 100.0,
                carbs: 200.0,
                fat: 60.0,
            },
            meal_suggestions: MealSuggestions {
                breakfast: "Oats".into(),
                lunch: "Soup".into(),
                dinner: "Fish".into(),
                snacks: "Fruit".into(),
            },
        };
        assert!(matches!(validate_plan(&plan), Err(GatewayError::Invalid(_))));

        let analysis = MealAnalysis {
            total_calories: 100.0,
            items: vec![AnalyzedItem {
                name: "cake".into(),
                calories: f64::NAN,
                avoidable: true,
                alternative: None,
            }],
        };
        assert!(matches!(validate_analysis(&analysis), Err(GatewayError::Invalid(_))));
    }

    #[test]
    fn plan_prompt_mentions_every_profile_field() {
        let profile = UserProfile {
            name: "Sam".into(),
            age: 41,
            height: 182,
            weight: 88.0,
            bmi: 26.6,
            bmi_category: BmiCategory::Overweight,
        };
        let prompt = plan_prompt(&profile);
        for needle in ["Sam", "age 41", "height 182 cm", "weight 88 kg", "BMI of 26.6", "'Overweight'"] {
            assert!(prompt.contains(needle), "prompt missing {needle}");
        }
    }

    #[test]
    fn analysis_request_serializes_inline_data_first() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/jpeg".into(),
                            data: "AAAA".into(),
                        },
                    },
                    Part::Text { text: "hi".into() },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: meal_analysis_schema(),
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(value["contents"][0]["parts"][1]["text"], "hi");
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(value["generationConfig"]["responseSchema"]["required"][1], "items");
    }
}
