use crate::models::{AppData, DashboardResponse, Meal};
use chrono::{Local, NaiveDate};

pub fn build_dashboard(data: &AppData) -> Option<DashboardResponse> {
    build_dashboard_at(Local::now().date_naive(), data)
}

/// Summary for `today`; `None` until a profile and plan exist.
pub fn build_dashboard_at(today: NaiveDate, data: &AppData) -> Option<DashboardResponse> {
    let profile = data.profile.as_ref()?;
    let plan = data.plan.as_ref()?;

    let meals: Vec<Meal> = todays_meals(today, &data.meals).cloned().collect();
    let consumed = calories_consumed(&meals);
    let progress = calorie_progress(consumed, plan.daily_calorie_goal);

    Some(DashboardResponse {
        date: today.to_string(),
        name: profile.name.clone(),
        calories_consumed: consumed,
        daily_calorie_goal: plan.daily_calorie_goal,
        calorie_progress: progress,
        display_progress: display_progress(progress),
        meals,
        meal_suggestions: plan.meal_suggestions.clone(),
    })
}

/// Meals logged on `today` in local time.
pub fn todays_meals(today: NaiveDate, meals: &[Meal]) -> impl Iterator<Item = &Meal> {
    meals
        .iter()
        .filter(move |meal| meal.timestamp.with_timezone(&Local).date_naive() == today)
}

pub fn calories_consumed(meals: &[Meal]) -> f64 {
    meals.iter().map(|meal| meal.calories).sum()
}

/// Percentage of the daily goal; 0 when there is no positive goal.
pub fn calorie_progress(consumed: f64, goal: f64) -> f64 {
    if goal <= 0.0 {
        return 0.0;
    }
    consumed * 100.0 / goal
}

pub fn display_progress(progress: f64) -> f64 {
    progress.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::BmiCategory;
    use crate::models::{DietPlan, MacroBreakdown, MealSuggestions, UserProfile};
    use chrono::{Duration, Utc};

    fn meal_at(day: NaiveDate, hour: u32, calories: f64) -> Meal {
        let timestamp = day
            .and_hms_opt(hour, 0, 0)
            .unwrap()
            .and_local_timezone(Local)
            .single()
            .expect("unambiguous local time")
            .with_timezone(&Utc);
        Meal {
            id: timestamp.to_rfc3339(),
            name: "Meal".to_string(),
            calories,
            image_url: None,
            analysis: None,
            timestamp,
        }
    }

    fn data(goal: f64, meals: Vec<Meal>) -> AppData {
        AppData {
            profile: Some(UserProfile {
                name: "Rae".to_string(),
                age: 33,
                height: 165,
                weight: 60.0,
                bmi: 22.0,
                bmi_category: BmiCategory::Normal,
            }),
            plan: Some(DietPlan {
                daily_calorie_goal: goal,
                macro_breakdown: MacroBreakdown {
                    protein: 100.0,
                    carbs: 200.0,
                    fat: 50.0,
                },
                meal_suggestions: MealSuggestions {
                    breakfast: "Eggs".into(),
                    lunch: "Wrap".into(),
                    dinner: "Tofu".into(),
                    snacks: "Berries".into(),
                },
            }),
            meals,
            weight_history: Vec::new(),
        }
    }

    #[test]
    fn only_same_day_meals_count() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let yesterday = today - Duration::days(1);
        let data = data(
            2000.0,
            vec![meal_at(yesterday, 20, 900.0), meal_at(today, 8, 450.0), meal_at(today, 13, 650.0)],
        );

        let summary = build_dashboard_at(today, &data).unwrap();
        assert_eq!(summary.meals.len(), 2);
        assert_eq!(summary.calories_consumed, 1100.0);
        assert_eq!(summary.calorie_progress, 55.0);
        assert_eq!(summary.display_progress, 55.0);
        assert_eq!(summary.date, "2026-01-05");
        assert_eq!(summary.name, "Rae");
    }

    #[test]
    fn progress_is_clamped_for_display() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let data = data(1000.0, vec![meal_at(today, 9, 800.0), meal_at(today, 19, 700.0)]);

        let summary = build_dashboard_at(today, &data).unwrap();
        assert_eq!(summary.calorie_progress, 150.0);
        assert_eq!(summary.display_progress, 100.0);
    }

    #[test]
    fn zero_goal_gives_zero_progress() {
        assert_eq!(calorie_progress(500.0, 0.0), 0.0);
        assert_eq!(calorie_progress(500.0, -10.0), 0.0);
    }

    #[test]
    fn no_dashboard_without_profile() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert!(build_dashboard_at(today, &AppData::default()).is_none());
    }
}
