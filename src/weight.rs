use crate::metrics::calculate_bmi;
use crate::models::{AppData, WeightEntry};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

impl AppData {
    /// Records a new weight against the current profile. Returns `None` and
    /// changes nothing when there is no profile or the text is not a usable
    /// weight.
    pub fn log_weight(&mut self, weight_text: &str, now: DateTime<Utc>) -> Option<WeightEntry> {
        let Some(profile) = self.profile.as_mut() else {
            debug!("weight ignored: no profile");
            return None;
        };
        let Some(weight) = parse_weight(weight_text) else {
            debug!(input = weight_text, "weight ignored: not a number");
            return None;
        };

        let entry = WeightEntry {
            date: now,
            weight,
            bmi: calculate_bmi(weight, f64::from(profile.height)),
        };
        profile.weight = entry.weight;
        profile.bmi = entry.bmi;
        self.weight_history.push(entry.clone());

        info!(weight = entry.weight, bmi = entry.bmi, "weight logged");
        Some(entry)
    }
}

fn parse_weight(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|weight| weight.is_finite() && *weight > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::BmiCategory;
    use crate::models::UserProfile;
    use chrono::TimeZone;

    fn data_with_profile() -> AppData {
        AppData {
            profile: Some(UserProfile {
                name: "Kim".to_string(),
                age: 28,
                height: 175,
                weight: 70.0,
                bmi: 22.9,
                bmi_category: BmiCategory::Normal,
            }),
            ..AppData::default()
        }
    }

    #[test]
    fn logging_updates_snapshot_and_appends_once() {
        let mut data = data_with_profile();
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 7, 0, 0).unwrap();

        let entry = data.log_weight(" 68.5 ", now).expect("entry logged");

        assert_eq!(entry.weight, 68.5);
        assert_eq!(entry.bmi, 22.4);
        assert_eq!(data.weight_history, vec![entry]);

        let profile = data.profile.as_ref().unwrap();
        assert_eq!(profile.name, "Kim");
        assert_eq!(profile.age, 28);
        assert_eq!(profile.height, 175);
        assert_eq!(profile.weight, 68.5);
        assert_eq!(profile.bmi, 22.4);
    }

    #[test]
    fn no_profile_is_a_no_op() {
        let mut data = AppData::default();
        assert!(data.log_weight("70", Utc::now()).is_none());
        assert!(data.weight_history.is_empty());
    }

    #[test]
    fn meaningless_input_is_a_no_op() {
        let mut data = data_with_profile();
        for input in ["", "heavy", "NaN", "-4", "0"] {
            assert!(data.log_weight(input, Utc::now()).is_none(), "accepted {input:?}");
        }
        assert!(data.weight_history.is_empty());
        assert_eq!(data.profile.as_ref().unwrap().weight, 70.0);
    }
}
