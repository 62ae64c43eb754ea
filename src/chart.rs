use crate::models::WeightEntry;
use crate::ui::format_number;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::fmt::Write as _;

pub const PLACEHOLDER_MESSAGE: &str = "Log at least two weight entries to see your progress chart.";

const WIDTH: f64 = 600.0;
const HEIGHT: f64 = 260.0;
const PADDING_X: f64 = 48.0;
const PADDING_Y: f64 = 34.0;
const TOP: f64 = 24.0;
const TICKS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChartView {
    Placeholder { message: String },
    Trend { points: Vec<TrendPoint> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub label: String,
    pub date: DateTime<Utc>,
    pub weight: f64,
    pub bmi: f64,
}

/// Weight/BMI series ordered by when each entry was taken. Entries sharing
/// an instant keep their logging order.
pub fn build_chart(history: &[WeightEntry]) -> ChartView {
    if history.len() < 2 {
        return ChartView::Placeholder {
            message: PLACEHOLDER_MESSAGE.to_string(),
        };
    }

    let mut entries: Vec<&WeightEntry> = history.iter().collect();
    entries.sort_by_key(|entry| entry.date);

    let points = entries
        .into_iter()
        .map(|entry| TrendPoint {
            label: entry.date.with_timezone(&Local).format("%b %-d").to_string(),
            date: entry.date,
            weight: entry.weight,
            bmi: entry.bmi,
        })
        .collect();
    ChartView::Trend { points }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Axis {
    min: f64,
    max: f64,
}

impl Axis {
    fn fit(values: impl Iterator<Item = f64>) -> Self {
        let (mut min, mut max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), value| {
            (lo.min(value), hi.max(value))
        });
        if !min.is_finite() || !max.is_finite() {
            return Self { min: 0.0, max: 1.0 };
        }
        if min == max {
            min -= 1.0;
            max += 1.0;
        }
        Self { min, max }
    }

    fn range(&self) -> f64 {
        self.max - self.min
    }

    fn y(&self, value: f64) -> f64 {
        let scale = (HEIGHT - TOP - PADDING_Y) / self.range();
        HEIGHT - PADDING_Y - (value - self.min) * scale
    }

    fn tick(&self, step: usize) -> f64 {
        self.min + self.range() * step as f64 / TICKS as f64
    }
}

fn x(index: usize, count: usize) -> f64 {
    if count < 2 {
        return PADDING_X;
    }
    PADDING_X + index as f64 * (WIDTH - PADDING_X * 2.0) / (count - 1) as f64
}

fn line_path(points: &[TrendPoint], axis: Axis, value: impl Fn(&TrendPoint) -> f64) -> String {
    points
        .iter()
        .enumerate()
        .map(|(index, point)| {
            let command = if index == 0 { 'M' } else { 'L' };
            format!("{command} {:.2} {:.2}", x(index, points.len()), axis.y(value(point)))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Dual-axis line chart: weight against the left axis, BMI against the right.
pub fn render_svg(points: &[TrendPoint]) -> String {
    let weight_axis = Axis::fit(points.iter().map(|point| point.weight));
    let bmi_axis = Axis::fit(points.iter().map(|point| point.bmi));
    let mut svg = String::new();

    let _ = write!(
        svg,
        r#"<svg class="chart" viewBox="0 0 {WIDTH} {HEIGHT}" role="img" aria-label="Weight and BMI trend">"#
    );
    for step in 0..=TICKS {
        let y = weight_axis.y(weight_axis.tick(step));
        let _ = write!(
            svg,
            r#"<line class="chart-grid" x1="{PADDING_X}" y1="{y:.2}" x2="{right:.2}" y2="{y:.2}" />"#,
            right = WIDTH - PADDING_X
        );
        let _ = write!(
            svg,
            r#"<text class="chart-label" x="{left:.2}" y="{label_y:.2}" text-anchor="end">{value}</text>"#,
            left = PADDING_X - 8.0,
            label_y = y + 4.0,
            value = format_number(weight_axis.tick(step))
        );
        let _ = write!(
            svg,
            r#"<text class="chart-label bmi" x="{right:.2}" y="{label_y:.2}" text-anchor="start">{value}</text>"#,
            right = WIDTH - PADDING_X + 8.0,
            label_y = y + 4.0,
            value = format_number(bmi_axis.tick(step))
        );
    }

    let _ = write!(
        svg,
        r#"<path class="chart-line weight" d="{}" /><path class="chart-line bmi" d="{}" />"#,
        line_path(points, weight_axis, |point| point.weight),
        line_path(points, bmi_axis, |point| point.bmi)
    );

    let label_every = if points.len() > 8 { 2 } else { 1 };
    for (index, point) in points.iter().enumerate() {
        let cx = x(index, points.len());
        let _ = write!(
            svg,
            r#"<circle class="chart-point weight" cx="{cx:.2}" cy="{:.2}" r="4" /><circle class="chart-point bmi" cx="{cx:.2}" cy="{:.2}" r="4" />"#,
            weight_axis.y(point.weight),
            bmi_axis.y(point.bmi)
        );
        if index % label_every == 0 {
            let _ = write!(
                svg,
                r#"<text class="chart-label" x="{cx:.2}" y="{:.2}" text-anchor="middle">{}</text>"#,
                HEIGHT - PADDING_Y + 18.0,
                point.label
            );
        }
    }

    let _ = write!(
        svg,
        r#"<text class="chart-legend weight" x="{PADDING_X}" y="14">Weight (kg)</text><text class="chart-legend bmi" x="{legend_x}" y="14" text-anchor="end">BMI</text></svg>"#,
        legend_x = WIDTH - PADDING_X
    );
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(year: i32, month: u32, day: u32, weight: f64, bmi: f64) -> WeightEntry {
        WeightEntry {
            date: Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap(),
            weight,
            bmi,
        }
    }

    #[test]
    fn fewer_than_two_entries_gives_placeholder() {
        for history in [vec![], vec![entry(2026, 1, 5, 70.0, 22.9)]] {
            assert_eq!(
                build_chart(&history),
                ChartView::Placeholder {
                    message: PLACEHOLDER_MESSAGE.to_string()
                }
            );
        }
    }

    #[test]
    fn points_are_sorted_by_instant_across_years() {
        let history = vec![
            entry(2026, 1, 5, 69.0, 22.5),
            entry(2025, 12, 20, 71.0, 23.2),
            entry(2026, 2, 1, 68.0, 22.2),
        ];
        let ChartView::Trend { points } = build_chart(&history) else {
            panic!("expected a trend");
        };
        let weights: Vec<f64> = points.iter().map(|point| point.weight).collect();
        assert_eq!(weights, vec![71.0, 69.0, 68.0]);
        assert!(points.iter().all(|point| !point.label.is_empty()));
    }

    #[test]
    fn equal_instants_keep_logging_order() {
        let history = vec![entry(2026, 3, 1, 70.0, 22.9), entry(2026, 3, 1, 69.5, 22.7)];
        let ChartView::Trend { points } = build_chart(&history) else {
            panic!("expected a trend");
        };
        assert_eq!(points[0].weight, 70.0);
        assert_eq!(points[1].weight, 69.5);
    }

    #[test]
    fn svg_draws_both_series() {
        let history = vec![entry(2026, 3, 1, 70.0, 22.9), entry(2026, 3, 8, 69.0, 22.5)];
        let ChartView::Trend { points } = build_chart(&history) else {
            panic!("expected a trend");
        };
        let svg = render_svg(&points);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<path class=\"chart-line").count(), 2);
        assert_eq!(svg.matches("<circle").count(), 4);
        assert!(svg.contains("Weight (kg)"));
    }

    #[test]
    fn flat_axis_is_widened() {
        let axis = Axis::fit([70.0, 70.0].into_iter());
        assert_eq!(axis, Axis { min: 69.0, max: 71.0 });
    }
}
