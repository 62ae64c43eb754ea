use crate::capture::{CapturePhase, MealCapture, MealReview};
use crate::chart::{ChartView, render_svg};
use crate::models::{DashboardResponse, Meal, ProfileForm, UserProfile};
use chrono::Local;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Progress,
}

pub fn render_setup(form: &ProfileForm, error: Option<&str>) -> String {
    let body = SETUP_HTML
        .replace("{{NAME}}", &escape_html(&form.name))
        .replace("{{AGE}}", &escape_html(&form.age))
        .replace("{{HEIGHT}}", &escape_html(&form.height))
        .replace("{{WEIGHT}}", &escape_html(&form.weight))
        .replace("{{ERROR}}", &error_line(error));
    layout("Welcome to SmartDiet", None, &body)
}

pub fn render_dashboard(summary: &DashboardResponse, capture: &MealCapture) -> String {
    let body = DASHBOARD_HTML
        .replace("{{NAME}}", &escape_html(&summary.name))
        .replace("{{CONSUMED}}", &format_number(summary.calories_consumed))
        .replace("{{GOAL}}", &format_number(summary.daily_calorie_goal))
        .replace("{{PROGRESS}}", &format!("{:.1}", summary.display_progress))
        .replace("{{CAPTURE}}", &render_capture(capture))
        .replace("{{MEALS}}", &render_meal_log(&summary.meals))
        .replace("{{BREAKFAST}}", &escape_html(&summary.meal_suggestions.breakfast))
        .replace("{{LUNCH}}", &escape_html(&summary.meal_suggestions.lunch))
        .replace("{{DINNER}}", &escape_html(&summary.meal_suggestions.dinner))
        .replace("{{SNACKS}}", &escape_html(&summary.meal_suggestions.snacks));
    layout("SmartDiet Tracker", Some(View::Dashboard), &body)
}

pub fn render_progress(profile: &UserProfile, chart: &ChartView) -> String {
    let chart_html = match chart {
        ChartView::Placeholder { message } => format!(
            r#"<h3>Weight Trend</h3><div class="placeholder"><p class="muted">{}</p></div>"#,
            escape_html(message)
        ),
        ChartView::Trend { points } => format!(
            r#"<h3>Weight &amp; BMI Trend</h3><div class="chart-card">{}</div>"#,
            render_svg(points)
        ),
    };
    let body = PROGRESS_HTML
        .replace("{{WEIGHT}}", &format_number(profile.weight))
        .replace("{{BMI}}", &format_number(profile.bmi))
        .replace("{{CATEGORY}}", profile.bmi_category.label())
        .replace("{{CHART}}", &chart_html);
    layout("SmartDiet Progress", Some(View::Progress), &body)
}

fn render_capture(capture: &MealCapture) -> String {
    match capture.phase() {
        CapturePhase::Idle { notice } => UPLOAD_HTML.replace("{{ERROR}}", &error_line(notice.as_deref())),
        CapturePhase::Loading { .. } => LOADING_HTML.to_string(),
        CapturePhase::Review(review) => render_review(review),
        CapturePhase::Failed { message } => format!(
            r#"<p class="error">{}</p><form method="post" action="/meals/retry"><button type="submit" class="btn">Try again</button></form>"#,
            escape_html(message)
        ),
    }
}

fn render_review(review: &MealReview) -> String {
    let mut items = String::new();
    for (index, item) in review.analysis.items.iter().enumerate() {
        let suggestion = if item.avoidable {
            let text = item.alternative.as_deref().unwrap_or("Consider a healthier option.");
            format!(r#"<p class="suggestion">Suggestion: {}</p>"#, escape_html(text))
        } else {
            String::new()
        };
        let _ = write!(
            items,
            r#"<li class="item"><div><div class="item-name">{name} - ~{calories} kcal</div>{suggestion}</div><button type="submit" form="confirm-form" formaction="/meals/items/{index}/remove" class="remove" aria-label="Remove {name}">&times;</button></li>"#,
            name = escape_html(&item.name),
            calories = format_number(item.calories),
        );
    }

    REVIEW_HTML
        .replace("{{IMAGE}}", &escape_html(&review.image.data_url()))
        .replace("{{TOTAL}}", &format_number(review.analysis.total_calories))
        .replace("{{ITEMS}}", &items)
        .replace("{{MEAL_NAME}}", &escape_html(&review.name))
}

fn render_meal_log(meals: &[Meal]) -> String {
    if meals.is_empty() {
        return r#"<p class="muted">No meals logged yet today.</p>"#.to_string();
    }
    let mut html = String::from(r#"<ul class="meal-log">"#);
    for meal in meals {
        let _ = write!(
            html,
            r#"<li><div><p class="item-name">{}</p><p class="muted small">{}</p></div><span class="kcal">{} kcal</span></li>"#,
            escape_html(&meal.name),
            meal.timestamp.with_timezone(&Local).format("%-I:%M %p"),
            format_number(meal.calories)
        );
    }
    html.push_str("</ul>");
    html
}

fn layout(title: &str, active: Option<View>, body: &str) -> String {
    let nav = match active {
        None => String::new(),
        Some(view) => {
            let link = |target: View, href: &str, label: &str| {
                let class = if target == view { "tab active" } else { "tab" };
                format!(r#"<a class="{class}" href="{href}">{label}</a>"#)
            };
            format!(
                r#"<nav class="tabs">{}{}</nav>"#,
                link(View::Dashboard, "/", "Dashboard"),
                link(View::Progress, "/progress", "Progress")
            )
        }
    };
    LAYOUT_HTML
        .replace("{{TITLE}}", title)
        .replace("{{NAV}}", &nav)
        .replace("{{BODY}}", body)
}

fn error_line(error: Option<&str>) -> String {
    error
        .map(|message| format!(r#"<p class="error">{}</p>"#, escape_html(message)))
        .unwrap_or_default()
}

/// Whole numbers print without a fraction, anything else with one decimal.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.1}")
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <style>
    :root {
      --bg: #f1f5f9;
      --ink: #1e293b;
      --muted: #64748b;
      --accent: #10b981;
      --accent-dark: #059669;
      --bmi: #3b82f6;
      --card: #ffffff;
      --danger: #ef4444;
      --warn: #d97706;
      --shadow: 0 10px 30px rgba(15, 23, 42, 0.08);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Inter", "Segoe UI", sans-serif;
    }

    header {
      background: var(--card);
      box-shadow: 0 1px 2px rgba(15, 23, 42, 0.06);
      position: sticky;
      top: 0;
    }

    .bar {
      max-width: 1080px;
      margin: 0 auto;
      padding: 14px 20px;
      display: flex;
      align-items: center;
      justify-content: space-between;
    }

    .brand {
      font-size: 1.25rem;
      font-weight: 700;
      color: var(--accent);
      margin: 0;
    }

    .tabs {
      display: flex;
      gap: 8px;
    }

    .tab {
      padding: 8px 12px;
      border-radius: 8px;
      color: var(--muted);
      text-decoration: none;
      font-weight: 600;
      font-size: 0.9rem;
    }

    .tab.active {
      background: #d1fae5;
      color: #047857;
    }

    main {
      max-width: 1080px;
      margin: 0 auto;
      padding: 24px 20px 48px;
    }

    .grid {
      display: grid;
      grid-template-columns: 2fr 1fr;
      gap: 24px;
    }

    .stack {
      display: grid;
      gap: 24px;
      align-content: start;
    }

    .card {
      background: var(--card);
      border-radius: 14px;
      box-shadow: var(--shadow);
      padding: 24px;
    }

    .card.narrow {
      max-width: 440px;
      margin: 48px auto;
    }

    h2, h3 {
      margin: 0 0 6px;
    }

    .muted {
      color: var(--muted);
      margin: 0;
    }

    .small {
      font-size: 0.85rem;
    }

    .error {
      color: var(--danger);
      font-size: 0.9rem;
    }

    .suggestion {
      color: var(--warn);
      font-size: 0.85rem;
      margin: 4px 0 0;
    }

    .totals {
      display: flex;
      justify-content: space-between;
      align-items: flex-end;
      margin-top: 16px;
    }

    .big {
      font-size: 2rem;
      font-weight: 700;
      color: var(--accent);
    }

    .meter {
      height: 10px;
      background: #e2e8f0;
      border-radius: 999px;
      margin-top: 8px;
      overflow: hidden;
    }

    .meter span {
      display: block;
      height: 100%;
      background: var(--accent);
    }

    input[type="text"], input[type="number"] {
      width: 100%;
      padding: 10px 14px;
      border: 1px solid #cbd5e1;
      border-radius: 8px;
      font-size: 1rem;
    }

    form.fields {
      display: grid;
      gap: 12px;
      margin-top: 20px;
    }

    .btn {
      appearance: none;
      border: none;
      border-radius: 8px;
      padding: 10px 16px;
      font-weight: 700;
      cursor: pointer;
      background: var(--accent);
      color: white;
    }

    .btn:hover {
      background: var(--accent-dark);
    }

    .btn:disabled {
      background: #6ee7b7;
      cursor: wait;
    }

    .btn.secondary {
      background: #e2e8f0;
      color: #475569;
    }

    .drop-zone {
      margin-top: 16px;
      border: 2px dashed #cbd5e1;
      border-radius: 12px;
      padding: 28px;
      text-align: center;
      color: var(--muted);
    }

    .drop-zone.hover {
      border-color: var(--accent);
      background: #ecfdf5;
    }

    .preview {
      width: 100%;
      max-height: 240px;
      object-fit: cover;
      border-radius: 10px;
      margin-top: 8px;
    }

    .center {
      text-align: center;
      margin: 16px 0;
    }

    ul.items, ul.meal-log {
      list-style: none;
      padding: 0;
      margin: 12px 0 0;
      display: grid;
      gap: 8px;
    }

    ul.items li, ul.meal-log li {
      display: flex;
      justify-content: space-between;
      align-items: center;
      background: #f8fafc;
      border-radius: 8px;
      padding: 10px 12px;
    }

    .item-name {
      font-weight: 600;
      margin: 0;
    }

    .kcal {
      font-weight: 700;
      color: var(--accent);
    }

    .remove {
      border: none;
      background: none;
      color: #94a3b8;
      font-size: 1.3rem;
      cursor: pointer;
    }

    .remove:hover {
      color: var(--danger);
    }

    .actions {
      display: flex;
      justify-content: flex-end;
      gap: 8px;
      margin-top: 16px;
    }

    .inline {
      display: flex;
      gap: 8px;
      margin-top: 16px;
    }

    .placeholder {
      height: 240px;
      display: grid;
      place-items: center;
    }

    .chart-card svg {
      width: 100%;
      height: auto;
    }

    .chart-grid {
      stroke: rgba(100, 116, 139, 0.2);
      stroke-dasharray: 3 3;
    }

    .chart-label {
      fill: var(--muted);
      font-size: 11px;
    }

    .chart-line {
      fill: none;
      stroke-width: 2;
    }

    .chart-line.weight, .chart-point.weight {
      stroke: var(--accent);
    }

    .chart-line.bmi, .chart-point.bmi {
      stroke: var(--bmi);
    }

    .chart-point {
      fill: white;
      stroke-width: 2;
    }

    .chart-legend {
      font-size: 12px;
      font-weight: 600;
    }

    .chart-legend.weight {
      fill: var(--accent);
    }

    .chart-legend.bmi {
      fill: var(--bmi);
    }

    .spinner {
      width: 32px;
      height: 32px;
      border: 4px solid #d1fae5;
      border-top-color: var(--accent);
      border-radius: 50%;
      margin: 16px auto;
      animation: spin 800ms linear infinite;
    }

    @keyframes spin {
      to {
        transform: rotate(360deg);
      }
    }

    @media (max-width: 820px) {
      .grid {
        grid-template-columns: 1fr;
      }
    }
  </style>
</head>
<body>
  <header>
    <div class="bar">
      <h1 class="brand">SmartDiet Tracker</h1>
      {{NAV}}
    </div>
  </header>
  <main>
{{BODY}}
  </main>
  <script>
    document.querySelectorAll('form[data-busy]').forEach((form) => {
      form.addEventListener('submit', () => {
        form.querySelectorAll('button').forEach((button) => {
          button.disabled = true;
        });
        form.querySelectorAll('input:not([type="file"])').forEach((input) => {
          input.readOnly = true;
        });
        const label = form.querySelector('[data-busy-label]');
        if (label) {
          label.textContent = form.dataset.busy;
        }
      });
    });

    const dropZone = document.getElementById('drop-zone');
    if (dropZone) {
      const form = document.getElementById('upload-form');
      const input = document.getElementById('meal-image');
      input.addEventListener('change', () => {
        if (input.files.length) {
          form.requestSubmit();
        }
      });
      ['dragenter', 'dragover'].forEach((name) => {
        dropZone.addEventListener(name, (event) => {
          event.preventDefault();
          dropZone.classList.add('hover');
        });
      });
      ['dragleave', 'drop'].forEach((name) => {
        dropZone.addEventListener(name, () => dropZone.classList.remove('hover'));
      });
      dropZone.addEventListener('drop', (event) => {
        event.preventDefault();
        if (event.dataTransfer.files.length) {
          input.files = event.dataTransfer.files;
          form.requestSubmit();
        }
      });
    }
  </script>
</body>
</html>
"#;

const SETUP_HTML: &str = r#"    <section class="card narrow">
      <div class="center">
        <h2>Welcome to SmartDiet</h2>
        <p class="muted">Let's set up your profile to get started.</p>
      </div>
      <form class="fields" method="post" action="/profile" data-busy="Generating your plan...">
        <input type="text" name="name" placeholder="Your Name" value="{{NAME}}" required />
        <input type="number" name="age" placeholder="Age" value="{{AGE}}" required />
        <input type="number" name="height" placeholder="Height (cm)" value="{{HEIGHT}}" required />
        <input type="number" name="weight" placeholder="Weight (kg)" value="{{WEIGHT}}" required />
        {{ERROR}}
        <button class="btn" type="submit"><span data-busy-label>Create Profile &amp; Generate Plan</span></button>
      </form>
    </section>"#;

const DASHBOARD_HTML: &str = r#"    <div class="grid">
      <div class="stack">
        <section class="card">
          <h2>Today's Summary</h2>
          <p class="muted">Hello, {{NAME}}! Here's your progress for today.</p>
          <div class="totals">
            <span class="big">{{CONSUMED}}</span>
            <span class="muted">/ {{GOAL}} kcal</span>
          </div>
          <div class="meter"><span style="width: {{PROGRESS}}%"></span></div>
        </section>
        <section class="card">
          <h2>Track a Meal</h2>
          <p class="muted">Upload a photo of your meal for AI analysis.</p>
{{CAPTURE}}
        </section>
      </div>
      <div class="stack">
        <section class="card">
          <h3>Today's Log</h3>
{{MEALS}}
        </section>
        <section class="card">
          <h3>Diet Plan</h3>
          <p><strong>Breakfast:</strong> {{BREAKFAST}}</p>
          <p><strong>Lunch:</strong> {{LUNCH}}</p>
          <p><strong>Dinner:</strong> {{DINNER}}</p>
          <p><strong>Snacks:</strong> {{SNACKS}}</p>
        </section>
      </div>
    </div>"#;

const UPLOAD_HTML: &str = r#"          <form id="upload-form" method="post" action="/meals/upload" enctype="multipart/form-data" data-busy="Analyzing your meal...">
            <div id="drop-zone" class="drop-zone">
              <p data-busy-label>Drop a meal photo here, or choose one below.</p>
              <input id="meal-image" type="file" name="image" accept="image/*" />
            </div>
          </form>
          {{ERROR}}"#;

const LOADING_HTML: &str = r#"          <meta http-equiv="refresh" content="2" />
          <div class="spinner"></div>
          <p class="muted center">Analyzing your meal...</p>"#;

const REVIEW_HTML: &str = r#"          <h3>AI Meal Analysis</h3>
          <p class="muted small">You can remove items to refine the calorie count.</p>
          <img class="preview" src="{{IMAGE}}" alt="Meal" />
          <div class="center">
            <div class="big">{{TOTAL}}</div>
            <p class="muted">Total Estimated Calories</p>
          </div>
          <ul class="items">{{ITEMS}}</ul>
          <form method="post" action="/meals/confirm" id="confirm-form">
            <div class="inline"><input type="text" name="name" value="{{MEAL_NAME}}" placeholder="Give this meal a name" /></div>
          </form>
          <div class="actions">
            <form method="post" action="/meals/cancel"><button type="submit" class="btn secondary">Cancel</button></form>
            <button type="submit" class="btn" form="confirm-form">Add to Journal</button>
          </div>"#;

const PROGRESS_HTML: &str = r#"    <div class="stack">
      <section class="card">
        <h2>Track Your Weight</h2>
        <p class="muted">Current BMI {{BMI}} ({{CATEGORY}})</p>
        <form class="inline" method="post" action="/weight">
          <input type="number" step="0.1" name="weight" placeholder="Current weight: {{WEIGHT}} kg" required />
          <button class="btn" type="submit">Log New Weight</button>
        </form>
      </section>
      <section class="card">
        {{CHART}}
      </section>
    </div>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ImageUpload;
    use crate::models::{AnalyzedItem, MealAnalysis};

    #[test]
    fn setup_page_escapes_and_shows_error() {
        let form = ProfileForm {
            name: "<b>Al</b>".to_string(),
            ..ProfileForm::default()
        };
        let html = render_setup(&form, Some("All fields are required."));
        assert!(html.contains("&lt;b&gt;Al&lt;/b&gt;"));
        assert!(html.contains(r#"<p class="error">All fields are required.</p>"#));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn review_lists_items_with_suggestions() {
        let mut capture = MealCapture::default();
        capture
            .accept(ImageUpload {
                file_name: None,
                content_type: Some("image/png".to_string()),
                bytes: vec![1, 2, 3],
            })
            .unwrap();
        capture.finish(Ok(MealAnalysis {
            total_calories: 650.0,
            items: vec![
                AnalyzedItem {
                    name: "Fries".to_string(),
                    calories: 365.0,
                    avoidable: true,
                    alternative: None,
                },
                AnalyzedItem {
                    name: "Grilled fish".to_string(),
                    calories: 285.0,
                    avoidable: false,
                    alternative: None,
                },
            ],
        }));

        let html = render_capture(&capture);
        assert!(html.contains("Fries - ~365 kcal"));
        assert!(html.contains("Suggestion: Consider a healthier option."));
        assert!(html.contains(r#"form="confirm-form" formaction="/meals/items/1/remove""#));
        assert!(html.contains(r#"value="My Meal""#));
        assert!(html.contains(">650<"));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(350.0), "350");
        assert_eq!(format_number(22.86), "22.9");
        assert_eq!(format_number(0.0), "0");
    }

    #[test]
    fn busy_forms_keep_their_fields_submittable() {
        let html = render_setup(&ProfileForm::default(), None);
        assert!(html.contains("data-busy="));
        assert!(html.contains("button.disabled = true"));
        assert!(html.contains("input.readOnly = true"));
        assert!(!html.contains("input.disabled"));
        assert!(!html.contains("el.disabled"));
    }

    #[test]
    fn empty_meal_log_message() {
        assert!(render_meal_log(&[]).contains("No meals logged yet today."));
    }
}
