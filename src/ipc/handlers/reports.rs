use crate::calc::{self, CalcError, CompositeResult, PerformanceScale, ScoreEntry, Weights};
use crate::ipc::error::ok;
use crate::ipc::params::{required, resolve_scale, resolve_weights};
use crate::ipc::types::{AppState, Request};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LearnerMarks {
    learner_id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    formative_average: Option<f64>,
    #[serde(default)]
    formative_entries: Option<Vec<ScoreEntry>>,
    #[serde(default)]
    summative_score: Option<f64>,
    #[serde(default)]
    summative_entry: Option<ScoreEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RowError {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl From<CalcError> for RowError {
    fn from(e: CalcError) -> Self {
        Self {
            code: e.code().to_string(),
            message: e.to_string(),
            details: Some(e.details()),
        }
    }
}

impl RowError {
    fn missing(what: &str) -> Self {
        Self {
            code: "missing_marks".to_string(),
            message: format!("no {} marks recorded", what),
            details: None,
        }
    }
}

/// Ungraded rows carry the reason; they are never given a default level.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
enum ReportOutcome {
    Graded { result: CompositeResult },
    Ungraded { error: RowError },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportRow {
    learner_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(flatten)]
    outcome: ReportOutcome,
}

fn formative_percent(learner: &LearnerMarks) -> Result<f64, RowError> {
    if let Some(avg) = learner.formative_average {
        return Ok(avg);
    }
    let Some(entries) = &learner.formative_entries else {
        return Err(RowError::missing("formative"));
    };
    calc::formative_average(entries)?.ok_or_else(|| RowError::missing("formative"))
}

fn summative_percent(learner: &LearnerMarks) -> Result<f64, RowError> {
    if let Some(score) = learner.summative_score {
        return Ok(score);
    }
    let Some(entry) = &learner.summative_entry else {
        return Err(RowError::missing("summative"));
    };
    Ok(calc::percentage_of(entry)?.percent)
}

fn grade_learner(
    learner: &LearnerMarks,
    weights: &Weights,
    scale: &PerformanceScale,
) -> Result<CompositeResult, RowError> {
    let formative = formative_percent(learner)?;
    let summative = summative_percent(learner)?;
    Ok(calc::composite(formative, summative, weights, scale)?)
}

fn handle_reports_class_composite(state: &mut AppState, req: &Request) -> serde_json::Value {
    let learners: Vec<LearnerMarks> = match required(req, "learners") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let weights = match resolve_weights(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let scale = match resolve_scale(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut rows: Vec<ReportRow> = Vec::with_capacity(learners.len());
    for learner in &learners {
        let outcome = match grade_learner(learner, &weights, &scale) {
            Ok(result) => ReportOutcome::Graded { result },
            Err(error) => ReportOutcome::Ungraded { error },
        };
        rows.push(ReportRow {
            learner_id: learner.learner_id.clone(),
            display_name: learner.display_name.clone(),
            outcome,
        });
    }

    let graded: Vec<&CompositeResult> = rows
        .iter()
        .filter_map(|r| match &r.outcome {
            ReportOutcome::Graded { result } => Some(result),
            ReportOutcome::Ungraded { .. } => None,
        })
        .collect();
    let failed_learner_ids: Vec<&str> = rows
        .iter()
        .filter(|r| matches!(r.outcome, ReportOutcome::Ungraded { .. }))
        .map(|r| r.learner_id.as_str())
        .collect();

    let level_counts: Vec<serde_json::Value> = scale
        .bands_ascending()
        .iter()
        .map(|b| {
            let count = graded.iter().filter(|g| g.level == b.level).count();
            json!({ "level": b.level, "count": count })
        })
        .collect();
    let mean_points = calc::mean_points(graded.iter().map(|g| &g.band));

    if !failed_learner_ids.is_empty() {
        log::warn!(
            "class composite on scale '{}': {} of {} learner(s) ungraded",
            scale.id,
            failed_learner_ids.len(),
            rows.len()
        );
    }

    ok(
        &req.id,
        json!({
            "reportId": Uuid::new_v4().to_string(),
            "generatedAt": chrono::Utc::now().to_rfc3339(),
            "scaleId": scale.id,
            "weights": weights,
            "rows": rows,
            "levelCounts": level_counts,
            "gradedCount": graded.len(),
            "ungradedCount": failed_learner_ids.len(),
            "failedLearnerIds": failed_learner_ids,
            "meanPoints": mean_points,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.classComposite" => Some(handle_reports_class_composite(state, req)),
        _ => None,
    }
}
