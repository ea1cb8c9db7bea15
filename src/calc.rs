use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cmp::Ordering;
use thiserror::Error;

/// Absorbs float drift at exact `.5` boundaries (e.g. `72.49999999999999`).
const ROUNDING_EPSILON: f64 = 1e-9;
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Whole-point round-half-up: `Int(x + 0.5)`.
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5 + ROUNDING_EPSILON).floor()
}

fn clamp_percent(x: f64) -> f64 {
    x.clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidScore,
    Configuration,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("invalid score {raw_score}/{max_score}: {reason}")]
    InvalidScore {
        raw_score: f64,
        max_score: f64,
        reason: &'static str,
    },

    #[error("{field} must be a finite number (got {value})")]
    NonFinite { field: &'static str, value: f64 },

    #[error("scale '{scale}' has no bands")]
    EmptyScale { scale: String },

    #[error("scale '{scale}' has no band covering {percentage}%")]
    Unclassified { scale: String, percentage: f64 },

    #[error("weights {formative}/{summative} are invalid: {reason}")]
    InvalidWeights {
        formative: f64,
        summative: f64,
        reason: String,
    },

    #[error("scale '{scale}' band '{level}' is invalid: {reason}")]
    InvalidBand {
        scale: String,
        level: String,
        reason: String,
    },

    #[error("scale '{scale}' does not cover 0-100: {reason}")]
    Coverage { scale: String, reason: String },
}

impl CalcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalcError::InvalidScore { .. } | CalcError::NonFinite { .. } => ErrorKind::InvalidScore,
            CalcError::EmptyScale { .. }
            | CalcError::Unclassified { .. }
            | CalcError::InvalidWeights { .. }
            | CalcError::InvalidBand { .. }
            | CalcError::Coverage { .. } => ErrorKind::Configuration,
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidScore => "invalid_score",
            ErrorKind::Configuration => "configuration_error",
        }
    }

    pub fn details(&self) -> serde_json::Value {
        match self {
            CalcError::InvalidScore {
                raw_score,
                max_score,
                ..
            } => json!({ "rawScore": raw_score, "maxScore": max_score }),
            CalcError::NonFinite { field, value } => json!({ "field": field, "value": value.to_string() }),
            CalcError::EmptyScale { scale } => json!({ "scaleId": scale }),
            CalcError::Unclassified { scale, percentage } => {
                json!({ "scaleId": scale, "percentage": percentage })
            }
            CalcError::InvalidWeights {
                formative,
                summative,
                ..
            } => json!({ "formative": formative, "summative": summative }),
            CalcError::InvalidBand { scale, level, .. } => json!({ "scaleId": scale, "level": level }),
            CalcError::Coverage { scale, .. } => json!({ "scaleId": scale }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceBand {
    pub level: String,
    pub min_percentage: f64,
    pub max_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PerformanceBand {
    pub fn new(level: impl Into<String>, min_percentage: f64, max_percentage: f64) -> Self {
        Self {
            level: level.into(),
            min_percentage,
            max_percentage,
            points: None,
            label: None,
            description: None,
        }
    }

    pub fn with_points(mut self, points: f64) -> Self {
        self.points = Some(points);
        self
    }

    pub fn contains(&self, percentage: f64) -> bool {
        self.min_percentage <= percentage && percentage <= self.max_percentage
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceScale {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub bands: Vec<PerformanceBand>,
}

impl PerformanceScale {
    pub fn new(id: impl Into<String>, bands: Vec<PerformanceBand>) -> Self {
        Self {
            id: id.into(),
            name: None,
            bands,
        }
    }

    /// Bands in ascending `min_percentage` order, whatever order they were stored in.
    pub fn bands_ascending(&self) -> Vec<&PerformanceBand> {
        let mut bands: Vec<&PerformanceBand> = self.bands.iter().collect();
        bands.sort_by(|a, b| {
            a.min_percentage
                .partial_cmp(&b.min_percentage)
                .unwrap_or(Ordering::Equal)
        });
        bands
    }

    /// Admin-time check: every band well-formed, no overlaps, and whole-point
    /// coverage of 0..=100 with no gaps.
    pub fn validate(&self) -> Result<(), CalcError> {
        if self.bands.is_empty() {
            return Err(CalcError::EmptyScale {
                scale: self.id.clone(),
            });
        }

        for b in &self.bands {
            let bad = |reason: &str| CalcError::InvalidBand {
                scale: self.id.clone(),
                level: b.level.clone(),
                reason: reason.to_string(),
            };
            if b.level.trim().is_empty() {
                return Err(bad("level code must not be blank"));
            }
            if !b.min_percentage.is_finite() || !b.max_percentage.is_finite() {
                return Err(bad("bounds must be finite"));
            }
            if b.min_percentage < 0.0 || b.max_percentage > 100.0 {
                return Err(bad("bounds must lie within 0-100"));
            }
            if b.min_percentage > b.max_percentage {
                return Err(bad("minPercentage exceeds maxPercentage"));
            }
            if matches!(b.points, Some(p) if !p.is_finite()) {
                return Err(bad("points must be finite"));
            }
        }

        let ordered = self.bands_ascending();
        let first = ordered[0];
        if first.min_percentage > 0.0 {
            return Err(CalcError::Coverage {
                scale: self.id.clone(),
                reason: format!("nothing covers 0 to {}", first.min_percentage),
            });
        }
        for pair in ordered.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if hi.min_percentage <= lo.max_percentage {
                return Err(CalcError::Coverage {
                    scale: self.id.clone(),
                    reason: format!(
                        "bands '{}' and '{}' overlap at {}",
                        lo.level, hi.level, hi.min_percentage
                    ),
                });
            }
            // Whole-point bands: 0-49 followed by 50-74 is contiguous.
            if hi.min_percentage > lo.max_percentage.floor() + 1.0 {
                return Err(CalcError::Coverage {
                    scale: self.id.clone(),
                    reason: format!(
                        "gap between '{}' (max {}) and '{}' (min {})",
                        lo.level, lo.max_percentage, hi.level, hi.min_percentage
                    ),
                });
            }
        }
        let last = ordered[ordered.len() - 1];
        if last.max_percentage < 100.0 {
            return Err(CalcError::Coverage {
                scale: self.id.clone(),
                reason: format!("nothing covers {} to 100", last.max_percentage),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub raw_score: f64,
    pub max_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl ScoreEntry {
    pub fn new(raw_score: f64, max_score: f64) -> Self {
        Self {
            raw_score,
            max_score,
            remarks: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentageOf {
    pub percent: f64,
    /// Raw score exceeded the maximum and was capped at 100.
    pub clamped: bool,
}

pub fn percentage_of(score: &ScoreEntry) -> Result<PercentageOf, CalcError> {
    let invalid = |reason| CalcError::InvalidScore {
        raw_score: score.raw_score,
        max_score: score.max_score,
        reason,
    };
    if !score.raw_score.is_finite() || !score.max_score.is_finite() {
        return Err(invalid("scores must be finite numbers"));
    }
    if score.max_score <= 0.0 {
        return Err(invalid("maxScore must be greater than zero"));
    }
    if score.raw_score < 0.0 {
        return Err(invalid("rawScore must not be negative"));
    }

    if score.raw_score > score.max_score {
        log::warn!(
            "raw score {} exceeds max score {}; clamping to 100%",
            score.raw_score,
            score.max_score
        );
        return Ok(PercentageOf {
            percent: 100.0,
            clamped: true,
        });
    }

    // Multiply first: 17 * 100 / 20 is exact where 17 / 20 * 100 is not.
    let raw_percent = score.raw_score * 100.0 / score.max_score;
    Ok(PercentageOf {
        percent: round_half_up(raw_percent).min(100.0),
        clamped: false,
    })
}

pub fn classify(percentage: f64, scale: &PerformanceScale) -> Result<&PerformanceBand, CalcError> {
    if !percentage.is_finite() {
        return Err(CalcError::NonFinite {
            field: "percentage",
            value: percentage,
        });
    }
    if scale.bands.is_empty() {
        return Err(CalcError::EmptyScale {
            scale: scale.id.clone(),
        });
    }

    let p = clamp_percent(percentage);
    let ordered = scale.bands_ascending();
    if let Some(band) = ordered.iter().copied().find(|b| b.contains(p)) {
        return Ok(band);
    }
    // A fractional value between whole-point bands (49.99 between 0-49 and 50-74)
    // belongs to the band of its whole point.
    let whole = p.floor();
    if whole != p {
        if let Some(band) = ordered.iter().copied().find(|b| b.contains(whole)) {
            return Ok(band);
        }
    }

    Err(CalcError::Unclassified {
        scale: scale.id.clone(),
        percentage: p,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weights {
    pub formative: f64,
    pub summative: f64,
}

impl Weights {
    pub fn new(formative: f64, summative: f64) -> Result<Self, CalcError> {
        let w = Self {
            formative,
            summative,
        };
        w.validate()?;
        Ok(w)
    }

    pub fn validate(&self) -> Result<(), CalcError> {
        let invalid = |reason: String| CalcError::InvalidWeights {
            formative: self.formative,
            summative: self.summative,
            reason,
        };
        for (name, w) in [("formative", self.formative), ("summative", self.summative)] {
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(invalid(format!("{} weight must be between 0.0 and 1.0", name)));
            }
        }
        let sum = self.formative + self.summative;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(invalid(format!("weights must sum to 1.0, but sum to {}", sum)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeResult {
    pub formative_average: f64,
    pub summative_score: f64,
    pub weighted_score: f64,
    pub level: String,
    pub band: PerformanceBand,
}

pub fn composite(
    formative_average: f64,
    summative_score: f64,
    weights: &Weights,
    scale: &PerformanceScale,
) -> Result<CompositeResult, CalcError> {
    weights.validate()?;
    if !formative_average.is_finite() {
        return Err(CalcError::NonFinite {
            field: "formativeAverage",
            value: formative_average,
        });
    }
    if !summative_score.is_finite() {
        return Err(CalcError::NonFinite {
            field: "summativeScore",
            value: summative_score,
        });
    }

    let formative_average = clamp_percent(formative_average);
    let summative_score = clamp_percent(summative_score);
    let weighted_score = round_half_up(
        formative_average * weights.formative + summative_score * weights.summative,
    )
    .min(100.0);
    let band = classify(weighted_score, scale)?;

    Ok(CompositeResult {
        formative_average,
        summative_score,
        weighted_score,
        level: band.level.clone(),
        band: band.clone(),
    })
}

/// Mean of each entry's whole-point percentage, rounded half-up.
/// `None` means nothing was assessed, which is not the same as zero.
pub fn formative_average(entries: &[ScoreEntry]) -> Result<Option<f64>, CalcError> {
    if entries.is_empty() {
        return Ok(None);
    }
    let mut sum = 0.0_f64;
    for e in entries {
        sum += percentage_of(e)?.percent;
    }
    Ok(Some(round_half_up(sum / entries.len() as f64)))
}

/// Average ordinal points across classified bands. `None` if any band has no points.
pub fn mean_points<'a, I>(bands: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a PerformanceBand>,
{
    let mut sum = 0.0_f64;
    let mut count: usize = 0;
    for b in bands {
        sum += b.points?;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(sum / count as f64)
}
