use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::calc::{PerformanceScale, Weights};

/// Preset loaded at sidecar startup. Nothing here has a built-in default:
/// without a file the sidecar starts with no scales and no session weights.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: Option<Weights>,
    pub scales: Vec<PerformanceScale>,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(w) = &self.weights {
            w.validate().context("invalid [weights]")?;
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for scale in &self.scales {
            if scale.id.trim().is_empty() {
                bail!("every [[scales]] entry needs an id");
            }
            if !seen.insert(scale.id.as_str()) {
                bail!("duplicate scale id '{}'", scale.id);
            }
            scale
                .validate()
                .with_context(|| format!("invalid scale '{}'", scale.id))?;
        }
        Ok(())
    }
}

pub fn parse_config(content: &str) -> Result<EngineConfig> {
    let config = toml::from_str::<EngineConfig>(content).context("failed parsing config")?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    if !path.exists() {
        bail!("config file not found at {}", path.display());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed reading config file {}", path.display()))?;
    let config =
        parse_config(&content).with_context(|| format!("in config file {}", path.display()))?;
    log::debug!(
        "loaded {} scale(s) from {}",
        config.scales.len(),
        path.display()
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE_LEVEL: &str = r#"
[weights]
formative = 0.6
summative = 0.4

[[scales]]
id = "cbc-5"
name = "CBC five-level"
bands = [
  { level = "NY", minPercentage = 0, maxPercentage = 24, points = 0 },
  { level = "BE", minPercentage = 25, maxPercentage = 49, points = 1 },
  { level = "AE", minPercentage = 50, maxPercentage = 74, points = 2 },
  { level = "ME", minPercentage = 75, maxPercentage = 89, points = 3 },
  { level = "EE", minPercentage = 90, maxPercentage = 100, points = 4 },
]
"#;

    #[test]
    fn parses_weights_and_scales() {
        let cfg = parse_config(FIVE_LEVEL).expect("parse");
        let w = cfg.weights.expect("weights");
        assert_eq!(w.formative, 0.6);
        assert_eq!(cfg.scales.len(), 1);
        assert_eq!(cfg.scales[0].bands[4].level, "EE");
        assert_eq!(cfg.scales[0].bands[4].points, Some(4.0));
    }

    #[test]
    fn empty_file_means_no_defaults() {
        let cfg = parse_config("").expect("parse");
        assert!(cfg.weights.is_none());
        assert!(cfg.scales.is_empty());
    }

    #[test]
    fn rejects_bad_weights() {
        let e = parse_config("[weights]\nformative = 0.5\nsummative = 0.3\n").unwrap_err();
        assert!(format!("{e:#}").contains("sum to 1.0"));
    }

    #[test]
    fn rejects_duplicate_and_gapped_scales() {
        let dup = format!("{}\n{}", FIVE_LEVEL, &FIVE_LEVEL[FIVE_LEVEL.find("[[scales]]").unwrap()..]);
        let e = parse_config(&dup).unwrap_err();
        assert!(format!("{e:#}").contains("duplicate scale id"));

        let gapped = r#"
[[scales]]
id = "gap"
bands = [
  { level = "BE", minPercentage = 0, maxPercentage = 29 },
  { level = "AE", minPercentage = 40, maxPercentage = 100 },
]
"#;
        let e = parse_config(gapped).unwrap_err();
        assert!(format!("{e:#}").contains("gap"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let p = std::env::temp_dir().join("cbcgrade-config-does-not-exist.toml");
        assert!(load_config(Some(&p)).is_err());
        assert!(load_config(None).expect("no path").scales.is_empty());
    }
}
