use anyhow::{bail, Context, Result};
use merge_core::SimConfig;
use std::collections::HashMap;

const VALID_KEYS: &[&str] = &[
    "target_tier",
    "start_stage",
    "max_stages",
    "fallback_secondary_probability",
];

/// Applies scenario overrides on top of a loaded config, then re-validates.
/// The secondary probability table is left as loaded.
pub fn apply_overrides(
    config: &mut SimConfig,
    overrides: &HashMap<String, serde_json::Value>,
) -> Result<()> {
    for (key, value) in overrides {
        match key.as_str() {
            "target_tier" => config.target_tier = as_u32(key, value)?,
            "start_stage" => config.start_stage = as_u64(key, value)?,
            "max_stages" => config.max_stages = as_u64(key, value)?,
            "fallback_secondary_probability" => {
                config.fallback_secondary_probability = as_f64(key, value)?;
            }
            _ => bail!(
                "unknown override key '{key}'. Valid keys: {}",
                VALID_KEYS.join(", ")
            ),
        }
    }
    config.validate().context("config invalid after overrides")?;
    Ok(())
}

fn as_f64(key: &str, value: &serde_json::Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| anyhow::anyhow!("override '{key}': expected a number, got {value}"))
}

fn as_u64(key: &str, value: &serde_json::Value) -> Result<u64> {
    value.as_u64().ok_or_else(|| {
        anyhow::anyhow!("override '{key}': expected a positive integer, got {value}")
    })
}

fn as_u32(key: &str, value: &serde_json::Value) -> Result<u32> {
    let val = as_u64(key, value)?;
    u32::try_from(val)
        .map_err(|_| anyhow::anyhow!("override '{key}': value {val} exceeds u32 range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use merge_core::ConfigError;

    fn overrides(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn integer_overrides_apply() {
        let mut config = SimConfig::new(10);
        apply_overrides(
            &mut config,
            &overrides(&[
                ("target_tier", serde_json::json!(12)),
                ("start_stage", serde_json::json!(19)),
                ("max_stages", serde_json::json!(500)),
            ]),
        )
        .unwrap();
        assert_eq!(config.target_tier, 12);
        assert_eq!(config.start_stage, 19);
        assert_eq!(config.max_stages, 500);
        // The loaded table stays untouched.
        assert_eq!(config.secondary_probabilities.len(), 5);
    }

    #[test]
    fn probability_override_applies() {
        let mut config = SimConfig::new(10);
        apply_overrides(
            &mut config,
            &overrides(&[("fallback_secondary_probability", serde_json::json!(0.15))]),
        )
        .unwrap();
        assert!((config.fallback_secondary_probability - 0.15).abs() < 1e-12);
    }

    #[test]
    fn unknown_key_errors() {
        let mut config = SimConfig::new(10);
        let err = apply_overrides(
            &mut config,
            &overrides(&[("energy_per_stage", serde_json::json!(2))]),
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("unknown override key"));
        assert!(err.contains("energy_per_stage"));
    }

    #[test]
    fn type_mismatch_errors() {
        let mut config = SimConfig::new(10);
        let result = apply_overrides(
            &mut config,
            &overrides(&[("start_stage", serde_json::json!("nineteen"))]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn invalid_result_is_rejected() {
        let mut config = SimConfig::new(10);
        let err = apply_overrides(
            &mut config,
            &overrides(&[("target_tier", serde_json::json!(2))]),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::TargetTierTooLow { .. })
        ));
    }
}
