//! Serde helpers for configuration values.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Deserializes a `Duration` from a number of milliseconds.
pub fn deserialize_duration_from_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(ms))
}

/// Deserializes a `Duration` from a number of seconds.
pub fn deserialize_duration_from_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(deserialize_with = "deserialize_duration_from_ms")]
        ms: Duration,
        #[serde(deserialize_with = "deserialize_duration_from_secs")]
        secs: Duration,
    }

    #[test]
    fn durations_deserialize_from_numbers() {
        let w: Wrapper = serde_json::from_str(r#"{"ms": 1500, "secs": 30}"#).unwrap();
        assert_eq!(w.ms, Duration::from_millis(1500));
        assert_eq!(w.secs, Duration::from_secs(30));
    }
}
