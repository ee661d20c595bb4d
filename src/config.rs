//! Service configuration read from the environment.
//!
//! Unset or unparseable values fall back to their defaults.

use std::env;
use std::str::FromStr;

use chrono_tz::Tz;
use parking::ParkingConfig;

const DEFAULT_TOPICS: &str = "routes/,vehicles/";
const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Bogota;

#[derive(Debug, Clone)]
pub struct Config {
    /// Topic prefixes telemetry is accepted on.
    pub topics: Vec<String>,
    /// Reporting timezone for day boundaries in statistics.
    pub timezone: Tz,
    /// Thresholds served by the static config provider.
    pub parking: ParkingConfig,
    pub detector: parking::Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            topics: split_topics(DEFAULT_TOPICS),
            timezone: DEFAULT_TIMEZONE,
            parking: ParkingConfig {
                company_id: 1,
                min_time_minutes: 10,
                max_distance_meters: 10.0,
                max_speed_kmh: 2.0,
                is_active: true,
            },
            detector: parking::Config::default(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let parking = &defaults.parking;

        Self {
            topics: env::var("PARKING_TOPICS")
                .ok()
                .map(|topics| split_topics(&topics))
                .filter(|topics| !topics.is_empty())
                .unwrap_or(defaults.topics),
            timezone: get_timezone(),
            parking: ParkingConfig {
                company_id: env_parse("PARKING_COMPANY_ID", parking.company_id),
                min_time_minutes: env_parse("PARKING_MIN_TIME_MINUTES", parking.min_time_minutes),
                max_distance_meters: env_parse(
                    "PARKING_MAX_DISTANCE_METERS",
                    parking.max_distance_meters,
                ),
                max_speed_kmh: env_parse("PARKING_MAX_SPEED_KMH", parking.max_speed_kmh),
                is_active: env_parse("PARKING_ENABLED", parking.is_active),
            },
            detector: parking::Config::from_env(),
        }
    }
}

fn get_timezone() -> Tz {
    let Ok(name) = env::var("TIMEZONE") else {
        tracing::trace!("TIMEZONE not set, using default: {DEFAULT_TIMEZONE}");
        return DEFAULT_TIMEZONE;
    };
    name.trim().parse::<Tz>().unwrap_or_else(|err| {
        tracing::warn!(timezone = %name, error = %err, "invalid TIMEZONE, using default");
        DEFAULT_TIMEZONE
    })
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %value, "invalid value, using default");
            default
        }),
        Err(_) => {
            tracing::trace!("{key} not set, using default");
            default
        }
    }
}

fn split_topics(topics: &str) -> Vec<String> {
    topics
        .split(',')
        .map(str::trim)
        .filter(|topic| !topic.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.topics, vec!["routes/".to_string(), "vehicles/".to_string()]);
        assert_eq!(config.timezone, chrono_tz::America::Bogota);
        assert_eq!(config.parking.min_time_minutes, 10);
        assert_eq!(config.detector, parking::Config::default());
    }

    #[test]
    fn topic_list() {
        assert_eq!(split_topics(" gps/ ,, fleet/"), vec!["gps/".to_string(), "fleet/".to_string()]);
        assert!(split_topics(" , ").is_empty());
    }

    #[test]
    fn unset_uses_default() {
        assert!((env_parse("PARKING_TEST_UNSET_VARIABLE", 2.5_f64) - 2.5).abs() < f64::EPSILON);
    }
}
