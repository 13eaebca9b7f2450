//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive (configparser lowercases
//! them); values are returned trimmed. Only `#` starts a comment, since `;`
//! separates entry conditions.

use std::path::Path;

use configparser::ini::Ini;

use crate::domain::error::SignalError;
use crate::ports::config_port::ConfigPort;

pub struct FileConfigAdapter {
    config: Ini,
}

fn new_ini() -> Ini {
    let mut config = Ini::new();
    config.set_comment_symbols(&['#']);
    config
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SignalError> {
        let path = path.as_ref();
        let mut config = new_ini();
        config.load(path).map_err(|reason| SignalError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, SignalError> {
        let mut config = new_ini();
        config
            .read(content.to_string())
            .map_err(|reason| SignalError::ConfigParse {
                file: "<inline>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn sections(&self) -> Vec<String> {
        let mut sections = self.config.sections();
        sections.sort();
        sections
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.get_string(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.get_string(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.get_string(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const SAMPLE: &str = r#"
[feed]
data_dir = ./data
candle_count = 150

[orchestrator]
instruments = BTCUSD, ETHUSD
cooldown_ms = 7000
paused = yes

[scorer]
min_separation = 12.5
"#;

    #[test]
    fn from_string_parses_config() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("orchestrator", "instruments"),
            Some("BTCUSD, ETHUSD".to_string())
        );
        assert_eq!(adapter.get_int("feed", "candle_count", 0), 150);
        assert_eq!(adapter.get_double("scorer", "min_separation", 0.0), 12.5);
        assert!(adapter.get_bool("orchestrator", "paused", false));
        assert_eq!(adapter.sections(), vec!["feed", "orchestrator", "scorer"]);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("feed", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
        assert_eq!(adapter.get_int("orchestrator", "order_timeout_ms", 10_000), 10_000);
        assert_eq!(adapter.get_double("scorer", "min_score", 20.0), 20.0);
        assert!(!adapter.get_bool("orchestrator", "missing", false));
        assert!(!adapter.has_key("scorer", "min_score"));
        assert!(adapter.has_key("scorer", "min_separation"));
    }

    #[test]
    fn unparsable_values_fall_back_to_defaults() {
        let adapter =
            FileConfigAdapter::from_string("[feed]\ncandle_count = lots\nflag = maybe\n").unwrap();
        assert_eq!(adapter.get_int("feed", "candle_count", 100), 100);
        assert!(adapter.get_bool("feed", "flag", true));
    }

    #[test]
    fn semicolons_survive_in_values() {
        let adapter = FileConfigAdapter::from_string(
            "[strategy]\nentry_conditions = RSI BELOW 30; MACD BULLISH_CROSSOVER\n",
        )
        .unwrap();
        assert_eq!(
            adapter.get_string("strategy", "entry_conditions"),
            Some("RSI BELOW 30; MACD BULLISH_CROSSOVER".to_string())
        );
    }

    #[test]
    fn empty_value_reads_as_missing() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nname =\n").unwrap();
        assert_eq!(adapter.get_string("strategy", "name"), None);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config(SAMPLE);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("feed", "data_dir"), Some("./data".to_string()));
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/signalguard.ini").err().unwrap();
        assert!(matches!(err, SignalError::ConfigParse { .. }));
    }
}
