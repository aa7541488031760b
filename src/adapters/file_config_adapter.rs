//! INI file configuration adapter.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
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
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
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

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[database]
backend = postgres
conninfo = host=localhost dbname=stockcast

[forecast]
min_window = 1000
symbols = AAPL, MSFT
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("database", "conninfo"),
            Some("host=localhost dbname=stockcast".to_string())
        );
        assert_eq!(
            adapter.get_string("forecast", "symbols"),
            Some("AAPL, MSFT".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[forecast]\nmin_window = 100\n").unwrap();
        assert_eq!(adapter.get_string("forecast", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value() {
        let adapter = FileConfigAdapter::from_string("[strategies]\nsma_window = 20\n").unwrap();
        assert_eq!(adapter.get_int("strategies", "sma_window", 0), 20);
    }

    #[test]
    fn get_int_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[strategies]\n").unwrap();
        assert_eq!(adapter.get_int("strategies", "missing", 42), 42);
    }

    #[test]
    fn get_int_returns_default_for_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[forecast]\nmin_window = abc\n").unwrap();
        assert_eq!(adapter.get_int("forecast", "min_window", 42), 42);
    }

    #[test]
    fn get_bool_returns_true_values() {
        let adapter =
            FileConfigAdapter::from_string("[forecast]\na = true\nb = yes\nc = 1\nd = on\n")
                .unwrap();
        assert!(adapter.get_bool("forecast", "a", false));
        assert!(adapter.get_bool("forecast", "b", false));
        assert!(adapter.get_bool("forecast", "c", false));
        assert!(adapter.get_bool("forecast", "d", false));
    }

    #[test]
    fn get_bool_returns_false_values() {
        let adapter =
            FileConfigAdapter::from_string("[forecast]\na = false\nb = no\nc = 0\n").unwrap();
        assert!(!adapter.get_bool("forecast", "a", true));
        assert!(!adapter.get_bool("forecast", "b", true));
        assert!(!adapter.get_bool("forecast", "c", true));
    }

    #[test]
    fn get_bool_returns_default_for_missing_or_garbage() {
        let adapter = FileConfigAdapter::from_string("[forecast]\nparallel = maybe\n").unwrap();
        assert!(adapter.get_bool("forecast", "missing", true));
        assert!(!adapter.get_bool("forecast", "missing", false));
        assert!(adapter.get_bool("forecast", "parallel", true));
    }

    #[test]
    fn from_file_reads_config() {
        let content = "[sqlite]\npath = /var/lib/stockcast.db\n";
        let file = create_temp_config(content);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("sqlite", "path"),
            Some("/var/lib/stockcast.db".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(result.is_err());
    }

    #[test]
    fn handles_all_config_sections() {
        let content = r#"
[database]
backend = sqlite

[sqlite]
path = /tmp/stockcast.db
pool_size = 8

[market_data]
csv_dir = /data/bars
page_size = 250

[forecast]
min_window = 500
parallel = false

[strategies]
enabled = sma, ema
ema_period = 12
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();

        assert_eq!(
            adapter.get_string("database", "backend"),
            Some("sqlite".to_string())
        );
        assert_eq!(adapter.get_int("sqlite", "pool_size", 4), 8);
        assert_eq!(
            adapter.get_string("market_data", "csv_dir"),
            Some("/data/bars".to_string())
        );
        assert_eq!(adapter.get_int("market_data", "page_size", 1000), 250);
        assert_eq!(adapter.get_int("forecast", "min_window", 1000), 500);
        assert!(!adapter.get_bool("forecast", "parallel", true));
        assert_eq!(
            adapter.get_string("strategies", "enabled"),
            Some("sma, ema".to_string())
        );
        assert_eq!(adapter.get_int("strategies", "ema_period", 10), 12);
    }
}
