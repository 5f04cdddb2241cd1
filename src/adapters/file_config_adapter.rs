//! INI file configuration adapter.

use crate::domain::error::QuantsimError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::collections::BTreeMap;
use std::path::Path;

/// INI-backed [`ConfigPort`]. Section and key names are case-insensitive.
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, QuantsimError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| QuantsimError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, QuantsimError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| QuantsimError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_section(&self, section: &str) -> BTreeMap<String, String> {
        self.config
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone())))
                    .collect()
            })
            .unwrap_or_default()
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
[backtest]
starting_cash = 1000
instruments = SPY, QQQ

[strategy]
kind = arbitrage
spread_period = 20
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "instruments"),
            Some("SPY, QQQ".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "kind"),
            Some("arbitrage".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nstarting_cash = 100\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_section_lists_all_keys() {
        let adapter = FileConfigAdapter::from_string(
            "[Strategy]\nKind = momentum\nshort_period = 5\nlong_period = 20\n",
        )
        .unwrap();
        let section = adapter.get_section("strategy");
        assert_eq!(section.len(), 3);
        assert_eq!(section.get("kind").map(String::as_str), Some("momentum"));
        assert_eq!(section.get("long_period").map(String::as_str), Some("20"));
        assert!(adapter.get_section("missing").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[backtest]\ndata_dir = /data/bars\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "data_dir"),
            Some("/data/bars".to_string())
        );
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        match result {
            Err(QuantsimError::ConfigParse { file, .. }) => {
                assert_eq!(file, "/nonexistent/path/config.ini")
            }
            Err(other) => panic!("expected ConfigParse, got {other:?}"),
            Ok(_) => panic!("expected an error"),
        }
    }
}
