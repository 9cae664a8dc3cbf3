use std::collections::HashMap;
use std::sync::LazyLock;

use gpframe_error::{DbError, Result};

use crate::naming::DEFAULT_PREFIX;

/// Configuration for a database session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Log every statement sent to the database at INFO instead of DEBUG.
    pub print_sql: bool,
    /// Prefix for generated relation names.
    pub cte_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            print_sql: false,
            cte_prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn set_from_str(&mut self, name: &str, value: &str) -> Result<()> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| DbError::new(format!("Missing setting for '{name}'")))?;

        (func.set)(value, self)
    }

    pub fn get_as_string(&self, name: &str) -> Result<String> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| DbError::new(format!("Missing setting for '{name}'")))?;

        Ok((func.get)(self))
    }

    pub fn reset(&mut self, name: &str) -> Result<()> {
        let def_conf = Self::default();
        let value = def_conf.get_as_string(name)?;
        self.set_from_str(name, &value)
    }
}

struct SettingFunctions {
    set: fn(value: &str, conf: &mut SessionConfig) -> Result<()>,
    get: fn(conf: &SessionConfig) -> String,
}

impl SettingFunctions {
    const fn new<S: SessionSetting>() -> Self {
        SettingFunctions {
            set: S::set_from_str as _,
            get: S::get_as_string as _,
        }
    }
}

fn insert_setting<S: SessionSetting>(map: &mut HashMap<&'static str, SettingFunctions>) {
    if map.insert(S::NAME, SettingFunctions::new::<S>()).is_some() {
        panic!("Duplicate settings names: {}", S::NAME);
    }
}

static GET_SET_FUNCTIONS: LazyLock<HashMap<&'static str, SettingFunctions>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    insert_setting::<PrintSql>(&mut map);
    insert_setting::<CtePrefix>(&mut map);

    map
});

pub trait SessionSetting: Sync + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn set_from_str(value: &str, conf: &mut SessionConfig) -> Result<()>;
    fn get_as_string(conf: &SessionConfig) -> String;
}

pub struct PrintSql;

impl SessionSetting for PrintSql {
    const NAME: &'static str = "print_sql";
    const DESCRIPTION: &'static str = "Log each statement sent to the database.";

    fn set_from_str(value: &str, conf: &mut SessionConfig) -> Result<()> {
        conf.print_sql = match value.to_ascii_lowercase().as_str() {
            "true" | "on" | "1" => true,
            "false" | "off" | "0" => false,
            other => {
                return Err(DbError::new(format!(
                    "Invalid boolean value for '{}': {other}",
                    Self::NAME
                )));
            }
        };
        Ok(())
    }

    fn get_as_string(conf: &SessionConfig) -> String {
        conf.print_sql.to_string()
    }
}

pub struct CtePrefix;

impl SessionSetting for CtePrefix {
    const NAME: &'static str = "cte_prefix";
    const DESCRIPTION: &'static str = "Prefix for generated relation names.";

    fn set_from_str(value: &str, conf: &mut SessionConfig) -> Result<()> {
        let valid = value
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
            && value
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid {
            return Err(DbError::new(format!(
                "Invalid prefix for '{}', expected a lowercase identifier: {value}",
                Self::NAME
            )));
        }
        conf.cte_prefix = value.to_string();
        Ok(())
    }

    fn get_as_string(conf: &SessionConfig) -> String {
        conf.cte_prefix.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_setting_exists() {
        let mut conf = SessionConfig::default();
        conf.set_from_str("print_sql", "on").unwrap();
        assert!(conf.print_sql);
        assert_eq!("true", conf.get_as_string("print_sql").unwrap());
    }

    #[test]
    fn set_setting_not_exists() {
        let mut conf = SessionConfig::default();
        conf.set_from_str("hello_world", "58").unwrap_err();
    }

    #[test]
    fn invalid_values() {
        let mut conf = SessionConfig::default();
        conf.set_from_str("print_sql", "maybe").unwrap_err();
        conf.set_from_str("cte_prefix", "Not Valid").unwrap_err();
        conf.set_from_str("cte_prefix", "").unwrap_err();
    }

    #[test]
    fn reset_prefix() {
        let mut conf = SessionConfig::default();
        conf.set_from_str("cte_prefix", "tmp").unwrap();
        assert_eq!("tmp", conf.cte_prefix);

        conf.reset("cte_prefix").unwrap();
        assert_eq!("cte", conf.cte_prefix);
    }
}
