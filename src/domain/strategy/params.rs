//! Typed reads over the raw `[strategy]` key/value section.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::domain::error::QuantsimError;

pub struct Params<'a> {
    raw: &'a BTreeMap<String, String>,
}

impl<'a> Params<'a> {
    pub fn new(raw: &'a BTreeMap<String, String>) -> Self {
        Params { raw }
    }

    fn key(name: &str) -> String {
        format!("strategy.{}", name)
    }

    pub fn get_str(&self, name: &str) -> Option<&'a str> {
        self.raw
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&self, name: &str, expected: &str) -> Result<Option<T>, QuantsimError> {
        match self.get_str(name) {
            None => Ok(None),
            Some(v) => v.parse::<T>().map(Some).map_err(|_| {
                QuantsimError::configuration(
                    Self::key(name),
                    format!("expected {}, got '{}'", expected, v),
                )
            }),
        }
    }

    /// Fail on the first key outside `known`, so typos are not silently
    /// replaced by defaults.
    pub fn check_known(&self, known: &[&[&str]]) -> Result<(), QuantsimError> {
        match self
            .raw
            .keys()
            .find(|k| !known.iter().any(|keys| keys.contains(&k.as_str())))
        {
            Some(k) => Err(QuantsimError::configuration(Self::key(k), "unknown parameter")),
            None => Ok(()),
        }
    }

    pub fn opt_period(&self, name: &str) -> Result<Option<usize>, QuantsimError> {
        match self.parse::<usize>(name, "a positive integer")? {
            Some(0) => Err(QuantsimError::configuration(
                Self::key(name),
                "must be at least 1",
            )),
            other => Ok(other),
        }
    }

    pub fn period(&self, name: &str, default: usize) -> Result<usize, QuantsimError> {
        Ok(self.opt_period(name)?.unwrap_or(default))
    }

    pub fn require_period(&self, name: &str) -> Result<usize, QuantsimError> {
        self.opt_period(name)?
            .ok_or_else(|| QuantsimError::configuration(Self::key(name), "required parameter is missing"))
    }

    pub fn quantity(&self, name: &str, default: i64) -> Result<i64, QuantsimError> {
        match self.parse::<i64>(name, "an integer")? {
            Some(q) if q <= 0 => Err(QuantsimError::configuration(
                Self::key(name),
                format!("must be positive, got {}", q),
            )),
            Some(q) => Ok(q),
            None => Ok(default),
        }
    }

    pub fn opt_f64(&self, name: &str) -> Result<Option<f64>, QuantsimError> {
        match self.parse::<f64>(name, "a number")? {
            Some(v) if !v.is_finite() => Err(QuantsimError::configuration(
                Self::key(name),
                "must be finite",
            )),
            other => Ok(other),
        }
    }

    pub fn f64(&self, name: &str, default: f64) -> Result<f64, QuantsimError> {
        Ok(self.opt_f64(name)?.unwrap_or(default))
    }

    pub fn bool(&self, name: &str, default: bool) -> Result<bool, QuantsimError> {
        match self.get_str(name).map(str::to_lowercase).as_deref() {
            None => Ok(default),
            Some("true" | "yes" | "1") => Ok(true),
            Some("false" | "no" | "0") => Ok(false),
            Some(other) => Err(QuantsimError::configuration(
                Self::key(name),
                format!("expected true or false, got '{}'", other),
            )),
        }
    }

    pub fn invalid(name: &str, reason: impl Into<String>) -> QuantsimError {
        QuantsimError::configuration(Self::key(name), reason)
    }
}
