//! Configuration access port.

use std::collections::BTreeMap;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Every key of a section with its raw value. Empty when the section is absent.
    fn get_section(&self, section: &str) -> BTreeMap<String, String>;
}
