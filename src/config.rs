use gck_asm::{AliasEntry, AliasTable};
use serde::Deserialize;
use thiserror::Error;

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load alias file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to deserialize alias file: {0}")]
    Deserialize(#[from] toml::de::Error),

    #[error("Invalid address '{value}' of alias {alias}")]
    Address { alias: String, value: String },
}

/// An address, written either as a hex string such as `"8057578C"` or `"0x8057578C"`, or as
/// an integer.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum Address {
    Int(u32),
    Hex(String),
}

impl Address {
    fn value(&self, alias: &str) -> Result<u32, ConfigError> {
        match self {
            Address::Int(value) => Ok(*value),
            Address::Hex(text) => {
                let digits = text.trim();
                let digits = digits
                    .strip_prefix("0x")
                    .or_else(|| digits.strip_prefix("0X"))
                    .unwrap_or(digits);
                u32::from_str_radix(digits, 16).map_err(|_| ConfigError::Address {
                    alias: alias.to_string(),
                    value: text.clone(),
                })
            }
        }
    }
}

/// The value of a single alias. Either one address for every version, or a table of addresses
/// keyed by version, where `*` is the universal value.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum AliasValue {
    Universal(Address),
    Versions(BTreeMap<String, Address>),
}

/// The alias file. Looks like:
///
/// ```toml
/// games = ["RVL-SOUE-0A-0", "RVL-SOUJ-0A-0"]
///
/// [addresses]
/// EmptyA = "80001500"
///
/// [addresses.LinkPtr]
/// RVL-SOUE-0A-0 = "8057578C"
/// ```
#[derive(Deserialize, Debug, Default)]
pub struct AliasConfig {
    #[serde(default)]
    games: Vec<String>,
    #[serde(default)]
    addresses: BTreeMap<String, AliasValue>,
}

impl AliasConfig {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Build the alias table, checking every address.
    pub fn into_table(self) -> Result<AliasTable, ConfigError> {
        let entries = self
            .addresses
            .into_iter()
            .map(|(name, value)| -> Result<AliasEntry, ConfigError> {
                let entry = match value {
                    AliasValue::Universal(address) => {
                        AliasEntry::new(&name).with("*", address.value(&name)?)
                    }
                    AliasValue::Versions(versions) => {
                        let mut entry = AliasEntry::new(&name);
                        for (version, address) in versions {
                            entry.set(&version, address.value(&name)?);
                        }
                        entry
                    }
                };
                Ok(entry)
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!("loaded {} aliases for {} games", entries.len(), self.games.len());
        Ok(AliasTable::new(self.games, entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        games = ["RVL-SOUE-0A-0", "RVL-SOUJ-0A-0"]

        [addresses]
        EmptyA = "80001500"
        Decimal = 4096
        Prefixed = "0x80004200"

        [addresses.LinkPtr]
        RVL-SOUE-0A-0 = "8057578C"

        [addresses.Both]
        "*" = "1"
        RVL-SOUJ-0A-0 = "2"
    "#;

    #[test]
    fn load_table() {
        let table = AliasConfig::parse(CONFIG).unwrap().into_table().unwrap();
        assert_eq!(table.versions(), ["RVL-SOUE-0A-0", "RVL-SOUJ-0A-0"]);
        assert_eq!(table.resolve("EmptyA", "RVL-SOUJ-0A-0"), Some(0x80001500));
        assert_eq!(table.resolve("Decimal", "*"), Some(0x1000));
        assert_eq!(table.resolve("Prefixed", "*"), Some(0x80004200));
        assert_eq!(table.resolve("LinkPtr", "RVL-SOUE-0A-0"), Some(0x8057578c));
        assert_eq!(table.resolve("LinkPtr", "*"), None);
        assert_eq!(table.resolve("Both", "RVL-SOUJ-0A-0"), Some(2));
        assert_eq!(table.resolve("Both", "RVL-SOUE-0A-0"), Some(1));
    }

    #[test]
    fn bad_address() {
        let config = AliasConfig::parse("[addresses]\nBroken = \"80OO1500\"").unwrap();
        match config.into_table() {
            Err(ConfigError::Address { alias, .. }) => assert_eq!(alias, "Broken"),
            other => panic!("expected address error, got {other:?}"),
        }
    }

    #[test]
    fn bad_toml() {
        assert!(matches!(
            AliasConfig::parse("games = ["),
            Err(ConfigError::Deserialize(..)),
        ));
    }
}
