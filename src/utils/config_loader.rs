use async_trait::async_trait;
use dotenvy::dotenv;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use std::{env, fs};
use thiserror::Error;

#[allow(clippy::enum_variant_names)]
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Missing [{0}] section")]
    MissingSection(&'static str),
    #[error("Error loading config: {0}")]
    ConfigError(String),
}

/// A table of a TOML config file that can be loaded on its own.
pub trait ConfigSection: DeserializeOwned {
    /// Name of the top-level table holding this section.
    const SECTION: &'static str;

    fn validate(&self) -> Result<(), LoadConfigError> {
        Ok(())
    }
}

#[async_trait]
pub trait ConfigLoader: Sized {
    async fn load_section_from_file(file_name: String) -> Result<Self, LoadConfigError>;
}

pub trait ConfigLoaderSync: Sized {
    fn load_section_from_file_sync(file_name: String) -> Result<Self, LoadConfigError>;
}

#[async_trait]
impl<T: ConfigSection + Send> ConfigLoader for T {
    async fn load_section_from_file(file_name: String) -> Result<T, LoadConfigError> {
        dotenv().ok();
        let contents = tokio::fs::read_to_string(&file_name).await?;
        section_from_str(&contents)
    }
}

impl<T: ConfigSection> ConfigLoaderSync for T {
    fn load_section_from_file_sync(file_name: String) -> Result<T, LoadConfigError> {
        dotenv().ok();
        let contents = fs::read_to_string(&file_name)?;
        section_from_str(&contents)
    }
}

/// Expand `${VAR}` references, pick out `T`'s table and validate it.
///
/// Other tables in the file are ignored, so several components can share one config file.
pub fn section_from_str<T: ConfigSection>(contents: &str) -> Result<T, LoadConfigError> {
    let mut root: toml::Table = toml::from_str(&expand_vars(contents)?)?;
    let section: T = root.remove(T::SECTION).ok_or(LoadConfigError::MissingSection(T::SECTION))?.try_into()?;
    section.validate()?;
    Ok(section)
}

fn expand_vars(raw_config: &str) -> Result<String, LoadConfigError> {
    let re = Regex::new(r"\$\{([a-zA-Z_][0-9a-zA-Z_]*)\}").map_err(|e| LoadConfigError::ConfigError(e.to_string()))?;
    Ok(re
        .replace_all(raw_config, |caps: &Captures| match env::var(&caps[1]) {
            Ok(val) => val,
            Err(_) => caps[0].to_string(),
        })
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Limits {
        cap: u32,
    }

    impl ConfigSection for Limits {
        const SECTION: &'static str = "limits";

        fn validate(&self) -> Result<(), LoadConfigError> {
            if self.cap == 0 {
                return Err(LoadConfigError::ConfigError("cap must be nonzero".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_unknown_vars_are_left_alone() {
        let expanded = expand_vars("cap = ${PROVIDER_QUEUE_SURELY_NOT_SET_ANYWHERE}").unwrap();
        assert_eq!(expanded, "cap = ${PROVIDER_QUEUE_SURELY_NOT_SET_ANYWHERE}");
    }

    #[test]
    fn test_known_vars_are_expanded() {
        // PATH is set in every environment the tests run in
        let path = env::var("PATH").unwrap();
        let expanded = expand_vars("path = \"${PATH}\"").unwrap();
        assert_eq!(expanded, format!("path = \"{path}\""));
    }

    #[test]
    fn test_section_is_picked_out_of_shared_file() {
        let limits: Limits = section_from_str("[other]\nname = \"x\"\n\n[limits]\ncap = 7\n").unwrap();
        assert_eq!(limits.cap, 7);
    }

    #[test]
    fn test_missing_section() {
        let result = section_from_str::<Limits>("[other]\ncap = 7\n");
        assert!(matches!(result, Err(LoadConfigError::MissingSection("limits"))));
    }

    #[test]
    fn test_section_is_validated() {
        let result = section_from_str::<Limits>("[limits]\ncap = 0\n");
        assert!(matches!(result, Err(LoadConfigError::ConfigError(_))));
    }
}
