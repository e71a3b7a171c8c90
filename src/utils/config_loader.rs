use crate::data_sync::{DataSyncConfig, VerificationTolerance};
use crate::logic::RouterConfig;
use async_trait::async_trait;
use dotenvy::dotenv;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::{env, fs};
use thiserror::Error;

#[allow(clippy::enum_variant_names)]
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),
    #[error("Error loading config: {0}")]
    ConfigError(String),
}

#[async_trait]
pub trait RouteConfigLoader {
    type SectionType;

    async fn load_section_from_file(file_name: String) -> Result<Self::SectionType, LoadConfigError>;
}

pub trait RouteConfigLoaderSync {
    type SectionType;

    fn load_section_from_file_sync(file_name: String) -> Result<Self::SectionType, LoadConfigError>;
}

/// Top level settings file with one section per layer.
///
/// ```toml
/// [router]
/// max_hops = 3
///
/// [data_sync]
/// max_snapshot_age_blocks = 5
///
/// [verification]
/// relative = 1e-10
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterSettings {
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub data_sync: DataSyncConfig,
    #[serde(default)]
    pub verification: VerificationTolerance,
}

impl RouterSettings {
    fn validate(self) -> Result<Self, LoadConfigError> {
        if self.router.max_hops == 0 {
            return Err(LoadConfigError::ConfigError("router.max_hops must be at least 1".to_string()));
        }
        if self.router.distribution_steps.iter().any(|steps| *steps == 0) {
            return Err(LoadConfigError::ConfigError("router.distribution_steps must be positive".to_string()));
        }
        Ok(self)
    }
}

#[async_trait]
impl RouteConfigLoader for RouterSettings {
    type SectionType = RouterSettings;

    async fn load_section_from_file(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        load_from_file::<RouterSettings>(file_name).await?.validate()
    }
}

impl RouteConfigLoaderSync for RouterSettings {
    type SectionType = RouterSettings;

    fn load_section_from_file_sync(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        load_from_file_sync::<RouterSettings>(file_name)?.validate()
    }
}

pub async fn load_from_file<T: DeserializeOwned>(file_name: String) -> Result<T, LoadConfigError> {
    dotenv().ok();
    let contents = tokio::fs::read_to_string(file_name).await?;
    let contents = expand_vars(&contents)?;
    let config: T = toml::from_str(&contents)?;
    Ok(config)
}

pub fn load_from_file_sync<T: DeserializeOwned>(file_name: String) -> Result<T, LoadConfigError> {
    dotenv().ok();
    let contents = fs::read_to_string(file_name)?;
    let contents = expand_vars(&contents)?;
    let config: T = toml::from_str(&contents)?;
    Ok(config)
}

fn expand_vars(raw_config: &str) -> Result<String, LoadConfigError> {
    let re = Regex::new(r"\$\{([a-zA-Z_][0-9a-zA-Z_]*)\}")?;
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
    use crate::logic::LiquidityProvider;
    use std::path::PathBuf;

    fn write_config(name: &str, contents: &str) -> eyre::Result<PathBuf> {
        let path = env::temp_dir().join(format!("swap-route-{}-{}.toml", name, std::process::id()));
        fs::write(&path, contents)?;
        Ok(path)
    }

    #[test]
    fn test_expand_vars() -> eyre::Result<()> {
        // SAFETY: the variable name is unique to this test
        unsafe { env::set_var("SWAP_ROUTE_TEST_HOPS", "2") };
        let expanded = expand_vars("max_hops = ${SWAP_ROUTE_TEST_HOPS}\nother = ${SWAP_ROUTE_TEST_UNSET}")?;
        assert_eq!(expanded, "max_hops = 2\nother = ${SWAP_ROUTE_TEST_UNSET}");
        Ok(())
    }

    #[test]
    fn test_load_settings_sync() -> eyre::Result<()> {
        let path = write_config(
            "sync",
            r#"
[router]
max_hops = 3
distribution_steps = [1, 5]
special_providers = ["SUSHI_SWAP", "TRIDENT"]

[data_sync]
max_snapshot_age_blocks = 7

[verification]
relative = 1e-8
absolute = 100.0
stable_reserve_absolute = 1e6
"#,
        )?;

        let settings = RouterSettings::load_section_from_file_sync(path.to_string_lossy().to_string())?;
        assert_eq!(settings.router.max_hops, 3);
        assert_eq!(settings.router.distribution_steps, vec![1, 5]);
        assert_eq!(settings.router.special_providers, vec![LiquidityProvider::SushiSwap, LiquidityProvider::Trident]);
        // untouched fields keep their defaults
        assert_eq!(settings.router.max_paths, RouterConfig::default().max_paths);
        assert_eq!(settings.data_sync.max_snapshot_age_blocks, 7);
        assert_eq!(settings.verification.absolute, 100.0);

        fs::remove_file(path)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_load_settings_async_with_env() -> eyre::Result<()> {
        // SAFETY: the variable name is unique to this test
        unsafe { env::set_var("SWAP_ROUTE_TEST_MAX_PATHS", "42") };
        let path = write_config("async", "[router]\nmax_paths = ${SWAP_ROUTE_TEST_MAX_PATHS}\n")?;

        let settings = RouterSettings::load_section_from_file(path.to_string_lossy().to_string()).await?;
        assert_eq!(settings.router.max_paths, 42);
        assert_eq!(settings.data_sync.max_snapshot_age_blocks, DataSyncConfig::default().max_snapshot_age_blocks);

        fs::remove_file(path)?;
        Ok(())
    }

    #[test]
    fn test_invalid_settings() -> eyre::Result<()> {
        let path = write_config("invalid", "[router]\nmax_hops = 0\n")?;
        let result = RouterSettings::load_section_from_file_sync(path.to_string_lossy().to_string());
        assert!(matches!(result, Err(LoadConfigError::ConfigError(_))));

        fs::remove_file(path)?;
        Ok(())
    }
}
