//! # Config Loader
//!
//! 读取 TOML / JSON 配置，校验后生成 `OdometerBlueprint`。
//! 格式由文件扩展名决定；解析与校验错误统一为 `ContractError`。
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("odometer.toml")).unwrap();
//! println!("Odom frame: {}", blueprint.frames.odom_frame_id);
//! ```

mod parser;
mod validator;

pub use contracts::OdometerBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Read, parse and validate a configuration file.
    pub fn load_from_path(path: &Path) -> Result<OdometerBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| ContractError::ConfigParse {
            message: format!("cannot read {}: {e}", path.display()),
            source: Some(Box::new(e)),
        })?;
        Self::load_from_str(&content, format)
    }

    /// Parse and validate configuration text.
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<OdometerBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Re-check a blueprint after command-line overrides were applied.
    pub fn validate(blueprint: &OdometerBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    pub fn to_toml(blueprint: &OdometerBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(blueprint: &OdometerBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}
