//! 设置文件：在默认 `ImageConfig` 之上覆盖个别参数。
//!
//! 所有字段都可缺省，缺省即沿用默认值；覆盖后的配置必须通过 `validate`。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::image_handler::ImageConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct AppSettings {
    pub max_file_size_mb: Option<u64>,
    pub download_timeout: Option<u64>,
    pub connect_timeout: Option<u64>,
    pub allow_private_network: Option<bool>,
    pub min_dimension: Option<u32>,
    pub max_dimension: Option<u32>,
    pub contrast_threshold: Option<f64>,
    pub contrast_enhancement: Option<bool>,
    pub apply_exif_orientation: Option<bool>,
    pub try_harder: Option<bool>,
    pub palette_size: Option<usize>,
    pub palette_quality: Option<usize>,
    pub brand_cache_capacity: Option<usize>,
}

impl AppSettings {
    /// 读取设置文件；文件不存在时返回 `None`。
    pub fn load(path: &Path) -> Result<Option<Self>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)?;
        let parsed = serde_json::from_str::<Self>(&content)
            .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))?;

        Ok(Some(parsed))
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Settings(format!("创建设置目录失败: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 将覆盖项写入配置。
    pub fn apply_to(&self, config: &mut ImageConfig) {
        if let Some(mb) = self.max_file_size_mb {
            config.max_file_size = mb.saturating_mul(1024 * 1024);
        }
        if let Some(v) = self.download_timeout {
            config.download_timeout = v;
        }
        if let Some(v) = self.connect_timeout {
            config.connect_timeout = v;
        }
        if let Some(v) = self.allow_private_network {
            config.allow_private_network = v;
        }
        if let Some(v) = self.min_dimension {
            config.min_dimension = v;
        }
        if let Some(v) = self.max_dimension {
            config.max_dimension = v;
        }
        if let Some(v) = self.contrast_threshold {
            config.contrast_threshold = v;
        }
        if let Some(v) = self.contrast_enhancement {
            config.contrast_enhancement = v;
        }
        if let Some(v) = self.apply_exif_orientation {
            config.apply_exif_orientation = v;
        }
        if let Some(v) = self.try_harder {
            config.try_harder = v;
        }
        if let Some(v) = self.palette_size {
            config.palette_size = v;
        }
        if let Some(v) = self.palette_quality {
            config.palette_quality = v;
        }
        if let Some(v) = self.brand_cache_capacity {
            config.brand_cache_capacity = v;
        }
    }

    /// 默认配置 + 覆盖项，并校验结果。
    pub fn to_config(&self) -> Result<ImageConfig, AppError> {
        let mut config = ImageConfig::default();
        self.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("wallet-scan-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn missing_file_is_none() {
        assert_eq!(AppSettings::load(&temp_path("missing")).unwrap(), None);
    }

    #[test]
    fn overrides_only_listed_fields() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"maxDimension": 1600, "tryHarder": false}"#).unwrap();
        let config = settings.to_config().unwrap();

        assert_eq!(config.max_dimension, 1600);
        assert!(!config.try_harder);
        assert_eq!(config.min_dimension, 800);
        assert_eq!(config.palette_size, 8);
    }

    #[test]
    fn inconsistent_overrides_are_rejected() {
        let settings = AppSettings {
            min_dimension: Some(2000),
            ..AppSettings::default()
        };
        assert!(matches!(settings.to_config(), Err(AppError::Image(_))));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let path = temp_path("unknown");
        fs::write(&path, r#"{"maxDimensions": 1600}"#).unwrap();
        let result = AppSettings::load(&path);
        let _ = fs::remove_file(&path);
        assert!(matches!(result, Err(AppError::Settings(_))));
    }

    #[test]
    fn save_then_load_keeps_values() {
        let path = temp_path("roundtrip");
        let settings = AppSettings {
            palette_size: Some(6),
            allow_private_network: Some(true),
            ..AppSettings::default()
        };
        settings.save(&path).unwrap();
        let loaded = AppSettings::load(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, Some(settings));
    }
}
