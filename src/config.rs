//! 配置模块，负责加载JSON配置文件

use crate::filter::BackendFilter;
use crate::logging::Profile;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "query_config.json";

/// 指定配置文件路径的环境变量
pub const CONFIG_ENV_VAR: &str = "QFR_CONFIG";

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("配置文件不存在: {0}")]
    NotFound(PathBuf),

    #[error("无法读取配置文件 {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("无法解析JSON配置文件 {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 一次实体查询请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub entity_type: String,
    #[serde(default)]
    pub filters: Vec<BackendFilter>,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            entity_type: "Sequence".to_string(),
            filters: vec![BackendFilter::condition(
                "project",
                "is",
                json!({"type": "Project", "id": 85}),
            )],
            fields: vec![
                "code".to_string(),
                "sg_cut_duration".to_string(),
                "sg_ip_versions".to_string(),
            ],
        }
    }
}

/// 应用配置结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 内存后端使用的 fixture 文件
    #[serde(default = "default_fixture_path")]
    pub fixture_path: PathBuf,
    #[serde(default)]
    pub request: QueryRequest,
    #[serde(default)]
    pub log_profile: Profile,
}

fn default_fixture_path() -> PathBuf {
    PathBuf::from("fixtures/demo_backend.json")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fixture_path: default_fixture_path(),
            request: QueryRequest::default(),
            log_profile: Profile::default(),
        }
    }
}

impl AppConfig {
    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(ConfigError::NotFound(path_ref.to_path_buf()));
        }

        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path_ref.to_path_buf(),
            source,
        })
    }

    /// 配置文件路径: 环境变量 `QFR_CONFIG` 优先, 否则使用默认文件名
    ///
    /// 会先加载 `.env` 文件 (如果存在)
    pub fn config_path() -> PathBuf {
        dotenvy::dotenv().ok();
        env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// 加载配置, 文件不存在时回退到默认配置; 文件存在但无效时返回错误
    pub fn load() -> Result<Self, ConfigError> {
        match Self::from_json_file(Self::config_path()) {
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_valid_json_config() {
        // 创建临时配置文件
        let temp_file = "test_query_config.json";
        let mut file = fs::File::create(temp_file).unwrap();
        writeln!(file, r#"{{
            "fixture_path": "fixtures/other.json",
            "log_profile": "production",
            "request": {{
                "entity_type": "Shot",
                "filters": [["sg_status_list", "is", "ip"]],
                "fields": ["code", "sg_version_count"]
            }}
        }}"#).unwrap();

        // 测试加载
        let config = AppConfig::from_json_file(temp_file).unwrap();
        assert_eq!(config.fixture_path, PathBuf::from("fixtures/other.json"));
        assert_eq!(config.log_profile, Profile::Production);
        assert_eq!(config.request.entity_type, "Shot");
        assert_eq!(
            config.request.filters,
            vec![BackendFilter::condition("sg_status_list", "is", json!("ip"))]
        );
        assert_eq!(config.request.fields, vec!["code", "sg_version_count"]);

        // 清理
        fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp_file = "test_partial_config.json";
        let mut file = fs::File::create(temp_file).unwrap();
        writeln!(file, r#"{{"log_profile": "development"}}"#).unwrap();

        let config = AppConfig::from_json_file(temp_file).unwrap();
        assert_eq!(config.fixture_path, default_fixture_path());
        assert_eq!(config.request, QueryRequest::default());

        fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_invalid_json_config() {
        let temp_file = "test_invalid_query_config.json";
        let mut file = fs::File::create(temp_file).unwrap();
        writeln!(file, "invalid json").unwrap();

        let result = AppConfig::from_json_file(temp_file);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));

        // 清理
        fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_missing_file() {
        let result = AppConfig::from_json_file("non_existent_file.json");
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.request.entity_type, "Sequence");
        assert_eq!(config.request.fields, vec!["code", "sg_cut_duration", "sg_ip_versions"]);
        assert_eq!(
            serde_json::to_value(&config.request.filters).unwrap(),
            json!([["project", "is", {"type": "Project", "id": 85}]])
        );
    }
}
