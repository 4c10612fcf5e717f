//! 配置加载
//!
//! 四个 JSON 文档（棋子属性、攻击序列、场景灯光、编排参数）各自独立加载，
//! 任何一个读取失败、解析失败或超时都替换为默认文档并记录警告，
//! 不会阻塞实体创建。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{fs, time};
use tracing::{info, warn};

use crate::attributes::{parse_color, AttributeConfig};
use crate::constants::{
    ATTRIBUTES_FILE, CONFIG_DIR_NAME, CROSS_FADE_SECS, DEFAULT_GRACE_MS, DEFAULT_LOAD_TIMEOUT_MS,
    DEFAULT_ROTATION_SPEED, DEFAULT_SQUARE_SIZE, LIGHTING_FILE, SEQUENCES_FILE,
};
use crate::error::{ChoreographyError, Result};
use crate::sequence::SequenceConfig;

/// 编排参数文件名
pub const CHOREOGRAPHY_FILE: &str = "choreography.json";

/// 编排参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChoreographyConfig {
    /// 被吃棋子至少保留多久（毫秒）
    pub grace_ms: u64,
    /// 转向角速度（弧度/秒）
    pub rotation_speed: f32,
    /// 动画切换淡入淡出（秒）
    pub cross_fade_secs: f32,
    /// 格子边长
    pub square_size: f32,
    /// 单个配置文件加载超时（毫秒）
    pub load_timeout_ms: u64,
}

impl Default for ChoreographyConfig {
    fn default() -> Self {
        Self {
            grace_ms: DEFAULT_GRACE_MS,
            rotation_speed: DEFAULT_ROTATION_SPEED,
            cross_fade_secs: CROSS_FADE_SECS,
            square_size: DEFAULT_SQUARE_SIZE,
            load_timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
        }
    }
}

impl ChoreographyConfig {
    /// 把无效数值替换为默认值
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.rotation_speed.is_finite() && self.rotation_speed > 0.0) {
            self.rotation_speed = defaults.rotation_speed;
        }
        if !(self.cross_fade_secs.is_finite() && self.cross_fade_secs >= 0.0) {
            self.cross_fade_secs = defaults.cross_fade_secs;
        }
        if !(self.square_size.is_finite() && self.square_size > 0.0) {
            self.square_size = defaults.square_size;
        }
        if self.load_timeout_ms == 0 {
            self.load_timeout_ms = defaults.load_timeout_ms;
        }
        self
    }
}

/// 环境光
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AmbientLight {
    pub color: Value,
    pub intensity: f32,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            color: Value::from("#ffffff"),
            intensity: 0.6,
        }
    }
}

/// 平行光
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectionalLight {
    pub color: Value,
    pub intensity: f32,
    pub position: [f32; 3],
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            color: Value::from("#ffffff"),
            intensity: 1.0,
            position: [5.0, 10.0, 7.5],
        }
    }
}

/// 场景灯光配置，由场景构建方使用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LightingConfig {
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
    pub shadows: bool,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient: AmbientLight::default(),
            directional: DirectionalLight::default(),
            shadows: true,
        }
    }
}

impl LightingConfig {
    /// 环境光颜色，无法解析时为白色
    pub fn ambient_color(&self) -> u32 {
        parse_color(&self.ambient.color).unwrap_or(0xFF_FFFF)
    }

    /// 平行光颜色，无法解析时为白色
    pub fn directional_color(&self) -> u32 {
        parse_color(&self.directional.color).unwrap_or(0xFF_FFFF)
    }
}

/// 配置文件位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub dir: PathBuf,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

impl ConfigPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 系统配置目录下的 chess-choreography，取不到时用 ./config
    pub fn default_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(CONFIG_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("config"))
    }

    pub fn attributes(&self) -> PathBuf {
        self.dir.join(ATTRIBUTES_FILE)
    }

    pub fn sequences(&self) -> PathBuf {
        self.dir.join(SEQUENCES_FILE)
    }

    pub fn lighting(&self) -> PathBuf {
        self.dir.join(LIGHTING_FILE)
    }

    pub fn choreography(&self) -> PathBuf {
        self.dir.join(CHOREOGRAPHY_FILE)
    }
}

/// 一次加载得到的全部配置
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub attributes: AttributeConfig,
    pub sequences: SequenceConfig,
    pub lighting: LightingConfig,
    pub choreography: ChoreographyConfig,
}

/// 配置加载器
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    paths: ConfigPaths,
    timeout: Duration,
}

impl ConfigLoader {
    pub fn new(paths: ConfigPaths, timeout_ms: u64) -> Self {
        Self {
            paths,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// 同一目录，换一个超时
    pub fn with_timeout(&self, timeout_ms: u64) -> Self {
        Self::new(self.paths.clone(), timeout_ms)
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// 读取并解析一个文档
    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let display = path.display().to_string();
        let text = match time::timeout(self.timeout, fs::read_to_string(path)).await {
            Ok(Ok(text)) => text,
            Ok(Err(source)) => {
                return Err(ChoreographyError::ConfigIo {
                    path: display,
                    source,
                })
            }
            Err(_) => {
                return Err(ChoreographyError::ConfigTimeout {
                    path: display,
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        };

        serde_json::from_str(&text).map_err(|source| ChoreographyError::ConfigParse {
            path: display,
            source,
        })
    }

    /// 加载失败时退回默认值
    async fn load_or_default<T: DeserializeOwned + Default>(&self, path: PathBuf, what: &str) -> T {
        match self.read_json(&path).await {
            Ok(config) => {
                info!("已加载{}: {}", what, path.display());
                config
            }
            Err(ChoreographyError::ConfigIo { source, .. }) if source.kind() == ErrorKind::NotFound => {
                info!("{}文件不存在，使用默认配置: {}", what, path.display());
                T::default()
            }
            Err(e) => {
                warn!("{}加载失败，使用默认配置: {}", what, e);
                T::default()
            }
        }
    }

    pub async fn try_load_attributes(&self) -> Result<AttributeConfig> {
        self.read_json(&self.paths.attributes()).await
    }

    pub async fn try_load_sequences(&self) -> Result<SequenceConfig> {
        self.read_json(&self.paths.sequences()).await
    }

    pub async fn try_load_lighting(&self) -> Result<LightingConfig> {
        self.read_json(&self.paths.lighting()).await
    }

    pub async fn try_load_choreography(&self) -> Result<ChoreographyConfig> {
        self.read_json(&self.paths.choreography())
            .await
            .map(ChoreographyConfig::sanitized)
    }

    pub async fn load_attributes(&self) -> AttributeConfig {
        self.load_or_default(self.paths.attributes(), "棋子属性配置").await
    }

    pub async fn load_sequences(&self) -> SequenceConfig {
        self.load_or_default(self.paths.sequences(), "攻击序列配置").await
    }

    pub async fn load_lighting(&self) -> LightingConfig {
        self.load_or_default(self.paths.lighting(), "灯光配置").await
    }

    pub async fn load_choreography(&self) -> ChoreographyConfig {
        self.load_or_default::<ChoreographyConfig>(self.paths.choreography(), "编排参数")
            .await
            .sanitized()
    }

    /// 先加载编排参数，再按其中的超时并发加载其余文档，互不影响
    pub async fn load_all(&self) -> LoadedConfig {
        let choreography = self.load_choreography().await;
        let documents = self.with_timeout(choreography.load_timeout_ms);
        let (attributes, sequences, lighting) = tokio::join!(
            documents.load_attributes(),
            documents.load_sequences(),
            documents.load_lighting(),
        );
        LoadedConfig {
            attributes,
            sequences,
            lighting,
            choreography,
        }
    }
}
