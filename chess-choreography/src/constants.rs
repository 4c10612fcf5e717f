//! 动画编排常量

/// 默认缩放
pub const DEFAULT_SCALE: f32 = 0.8;

/// 默认移动速度（格/秒）
pub const DEFAULT_MOVE_SPEED: f32 = 4.0;

/// 默认动画时间缩放
pub const DEFAULT_ANIMATION_TIME_SCALE: f32 = 1.0;

/// 被吃棋子移除前的最短等待时间（毫秒）
pub const DEFAULT_GRACE_MS: u64 = 1200;

/// 动画切换的淡入淡出时间（秒）
pub const CROSS_FADE_SECS: f32 = 0.2;

/// 转向角速度（弧度/秒）
pub const DEFAULT_ROTATION_SPEED: f32 = 8.0;

/// 格子边长（世界单位）
pub const DEFAULT_SQUARE_SIZE: f32 = 1.0;

/// 单个配置文件的加载超时（毫秒）
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 2000;

/// 棋子属性配置文件名
pub const ATTRIBUTES_FILE: &str = "piece-attributes.json";

/// 攻击序列配置文件名
pub const SEQUENCES_FILE: &str = "attack-sequences.json";

/// 场景灯光配置文件名
pub const LIGHTING_FILE: &str = "scene-lighting.json";

/// 配置目录名
pub const CONFIG_DIR_NAME: &str = "chess-choreography";

/// 名称中含有这些关键字的片段循环播放
pub const LOOP_CLIP_KEYWORDS: [&str; 5] = ["idle", "walk", "run", "loop", "breath"];
