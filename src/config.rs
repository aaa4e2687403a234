use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub cors_origin: String,
    pub limits: LimitsConfig,
    pub analyzer: AnalyzerEnvConfig,
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub max_frames_per_request: usize,
    pub max_body_bytes: usize,
}

/// 分析器默认配置中可由环境变量覆盖的部分
#[derive(Debug, Clone)]
pub struct AnalyzerEnvConfig {
    pub smoothing_window: usize,
    pub min_visibility: f64,
    pub include_knee_alignment: bool,
    /// 未设置时由参与表决的检查项数推出过半数
    pub min_passing_checks: Option<usize>,
    pub min_squat_duration_frames: u32,
}

impl Default for AnalyzerEnvConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 3,
            min_visibility: 0.5,
            include_knee_alignment: false,
            min_passing_checks: None,
            min_squat_duration_frames: 6,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let analyzer_defaults = AnalyzerEnvConfig::default();
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            limits: LimitsConfig {
                max_frames_per_request: env_or_parse("MAX_FRAMES_PER_REQUEST", 18_000_usize),
                max_body_bytes: env_or_parse("MAX_BODY_BYTES", 32 * 1024 * 1024_usize),
            },
            analyzer: AnalyzerEnvConfig {
                smoothing_window: env_or_parse(
                    "ANALYZER_SMOOTHING_WINDOW",
                    analyzer_defaults.smoothing_window,
                ),
                min_visibility: env_or_parse(
                    "ANALYZER_MIN_VISIBILITY",
                    analyzer_defaults.min_visibility,
                ),
                include_knee_alignment: env_or_bool(
                    "ANALYZER_INCLUDE_KNEE_ALIGNMENT",
                    analyzer_defaults.include_knee_alignment,
                ),
                min_passing_checks: env_opt_parse("ANALYZER_MIN_PASSING_CHECKS")
                    .or(analyzer_defaults.min_passing_checks),
                min_squat_duration_frames: env_or_parse(
                    "ANALYZER_MIN_SQUAT_DURATION_FRAMES",
                    analyzer_defaults.min_squat_duration_frames,
                ),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

/// 可选数值；未设置或无法解析时为 `None`
pub fn env_opt_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Failed to parse env var, ignoring");
            None
        }
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                tracing::warn!(key, value = %raw, "Invalid boolean env var, using default");
                default
            }
        },
        Err(_) => default,
    }
}
