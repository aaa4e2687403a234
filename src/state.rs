use std::sync::Arc;
use std::time::Instant;

use crate::analysis::config::AnalyzerConfig;
use crate::config::Config;

/// 服务共享状态。分析本身是无状态的：每个请求创建自己的分析器
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    analyzer_defaults: Arc<AnalyzerConfig>,
    started_at: Instant,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let analyzer_defaults = AnalyzerConfig::from_env(&config.analyzer);
        let analyzer_defaults = match analyzer_defaults.validate() {
            Ok(()) => analyzer_defaults,
            Err(e) => {
                tracing::warn!(error = %e, "Analyzer env overrides rejected, using built-in defaults");
                AnalyzerConfig::default()
            }
        };

        Self {
            config: Arc::new(config.clone()),
            analyzer_defaults: Arc::new(analyzer_defaults),
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 请求未覆盖时使用的分析器配置（已校验）
    pub fn analyzer_defaults(&self) -> &AnalyzerConfig {
        &self.analyzer_defaults
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
