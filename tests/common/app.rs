use axum::Router;

use squat_coach::config::{AnalyzerEnvConfig, Config, LimitsConfig};
use squat_coach::routes::build_router;
use squat_coach::state::AppState;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
}

fn test_config(limits: LimitsConfig, analyzer: AnalyzerEnvConfig) -> Config {
    // 直接构造 Config，避免 set_var 在并行测试中互相干扰
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        limits,
        analyzer,
    }
}

fn spawn_with(limits: LimitsConfig, analyzer: AnalyzerEnvConfig) -> TestApp {
    let config = test_config(limits, analyzer);
    let state = AppState::new(&config);
    let app = build_router(state.clone());
    TestApp { app, state, config }
}

pub async fn spawn_test_app() -> TestApp {
    spawn_with(
        LimitsConfig {
            max_frames_per_request: 2_000,
            max_body_bytes: 8 * 1024 * 1024,
        },
        AnalyzerEnvConfig::default(),
    )
}

pub async fn spawn_test_app_with_limits(max_frames: usize, max_body_bytes: usize) -> TestApp {
    spawn_with(
        LimitsConfig {
            max_frames_per_request: max_frames,
            max_body_bytes,
        },
        AnalyzerEnvConfig::default(),
    )
}

pub async fn spawn_test_app_with_analyzer(analyzer: AnalyzerEnvConfig) -> TestApp {
    spawn_with(
        LimitsConfig {
            max_frames_per_request: 2_000,
            max_body_bytes: 8 * 1024 * 1024,
        },
        analyzer,
    )
}
