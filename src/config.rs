//! 환경 변수 기반 설정 관리

use std::env;

/// 서버 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub presence: PresenceConfig,
    pub meeting: MeetingConfig,
    pub log_level: String,
}

/// 프레즌스 설정
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// 이 시간(초) 동안 위치 갱신이 없으면 away로 전환
    pub away_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

/// 회의 설정
#[derive(Debug, Clone)]
pub struct MeetingConfig {
    /// 요청에 capacity가 없을 때 사용하는 기본 정원
    pub default_room_capacity: usize,
}

impl Config {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "5600".to_string())
                .parse()
                .unwrap_or(5600),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            presence: PresenceConfig {
                away_timeout_secs: env::var("PRESENCE_AWAY_TIMEOUT")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .unwrap_or(300),
                sweep_interval_secs: env::var("PRESENCE_SWEEP_INTERVAL")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .unwrap_or(60),
            },
            meeting: MeetingConfig {
                default_room_capacity: env::var("DEFAULT_ROOM_CAPACITY")
                    .unwrap_or_else(|_| "8".to_string())
                    .parse()
                    .unwrap_or(8),
            },
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}
