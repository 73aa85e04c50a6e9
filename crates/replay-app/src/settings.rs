//! 설정 로드.
//!
//! 우선순위: 기본값 → 설정 파일 → `REPLAY__` 환경변수 → CLI 인자.
//! 설정 파일은 `--config`로 지정하거나, 없으면 플랫폼 설정 디렉토리의 `config.json`을 (있을 때만) 읽는다.
//!
//! - macOS: `~/Library/Application Support/dev.session-replay.session-replay/config.json`
//! - Windows: `%APPDATA%\session-replay\session-replay\config\config.json`
//! - Linux: `~/.config/session-replay/config.json`

use config::{Config, Environment, File};
use directories::ProjectDirs;
use std::path::PathBuf;
use tracing::{debug, info};

use replay_core::config::{AppConfig, ExternalApiEndpoint};
use replay_core::error::CoreError;
use replay_network::ai_classifier_client::DEFAULT_CLASSIFIER_MODEL;
use replay_network::ai_report_client::DEFAULT_REPORT_MODEL;
use replay_network::ai_speech_client::DEFAULT_SPEECH_MODEL;

/// 환경변수 접두사 (`REPLAY__VISION__CLICK_COOLDOWN_SECS=3`)
pub const ENV_PREFIX: &str = "REPLAY";
/// 엔드포인트 API 키가 비어 있을 때 쓰는 환경변수
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
const CONFIG_FILE_NAME: &str = "config.json";

/// CLI에서 넘어오는 설정 덮어쓰기
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub marker_template: Option<PathBuf>,
    pub keep_temp_files: bool,
    pub concurrency: Option<usize>,
    pub no_classifier: bool,
    pub no_text_observer: bool,
}

impl CliOverrides {
    /// 지정된 값만 덮어쓴다
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.output_dir {
            config.output.base_dir = dir.clone();
        }
        if let Some(template) = &self.marker_template {
            config.vision.marker_template = Some(template.clone());
        }
        if self.keep_temp_files {
            config.output.keep_temp_files = true;
        }
        if let Some(n) = self.concurrency {
            config.ai_provider.max_concurrency = n;
        }
        if self.no_classifier {
            config.ai_provider.classifier_api = None;
        }
        if self.no_text_observer {
            config.vision.text_observer_enabled = false;
        }
    }
}

/// 플랫폼 기본 설정 파일 경로
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "session-replay", "session-replay")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// 설정 계층을 합쳐 검증된 `AppConfig` 생성
pub fn load(cli: &CliOverrides) -> Result<AppConfig, CoreError> {
    let defaults = Config::try_from(&AppConfig::default_config()).map_err(config_error)?;
    let mut builder = Config::builder().add_source(defaults);

    match &cli.config_path {
        Some(path) => {
            info!(path = %path.display(), "설정 파일 사용");
            builder = builder.add_source(File::from(path.as_path()).required(true));
        }
        None => {
            if let Some(path) = default_config_path() {
                debug!(path = %path.display(), "기본 설정 파일 경로");
                builder = builder.add_source(File::from(path).required(false));
            }
        }
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let mut config: AppConfig = builder
        .build()
        .and_then(Config::try_deserialize)
        .map_err(config_error)?;

    resolve_api_keys(&mut config, std::env::var(GEMINI_API_KEY_ENV).ok());
    cli.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// API 키 채우기
///
/// 키가 비어 있는 엔드포인트는 환경 키를 쓰고, 엔드포인트가 아예 없으면
/// 환경 키가 있을 때 Gemini 기본 엔드포인트를 만든다.
pub fn resolve_api_keys(config: &mut AppConfig, env_key: Option<String>) {
    let Some(key) = env_key.filter(|k| !k.trim().is_empty()) else {
        return;
    };

    let slots = [
        (&mut config.ai_provider.classifier_api, DEFAULT_CLASSIFIER_MODEL),
        (&mut config.ai_provider.speech_api, DEFAULT_SPEECH_MODEL),
        (&mut config.ai_provider.report_api, DEFAULT_REPORT_MODEL),
    ];
    for (slot, model) in slots {
        match slot {
            Some(endpoint) if endpoint.api_key.is_empty() => endpoint.api_key = key.clone(),
            Some(_) => {}
            None => *slot = Some(ExternalApiEndpoint::gemini(model, key.clone())),
        }
    }
}

fn config_error(e: config::ConfigError) -> CoreError {
    CoreError::Config(format!("설정 로드 실패: {e}"))
}
