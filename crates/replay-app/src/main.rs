//! # session-replay
//!
//! 화면 녹화 영상을 행동 타임라인과 단계별 안내문으로 바꾸는 CLI 진입점.
//! 설정 로드, 로깅 초기화, 출력 디렉토리 준비, 파이프라인 실행, 임시 파일 정리를 맡는다.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use replay_app::pipeline::SessionSummary;
use replay_app::settings::{self, CliOverrides};
use replay_app::wiring::build_pipeline;
use replay_storage::session_output::SessionOutputStorage;

/// 화면 녹화 → 행동 타임라인
#[derive(Parser, Debug)]
#[command(name = "session-replay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 분석할 영상 파일
    #[arg(long, short = 'v')]
    video: PathBuf,

    /// 추출한 프레임/오디오를 지우지 않고 남긴다
    #[arg(long)]
    keep_temp_files: bool,

    /// 설정 파일 (JSON/TOML/YAML)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 출력 상위 디렉토리 (기본: output)
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// 마커(커서) 템플릿 이미지
    #[arg(long)]
    marker_template: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 동시 분류 요청 수
    #[arg(long)]
    concurrency: Option<usize>,

    /// 프레임 쌍 분류기 사용 안 함
    #[arg(long)]
    no_classifier: bool,

    /// 텍스트 diff 관측기 사용 안 함
    #[arg(long)]
    no_text_observer: bool,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config_path: self.config.clone(),
            output_dir: self.output_dir.clone(),
            marker_template: self.marker_template.clone(),
            keep_temp_files: self.keep_temp_files,
            concurrency: self.concurrency,
            no_classifier: self.no_classifier,
            no_text_observer: self.no_text_observer,
        }
    }
}

fn init_tracing(level: &str) {
    let log_filter = [
        "session_replay",
        "replay_app",
        "replay_core",
        "replay_timeline",
        "replay_vision",
        "replay_network",
        "replay_storage",
    ]
    .iter()
    .map(|krate| format!("{krate}={level}"))
    .collect::<Vec<_>>()
    .join(",");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();
}

fn print_summary(summary: &SessionSummary, output_dir: &std::path::Path, elapsed_secs: f64) {
    println!();
    println!("세션 리플레이 완료");
    println!("  원시 관측:   {}", summary.raw_count);
    println!("  최종 이벤트: {}", summary.final_count());
    match summary.transcript.spoken() {
        Some(text) => println!("  음성 전사:   {}자", text.chars().count()),
        None => println!("  음성 전사:   {}", summary.transcript),
    }
    match &summary.report {
        Some(path) => println!("  안내문:      {}", path.display()),
        None => println!("  안내문:      (생성 안 됨)"),
    }
    println!("  출력 경로:   {}", output_dir.display());
    println!("  소요 시간:   {elapsed_secs:.2}초");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);
    let started = Instant::now();

    if !args.video.exists() {
        bail!("영상 파일을 찾을 수 없음: {}", args.video.display());
    }

    let config = settings::load(&args.overrides()).context("설정 로드 실패")?;
    info!(video = %args.video.display(), "세션 리플레이 시작");

    let output_dir = SessionOutputStorage::output_dir_for(
        &config.output.base_dir,
        &args.video,
        chrono::Local::now(),
    );
    let storage = Arc::new(
        SessionOutputStorage::create(output_dir)
            .await
            .context("출력 디렉토리 생성 실패")?,
    );

    let pipeline = build_pipeline(&config, storage.clone());
    let result = pipeline.run(&args.video, &storage.temp_dir()).await;

    if config.output.keep_temp_files {
        info!(path = %storage.temp_dir().display(), "임시 파일 보존");
    } else if let Err(e) = storage.cleanup_temp().await {
        warn!(error = %e, "임시 파일 정리 실패");
    }

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "세션 처리 실패");
            return Err(e).context("세션 처리 실패");
        }
    };

    print_summary(
        &summary,
        storage.output_dir(),
        started.elapsed().as_secs_f64(),
    );
    Ok(())
}
