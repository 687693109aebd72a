/// Runs one demo page headlessly from a TOML config file.
///
/// Usage: `visionary [CONFIG_TOML]`, defaulting to `configs/webcam.toml`.
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

use visionary::{
    CameraDevice, ConsoleSink, InferenceLoop, LoopState, OverlayRenderer, ReplayCamera,
    SessionConfig, SourceTab, UltralyticsBackend, init_logger, parse_toml,
};

#[cfg(feature = "v4l")]
fn v4l_camera(session: &SessionConfig) -> Option<Box<dyn CameraDevice>> {
    let device = session.v4l_device.clone()?;
    Some(Box::new(visionary::V4lCamera::new(device)))
}

#[cfg(not(feature = "v4l"))]
fn v4l_camera(session: &SessionConfig) -> Option<Box<dyn CameraDevice>> {
    if let Some(device) = &session.v4l_device {
        tracing::warn!("Built without the `v4l` feature, ignoring device {}", device);
    }
    None
}

fn build_camera(session: &SessionConfig) -> Result<Box<dyn CameraDevice>> {
    if let Some(camera) = v4l_camera(session) {
        return Ok(camera);
    }

    let dir = session
        .camera_dir
        .clone()
        .context("No camera source configured")?;
    let mut camera = ReplayCamera::new(dir);
    if let Some(env_dir) = &session.environment_dir {
        camera = camera.with_environment_dir(env_dir.clone());
    }
    Ok(Box::new(camera))
}

async fn run_webcam(
    page: &InferenceLoop<UltralyticsBackend, ConsoleSink>,
    session: &SessionConfig,
) -> Result<()> {
    if page.start_camera(session.facing)?.is_none() {
        return Ok(());
    }

    let poll = Duration::from_millis(session.frame_interval_ms.max(1));
    let wait_done = async {
        loop {
            tokio::time::sleep(poll).await;
            if page.state() != LoopState::Running {
                break;
            }
            if session
                .max_frames
                .is_some_and(|max| page.sink().published() >= max)
            {
                break;
            }
        }
    };

    tokio::select! {
        _ = wait_done => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }
    page.stop();
    Ok(())
}

async fn run_upload(
    page: &InferenceLoop<UltralyticsBackend, ConsoleSink>,
    path: &Path,
) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read upload {:?}", path))?;
    page.upload_image(&bytes).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let project_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let config_toml = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| project_root.join("configs/webcam.toml"));
    let config_dir = config_toml
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| project_root.clone());

    let config = parse_toml(&config_toml, &config_dir)
        .with_context(|| format!("Failed to parse TOML config {:?}", config_toml))?;
    tracing::debug!("{:?}", config);
    let session = &config.session;

    let backend = UltralyticsBackend::new(session.into());
    let renderer = OverlayRenderer::for_model(session.model, config.annotate.clone())?;
    let sink = ConsoleSink::new(session.model, session.save_dir.clone())?;
    let camera = build_camera(session)?;

    let page = InferenceLoop::new(session.loop_config(), backend, sink, camera, renderer);
    page.load().await.context("Model failed to load")?;

    let outcome = match session.tab {
        SourceTab::Webcam => run_webcam(&page, session).await,
        SourceTab::Upload => match &session.upload {
            Some(path) => run_upload(&page, path).await,
            None => Ok(()),
        },
    };

    page.sink().finish();
    tracing::info!("Published {} result(s)", page.sink().published());
    outcome
}
