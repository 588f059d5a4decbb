use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

use billetes::codec::decode_data_url;
use billetes::config::{ClientConfig, DEFAULT_API_URL};
use billetes::media::{CameraProvider, FakeCamera, FfmpegCamera};
use billetes::render::{RenderedResult, ResultView, render_result};
use billetes::stream::{SessionEventKind, StreamSession, StreamView, WebSocketTransport};
use billetes::{ApiClient, ImageFile, UploadView};

#[derive(Parser)]
#[command(name = "billetes")]
#[command(about = "Classify Colombian banknotes with a remote detection service")]
struct Cli {
    /// Base URL of the detection backend
    #[arg(long, env = "BILLETES_API_URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    timeout_secs: u64,

    #[command(flatten)]
    camera: CameraArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args)]
struct CameraArgs {
    /// Capture device used when no rear camera is requested
    #[arg(long, value_name = "DEVICE", global = true)]
    device: Option<String>,

    /// Capture device that counts as the rear-facing camera
    #[arg(long, value_name = "DEVICE", global = true)]
    rear_device: Option<String>,

    /// Milliseconds between captured frames
    #[arg(long, default_value_t = 200, global = true)]
    interval_ms: u64,

    /// JPEG quality of transmitted frames (1-100)
    #[arg(long, default_value_t = 80, global = true)]
    jpeg_quality: u8,

    /// Use a synthetic test-pattern camera instead of a real device
    #[arg(long, global = true)]
    fake_camera: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Open the desktop application (default)
    Gui,

    /// Classify a single image
    Predict {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Write the annotated image returned by the server to this path
        #[arg(long, value_name = "PATH")]
        save_annotated: Option<PathBuf>,
    },

    /// Check whether the backend is up
    Health,

    /// Stream camera frames and print live results
    Stream {
        /// Stop after this many live results
        #[arg(long)]
        frames: Option<u64>,

        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .init();

    let config = build_config(&args)?;
    let camera: Arc<dyn CameraProvider> = if args.camera.fake_camera {
        Arc::new(FakeCamera::new())
    } else {
        Arc::new(FfmpegCamera::new(config.camera.clone()))
    };

    match args.command {
        None | Some(Command::Gui) => run_gui(config, camera),
        Some(command) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(run_command(command, config, camera))
        }
    }
}

fn build_config(args: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config =
        ClientConfig::new(&args.api_url)?.with_request_timeout(Duration::from_secs(args.timeout_secs));

    if let Some(device) = &args.camera.device {
        config.camera.default_device = device.clone();
    }
    config.camera.environment_device = args.camera.rear_device.clone();
    config.stream.frame_interval = Duration::from_millis(args.camera.interval_ms.max(1));
    config.stream.jpeg_quality = args.camera.jpeg_quality.clamp(1, 100);

    tracing::info!("Backend: {}", config.api_url);
    Ok(config)
}

#[cfg(feature = "gui")]
fn run_gui(config: ClientConfig, camera: Arc<dyn CameraProvider>) -> anyhow::Result<()> {
    billetes::gui::run(config, camera)
}

#[cfg(not(feature = "gui"))]
fn run_gui(_config: ClientConfig, _camera: Arc<dyn CameraProvider>) -> anyhow::Result<()> {
    anyhow::bail!("built without the `gui` feature; use `predict`, `health` or `stream`")
}

async fn run_command(
    command: Command,
    config: ClientConfig,
    camera: Arc<dyn CameraProvider>,
) -> anyhow::Result<()> {
    match command {
        Command::Gui => anyhow::bail!("the GUI runs on its own event loop"),
        Command::Predict {
            image_path,
            save_annotated,
        } => predict(&config, image_path, save_annotated).await,
        Command::Health => health(&config).await,
        Command::Stream { frames, seconds } => stream(&config, camera, frames, seconds).await,
    }
}

async fn predict(
    config: &ClientConfig,
    image_path: PathBuf,
    save_annotated: Option<PathBuf>,
) -> anyhow::Result<()> {
    let client = ApiClient::new(config)?;
    let mut view = UploadView::new();

    let file = ImageFile::from_path(&image_path).await?;
    view.select(file)?;

    let result = match view.submit_with(&client).await {
        Ok(result) => result.clone(),
        Err(e) => anyhow::bail!("{}", e.alert_message()),
    };

    println!("\n=== Resultados ===");
    print_rendered(&render_result(&result, ResultView::Upload));

    if let Some(path) = save_annotated {
        let bytes = decode_data_url(&result.annotated_image)?;
        tokio::fs::write(&path, bytes).await?;
        println!("\nImagen anotada guardada en {}", path.display());
    }
    Ok(())
}

async fn health(config: &ClientConfig) -> anyhow::Result<()> {
    let client = ApiClient::new(config)?;
    let status = client.health().await?;
    println!("status: {}", status.status);
    println!("model_loaded: {}", status.model_loaded);
    println!("gpu_available: {}", status.gpu_available);
    if !status.is_healthy() {
        anyhow::bail!("backend is not ready");
    }
    Ok(())
}

async fn stream(
    config: &ClientConfig,
    camera: Arc<dyn CameraProvider>,
    max_results: Option<u64>,
    seconds: Option<u64>,
) -> anyhow::Result<()> {
    let mut view = StreamView::new();
    view.begin_start();

    let started = StreamSession::start(config, camera.as_ref(), &WebSocketTransport).await;
    let mut events = match started {
        Ok((session, events)) => {
            view.started(Ok(session));
            events
        }
        Err(e) => {
            let message = e.alert_message();
            view.started(Err(e));
            anyhow::bail!(message);
        }
    };

    let deadline = tokio::time::sleep(seconds.map_or(Duration::MAX, Duration::from_secs));
    tokio::pin!(deadline);
    let mut results = 0u64;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = &mut deadline => break,
            event = events.next() => {
                let Some(event) = event else { break };
                let show = matches!(event.kind, SessionEventKind::Detection(_));
                let terminal = event.kind.is_terminal();
                view.handle(event);

                if show && let Some(live) = view.latest() {
                    results += 1;
                    println!("\n--- Resultado en vivo #{results} ---");
                    print_rendered(&render_result(&live.result, ResultView::Live));
                }
                if terminal {
                    break;
                }
                if max_results.is_some_and(|max| results >= max) {
                    break;
                }
            }
        }
    }

    view.stop();
    if let Some(error) = view.error() {
        anyhow::bail!("{error}");
    }
    Ok(())
}

fn print_rendered(rendered: &RenderedResult) {
    println!("Billetes detectados: {}", rendered.detected);
    println!("Valor total: {}", rendered.total_display());
    println!("{}: {}", rendered.timing_label, rendered.timing);
    for card in &rendered.cards {
        match rendered.view {
            ResultView::Upload => println!("  {} {} - {}", card.icon, card.message, card.confidence),
            ResultView::Live => println!("  {} {}", card.icon, card.label),
        }
    }
}
