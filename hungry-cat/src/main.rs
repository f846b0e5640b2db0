use clap::Parser;
use dotenvy::dotenv;
use hungry_cat::simulator::{
    RandomClassifier, RandomObjectDetector, SimulatedCamera, SimulatedMicrophone,
};
use hungry_cat::{init_logging, Config, HungryCatService};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about)]
/// Detect a hungry cat from simulated camera and microphone input.
struct Cli {
    /// JSON configuration file
    #[arg(long, env = "HUNGRY_CAT_CONFIG")]
    config: Option<PathBuf>,
    /// Rate of the simulated camera
    #[arg(long, env = "CAMERA_FPS", default_value_t = 30)]
    camera_fps: u32,
    /// Expire channel flags older than this many milliseconds
    #[arg(long, env = "STALE_AFTER_MS")]
    stale_after_ms: Option<u64>,
    /// Chance that one audio cycle hears a meow
    #[arg(long, default_value_t = 0.2)]
    meow_probability: f64,
    /// Chance that one camera cycle sees a cat
    #[arg(long, default_value_t = 0.3)]
    cat_probability: f64,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if cli.stale_after_ms.is_some() {
        config.stale_after_ms = cli.stale_after_ms;
    }
    config.validate()?;

    let service = HungryCatService::new(
        &config,
        SimulatedMicrophone::default(),
        RandomClassifier::new(cli.meow_probability),
        RandomObjectDetector::new(cli.cat_probability),
    );
    let mut events = service.subscribe_composite();
    service.start()?;
    let camera = SimulatedCamera::spawn(Arc::clone(service.vision()), cli.camera_fps);

    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(state) => {
                    let verdict = if state.hungry { "HUNGRY CAT" } else { "no hungry cat" };
                    println!("{verdict} (cat: {}, meow: {})", state.vision, state.audio);
                }
                Err(RecvError::Lagged(n)) => warn!("subscriber lagged by {n} events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    info!("press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    camera.stop();
    service.stop().await;
    printer.abort();
    Ok(())
}
