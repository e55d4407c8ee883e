use anyhow::{Result, anyhow};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod compose;
mod config;
mod dom;
mod drag;
mod export;
mod handler;
mod ollama;
mod preview;
mod project;
mod selector;
mod transform;
mod tui;
mod ui;

use app::App;
use config::Config;
use tui::EventHandler;

/// Logs go to a file; stderr belongs to the terminal UI.
fn init_tracing() -> Result<()> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?
        .join("maqueta");
    std::fs::create_dir_all(&data_dir)?;
    let log_file = std::fs::File::create(data_dir.join("maqueta.log"))?;

    tracing_subscriber::fmt()
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("maqueta=info")),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let config = Config::load_or_init()?;
    let mut app = App::new(config);
    info!(model = %app.model, "starting");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let reports = events.sender();

    let result = run(&mut app, &mut terminal, &mut events, &reports).await;

    tui::restore()?;
    result
}

async fn run(
    app: &mut App,
    terminal: &mut tui::Tui,
    events: &mut EventHandler,
    reports: &tokio::sync::mpsc::UnboundedSender<tui::AppEvent>,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;
        if let Some(event) = events.next().await {
            handler::handle_event(app, event, reports).await?;
        } else {
            break;
        }
    }
    Ok(())
}
