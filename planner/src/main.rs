use std::sync::Arc;

use anyhow::Context;
use planner::{
    commands::{Command, CommandError, HELP},
    config::PlannerConfig,
    db::{self, InMemoryPlacesBackend, PgPlacesRepository, PlacesBackend},
    error::SessionError,
    map::MapInteractionController,
    services::{DirectionsProvider, GeocodeProvider, MapboxClient},
    utils::auth::{Identity, SessionContext},
};
use shared_types::FavoriteUpdate;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env file for local development
    // Try the parent directory first (running from planner/), then the current one
    dotenvy::from_filename("../.env")
        .or_else(|_| dotenvy::dotenv())
        .ok();

    // Logs go to stderr so stdout carries only command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,planner=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Tracing initialized");

    let config = PlannerConfig::from_env().context("Failed to load configuration")?;
    let provider = Arc::new(MapboxClient::new(&config).context("Failed to build Mapbox client")?);

    match config.database_url.clone() {
        Some(url) => {
            let pool = db::pool::connect(&url)
                .await
                .context("Failed to initialize database pool")?;
            run(config, provider, Arc::new(PgPlacesRepository::new(pool))).await
        }
        None => run(config, provider, Arc::new(InMemoryPlacesBackend::new())).await,
    }
}

async fn run<P, B>(config: PlannerConfig, provider: Arc<P>, backend: Arc<B>) -> anyhow::Result<()>
where
    P: GeocodeProvider + DirectionsProvider,
    B: PlacesBackend,
{
    let session = SessionContext::new();
    let mut subscription = session.subscribe();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut controller = MapInteractionController::new(
        config.controller_settings(),
        provider,
        backend,
        session.clone(),
        tx,
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", HELP);
    print_state(&controller)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(Command::Help) => println!("{}", HELP),
                    Ok(command) => {
                        execute(&mut controller, &session, config.jwt_secret.as_deref(), command);
                        print_state(&controller)?;
                    }
                    Err(CommandError::Empty) => {}
                    Err(e) => println!("{}", e),
                }
            }
            Some(completion) = rx.recv() => {
                controller.apply(completion);
                print_state(&controller)?;
            }
            changed = subscription.changed() => {
                changed?;
                controller.on_session_changed();
                print_state(&controller)?;
            }
        }
    }

    tracing::info!("Bye");
    Ok(())
}

fn execute<P, B>(
    controller: &mut MapInteractionController<P, B>,
    session: &SessionContext,
    jwt_secret: Option<&str>,
    command: Command,
) where
    P: GeocodeProvider + DirectionsProvider,
    B: PlacesBackend,
{
    match command {
        Command::Click(coord) => controller.on_map_click(coord),
        Command::Mode(mode) => controller.set_mode(mode),
        Command::Search(text) => controller.set_query(&text),
        Command::Select(index) => {
            if !controller.select_result(index) {
                println!("No search result {}", index + 1);
            }
        }
        Command::Dismiss => controller.dismiss_search_results(),
        Command::Close => controller.clear_focus(),
        Command::Locate(position) => controller.on_geolocate(position),
        Command::Move { center, zoom } => controller.on_map_move(center, zoom),
        Command::Directions => {
            if !controller.get_directions_to_focus() {
                println!("Select a search result first");
            }
        }
        Command::FavAdd(notes) => {
            if !controller.add_focus_to_favorites(notes) {
                println!("Sign in and select a place to save it");
            }
        }
        Command::FavGo(id) => {
            if !controller.get_directions_to_favorite(&id) {
                println!("No favorite {}", id);
            }
        }
        Command::FavRename { id, name } => {
            let update = FavoriteUpdate {
                place_name: Some(name),
                notes: None,
            };
            if !controller.update_favorite(&id, update) {
                println!("No favorite {}", id);
            }
        }
        Command::FavNote { id, notes } => {
            let update = FavoriteUpdate {
                place_name: None,
                notes: Some(notes),
            };
            if !controller.update_favorite(&id, update) {
                println!("No favorite {}", id);
            }
        }
        Command::FavRm(id) => {
            if !controller.delete_favorite(&id) {
                println!("No favorite {}", id);
            }
        }
        Command::Saved => controller.load_saved_places(),
        Command::Login(token) => {
            let identity = jwt_secret
                .ok_or(SessionError::MissingSecret)
                .and_then(|secret| Identity::from_token(&token, secret));
            match identity {
                Ok(identity) => session.sign_in(identity),
                Err(e) => println!("Login failed: {}", e),
            }
        }
        Command::Logout => session.sign_out(),
        Command::Show | Command::Help | Command::Quit => {}
    }
}

fn print_state<P, B>(controller: &MapInteractionController<P, B>) -> anyhow::Result<()>
where
    P: GeocodeProvider + DirectionsProvider,
    B: PlacesBackend,
{
    println!("{}", serde_json::to_string_pretty(&controller.snapshot())?);
    Ok(())
}
