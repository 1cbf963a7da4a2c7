use clap::{Args, Parser, Subcommand};
use colored::*;
use shotboard::{
    logger, mask_key, AspectRatio, AssetRole, Board, BoardAction, CredentialResolution,
    CredentialResolver, DataUri, FileCredentialStore, GeminiClient, GenerationOutcome, ImageSize,
    Shot, ShotUpdate, StoryCursor, Studio, StudioConfig, StudioError,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "shotboard", version, about = "Storyboard studio for AI fashion photography")]
struct Cli {
    /// Board file to work on
    #[arg(long, global = true)]
    board: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage the Gemini API key
    #[command(subcommand)]
    Key(KeyCommand),
    /// Manage reference images
    #[command(subcommand)]
    Asset(AssetCommand),
    /// Manage storyboard frames
    #[command(subcommand)]
    Shot(ShotCommand),
    /// Render one or more frames
    Generate {
        /// 1-based frame numbers
        #[arg(required = true)]
        frames: Vec<usize>,
        #[arg(long, default_value = "1K")]
        size: ImageSize,
    },
    /// Re-render a finished frame at a higher resolution with the same seed
    Upscale { frame: usize, size: ImageSize },
    /// Write a frame's image to disk
    Export {
        frame: usize,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Walk through every finished frame
    Story {
        /// Frame to start from, counted among finished frames
        #[arg(long, default_value_t = 1)]
        start: usize,
    },
}

#[derive(Subcommand)]
enum KeyCommand {
    Set { key: String },
    Show,
    Reset,
}

#[derive(Subcommand)]
enum AssetCommand {
    Add { role: AssetRole, path: PathBuf },
    Rm { role: AssetRole, name: String },
    Ls,
}

#[derive(Subcommand)]
enum ShotCommand {
    New,
    Rm { frame: usize },
    /// Move a frame to a new position
    Move { from: usize, to: usize },
    Prompt { frame: usize, text: String },
    /// Append an @mention of an asset to the prompt
    Mention { frame: usize, name: String },
    /// Toggle a garment on or off
    Garment { frame: usize, name: String },
    /// Select a model; naming the selected one, or none, clears it
    Model(Selection),
    /// Select a pose; naming the selected one, or none, clears it
    Pose(Selection),
    Ratio { frame: usize, ratio: AspectRatio },
    Ls {
        #[arg(long)]
        grid: bool,
    },
}

#[derive(Args)]
struct Selection {
    frame: usize,
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let dotenv_loaded = dotenv::dotenv().is_ok();
    let logger_config = if cli.verbose {
        logger::LoggerConfig::development()
    } else {
        logger::LoggerConfig::new().with_level(logger::LogLevel::Warn)
    };
    logger::init_with_config(logger_config)?;
    if !dotenv_loaded {
        log::debug!("No .env file found, using system environment variables");
    }

    let mut config = StudioConfig::from_env();
    if let Some(board) = cli.board {
        config = config.with_board_path(board);
    }
    let board_path = config.board_path();
    logger::log_startup_info("shotboard", env!("CARGO_PKG_VERSION"), &board_path);
    logger::log_config_info(&config);

    let credentials = CredentialResolver::new(Arc::new(FileCredentialStore::new(
        config.credentials_path(),
    )));
    let mut board = Board::open(&board_path, config.limits)?;

    match cli.command {
        Command::Key(cmd) => run_key(cmd, &credentials).await?,
        Command::Asset(cmd) => {
            run_asset(cmd, &mut board)?;
            board.save(&board_path)?;
        }
        Command::Shot(cmd) => {
            run_shot(cmd, &mut board)?;
            board.save(&board_path)?;
        }
        Command::Generate { frames, size } => {
            let mut ids = frames
                .iter()
                .map(|frame| shot_id(&board, *frame))
                .collect::<Result<Vec<_>, _>>()?;
            let mut seen = HashSet::new();
            ids.retain(|id| seen.insert(*id));
            let studio = open_studio(&config, credentials, board).await?;
            for id in &ids {
                studio.spawn_generation(*id, size);
            }
            studio.join_all().await;
            let board = studio.board().read().await;
            for id in ids {
                report_shot(&board, id);
            }
            board.save(&board_path)?;
        }
        Command::Upscale { frame, size } => {
            let id = shot_id(&board, frame)?;
            let studio = open_studio(&config, credentials, board).await?;
            let outcome = studio.upscale_shot(id, size).await?;
            if outcome == GenerationOutcome::Skipped {
                println!("Frame {} is already {}", frame, size);
            }
            let board = studio.board().read().await;
            report_shot(&board, id);
            board.save(&board_path)?;
        }
        Command::Export { frame, out } => {
            let path = export_frame(&board, frame, &out)?;
            println!("Saved {}", path.display());
        }
        Command::Story { start } => show_story(&board, start),
    }

    Ok(())
}

async fn run_key(cmd: KeyCommand, credentials: &CredentialResolver) -> shotboard::Result<()> {
    match cmd {
        KeyCommand::Set { key } => {
            let key = credentials.submit_key(&key)?;
            println!("API key saved: {}", mask_key(&key));
        }
        KeyCommand::Show => match credentials.resolve().await? {
            CredentialResolution::Found { key, source } => {
                println!("{} ({})", mask_key(&key), source)
            }
            CredentialResolution::NotFound => println!("No Key"),
        },
        KeyCommand::Reset => {
            credentials.reset()?;
            println!("Saved API key removed");
        }
    }
    Ok(())
}

fn run_asset(cmd: AssetCommand, board: &mut Board) -> shotboard::Result<()> {
    match cmd {
        AssetCommand::Add { role, path } => {
            let id = board.upload(role, &path)?;
            if let Some(asset) = board.assets().get(role, id) {
                println!("Added {} {}", role.as_str(), asset.mention().cyan());
            }
        }
        AssetCommand::Rm { role, name } => {
            let id = asset_id(board, role, &name)?;
            board.dispatch(BoardAction::RemoveAsset { role, id })?;
            println!("Removed {} @{}", role.as_str(), name.trim_start_matches('@'));
        }
        AssetCommand::Ls => {
            for role in AssetRole::ALL {
                let assets = board.assets().list(role);
                println!(
                    "{} ({}/{})",
                    role.title().bold(),
                    assets.len(),
                    board.limits().max_for(role)
                );
                if assets.is_empty() {
                    println!("  No {} added yet.", role.title().to_lowercase());
                }
                for asset in assets {
                    println!("  {}  {}", asset.mention().cyan(), asset.mime_type.bright_black());
                }
            }
        }
    }
    Ok(())
}

fn run_shot(cmd: ShotCommand, board: &mut Board) -> shotboard::Result<()> {
    match cmd {
        ShotCommand::New => {
            board.dispatch(BoardAction::CreateShot)?;
            println!("Created {}", Shot::frame_label(board.shots().len() - 1));
        }
        ShotCommand::Rm { frame } => {
            let id = shot_id(board, frame)?;
            board.dispatch(BoardAction::RemoveShot(id))?;
        }
        ShotCommand::Move { from, to } => {
            let (from, to) = (frame_index(board, from)?, frame_index(board, to)?);
            board.dispatch(BoardAction::ReorderShots { from, to })?;
        }
        ShotCommand::Prompt { frame, text } => {
            let id = shot_id(board, frame)?;
            board.dispatch(BoardAction::UpdateShot {
                id,
                update: ShotUpdate::new().with_prompt(text),
            })?;
        }
        ShotCommand::Mention { frame, name } => {
            let shot = shot_id(board, frame)?;
            let name = name.trim_start_matches('@').to_string();
            let known = AssetRole::ALL
                .iter()
                .any(|role| board.assets().find_by_name(*role, &name).is_some());
            if !known {
                log::warn!("No asset named @{} on this board", name);
            }
            board.dispatch(BoardAction::InsertMention { shot, name })?;
        }
        ShotCommand::Garment { frame, name } => {
            let shot = shot_id(board, frame)?;
            let garment = asset_id(board, AssetRole::Garment, &name)?;
            board.dispatch(BoardAction::ToggleGarment { shot, garment })?;
        }
        ShotCommand::Model(Selection { frame, name }) => {
            let shot = shot_id(board, frame)?;
            let model = name
                .map(|n| asset_id(board, AssetRole::Model, &n))
                .transpose()?;
            board.dispatch(BoardAction::SelectModel { shot, model })?;
        }
        ShotCommand::Pose(Selection { frame, name }) => {
            let shot = shot_id(board, frame)?;
            let pose = name
                .map(|n| asset_id(board, AssetRole::Pose, &n))
                .transpose()?;
            board.dispatch(BoardAction::SelectPose { shot, pose })?;
        }
        ShotCommand::Ratio { frame, ratio } => {
            let id = shot_id(board, frame)?;
            board.dispatch(BoardAction::UpdateShot {
                id,
                update: ShotUpdate::new().with_aspect_ratio(ratio),
            })?;
        }
        ShotCommand::Ls { grid } => {
            if grid {
                print_grid(board)
            } else {
                print_list(board)
            }
        }
    }
    Ok(())
}

async fn open_studio(
    config: &StudioConfig,
    credentials: CredentialResolver,
    board: Board,
) -> shotboard::Result<Studio> {
    if let CredentialResolution::NotFound = credentials.resolve().await? {
        eprintln!("{}", "API key required".red().bold());
        eprintln!("Run `shotboard key set <KEY>` or export API_KEY.");
        eprintln!("Get a key from Google AI Studio: https://aistudio.google.com/app/apikey");
        return Err(StudioError::MissingCredential);
    }

    let client = GeminiClient::new(config.gemini.clone(), credentials)?;
    let studio = Studio::new(board, Arc::new(client)).with_quota_observer(
        Arc::new(|_shot: Uuid, _message: &str| {
            eprintln!(
                "{} Your API key has reached its quota. Run `shotboard key set <KEY>` with a paid key.",
                "Quota exceeded.".yellow().bold()
            );
        }),
    );
    Ok(studio)
}

fn frame_index(board: &Board, frame: usize) -> shotboard::Result<usize> {
    let len = board.shots().len();
    if frame == 0 || frame > len {
        return Err(StudioError::InvalidIndex { index: frame, len });
    }
    Ok(frame - 1)
}

fn shot_id(board: &Board, frame: usize) -> shotboard::Result<Uuid> {
    let index = frame_index(board, frame)?;
    board
        .shots()
        .at(index)
        .map(|shot| shot.id)
        .ok_or(StudioError::InvalidIndex {
            index: frame,
            len: board.shots().len(),
        })
}

fn asset_id(board: &Board, role: AssetRole, name: &str) -> shotboard::Result<Uuid> {
    board
        .assets()
        .find_by_name(role, name)
        .map(|asset| asset.id)
        .ok_or_else(|| {
            StudioError::ConfigError(format!(
                "no {} named @{}",
                role.as_str(),
                name.trim_start_matches('@')
            ))
        })
}

fn status_of(shot: &Shot) -> ColoredString {
    if shot.is_generating {
        "generating".yellow()
    } else if let Some(error) = &shot.error {
        error.as_str().red()
    } else if shot.has_image() {
        format!("ready {}", shot.image_size).green()
    } else {
        "empty".bright_black()
    }
}

fn names(board: &Board, role: AssetRole, ids: &[Uuid]) -> String {
    ids.iter()
        .filter_map(|id| board.assets().get(role, *id))
        .map(|asset| asset.mention())
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_list(board: &Board) {
    if board.shots().is_empty() {
        println!("No frames yet. Run `shotboard shot new`.");
        return;
    }
    for (index, shot) in board.shots().iter().enumerate() {
        println!(
            "{}  [{}]  {}",
            Shot::frame_label(index).bold(),
            shot.aspect_ratio,
            status_of(shot)
        );
        let model: Vec<Uuid> = shot.selected_model_id.into_iter().collect();
        let pose: Vec<Uuid> = shot.selected_pose_id.into_iter().collect();
        println!("  model:    {}", names(board, AssetRole::Model, &model));
        println!("  pose:     {}", names(board, AssetRole::Pose, &pose));
        println!(
            "  garments: {}",
            names(board, AssetRole::Garment, &shot.selected_garment_ids)
        );
        println!("  prompt:   {}", shot.prompt.trim());
        if let Some(seed) = shot.seed {
            println!("  seed:     {}", seed);
        }
    }
}

fn print_grid(board: &Board) {
    const COLUMNS: usize = 4;
    let cells: Vec<String> = board
        .shots()
        .iter()
        .enumerate()
        .map(|(index, shot)| {
            let mark = if shot.is_generating {
                "…"
            } else if shot.error.is_some() {
                "!"
            } else if shot.has_image() {
                "■"
            } else {
                "□"
            };
            format!("{} {} {:<5}", mark, Shot::frame_label(index), shot.aspect_ratio)
        })
        .collect();
    for row in cells.chunks(COLUMNS) {
        println!("{}", row.join("   "));
    }
}

fn report_shot(board: &Board, id: Uuid) {
    let Some(index) = board.shots().index_of(id) else {
        return;
    };
    if let Some(shot) = board.shots().at(index) {
        println!("{}  {}", Shot::frame_label(index).bold(), status_of(shot));
    }
}

fn export_frame(board: &Board, frame: usize, out: &Path) -> shotboard::Result<PathBuf> {
    let index = frame_index(board, frame)?;
    let shot = board
        .shots()
        .at(index)
        .ok_or(StudioError::InvalidIndex { index: frame, len: board.shots().len() })?;
    let image = shot
        .generated_image
        .as_deref()
        .ok_or_else(|| StudioError::ConfigError(format!("frame {} has no image yet", frame)))?;
    let bytes = DataUri::parse(image)
        .ok_or_else(|| StudioError::ResponseError("stored image is not a data URI".into()))?
        .decode()
        .map_err(|e| StudioError::ResponseError(e.to_string()))?;

    std::fs::create_dir_all(out)?;
    let path = out.join(shot.download_name(index));
    std::fs::write(&path, bytes)?;
    Ok(path)
}

fn show_story(board: &Board, start: usize) {
    let frames = board.shots().generated().len();
    if frames == 0 {
        println!("No finished frames yet.");
        return;
    }

    let mut cursor = StoryCursor {
        index: start.saturating_sub(1).min(frames - 1),
    };
    for _ in 0..frames {
        if let Some(shot) = cursor.current(board) {
            println!(
                "{} / {}  {}  {}",
                cursor.index + 1,
                frames,
                shot.image_size,
                shot.prompt.trim()
            );
        }
        cursor.next(frames);
    }
}
