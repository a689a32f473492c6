use crate::{
    app::App,
    config::AppConfig,
    logging,
    record::{GameDraft, GameRecord, GameStatus},
    session::Session,
    store::ProfileStore,
    ui,
};
use anyhow::{anyhow, bail, Context, Result};
use log::LevelFilter;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GlobalOptions {
    format: OutputFormat,
    profile: Option<String>,
    data_dir: Option<PathBuf>,
    verbose: bool,
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            profile: None,
            data_dir: None,
            verbose: false,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum CliAction {
    Ui,
    Command(CliCommand),
}

#[derive(Debug, PartialEq, Eq)]
enum CliCommand {
    ProfilesList,
    ProfilesCreate(String),
    ProfilesDelete(String),
    GamesList { filter: Option<String> },
    GamesShow(usize),
    GamesAdd(GameDraft),
    GamesUpdate(usize, GameDraft),
    GamesDelete(usize),
    Help,
    Version,
}

pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (global, action) = parse_args(&args)?;

    match action {
        CliAction::Command(CliCommand::Help) => {
            print_help();
            Ok(())
        }
        CliAction::Command(CliCommand::Version) => {
            println!("GameShelf v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliAction::Ui => {
            let config = AppConfig::load_or_create(global.data_dir.as_deref())?;
            let logs = logging::init(&config.log_path(), log_level(&global))?;
            log::info!("GameShelf v{} starting", env!("CARGO_PKG_VERSION"));
            let mut app = App::initialize(config, logs)?;
            ui::run(&mut app)
        }
        CliAction::Command(command) => {
            let mut config = AppConfig::load_or_create(global.data_dir.as_deref())?;
            logging::init(&config.log_path(), log_level(&global))?;
            let store = ProfileStore::new(config.profiles_dir());
            let mut session = Session::open(store, config.last_profile.as_deref())
                .context("unable to load or create a profile")?;
            if let Some(profile) = &global.profile {
                session.switch_profile(profile)?;
            }
            if let Some(warning) = session.load_warning() {
                eprintln!("Warning: {warning}. The file was left untouched.");
            }
            run_command(&mut session, command, global.format)?;
            if global.profile.is_none() {
                config.remember_profile(session.active_profile())?;
            }
            Ok(())
        }
    }
}

fn log_level(global: &GlobalOptions) -> LevelFilter {
    if global.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn parse_args(args: &[String]) -> Result<(GlobalOptions, CliAction)> {
    let (global, tokens) = parse_global_options(args)?;
    let Some(head) = tokens.first() else {
        return Ok((global, CliAction::Ui));
    };

    let rest = &tokens[1..];
    let command = match head.as_str() {
        "--help" | "-h" | "help" => CliCommand::Help,
        "--version" | "-V" | "version" => CliCommand::Version,
        "profiles" => parse_profiles(rest)?,
        "games" => parse_games(rest)?,
        other => bail!("Unknown command: {other} (see --help)"),
    };
    Ok((global, CliAction::Command(command)))
}

fn parse_global_options(args: &[String]) -> Result<(GlobalOptions, Vec<String>)> {
    let mut global = GlobalOptions::default();
    let mut tokens = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(value) = arg.strip_prefix("--format=") {
            global.format = parse_format(value)?;
            continue;
        }
        if let Some(value) = arg.strip_prefix("--profile=") {
            global.profile = Some(value.to_string());
            continue;
        }
        if let Some(value) = arg.strip_prefix("--data-dir=") {
            global.data_dir = Some(PathBuf::from(value));
            continue;
        }
        match arg.as_str() {
            "--format" => {
                let value = iter.next().ok_or_else(|| anyhow!("--format requires a value"))?;
                global.format = parse_format(value)?;
            }
            "--profile" => {
                let value = iter.next().ok_or_else(|| anyhow!("--profile requires a name"))?;
                global.profile = Some(value.to_string());
            }
            "--data-dir" => {
                let value = iter.next().ok_or_else(|| anyhow!("--data-dir requires a path"))?;
                global.data_dir = Some(PathBuf::from(value));
            }
            "-v" | "--verbose" => global.verbose = true,
            _ => tokens.push(arg.to_string()),
        }
    }
    Ok((global, tokens))
}

fn parse_format(value: &str) -> Result<OutputFormat> {
    OutputFormat::parse(value).ok_or_else(|| anyhow!("Unknown format: {value} (use json or text)"))
}

fn parse_profiles(args: &[String]) -> Result<CliCommand> {
    let sub = args.first().map(|value| value.as_str()).unwrap_or("list");
    match sub {
        "list" => Ok(CliCommand::ProfilesList),
        "create" => Ok(CliCommand::ProfilesCreate(join_name(&args[1..], "create")?)),
        "delete" => Ok(CliCommand::ProfilesDelete(join_name(&args[1..], "delete")?)),
        _ => bail!("Unknown profiles command: {sub} (use 'list', 'create', or 'delete')"),
    }
}

fn join_name(args: &[String], action: &str) -> Result<String> {
    if args.is_empty() {
        bail!("profiles {action} requires a name");
    }
    Ok(args.join(" "))
}

fn parse_games(args: &[String]) -> Result<CliCommand> {
    let sub = args.first().map(|value| value.as_str()).unwrap_or("list");
    let rest = args.get(1..).unwrap_or(&[]);
    match sub {
        "list" => {
            let mut filter = None;
            let mut iter = rest.iter();
            while let Some(arg) = iter.next() {
                if arg == "--filter" {
                    let value = iter.next().ok_or_else(|| anyhow!("--filter requires a value"))?;
                    filter = Some(value.to_string());
                } else if let Some(value) = arg.strip_prefix("--filter=") {
                    filter = Some(value.to_string());
                } else {
                    bail!("Unexpected argument: {arg}");
                }
            }
            Ok(CliCommand::GamesList { filter })
        }
        "show" => Ok(CliCommand::GamesShow(parse_index(rest.first())?)),
        "delete" => Ok(CliCommand::GamesDelete(parse_index(rest.first())?)),
        "add" => Ok(CliCommand::GamesAdd(parse_draft(rest)?)),
        "update" => {
            let index = parse_index(rest.first())?;
            Ok(CliCommand::GamesUpdate(index, parse_draft(&rest[1..])?))
        }
        _ => bail!("Unknown games command: {sub} (use 'list', 'show', 'add', 'update', or 'delete')"),
    }
}

fn parse_index(value: Option<&String>) -> Result<usize> {
    let value = value.ok_or_else(|| anyhow!("a game index is required (see 'games list')"))?;
    value
        .parse()
        .with_context(|| format!("invalid game index: {value}"))
}

fn parse_draft(args: &[String]) -> Result<GameDraft> {
    let mut positional = Vec::new();
    let mut genre = String::new();
    let mut status = GameStatus::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--genre" => {
                genre = iter
                    .next()
                    .ok_or_else(|| anyhow!("--genre requires a value"))?
                    .to_string();
            }
            "--status" => {
                let value = iter.next().ok_or_else(|| anyhow!("--status requires a value"))?;
                status = parse_status(value)?;
            }
            value if value.starts_with("--genre=") => {
                genre = value.trim_start_matches("--genre=").to_string();
            }
            value if value.starts_with("--status=") => {
                status = parse_status(value.trim_start_matches("--status="))?;
            }
            _ => positional.push(arg.as_str()),
        }
    }
    let [title, platform] = positional.as_slice() else {
        bail!("expected <title> <platform>, got {} argument(s)", positional.len());
    };
    Ok(GameDraft::new(title, platform, &genre, status))
}

fn parse_status(value: &str) -> Result<GameStatus> {
    GameStatus::parse(value).ok_or_else(|| {
        anyhow!("Unknown status: {value} (use owned, in-progress, finished, or wishlisted)")
    })
}

fn run_command(session: &mut Session, command: CliCommand, format: OutputFormat) -> Result<()> {
    match command {
        CliCommand::ProfilesList => list_profiles(session, format),
        CliCommand::ProfilesCreate(name) => {
            let name = session.create_profile(&name)?;
            let path = session.store().profile_path(&name);
            println!("Profile created: {name} ({})", path.display());
            Ok(())
        }
        CliCommand::ProfilesDelete(name) => {
            session.delete_profile(&name)?;
            println!("Profile deleted: {name}");
            Ok(())
        }
        CliCommand::GamesList { filter } => list_games(session, filter.as_deref(), format),
        CliCommand::GamesShow(index) => {
            let record = session.select(index)?;
            let item = GameListItem::new(index, record);
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&item)?),
                OutputFormat::Text => {
                    println!("Title:    {}", item.title);
                    println!("Platform: {}", item.platform);
                    println!("Genre:    {}", item.genre);
                    println!("Status:   {}", record.status.label());
                }
            }
            Ok(())
        }
        CliCommand::GamesAdd(draft) => {
            let index = session.add(draft)?;
            println!("Added game #{index} to {}", active_label(session));
            Ok(())
        }
        CliCommand::GamesUpdate(index, draft) => {
            session.update(index, draft)?;
            println!("Updated game #{index} in {}", active_label(session));
            Ok(())
        }
        CliCommand::GamesDelete(index) => {
            let removed = session.delete(index)?;
            println!("Deleted {} ({})", removed.title, removed.platform);
            Ok(())
        }
        CliCommand::Help | CliCommand::Version => Ok(()),
    }
}

fn active_label(session: &Session) -> String {
    session.active_profile().unwrap_or("(none)").to_string()
}

#[derive(Serialize)]
struct ProfileListItem {
    name: String,
    active: bool,
}

fn list_profiles(session: &Session, format: OutputFormat) -> Result<()> {
    let items: Vec<ProfileListItem> = session
        .list_profiles()?
        .into_iter()
        .map(|name| ProfileListItem {
            active: session.active_profile() == Some(name.as_str()),
            name,
        })
        .collect();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        OutputFormat::Text => {
            for item in items {
                if item.active {
                    println!("* {}", item.name);
                } else {
                    println!("  {}", item.name);
                }
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct GameListItem {
    index: usize,
    title: String,
    platform: String,
    genre: String,
    status: GameStatus,
}

impl GameListItem {
    fn new(index: usize, record: &GameRecord) -> Self {
        Self {
            index,
            title: record.title.clone(),
            platform: record.platform.clone(),
            genre: record.genre.clone(),
            status: record.status,
        }
    }
}

fn list_games(session: &Session, filter: Option<&str>, format: OutputFormat) -> Result<()> {
    let needle = filter.map(|value| value.to_lowercase());
    let items: Vec<GameListItem> = session
        .sorted_view()
        .filter(|(_, record)| match &needle {
            Some(needle) => record.title.to_lowercase().contains(needle),
            None => true,
        })
        .map(|(index, record)| GameListItem::new(index, record))
        .collect();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        OutputFormat::Text => {
            if items.is_empty() {
                println!("No games in {}", active_label(session));
            }
            for item in &items {
                println!(
                    "{index:>4}  {title:<32} {platform:<12} {genre:<16} {status}",
                    index = item.index,
                    title = item.title,
                    platform = item.platform,
                    genre = item.genre,
                    status = item.status.label()
                );
            }
        }
    }

    Ok(())
}

fn print_help() {
    println!("GameShelf v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage:");
    println!("  gameshelf                                   Launch the TUI");
    println!("  gameshelf profiles [list]                   List profiles (* = active)");
    println!("  gameshelf profiles create <name>            Create and activate a profile");
    println!("  gameshelf profiles delete <name>            Delete a profile and its games");
    println!("  gameshelf games [list] [--filter <text>]    List games sorted by title");
    println!("  gameshelf games show <index>                Show one game");
    println!("  gameshelf games add <title> <platform>      Add a game");
    println!("  gameshelf games update <index> <title> <platform>");
    println!("  gameshelf games delete <index>              Delete a game");
    println!();
    println!("Game options:");
    println!("  --genre <genre>                 Genre (default: Unspecified)");
    println!("  --status <status>               owned | in-progress | finished | wishlisted");
    println!();
    println!("Global options:");
    println!("  --format <json|text>            Output format for list commands");
    println!("  --profile <name>                Profile to act on (default: last active)");
    println!("  --data-dir <path>               Override the data directory");
    println!("  -v, --verbose                   Debug logging");
    println!("  -h, --help                      Show help");
    println!("  -V, --version                   Show version");
    println!();
    println!("Indices are the ones printed by 'games list'.");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn no_arguments_launch_ui() {
        let (global, action) = parse_args(&[]).unwrap();
        assert_eq!(action, CliAction::Ui);
        assert_eq!(global, GlobalOptions::default());

        let (global, action) = parse_args(&args(&["--data-dir", "/tmp/shelf"])).unwrap();
        assert_eq!(action, CliAction::Ui);
        assert_eq!(global.data_dir, Some(PathBuf::from("/tmp/shelf")));
    }

    #[test]
    fn parses_global_options_anywhere() {
        let (global, action) =
            parse_args(&args(&["games", "--format=json", "list", "--profile", "Arcade"])).unwrap();
        assert_eq!(global.format, OutputFormat::Json);
        assert_eq!(global.profile.as_deref(), Some("Arcade"));
        assert_eq!(action, CliAction::Command(CliCommand::GamesList { filter: None }));
    }

    #[test]
    fn parses_profile_commands() {
        let (_, action) = parse_args(&args(&["profiles"])).unwrap();
        assert_eq!(action, CliAction::Command(CliCommand::ProfilesList));
        let (_, action) = parse_args(&args(&["profiles", "create", "Retro", "Handhelds"])).unwrap();
        assert_eq!(
            action,
            CliAction::Command(CliCommand::ProfilesCreate("Retro Handhelds".to_string()))
        );
        assert!(parse_args(&args(&["profiles", "delete"])).is_err());
        assert!(parse_args(&args(&["profiles", "rename", "x"])).is_err());
    }

    #[test]
    fn parses_game_add_and_update() {
        let (_, action) = parse_args(&args(&[
            "games", "add", "Tetris", "GB", "--status", "wishlist", "--genre=Puzzle",
        ]))
        .unwrap();
        assert_eq!(
            action,
            CliAction::Command(CliCommand::GamesAdd(GameDraft::new(
                "Tetris",
                "GB",
                "Puzzle",
                GameStatus::Wishlisted
            )))
        );

        let (_, action) =
            parse_args(&args(&["games", "update", "2", "Tetris DX", "GBC"])).unwrap();
        assert_eq!(
            action,
            CliAction::Command(CliCommand::GamesUpdate(
                2,
                GameDraft::new("Tetris DX", "GBC", "", GameStatus::Owned)
            ))
        );
    }

    #[test]
    fn rejects_bad_game_arguments() {
        assert!(parse_args(&args(&["games", "add", "Tetris"])).is_err());
        assert!(parse_args(&args(&["games", "delete", "first"])).is_err());
        assert!(parse_args(&args(&["games", "add", "A", "B", "--status", "lost"])).is_err());
        assert!(parse_args(&args(&["--format", "xml", "games"])).is_err());
        assert!(parse_args(&args(&["launch"])).is_err());
    }

    #[test]
    fn list_accepts_filter() {
        let (_, action) = parse_args(&args(&["games", "list", "--filter", "zel"])).unwrap();
        assert_eq!(
            action,
            CliAction::Command(CliCommand::GamesList {
                filter: Some("zel".to_string())
            })
        );
    }
}
