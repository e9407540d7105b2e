use std::path::PathBuf;

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tracing_subscriber::EnvFilter;

use playsync::{cli, config, utils, warning};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Print debug logs of the sync engine to stderr
    #[clap(long, short, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show the track playing on the active device
    Now,

    /// Follow playback live
    Watch(WatchOptions),

    /// Toggle play/pause
    Toggle,

    /// Search for a track and play the best match
    Play(PlayOptions),

    /// Seek within the current track
    Seek(SeekOptions),

    /// Set the device volume
    Volume(VolumeOptions),

    /// Show lyrics for the current track
    Lyrics,

    /// Manage the cached Spotify token
    Token(TokenOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct WatchOptions {
    /// Print lyrics whenever the track changes
    #[clap(long)]
    pub lyrics: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct PlayOptions {
    /// Search terms, e.g. artist and title
    #[clap(required = true)]
    pub query: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct SeekOptions {
    /// Target position as m:ss or milliseconds
    #[clap(value_parser = utils::parse_position)]
    pub position: u64,
}

#[derive(Parser, Debug, Clone)]
pub struct VolumeOptions {
    /// Volume in percent, clamped to 0-100
    #[clap(allow_negative_numbers = true)]
    pub percent: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct TokenOptions {
    #[command(subcommand)]
    pub command: TokenSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TokenSubcommand {
    /// Import a token JSON into the local cache
    Import(TokenImportOpts),
    /// Show the state of the cached token
    Status,
}

#[derive(Parser, Debug, Clone)]
pub struct TokenImportOpts {
    /// Path to the token JSON
    pub file: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "playsync=debug" } else { "playsync=error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = config::load_env().await {
        warning!("Cannot load environment. Err: {}", e);
    }

    match cli.command {
        Command::Now => cli::now().await,
        Command::Watch(opt) => cli::watch(opt.lyrics).await,
        Command::Toggle => cli::toggle().await,
        Command::Play(opt) => cli::play(opt.query.join(" ")).await,
        Command::Seek(opt) => cli::seek(opt.position).await,
        Command::Volume(opt) => cli::volume(opt.percent).await,
        Command::Lyrics => cli::lyrics().await,
        Command::Token(opt) => match opt.command {
            TokenSubcommand::Import(i) => cli::import_token(i.file).await,
            TokenSubcommand::Status => cli::token_status().await,
        },
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
