mod commands;
mod config;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{Actor, EXIT_AUTH, EXIT_FAILURE, EXIT_STORE_ERROR};
use config::CliConfig;
use larder_core::{DonationId, Engine};
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_STORE: &str = "~/.local/share/larder";

#[derive(Debug, Parser)]
#[command(
    name = "larder",
    version,
    about = "Donation tracking for providers and receivers"
)]
struct Cli {
    /// Path to the Larder store directory [default: ~/.local/share/larder].
    #[arg(long, global = true)]
    store: Option<String>,

    /// Path to a TOML config file [default: ~/.config/larder/config.toml].
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    /// User acting on the store.
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Password of the acting user (prompted on a terminal when omitted).
    #[arg(long, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create an empty store.
    Init,
    /// Manage user accounts.
    User {
        #[command(subcommand)]
        action: UserCommand,
    },
    /// Check the --user / --password pair.
    Login,
    /// Manage registered barcodes.
    Barcode {
        #[command(subcommand)]
        action: BarcodeCommand,
    },
    /// Start, list, claim, and complete donations.
    Donation {
        #[command(subcommand)]
        action: DonationCommand,
    },
    /// Add items to a donation.
    Item {
        #[command(subcommand)]
        action: ItemCommand,
    },
    /// Verify store integrity.
    VerifyStore,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum UserCommand {
    /// Create a user under --user, or update the mask of one it owns.
    ///
    /// On an empty store no --user is needed: the first user becomes root
    /// with every permission.
    Add {
        /// New user id.
        user_id: String,
        /// Mask as 0b1010, 0xa, 10, or names joined by '+' (organization+provider).
        #[arg(long, default_value = "none")]
        permissions: String,
        /// Password for the new user (prompted on a terminal when omitted).
        #[arg(long)]
        new_password: Option<String>,
    },
    /// List all users.
    List,
    /// Change the password of --user.
    Passwd {
        /// Replacement password (prompted on a terminal when omitted).
        #[arg(long)]
        new_password: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum BarcodeCommand {
    /// Register a barcode.
    Add {
        code: String,
        title: String,
        unit: String,
    },
    /// List registered barcodes.
    List,
}

#[derive(Debug, Subcommand)]
enum DonationCommand {
    /// Start a donation as provider --user.
    Start {
        /// Create the donation already claimed by this receiver.
        #[arg(long)]
        receiver: Option<String>,
    },
    /// List a provider's donations (defaults to --user).
    List {
        #[arg(long)]
        provider: Option<String>,
        /// Include donations that are not completed.
        #[arg(long, default_value_t = false)]
        pending: bool,
        /// Include completed donations.
        #[arg(long, default_value_t = false)]
        completed: bool,
    },
    /// List every donation that has not been completed.
    Open,
    /// List donations claimed by receiver --user.
    History {
        /// Include donations that are not completed.
        #[arg(long, default_value_t = false)]
        pending: bool,
        /// Include completed donations.
        #[arg(long, default_value_t = false)]
        completed: bool,
    },
    /// Show a donation and its items.
    Show { id: DonationId },
    /// Claim a pending donation as receiver --user.
    Claim { id: DonationId },
    /// Mark a donation completed; --user must be its provider or receiver.
    Complete { id: DonationId },
}

#[derive(Debug, Subcommand)]
enum ItemCommand {
    /// Add an item by title, count, and unit.
    Add {
        donation: DonationId,
        title: String,
        #[arg(allow_negative_numbers = true)]
        count: i64,
        unit: String,
    },
    /// Add an item by registered barcode.
    Scan {
        donation: DonationId,
        code: String,
        /// Units scanned; values below 1 count as 1 [default: config or 1].
        #[arg(long, allow_negative_numbers = true)]
        count: Option<i64>,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("LARDER_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => CliConfig::load(path),
        None => CliConfig::load_default(),
    };
    let config = match config {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("error: {msg}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let store = cli
        .store
        .as_deref()
        .or(config.store.as_deref())
        .unwrap_or(DEFAULT_STORE);
    let store_path = expand_tilde(store);
    tracing::debug!("using store at {}", store_path.display());
    let engine = Engine::new(&store_path);
    let json = cli.json;
    let actor = Actor {
        user: cli.user.as_deref(),
        password: cli.password.as_deref(),
    };

    let result = match cli.command {
        Commands::Init => commands::init::run(&engine, json),
        Commands::User { action } => match action {
            UserCommand::Add {
                user_id,
                permissions,
                new_password,
            } => commands::user::add(
                &engine,
                &actor,
                &user_id,
                &permissions,
                new_password.as_deref(),
                json,
            ),
            UserCommand::List => commands::user::list(&engine, json),
            UserCommand::Passwd { new_password } => {
                commands::user::passwd(&engine, &actor, new_password.as_deref(), json)
            }
        },
        Commands::Login => commands::login::run(&engine, &actor, json),
        Commands::Barcode { action } => match action {
            BarcodeCommand::Add { code, title, unit } => {
                commands::barcode::add(&engine, &code, &title, &unit, json)
            }
            BarcodeCommand::List => commands::barcode::list(&engine, json),
        },
        Commands::Donation { action } => match action {
            DonationCommand::Start { receiver } => {
                commands::donation::start(&engine, &actor, receiver.as_deref(), json)
            }
            DonationCommand::List {
                provider,
                pending,
                completed,
            } => commands::donation::list(
                &engine,
                provider.as_deref().or(actor.user),
                commands::status_filter(pending, completed),
                json,
            ),
            DonationCommand::Open => commands::donation::open(&engine, json),
            DonationCommand::History { pending, completed } => commands::donation::history(
                &engine,
                &actor,
                commands::status_filter(pending, completed),
                json,
            ),
            DonationCommand::Show { id } => commands::donation::show(&engine, id, json),
            DonationCommand::Claim { id } => commands::donation::claim(&engine, &actor, id, json),
            DonationCommand::Complete { id } => {
                commands::donation::complete(&engine, &actor, id, json)
            }
        },
        Commands::Item { action } => match action {
            ItemCommand::Add {
                donation,
                title,
                count,
                unit,
            } => commands::item::add(&engine, &actor, donation, &title, count, &unit, json),
            ItemCommand::Scan {
                donation,
                code,
                count,
            } => commands::item::scan(
                &engine,
                &actor,
                donation,
                &code,
                count.or(config.default_scan_count).unwrap_or(1),
                json,
            ),
        },
        Commands::VerifyStore => commands::verify_store::run(&engine, json),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("invalid credentials")
        || msg.starts_with("permission denied")
        || msg.starts_with("ownership conflict")
    {
        EXIT_AUTH
    } else if msg.starts_with("store error:")
        || msg.starts_with("store inconsistency:")
        || msg.starts_with("I/O error:")
    {
        EXIT_STORE_ERROR
    } else {
        EXIT_FAILURE
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
