//! gitpop - CLI entry point.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use dialoguer::{Confirm, Input, MultiSelect, Select};
use secrecy::ExposeSecret;
use tracing_subscriber::EnvFilter;

use gitpop::config::{FileSettingsStore, SettingsStore};
use gitpop::error::{GenerationError, SessionError};
use gitpop::git::Git2Engine;
use gitpop::llm::{ProviderConfig, ProviderKind, ProviderRegistry};
use gitpop::session::{CommitOutcome, Session, SessionState};

/// Stage some of your changes, let an AI write the commit message, commit just those files.
#[derive(Parser, Debug)]
#[command(name = "gitpop")]
#[command(about = "Stage some of your changes, let an AI write the commit message, commit just those files")]
#[command(version)]
struct Cli {
    /// Directory to open (defaults to the current directory)
    #[arg(short = 'C', long = "path", value_name = "DIR", global = true)]
    path: Option<String>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List pending changes
    Status {
        /// Print the changes as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the diff that would be sent to the AI provider
    Diff(Selection),
    /// Print a generated commit message for the selected files
    Generate(Selection),
    /// Commit the selected files
    Commit {
        #[command(flatten)]
        selection: Selection,

        /// Commit message (generated when omitted)
        #[arg(short, long)]
        message: Option<String>,

        /// Never generate a message; require -m
        #[arg(long)]
        no_generate: bool,

        /// Commit without asking for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Choose files interactively, then generate and commit (default)
    Pick,
    /// Create a git repository in the directory
    Init,
    /// List models installed in the local Ollama service
    Models,
    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
struct Selection {
    /// Stage a changed path (repeatable)
    #[arg(long = "stage", value_name = "PATH")]
    stage: Vec<String>,

    /// Stage every changed path
    #[arg(long)]
    all: bool,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the current settings
    Show,
    /// Change one setting (an empty value removes it)
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = FileSettingsStore::default_location().context("Failed to locate settings")?;
    let start_dir = resolve_start_dir(cli.path.as_deref())?;

    match cli.command.unwrap_or(Command::Pick) {
        Command::Status { json } => status(start_dir, json),
        Command::Diff(selection) => {
            let config = load_config(&store)?;
            let session = open_selected(start_dir, &selection)?;
            let diff = session.diff(config.diff_budget)?;
            print!("{}", diff);
            Ok(())
        }
        Command::Generate(selection) => {
            let config = load_config(&store)?;
            let session = open_selected(start_dir, &selection)?;
            let message = generate(&session, &config).await?;
            println!("{}", message);
            Ok(())
        }
        Command::Commit {
            selection,
            message,
            no_generate,
            yes,
        } => {
            let config = load_config(&store)?;
            let session = open_selected(start_dir, &selection)?;
            commit(session, &config, message, no_generate, yes).await
        }
        Command::Pick => {
            let config = load_config(&store)?;
            pick(start_dir, &config).await
        }
        Command::Init => init(start_dir),
        Command::Models => {
            let config = load_config(&store)?;
            models(&config).await
        }
        Command::Config { action } => match action {
            ConfigAction::Show => show_config(&store),
            ConfigAction::Set { key, value } => {
                store.set(&key, &value)?;
                if key == "api_key" {
                    println!("api_key {}", if value.trim().is_empty() { "removed" } else { "updated" });
                } else {
                    println!("{} = {}", key, value.trim());
                }
                Ok(())
            }
        },
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("warn,gitpop=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// The directory to open. Strips the stray trailing quote Windows shell
/// verbs leave on `"%V"` arguments.
fn resolve_start_dir(arg: Option<&str>) -> Result<PathBuf> {
    match arg.map(|a| a.trim().trim_end_matches('"').trim()) {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => std::env::current_dir().context("Failed to read the current directory"),
    }
}

fn load_config(store: &FileSettingsStore) -> Result<ProviderConfig> {
    store
        .load()
        .with_context(|| format!("Failed to load settings from {}", store.path().display()))
}

fn open_session(start_dir: PathBuf) -> Result<Session<Git2Engine>> {
    Session::open(start_dir, Git2Engine, ProviderRegistry::new())
        .context("Failed to read repository status")
}

fn open_selected(start_dir: PathBuf, selection: &Selection) -> Result<Session<Git2Engine>> {
    let mut session = open_session(start_dir)?;
    if session.state() == SessionState::NotARepository {
        return Err(SessionError::NotARepository(session.repo_path().to_path_buf()).into());
    }

    if selection.all {
        let paths: Vec<String> = session.changes().iter().map(|c| c.path.clone()).collect();
        for path in paths {
            session.set_staged(&path, true);
        }
    }
    for path in &selection.stage {
        let normalized = path.replace('\\', "/");
        let normalized = normalized.trim_start_matches("./");
        if !session.set_staged(normalized, true) {
            bail!("{} has no pending changes", path);
        }
    }
    Ok(session)
}

fn status(start_dir: PathBuf, json: bool) -> Result<()> {
    let session = open_session(start_dir)?;
    if session.state() == SessionState::NotARepository {
        println!(
            "{} is not a git repository. Run `gitpop init` to create one.",
            session.repo_path().display()
        );
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(session.changes())?);
        return Ok(());
    }

    if session.changes().is_empty() {
        println!("Nothing to commit, working tree clean");
        return Ok(());
    }
    for change in session.changes() {
        println!("  {}  {}", change.kind.code(), change.path);
    }
    Ok(())
}

async fn generate(session: &Session<Git2Engine>, config: &ProviderConfig) -> Result<String> {
    eprintln!(
        "Generating commit message with {} ({})...",
        config.kind, config.model
    );
    session
        .generate_message(config)
        .await
        .map_err(|e| explain(e, config))
}

async fn commit(
    mut session: Session<Git2Engine>,
    config: &ProviderConfig,
    message: Option<String>,
    no_generate: bool,
    yes: bool,
) -> Result<()> {
    let (message, generated) = match message {
        Some(m) => (m, false),
        None if no_generate || !config.auto_generate => {
            bail!("No commit message given. Pass one with -m.")
        }
        None => (generate(&session, config).await?, true),
    };

    if generated && !yes {
        println!("\n{}\n", message);
        let proceed = Confirm::new()
            .with_prompt("Commit with this message?")
            .default(true)
            .interact()
            .context("Failed to read confirmation")?;
        if !proceed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let outcome = session.commit(Some(&message), config).await?;
    print_outcome(&outcome);
    Ok(())
}

async fn pick(start_dir: PathBuf, config: &ProviderConfig) -> Result<()> {
    let mut session = open_session(start_dir)?;

    if session.state() == SessionState::NotARepository {
        let create = Confirm::new()
            .with_prompt(format!(
                "{} is not a git repository. Initialize one here?",
                session.repo_path().display()
            ))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !create {
            return Ok(());
        }
        session.initialize()?;
        println!("Initialized empty repository in {}", session.repo_path().display());
    }

    if session.changes().is_empty() {
        println!("Nothing to commit, working tree clean");
        return Ok(());
    }

    let items: Vec<String> = session
        .changes()
        .iter()
        .map(|c| format!("{}  {}", c.kind.code(), c.path))
        .collect();
    let chosen = MultiSelect::new()
        .with_prompt("Select files to commit (space to toggle, enter to confirm)")
        .items(&items)
        .interact_opt()
        .context("Failed to read selection")?;

    let Some(chosen) = chosen else {
        println!("Cancelled.");
        return Ok(());
    };
    if chosen.is_empty() {
        println!("No files selected.");
        return Ok(());
    }

    let paths: Vec<String> = chosen
        .iter()
        .filter_map(|&i| session.changes().get(i).map(|c| c.path.clone()))
        .collect();
    for path in &paths {
        session.set_staged(path, true);
    }

    let Some(message) = choose_message(&session, config).await? else {
        println!("Cancelled.");
        return Ok(());
    };

    let outcome = session.commit(Some(&message), config).await?;
    print_outcome(&outcome);
    Ok(())
}

/// Generate, regenerate or type a message until the user commits or cancels.
async fn choose_message(
    session: &Session<Git2Engine>,
    config: &ProviderConfig,
) -> Result<Option<String>> {
    let mut message = String::new();
    if config.auto_generate {
        match generate(session, config).await {
            Ok(generated) => message = generated,
            Err(e) => eprintln!("{:#}", e),
        }
    }

    loop {
        if message.trim().is_empty() {
            message = Input::<String>::new()
                .with_prompt("Commit message")
                .interact_text()
                .context("Failed to read commit message")?;
            continue;
        }

        println!("\n{}\n", message);
        let choice = Select::new()
            .with_prompt("What now?")
            .items(&["Commit", "Regenerate", "Edit", "Cancel"])
            .default(0)
            .interact()
            .context("Failed to read choice")?;

        match choice {
            0 => return Ok(Some(message)),
            1 => match generate(session, config).await {
                Ok(generated) => message = generated,
                Err(e) => eprintln!("{:#}", e),
            },
            2 => {
                message = Input::<String>::new()
                    .with_prompt("Commit message")
                    .with_initial_text(message.lines().next().unwrap_or_default())
                    .interact_text()
                    .context("Failed to read commit message")?;
            }
            _ => return Ok(None),
        }
    }
}

fn print_outcome(outcome: &CommitOutcome) {
    let oid = outcome.oid.to_string();
    let short: String = oid.chars().take(7).collect();
    let summary = outcome.message.lines().next().unwrap_or_default();
    println!("[{}] {}", short, summary);
    println!(" {} file(s) committed", outcome.files.len());
}

fn init(start_dir: PathBuf) -> Result<()> {
    let mut session = open_session(start_dir)?;
    if session.state() == SessionState::Ready {
        println!("{} is already inside a git repository", session.repo_path().display());
        return Ok(());
    }
    session.initialize()?;
    println!("Initialized empty repository in {}", session.repo_path().display());
    Ok(())
}

async fn models(config: &ProviderConfig) -> Result<()> {
    let models = ProviderRegistry::new()
        .local_models(config)
        .await
        .map_err(|e| explain(SessionError::Generation(e), &ProviderConfig::default()))?;

    if models.is_empty() {
        println!("No local models installed. Pull one with `ollama pull <model>`.");
        return Ok(());
    }
    for model in models {
        println!("{}", model);
    }
    Ok(())
}

fn show_config(store: &FileSettingsStore) -> Result<()> {
    let config = load_config(store)?;
    let credential = match &config.credential {
        Some(key) if !key.expose_secret().is_empty() => "set",
        _ => "unset",
    };

    println!("settings file:  {}", store.path().display());
    println!("provider:       {}", config.kind.key());
    println!("model:          {}", config.model);
    println!("api_key:        {}", credential);
    if let Some(url) = config.kind.base_url() {
        println!("base_url:       {}", url);
    }
    println!("local_endpoint: {}", config.endpoints.local);
    println!("timeout_secs:   {}", config.timeout.as_secs());
    println!("diff_budget:    {}", config.diff_budget);
    println!("auto_generate:  {}", config.auto_generate);
    Ok(())
}

/// Attach a next step to errors the user can fix locally.
fn explain(err: SessionError, config: &ProviderConfig) -> anyhow::Error {
    match &err {
        SessionError::Generation(GenerationError::ProviderUnreachable { .. })
            if config.kind == ProviderKind::Local =>
        {
            let hint = if which::which("ollama").is_ok() {
                "Ollama is installed but not answering. Start it with `ollama serve`."
            } else {
                "Ollama does not seem to be installed. Get it from https://ollama.com or pick another provider with `gitpop config set provider <name>`."
            };
            anyhow!("{}\n{}", err, hint)
        }
        SessionError::Generation(GenerationError::ProviderAuthError { .. }) => anyhow!(
            "{}\nSet a key with `gitpop config set api_key <KEY>` or the GITPOP_API_KEY environment variable.",
            err
        ),
        _ => err.into(),
    }
}
