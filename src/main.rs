//! prompt-forge: prompt engineering studio
//!
//! - `serve` runs the auth gateway
//! - everything else drives the local studio (generation, history, training
//!   examples, theme, sign-in) against the state directory

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use prompt_forge::auth;
use prompt_forge::client::AuthClient;
use prompt_forge::config::{ForgeConfig, CONFIG};
use prompt_forge::llm::GeminiClient;
use prompt_forge::state::{FileStore, KeyValueStore, StateSync};
use prompt_forge::studio::{Completion, Studio};
use prompt_forge::types::{AuthProvider, ModelLength, Persona, PromptMode, Theme, Tone};

/// Gateway session token, kept next to the studio state
const SESSION_TOKEN_KEY: &str = "session_token";

#[derive(Parser)]
#[command(name = "prompt-forge", version)]
#[command(about = "Turn rough intents into optimized LLM prompts")]
struct Cli {
    /// State directory (history, examples, user, theme)
    #[arg(long, global = true, env = "FORGE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the auth gateway
    Serve {
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },

    /// Generate (or improve) a prompt and record it in history
    Generate {
        /// What the prompt should do, or the draft to improve
        #[arg(required = true, num_args = 1..)]
        intent: Vec<String>,

        #[arg(long, short = 'p')]
        persona: Option<Persona>,

        /// Defaults to the persona's tone
        #[arg(long, short = 't')]
        tone: Option<Tone>,

        #[arg(long, short = 'l', default_value = "medium")]
        length: ModelLength,

        #[arg(long, short = 'm', default_value = "generate")]
        mode: PromptMode,

        /// Gemini model name
        #[arg(long, env = "FORGE_MODEL")]
        model: Option<String>,
    },

    /// Past generations, most recent first
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Training examples used for few-shot conditioning
    Examples {
        #[command(subcommand)]
        action: ExamplesAction,
    },

    /// Theme preference
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },

    /// Sign in through the auth gateway
    Login {
        #[command(subcommand)]
        method: LoginMethod,
    },

    /// Sign out locally and end the gateway session
    Logout,

    /// Show the signed-in user
    Whoami,
}

#[derive(Subcommand)]
enum HistoryAction {
    List {
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },
    Show {
        id: String,
    },
    Clear,
}

#[derive(Subcommand)]
enum ExamplesAction {
    List,
    Add {
        #[arg(long, short = 'i')]
        input: String,
        #[arg(long, short = 'o')]
        output: String,
    },
    Delete {
        id: String,
    },
    Clear,
}

#[derive(Subcommand)]
enum ThemeAction {
    Show,
    Toggle,
    Set { theme: Theme },
}

#[derive(Subcommand)]
enum LoginMethod {
    Email {
        email: String,
        #[arg(long, env = "FORGE_PASSWORD")]
        password: String,
    },
    /// Print the Google login URL to open in a browser
    Google,
    /// Print the GitHub login URL to open in a browser
    Github,
    /// Finish a browser login with the session cookie it left behind
    Token {
        /// Value of the `forge.sid` cookie
        #[arg(env = "FORGE_SESSION_TOKEN")]
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays pipeable
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&CONFIG.log_level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = CONFIG.clone();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            auth::run(config).await
        }
        command => run_studio(config, command).await,
    }
}

async fn run_studio(config: ForgeConfig, command: Command) -> Result<()> {
    let store = FileStore::open(&config.data_dir)
        .with_context(|| format!("Failed to open state directory {}", config.data_dir.display()))?;
    let mut studio = Studio::open(StateSync::new(store.clone()));

    match command {
        Command::Serve { .. } => bail!("serve does not use the studio state"),

        Command::Generate {
            intent,
            persona,
            tone,
            length,
            mode,
            model,
        } => {
            let mut config = config;
            if let Some(model) = model {
                config.gemini_model = model;
            }

            studio.set_intent(intent.join(" "));
            if let Some(persona) = persona {
                studio.set_persona(persona);
            }
            if let Some(tone) = tone {
                studio.set_tone(tone);
            }
            studio.set_length(length);
            studio.set_mode(mode);

            let provider =
                GeminiClient::from_config(&config).context("Failed to build Gemini client")?;
            info!(model = provider.model(), mode = %mode, "Generating prompt");

            match studio.generate(&provider).await? {
                Completion::Stored(item) => {
                    println!("{}", item.generated_prompt);
                }
                Completion::Failed(e) => {
                    warn!("Generation failed: {}", e);
                    bail!("{}", e.user_message());
                }
                Completion::Stale => {}
            }
        }

        Command::History { action } => match action {
            HistoryAction::List { limit } => {
                let items = studio.history();
                if items.is_empty() {
                    println!("No history yet.");
                }
                for item in items.iter().take(limit.unwrap_or(usize::MAX)) {
                    let when = chrono::DateTime::from_timestamp_millis(item.timestamp)
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default();
                    let persona = item.persona.unwrap_or_default();
                    println!("{}  {}  [{}]  {}", item.id, when, persona, item.intent);
                }
            }
            HistoryAction::Show { id } => {
                studio.load_history_item(&id)?;
                println!("Intent:  {}", studio.intent());
                println!(
                    "Persona: {}  Tone: {}  Length: {}  Mode: {}",
                    studio.persona(),
                    studio.tone(),
                    studio.length(),
                    studio.mode()
                );
                println!();
                if let Some(result) = studio.result() {
                    println!("{}", result.text());
                }
            }
            HistoryAction::Clear => {
                studio.clear_history()?;
                println!("History cleared.");
            }
        },

        Command::Examples { action } => match action {
            ExamplesAction::List => {
                if studio.examples().is_empty() {
                    println!("No training examples.");
                }
                for example in studio.examples() {
                    println!("{}", example.id);
                    println!("  input:  {}", example.input);
                    println!("  output: {}", example.output);
                }
            }
            ExamplesAction::Add { input, output } => {
                let example = studio.add_example(input, output)?;
                println!("Added example {}", example.id);
            }
            ExamplesAction::Delete { id } => {
                if !studio.delete_example(&id)? {
                    bail!("No example with id '{}'", id);
                }
                println!("Deleted example {}", id);
            }
            ExamplesAction::Clear => {
                studio.save_examples(Vec::new())?;
                println!("Training examples cleared.");
            }
        },

        Command::Theme { action } => {
            let theme = match action {
                ThemeAction::Show => studio.theme(),
                ThemeAction::Toggle => studio.toggle_theme()?,
                ThemeAction::Set { theme } => {
                    studio.set_theme(theme)?;
                    theme
                }
            };
            println!("{}", theme);
        }

        Command::Login { method } => {
            let client = AuthClient::new(&config.api_url)?;
            match method {
                LoginMethod::Email { email, password } => {
                    let (user, token) = client.login_with_email(&email, &password).await?;
                    store.set(SESSION_TOKEN_KEY, &token)?;
                    println!("Signed in as {} <{}>", user.name, user.email);
                    studio.login(user)?;
                }
                LoginMethod::Google => print_browser_login(&client, AuthProvider::Google),
                LoginMethod::Github => print_browser_login(&client, AuthProvider::Github),
                LoginMethod::Token { token } => {
                    let user = client.resume_session(&token).await?;
                    store.set(SESSION_TOKEN_KEY, token.trim())?;
                    println!("Signed in as {} <{}> via {}", user.name, user.email, user.provider);
                    studio.login(user)?;
                }
            }
        }

        Command::Logout => {
            if let Some(token) = store.get(SESSION_TOKEN_KEY)? {
                let client = AuthClient::new(&config.api_url)?;
                if let Err(e) = client.logout(&token).await {
                    warn!("Gateway logout failed: {:#}", e);
                }
                store.remove(SESSION_TOKEN_KEY)?;
            }
            studio.logout()?;
            println!("Signed out.");
        }

        Command::Whoami => {
            let remote = match store.get(SESSION_TOKEN_KEY)? {
                Some(token) => AuthClient::new(&config.api_url)?
                    .current_user(&token)
                    .await
                    .unwrap_or_else(|e| {
                        warn!("Could not reach auth gateway: {:#}", e);
                        None
                    }),
                None => None,
            };

            match remote.or_else(|| studio.user().cloned()) {
                Some(user) => {
                    println!("{} <{}> via {}", user.name, user.email, user.provider);
                }
                None => println!("Not signed in."),
            }
        }
    }

    Ok(())
}

fn print_browser_login(client: &AuthClient, provider: AuthProvider) {
    println!("Open {}", client.login_url(provider));
    println!(
        "After signing in, copy the {} cookie and run: prompt-forge login token <value>",
        prompt_forge::auth::SESSION_COOKIE
    );
}
