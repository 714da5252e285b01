use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use eyre::Result;
use tracing_subscriber::EnvFilter;

use ava_cli::config::{AuthConfig, CliConfig};
use ava_cli::session_store;

mod commands;

#[derive(Parser)]
#[command(name = "ava", version, about = "Ask questions against your knowledge bases")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with your user-pool credentials
    Login {
        #[arg(long, short)]
        username: String,
        #[arg(long, env = "AVA_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List the models chat requests can use
    Models {
        #[arg(long)]
        json: bool,
    },
    /// List the knowledge bases you can query
    KnowledgeBases {
        #[arg(long)]
        json: bool,
    },
    /// Ask a question and wait for the answer
    Ask(AskArgs),
}

#[derive(Args)]
struct AskArgs {
    /// Knowledge base id
    #[arg(long, short = 'k')]
    knowledge_base: String,
    /// Model ARN
    #[arg(long, short)]
    model: String,
    #[arg(long, default_value_t = 4096)]
    max_tokens: u32,
    #[arg(long, default_value_t = 0.0)]
    temperature: f32,
    #[arg(long, default_value_t = 0.9)]
    top_p: f32,
    /// Stop sequence; repeat for more than one
    #[arg(long = "stop")]
    stop: Vec<String>,
    /// File holding a custom prompt template
    #[arg(long)]
    template_file: Option<PathBuf>,
    /// Give up waiting for the answer after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Print the raw response payload
    #[arg(long)]
    json: bool,
    #[arg(required = true, trailing_var_arg = true)]
    message: Vec<String>,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if std::env::var("AVA_LOG_JSON").is_ok_and(|v| v == "1") {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();
    let dir = session_store::default_dir()?;

    match cli.command {
        Command::Login { username, password } => {
            let auth = AuthConfig::from_env()?;
            commands::login(&auth, &dir, &username, password).await
        }
        Command::Logout => {
            let auth = AuthConfig::from_env()?;
            commands::logout(&auth, &dir).await
        }
        Command::Whoami => {
            let auth = AuthConfig::from_env()?;
            commands::whoami(&auth, &dir).await
        }
        Command::Models { json } => {
            let config = CliConfig::from_env()?;
            commands::models(&config, &dir, json).await
        }
        Command::KnowledgeBases { json } => {
            let config = CliConfig::from_env()?;
            commands::knowledge_bases(&config, &dir, json).await
        }
        Command::Ask(args) => {
            let config = CliConfig::from_env()?;
            let opts = commands::AskOptions {
                knowledge_base: args.knowledge_base,
                model: args.model,
                max_tokens: args.max_tokens,
                temperature: args.temperature,
                top_p: args.top_p,
                stop: args.stop,
                template_file: args.template_file,
                timeout: args.timeout_secs.map(Duration::from_secs),
                json: args.json,
                message: args.message.join(" "),
            };
            commands::ask(&config, &dir, opts).await
        }
    }
}
