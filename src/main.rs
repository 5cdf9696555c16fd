//! CLI entry point for sfdev-guide

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sfdev_guide::commands::progress::ProgressAction;
use sfdev_guide::Guide;

#[derive(Parser)]
#[command(name = "sfdev-guide")]
#[command(version)]
#[command(about = "Static site generator for a Salesforce development curriculum", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new guide with sample sections and topics
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Create a new topic from the scaffold
    New {
        /// Title of the new topic
        title: String,

        /// Section key the topic belongs to
        #[arg(short, long)]
        section: String,

        /// Position within the section (defaults to after the last topic)
        #[arg(short, long)]
        order: Option<i64>,

        /// beginner, intermediate or advanced
        #[arg(long)]
        difficulty: Option<String>,
    },

    /// Generate static files
    #[command(alias = "g")]
    Generate {
        /// Watch for file changes
        #[arg(short, long)]
        watch: bool,
    },

    /// Start a local server
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Enable static mode (no file watching)
        #[arg(long)]
        r#static: bool,
    },

    /// Clean the public folder
    Clean,

    /// List curriculum information
    List {
        /// Type of content to list (topics, sections, difficulty, tags)
        #[arg(default_value = "topics")]
        r#type: String,
    },

    /// Show or change learner progress
    Progress {
        #[command(subcommand)]
        action: Option<ProgressCommand>,
    },

    /// Report missing prerequisites, cycles and unknown sections
    Check,

    /// Display version information
    Version,
}

#[derive(Subcommand)]
enum ProgressCommand {
    /// Print overall and per-section progress
    Show,
    /// Mark a topic as completed
    Complete { slug: String },
    /// Mark a topic as not completed
    Undo { slug: String },
    /// Forget all completed topics
    Reset,
}

impl From<ProgressCommand> for ProgressAction {
    fn from(command: ProgressCommand) -> Self {
        match command {
            ProgressCommand::Show => ProgressAction::Show,
            ProgressCommand::Complete { slug } => ProgressAction::Complete(slug),
            ProgressCommand::Undo { slug } => ProgressAction::Undo(slug),
            ProgressCommand::Reset => ProgressAction::Reset,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "sfdev_guide=debug,info"
    } else {
        "sfdev_guide=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            sfdev_guide::commands::init::init_site(&target_dir)?;
            println!("Initialized guide in {:?}", target_dir);
        }

        Commands::New {
            title,
            section,
            order,
            difficulty,
        } => {
            let guide = Guide::new(&base_dir)?;
            let path = sfdev_guide::commands::new::create_topic(
                &guide,
                &title,
                &section,
                order,
                difficulty.as_deref(),
            )?;
            println!("Created: {:?}", path);
        }

        Commands::Generate { watch } => {
            let guide = Guide::new(&base_dir)?;
            tracing::info!("Generating static files...");
            guide.generate()?;

            if watch {
                sfdev_guide::commands::generate::watch(&guide).await?;
            }
        }

        Commands::Server {
            port,
            ip,
            open,
            r#static,
        } => {
            let guide = Guide::new(&base_dir)?;
            sfdev_guide::server::start(&guide, &ip, port, !r#static, open).await?;
        }

        Commands::Clean => {
            let guide = Guide::new(&base_dir)?;
            guide.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { r#type } => {
            let guide = Guide::new(&base_dir)?;
            sfdev_guide::commands::list::run(&guide, &r#type)?;
        }

        Commands::Progress { action } => {
            let guide = Guide::new(&base_dir)?;
            let action = action.map(ProgressAction::from).unwrap_or(ProgressAction::Show);
            sfdev_guide::commands::progress::run(&guide, action)?;
        }

        Commands::Check => {
            let guide = Guide::new(&base_dir)?;
            let issues = sfdev_guide::commands::check::run(&guide)?;
            if !issues.is_empty() {
                std::process::exit(1);
            }
        }

        Commands::Version => {
            println!("sfdev-guide version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
