use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use keepsake::config::KeepsakeConfig;

mod cli;

#[derive(Parser)]
#[command(name = "keepsake", version, about = "Semantic memory journal with AI-powered recall")]
struct Cli {
    /// User whose journal to operate on
    #[arg(long, global = true, default_value = "default")]
    user: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a new memory
    Remember {
        /// The memory text
        content: String,
        /// Optional title
        #[arg(long)]
        title: Option<String>,
        /// People mentioned (repeatable)
        #[arg(long = "person")]
        people: Vec<String>,
        /// Tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Where it happened
        #[arg(long)]
        location: Option<String>,
    },
    /// Search memories by meaning
    Recall {
        /// Natural-language query
        query: String,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete a memory
    Forget {
        /// Memory id
        id: String,
    },
    /// Generate and list nudges
    Nudge {
        #[command(subcommand)]
        action: NudgeAction,
    },
    /// Manage people
    People {
        #[command(subcommand)]
        action: PeopleAction,
    },
    /// Analyze emotional patterns over recent memories
    Patterns,
    /// Rebuild the vector index from stored memories
    Reindex,
}

#[derive(Subcommand)]
enum NudgeAction {
    /// Generate a fresh batch of nudges
    Generate,
    /// List active nudges
    List {
        /// Only show unread nudges
        #[arg(long)]
        unread: bool,
    },
    /// Mark a nudge as read
    Read { id: String },
    /// Mark a nudge as actioned
    Action { id: String },
}

#[derive(Subcommand)]
enum PeopleAction {
    /// Add a person
    Add {
        name: String,
        #[arg(long)]
        relationship: Option<String>,
    },
    /// List all people
    List,
    /// Remove a person (fails while memories still reference them)
    Remove { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let config = KeepsakeConfig::load()?;

    // Log to stderr so stdout stays clean for command output
    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let service = cli::build_service(config)?;
    let user = &args.user;

    match args.command {
        Command::Remember {
            content,
            title,
            people,
            tags,
            location,
        } => {
            cli::remember::run(&service, user, content, title, people, tags, location).await?;
        }
        Command::Recall { query, limit } => {
            cli::recall::run(&service, user, &query, limit).await?;
        }
        Command::Forget { id } => {
            service.delete_memory(user, &id)?;
            println!("Memory {id} deleted.");
        }
        Command::Nudge { action } => match action {
            NudgeAction::Generate => cli::nudge::generate(&service, user).await?,
            NudgeAction::List { unread } => cli::nudge::list(&service, user, unread)?,
            NudgeAction::Read { id } => {
                service.mark_nudge_read(user, &id)?;
                println!("Marked as read.");
            }
            NudgeAction::Action { id } => {
                service.mark_nudge_actioned(user, &id)?;
                println!("Marked as actioned.");
            }
        },
        Command::People { action } => match action {
            PeopleAction::Add { name, relationship } => {
                let person = service.add_person(user, &name, relationship)?;
                println!("Added {} ({})", person.name, person.id);
            }
            PeopleAction::List => cli::people::list(&service, user)?,
            PeopleAction::Remove { id } => {
                service.delete_person(user, &id)?;
                println!("Person {id} removed.");
            }
        },
        Command::Patterns => cli::maintenance::patterns(&service, user).await?,
        Command::Reindex => cli::maintenance::reindex(&service, user)?,
    }

    Ok(())
}
