use clap::{Parser, Subcommand};
use notion_rag::Result;
use notion_rag::commands::{ask, chat, delete_page, index_page, list_pages, show_status};
use notion_rag::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "notion-rag")]
#[command(about = "A retrieval-augmented chat assistant over a Notion workspace")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Notion and Ollama connection settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Index a Notion page tree
    Index {
        /// Page id to index (defaults to the configured default page)
        page_id: Option<String>,
        /// Optional title for the page
        #[arg(long)]
        title: Option<String>,
    },
    /// List all indexed pages
    List,
    /// Delete an indexed page
    Delete {
        /// Page id to delete
        page_id: String,
    },
    /// Ask a single question against the index
    Ask {
        /// The question to answer
        question: String,
    },
    /// Start an interactive chat session
    Chat,
    /// Show connectivity and index status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Index { page_id, title } => {
            index_page(page_id, title).await?;
        }
        Commands::List => {
            list_pages().await?;
        }
        Commands::Delete { page_id } => {
            delete_page(page_id).await?;
        }
        Commands::Ask { question } => {
            ask(question).await?;
        }
        Commands::Chat => {
            chat().await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["notion-rag", "list"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::List);
        }
    }

    #[test]
    fn index_command_with_page_id() {
        let cli = Cli::try_parse_from(["notion-rag", "index", "abc123"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Index { page_id, title } = parsed.command {
                assert_eq!(page_id, Some("abc123".to_string()));
                assert_eq!(title, None);
            }
        }
    }

    #[test]
    fn index_command_without_page_id() {
        let cli = Cli::try_parse_from(["notion-rag", "index"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Index { page_id, .. } = parsed.command {
                assert_eq!(page_id, None);
            }
        }
    }

    #[test]
    fn index_command_with_title() {
        let cli = Cli::try_parse_from([
            "notion-rag",
            "index",
            "abc123",
            "--title",
            "Team Handbook",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Index { page_id, title } = parsed.command {
                assert_eq!(page_id, Some("abc123".to_string()));
                assert_eq!(title, Some("Team Handbook".to_string()));
            }
        }
    }

    #[test]
    fn ask_command_requires_question() {
        let cli = Cli::try_parse_from(["notion-rag", "ask"]);
        assert!(cli.is_err());

        let cli = Cli::try_parse_from(["notion-rag", "ask", "What is the onboarding process?"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { question } = parsed.command {
                assert_eq!(question, "What is the onboarding process?");
            }
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["notion-rag", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["notion-rag", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["notion-rag", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
