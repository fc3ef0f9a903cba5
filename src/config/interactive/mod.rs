
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password, Select};

use super::{ChatConfig, Config, NotionConfig, OllamaConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Notion RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Notion Configuration").bold().yellow());
    eprintln!("Configure access to the Notion workspace to index.");
    eprintln!();

    configure_notion(&mut config.notion)?;

    eprintln!();
    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure the local Ollama instance used for embeddings and answers.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;
    configure_chat(&mut config.chat)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama)? {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before indexing.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Notion Settings:").bold().yellow());
    let token_display = if config.notion.token.is_empty() {
        style("(not set)").red()
    } else {
        style("(configured)").green()
    };
    eprintln!("  Token: {}", token_display);
    eprintln!("  API Version: {}", style(&config.notion.version).cyan());
    eprintln!(
        "  Default Page: {}",
        style(config.notion.default_page_id.as_deref().unwrap_or("(none)")).cyan()
    );
    eprintln!("  Max Depth: {}", style(config.notion.max_depth).cyan());
    eprintln!(
        "  Request Delay: {}ms",
        style(config.notion.request_delay_ms).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.ollama.embedding_model).cyan()
    );
    eprintln!("  Chat Model: {}", style(&config.ollama.chat_model).cyan());
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());

    eprintln!();
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Chat Settings:").bold().yellow());
    eprintln!("  Retrieval K: {}", style(config.chat.retrieval_k).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            let mut config = Config::default();
            if let Ok(dir) = Config::default_config_dir() {
                config.base_dir = dir;
            }
            Ok(config)
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_notion(notion: &mut NotionConfig) -> Result<()> {
    let token = Password::new()
        .with_prompt("Notion integration token")
        .allow_empty_password(!notion.token.is_empty())
        .interact()?;
    if !token.is_empty() {
        notion.token = token;
    }

    notion.version = Input::new()
        .with_prompt("Notion API version")
        .default(notion.version.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("API version cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let default_page: String = Input::new()
        .with_prompt("Default page id (blank for none)")
        .default(notion.default_page_id.clone().unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;
    notion.default_page_id = if default_page.trim().is_empty() {
        None
    } else {
        Some(default_page.trim().to_string())
    };

    notion.max_depth = Input::new()
        .with_prompt("Maximum recursion depth")
        .default(notion.max_depth)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (1..=16).contains(input) {
                Ok(())
            } else {
                Err("Depth must be between 1 and 16")
            }
        })
        .interact_text()?;

    notion.request_delay_ms = Input::new()
        .with_prompt("Delay between API requests (ms)")
        .default(notion.request_delay_ms)
        .validate_with(|input: &u64| -> Result<(), &str> {
            if *input <= 10_000 {
                Ok(())
            } else {
                Err("Delay must be at most 10000ms")
            }
        })
        .interact_text()?;

    Ok(())
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    ollama.protocol = protocols[protocol_index].to_string();

    ollama.host = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Host cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.port = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.embedding_model = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.embedding_model.clone())
        .validate_with(validate_model_name)
        .interact_text()?;

    ollama.chat_model = Input::new()
        .with_prompt("Chat model")
        .default(ollama.chat_model.clone())
        .validate_with(validate_model_name)
        .interact_text()?;

    ollama.batch_size = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(ollama.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    Ok(())
}

fn configure_chat(chat: &mut ChatConfig) -> Result<()> {
    chat.retrieval_k = Input::new()
        .with_prompt("Passages retrieved per question")
        .default(chat.retrieval_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=50).contains(input) {
                Ok(())
            } else {
                Err("Must be between 1 and 50")
            }
        })
        .interact_text()?;

    Ok(())
}

fn validate_model_name(input: &String) -> Result<(), &'static str> {
    if input.trim().is_empty() {
        Err("Model name cannot be empty")
    } else {
        Ok(())
    }
}

fn test_ollama_connection(ollama: &OllamaConfig) -> Result<bool> {
    let url = format!(
        "{}://{}:{}/api/version",
        ollama.protocol, ollama.host, ollama.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => Ok(true),
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => Ok(true),
        Err(_) => Ok(false),
    }
}
