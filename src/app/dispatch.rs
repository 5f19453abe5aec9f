use crate::cli::commands::{Cli, Commands};
use anyhow::{Result, bail};
use convokit::chat::ChatSession;
use convokit::config::Config;
use convokit::memory::{MemoryRegistry, MemoryStoreFactory, Message};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::app::status::render_status;

const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// One line per message: short id, role, content, attachment.
pub fn format_message(message: &Message) -> String {
    let short_id: String = message.id.chars().take(8).collect();
    let mut line = format!(
        "{} {short_id} {:<9} {}",
        message.timestamp.format("%Y-%m-%d %H:%M"),
        message.role.as_ref(),
        message.content
    );
    if let Some(url) = &message.image_url {
        line.push_str(&format!(" [image: {url}]"));
    }
    if message.pending {
        line.push_str(" (pending)");
    }
    line
}

fn print_messages(messages: &[Message]) {
    if messages.is_empty() {
        println!("(no messages)");
        return;
    }
    for message in messages {
        println!("{}", format_message(message));
    }
}

async fn run_chat(
    config: &Config,
    session_id: &str,
    message: Option<String>,
    image: Option<String>,
    model_override: Option<String>,
) -> Result<()> {
    let model = model_override
        .or_else(|| config.default_model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let factory = MemoryStoreFactory::from_config(config).await?;
    let provider = factory.provider();
    let mut registry = MemoryRegistry::new(factory);
    let store = registry.activate(session_id).await;
    let chat = ChatSession::new(store, provider, model);

    if let Some(text) = message {
        let reply = chat.send(&text, image.as_deref()).await?;
        println!("{}", reply.content);
        return Ok(());
    }

    info!(session_id, model = chat.model(), "reading messages from stdin (/quit to stop)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut image = image;
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if matches!(text, "/quit" | "/exit") {
            break;
        }
        match chat.send(text, image.take().as_deref()).await {
            Ok(reply) => println!("{}", reply.content),
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(())
}

async fn run_memory_command(config: &Config, command: Commands) -> Result<()> {
    let factory = MemoryStoreFactory::from_config(config).await?;
    let mut registry = MemoryRegistry::new(factory);

    match command {
        Commands::History { session } => {
            let store = registry.activate(&session).await;
            print_messages(store.lock().await.messages());
        }

        Commands::Search { session, query } => {
            let store = registry.activate(&session).await;
            print_messages(&store.lock().await.search_messages(&query));
        }

        Commands::Context { session, no_system } => {
            let store = registry.activate(&session).await;
            let store = store.lock().await;
            let include_system = !no_system && store.config().include_system_prompts;
            print_messages(&store.context_window(include_system));
        }

        Commands::Branch { session } => {
            let store = registry.activate(&session).await;
            let branch_id = store.lock().await.create_branch().await;
            println!("{branch_id}");
        }

        Commands::Delete {
            session,
            message_id,
        } => {
            let store = registry.activate(&session).await;
            if !store.lock().await.delete_message(&message_id).await {
                bail!("no message {message_id} in session {session}");
            }
            println!("Deleted {message_id}");
        }

        Commands::Snapshot { session } => {
            let store = registry.activate(&session).await;
            let mut store = store.lock().await;
            if store.messages().is_empty() {
                bail!("session {session} has no messages to summarize");
            }
            let snapshot = store.create_memory_snapshot().await;
            println!(
                "Snapshot {} covers {} messages",
                snapshot.id,
                snapshot.message_ids.len()
            );
            println!("{}", snapshot.summary);
        }

        Commands::Chat { .. } | Commands::Status => unreachable!(),
    }
    Ok(())
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Status => {
            println!("{}", render_status(&config));
            Ok(())
        }

        Commands::Chat {
            session,
            message,
            image,
            provider,
            model,
        } => {
            let mut config = config;
            if let Some(provider) = provider {
                let trimmed = provider.trim();
                if trimmed.is_empty() {
                    bail!("--provider cannot be empty");
                }
                config.default_provider = Some(trimmed.to_string());
            }
            run_chat(&config, &session, message, image, model).await
        }

        other => run_memory_command(&config, other).await,
    }
}
