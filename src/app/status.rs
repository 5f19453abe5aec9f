use convokit::config::Config;

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

pub fn render_status(config: &Config) -> String {
    let memory = &config.memory;
    let mut lines = vec![
        "◆ convokit status".to_string(),
        String::new(),
        format!("Version     {}", env!("CARGO_PKG_VERSION")),
        format!("Config      {}", config.config_path.display()),
        String::new(),
        format!(
            "  Provider      {}",
            config.default_provider.as_deref().unwrap_or("groq")
        ),
        format!(
            "  Model         {}",
            config.default_model.as_deref().unwrap_or("(default)")
        ),
        format!("  Temperature   {:.2}", config.default_temperature),
        format!(
            "  API key       {}",
            if config.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
                "configured"
            } else {
                "from environment"
            }
        ),
        String::new(),
        format!("  Context size  {}", memory.max_context_size),
        format!("  System msgs   {}", on_off(memory.include_system_prompts)),
        format!(
            "  Snapshots     {} (every {} messages, model {})",
            on_off(memory.long_term_memory_enabled),
            memory.summarization_threshold,
            memory.summary_model
        ),
        String::new(),
        format!("  Sessions dir  {}", config.data_dir().display()),
    ];

    match config.remote_identity() {
        Some(user_id) => {
            lines.push(format!(
                "  Remote store  {} (user {user_id})",
                config.remote_db_path().display()
            ));
        }
        None => lines.push("  Remote store  off (no identity)".to_string()),
    }

    lines.join("\n")
}
