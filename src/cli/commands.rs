use clap::{Parser, Subcommand};

/// `convokit` - conversation memory for LLM chat sessions.
#[derive(Parser, Debug)]
#[command(name = "convokit")]
#[command(version)]
#[command(
    about = "Chat with hosted LLMs while keeping a summarized, branchable history.",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a message (or read messages line by line from stdin)
    Chat {
        /// Session to continue
        #[arg(short, long, default_value = "default")]
        session: String,

        /// Single message mode (don't read from stdin)
        #[arg(short, long)]
        message: Option<String>,

        /// Image URL to attach to the message
        #[arg(long)]
        image: Option<String>,

        /// Provider to use (groq, openai)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model to use
        #[arg(long)]
        model: Option<String>,
    },

    /// Print the stored messages of a session
    History {
        #[arg(short, long, default_value = "default")]
        session: String,
    },

    /// Case-insensitive search over a session's messages
    Search {
        #[arg(short, long, default_value = "default")]
        session: String,

        /// Text to look for
        query: String,
    },

    /// Print the context window the next completion would receive
    Context {
        #[arg(short, long, default_value = "default")]
        session: String,

        /// Leave system messages out of the window
        #[arg(long)]
        no_system: bool,
    },

    /// Fork a session into a new one seeded with a summary
    Branch {
        #[arg(short, long, default_value = "default")]
        session: String,
    },

    /// Delete one message from a session
    Delete {
        #[arg(short, long, default_value = "default")]
        session: String,

        /// Identifier of the message to delete
        message_id: String,
    },

    /// Summarize a session now and record a snapshot
    Snapshot {
        #[arg(short, long, default_value = "default")]
        session: String,
    },

    /// Show configuration and storage locations
    Status,
}
