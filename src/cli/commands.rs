use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "replify")]
#[command(author, version, about = "Persona-aware reply suggestions and content ideas for Instagram accounts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InboxKind {
    Comments,
    Messages,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Listen address (overrides server.addr)
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Build and print the persona of an account
    Persona {
        /// Long-lived Instagram access token
        #[arg(long, env = "INSTAGRAM_ACCESS_TOKEN")]
        token: String,
    },

    /// List comment or message ids, flagging the ones not seen on the last poll
    Poll {
        #[arg(value_enum)]
        kind: InboxKind,

        #[arg(long, env = "INSTAGRAM_ACCESS_TOKEN")]
        token: String,

        /// Only print ids flagged new
        #[arg(short = 'n', long)]
        only_new: bool,
    },

    /// Suggest a reply to a comment or message
    Reply {
        #[arg(value_enum)]
        kind: InboxKind,

        /// Comment or message id
        id: String,

        #[arg(long, env = "INSTAGRAM_ACCESS_TOKEN")]
        token: String,

        /// Deliver the suggestion as a direct message
        #[arg(long)]
        send: bool,
    },

    /// Analyze account screenshots and suggest content ideas
    Analyze {
        /// Screenshot files (1 to analysis.max_images)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Print a stored analysis by its retrieval token
    Result { token: String },
}
