use anyhow::Result;
use clap::Parser;
use replify::analysis::ImageInput;
use replify::cli::{Cli, Commands, InboxKind};
use replify::novelty::{poll_comments, poll_messages, NoveltyTracker};
use replify::replies::ReplyTarget;
use replify::server::{self, AppState};
use replify::services::connect_store;
use replify::snapshot::{PersonaSource, SnapshotBuilder};
use replify::social::GraphConnector;
use replify::{utils, Services, Settings};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level)),
        )
        .init();

    let cli = Cli::parse();

    // persona and poll never reach the model, so they run without an API key
    match cli.command {
        Commands::Persona { token } => handle_persona(&settings, token).await,
        Commands::Poll {
            kind,
            token,
            only_new,
        } => handle_poll(&settings, kind, token, only_new).await,
        Commands::Serve { addr } => handle_serve(connect(settings).await?, addr).await,
        Commands::Reply {
            kind,
            id,
            token,
            send,
        } => handle_reply(&connect(settings).await?, kind, id, token, send).await,
        Commands::Analyze { files, description } => {
            handle_analyze(&connect(settings).await?, files, description).await
        }
        Commands::Result { token } => handle_result(&connect(settings).await?, token).await,
    }
}

async fn connect(settings: Settings) -> Result<Services> {
    let api_key = Settings::api_key()?;
    Ok(Services::from_settings(settings, api_key).await?)
}

async fn handle_serve(services: Services, addr: Option<String>) -> Result<()> {
    let addr = addr.unwrap_or_else(|| services.settings.server.addr.clone());
    server::serve(AppState::new(services), &addr).await
}

async fn handle_persona(settings: &Settings, token: String) -> Result<()> {
    utils::print_info("Fetching posts, comments and dialogs...");
    let client = GraphConnector::new(&settings.instagram).client(token);
    let persona = SnapshotBuilder::new().build_persona(&client).await?;

    utils::print_header("Persona");
    println!("{}", persona.text);
    if !persona.images.is_empty() {
        utils::print_header("Images");
        for url in &persona.images {
            println!("{}", url);
        }
    }
    Ok(())
}

async fn handle_poll(settings: &Settings, kind: InboxKind, token: String, only_new: bool) -> Result<()> {
    let client = GraphConnector::new(&settings.instagram).client(token);
    let tracker = NoveltyTracker::new(
        connect_store(&settings.store).await?,
        settings.novelty.index_ttl_secs.map(Duration::from_secs),
    );
    let flagged = match kind {
        InboxKind::Comments => poll_comments(&client, &tracker).await?,
        InboxKind::Messages => poll_messages(&client, &tracker)
            .await?
            .into_iter()
            .map(|(flag, _)| flag)
            .collect(),
    };

    let new_count = flagged.iter().filter(|f| f.is_new).count();
    let shown: Vec<_> = flagged
        .into_iter()
        .filter(|f| f.is_new || !only_new)
        .collect();

    utils::print_header(&format!("{:?} ({} new)", kind, new_count));
    utils::print_flagged(&shown);
    Ok(())
}

async fn handle_reply(services: &Services, kind: InboxKind, id: String, token: String, send: bool) -> Result<()> {
    let client = services.graph.client(token);
    let suggestion = match kind {
        InboxKind::Comments => services.replies.suggest_for_comment(&client, &id).await?,
        InboxKind::Messages => services.replies.suggest_for_message(&client, &id).await?,
    };

    utils::print_info(&format!("> {}", suggestion.inbound));
    println!("{}", suggestion.reply);
    if suggestion.cached {
        utils::print_info("(cached suggestion)");
    }

    if send {
        let target = match kind {
            InboxKind::Comments => ReplyTarget::Comment(id),
            InboxKind::Messages => ReplyTarget::User(suggestion.recipient_id.clone()),
        };
        let sent = services
            .replies
            .send_reply(&client, &target, &suggestion.reply)
            .await?;
        utils::print_success(&format!("Sent (message id {})", sent.message_id));
    }
    Ok(())
}

async fn handle_analyze(services: &Services, files: Vec<PathBuf>, description: Option<String>) -> Result<()> {
    let mut images = Vec::with_capacity(files.len());
    for path in &files {
        images.push(ImageInput::from_path(path).await?);
    }

    utils::print_info(&format!("Analyzing {} screenshots...", images.len()));
    let result = services
        .analysis
        .analyze(&images, description.as_deref())
        .await?;
    let token = services.results.store(&result).await?;

    utils::print_analysis(&result);
    utils::print_success(&format!("\nRetrieval token: {}", token));
    Ok(())
}

async fn handle_result(services: &Services, token: String) -> Result<()> {
    let result = services.results.fetch(&token).await?;
    utils::print_analysis(&result);
    Ok(())
}
