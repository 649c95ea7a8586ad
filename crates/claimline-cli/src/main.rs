use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use claimline_core::services::{
    CallLogService, ConversationService, HttpCrmClient, MemoryBackend, MemoryReplySink, ReplySink,
    UserDirectory,
};
use claimline_core::timeline::ChannelFilter;
use claimline_core::{tracing_setup, ActivityItem, ContactIdentifiers, CoreConfig, MentionCandidate, ReplySubmitter, TimelineSession};

#[derive(Parser)]
#[command(name = "claimline")]
#[command(about = "Unified SMS/email/call timeline and reply composer for a contact")]
struct Cli {
    /// Path to JSON config file (baseUrl, apiToken, limits)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Override the CRM API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Serve all data from a JSON fixture instead of the CRM API
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, short, global = true)]
    pretty: bool,

    /// Log filter, e.g. "debug" (defaults to RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ContactArgs {
    /// Contact phone number (SMS conversation and call log)
    #[arg(long)]
    phone: Option<String>,

    /// Contact email address (email conversation)
    #[arg(long)]
    email: Option<String>,
}

impl From<ContactArgs> for ContactIdentifiers {
    fn from(args: ContactArgs) -> Self {
        Self {
            phone: args.phone,
            email: args.email,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the merged activity timeline
    Timeline {
        #[command(flatten)]
        contact: ContactArgs,

        /// all, sms, email or phone
        #[arg(long, default_value = "all")]
        channel: String,

        /// Hide the body of this item (repeatable)
        #[arg(long)]
        collapse: Vec<String>,
    },

    /// Search the user directory for mention candidates
    Users {
        query: String,
    },

    /// Reply to a timeline item
    Reply {
        #[command(flatten)]
        contact: ContactArgs,

        /// Opportunity the reply is filed under
        #[arg(long)]
        opportunity: String,

        /// Id of the timeline item being replied to
        #[arg(long)]
        parent: String,

        /// Reply text
        #[arg(long, default_value = "")]
        text: String,

        /// Mention the first user matching this query (repeatable)
        #[arg(long)]
        mention: Vec<String>,
    },
}

/// Service set the commands run against
struct Backend {
    conversations: Arc<dyn ConversationService>,
    call_logs: Arc<dyn CallLogService>,
    directory: Arc<dyn UserDirectory>,
    replies: Arc<dyn ReplySink>,
}

impl Backend {
    fn http(config: &CoreConfig) -> Self {
        let client = Arc::new(HttpCrmClient::from_config(config));
        Self {
            conversations: client.clone(),
            call_logs: client.clone(),
            directory: client.clone(),
            replies: client,
        }
    }

    fn fixture(path: &Path) -> Result<Self> {
        let backend = Arc::new(MemoryBackend::load(path)?);
        Ok(Self {
            conversations: backend.clone(),
            call_logs: backend.clone(),
            directory: backend,
            replies: Arc::new(MemoryReplySink::default()),
        })
    }
}

#[derive(Serialize)]
struct TimelineEntry<'a> {
    #[serde(flatten)]
    item: &'a ActivityItem,
    collapsed: bool,
}

fn load_config(cli: &Cli) -> Result<CoreConfig> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize output")?;
    println!("{}", output);
    Ok(())
}

async fn run_timeline(
    config: CoreConfig,
    backend: &Backend,
    contact: ContactIdentifiers,
    channel: &str,
    collapse: &[String],
    pretty: bool,
) -> Result<()> {
    let Some(filter) = ChannelFilter::parse(channel) else {
        bail!("Unknown channel '{}': expected all, sms, email or phone", channel);
    };

    let mut session = TimelineSession::new(config);
    session
        .refresh(&contact, backend.conversations.as_ref(), backend.call_logs.as_ref())
        .await;
    session.set_filter(filter);
    for id in collapse {
        session.toggle_collapsed(id);
    }

    let visible = session.visible_feed();
    let items: Vec<TimelineEntry<'_>> = visible
        .iter()
        .map(|item| TimelineEntry {
            item,
            collapsed: session.is_collapsed(&item.id),
        })
        .collect();

    print_json(
        &serde_json::json!({
            "filter": filter,
            "counts": session.counts(),
            "items": items,
        }),
        pretty,
    )
}

async fn run_users(config: &CoreConfig, backend: &Backend, query: &str, pretty: bool) -> Result<()> {
    let users = backend
        .directory
        .search_users(query, config.user_search_limit)
        .await?;
    let candidates: Vec<MentionCandidate> = users.into_iter().map(MentionCandidate::from).collect();
    print_json(&candidates, pretty)
}

#[allow(clippy::too_many_arguments)]
async fn run_reply(
    config: CoreConfig,
    backend: &Backend,
    contact: ContactIdentifiers,
    opportunity: String,
    parent: &str,
    text: String,
    mentions: &[String],
    pretty: bool,
) -> Result<()> {
    let mut session = TimelineSession::new(config);
    session
        .refresh(&contact, backend.conversations.as_ref(), backend.call_logs.as_ref())
        .await;
    session.open_reply(parent)?;
    let debounce = session.search_debounce();

    for query in mentions {
        let query = query.trim_start_matches('@');
        // Type "@query" at the end of the draft, as a user would
        let draft = session.composer().map(|c| c.text().to_string()).unwrap_or_default();
        let typed = format!("{}@{}", draft, query);
        let cursor = typed.len();
        let Some(request) = session.edit_reply(typed, cursor)? else {
            bail!("'@{}' is not a valid mention", query);
        };

        if let Some(outcome) = request.execute(backend.directory.as_ref(), debounce).await {
            session.deliver_search(outcome);
        }

        let selected = session
            .composer_mut()
            .is_some_and(|composer| composer.select_candidate_at(0));
        if !selected {
            bail!("No user matches '@{}'", query);
        }
    }

    let draft = session.composer().map(|c| c.text().to_string()).unwrap_or_default();
    let full_text = format!("{}{}", draft, text);
    let cursor = full_text.len();
    session.edit_reply(full_text, cursor)?;

    let submitter = ReplySubmitter::new(opportunity, backend.replies.clone());
    let payload = session.submit_reply(&submitter).await?;
    info!(parent = %payload.parent_id, "Reply submitted");
    print_json(&payload, pretty)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_setup::init_tracing_with_level(cli.log_level.as_deref());

    let config = load_config(&cli)?;
    let backend = match &cli.fixture {
        Some(path) => Backend::fixture(path)?,
        None => Backend::http(&config),
    };

    match cli.command {
        Commands::Timeline {
            contact,
            channel,
            collapse,
        } => run_timeline(config, &backend, contact.into(), &channel, &collapse, cli.pretty).await,
        Commands::Users { query } => run_users(&config, &backend, &query, cli.pretty).await,
        Commands::Reply {
            contact,
            opportunity,
            parent,
            text,
            mention,
        } => {
            run_reply(
                config,
                &backend,
                contact.into(),
                opportunity,
                &parent,
                text,
                &mention,
                cli.pretty,
            )
            .await
        }
    }
}
