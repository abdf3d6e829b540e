use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use amplifier::automation::{self, AutomationProfile};
use amplifier::config;
use amplifier::dashboard::{Dashboard, Tab};
use amplifier::db::{
    self, ContentPatch, IdeaPatch, NewContent, NewIdea, NewPrompt, NewSource, NewUser, PromptPatch, UserPatch,
};
use amplifier::model::{EntityId, Platform, PlatformAssociation, PromptKind};
use amplifier::notify::TracingNotifier;
use amplifier::session::Session;
use amplifier::webhook::WebhookClient;

#[derive(Debug, Parser)]
#[command(author, version, about = "Manage ideas and content and publish them through automation webhooks")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Act as the user with this email
    #[arg(long)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(subcommand)]
    Ideas(IdeasCmd),
    #[command(subcommand)]
    Content(ContentCmd),
    #[command(subcommand)]
    Sources(SourcesCmd),
    Prompts {
        #[arg(long, value_enum, default_value = "idea")]
        kind: PromptKindArg,
        #[command(subcommand)]
        command: PromptsCmd,
    },
    #[command(subcommand)]
    Users(UsersCmd),
    /// Send the selected items to their platform webhooks
    Dispatch(DispatchArgs),
    /// Validate and submit an automation profile (YAML file)
    Profile {
        #[arg(long)]
        file: PathBuf,
    },
    /// Print an example config file
    ExampleConfig,
}

#[derive(Debug, Subcommand)]
enum IdeasCmd {
    List,
    Add {
        #[arg(long)]
        content: String,
        #[arg(long)]
        priority: Option<f64>,
        #[arg(long)]
        status: Option<String>,
    },
    Update {
        id: EntityId,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        priority: Option<f64>,
        #[arg(long)]
        status: Option<String>,
        /// Mark the idea as used now
        #[arg(long)]
        used: bool,
    },
    Delete {
        id: EntityId,
    },
}

#[derive(Debug, Subcommand)]
enum ContentCmd {
    List,
    Add(ContentFields),
    Update {
        id: EntityId,
        #[command(flatten)]
        fields: ContentFields,
    },
    Delete {
        id: EntityId,
    },
}

#[derive(Debug, ClapArgs)]
struct ContentFields {
    #[arg(long)]
    idea: Option<EntityId>,
    #[arg(long)]
    platform: Option<Platform>,
    #[arg(long = "type")]
    kind: Option<String>,
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    content: Option<String>,
}

#[derive(Debug, Subcommand)]
enum SourcesCmd {
    List,
    Add {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PromptKindArg {
    Idea,
    Content,
}

impl From<PromptKindArg> for PromptKind {
    fn from(k: PromptKindArg) -> Self {
        match k {
            PromptKindArg::Idea => PromptKind::IdeaGeneration,
            PromptKindArg::Content => PromptKind::ContentGeneration,
        }
    }
}

#[derive(Debug, Subcommand)]
enum PromptsCmd {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        status: Option<String>,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    Delete {
        id: i64,
    },
    /// Make this prompt the only active one of its kind
    Activate {
        id: i64,
    },
    /// Show the active prompt
    Active,
}

#[derive(Debug, Subcommand)]
enum UsersCmd {
    List,
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        domain: Option<String>,
    },
    Update {
        id: i64,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        domain: Option<String>,
        #[arg(long)]
        linkedin: Option<String>,
        #[arg(long)]
        facebook: Option<String>,
        #[arg(long)]
        instagram: Option<String>,
        #[arg(long)]
        twitter: Option<String>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TabArg {
    Ideas,
    Content,
}

#[derive(Debug, ClapArgs)]
struct DispatchArgs {
    #[arg(value_enum)]
    tab: TabArg,

    /// Entity ids to select (repeatable)
    #[arg(long = "select", num_args = 1..)]
    select: Vec<EntityId>,

    /// Content type per item and platform, as ID:PLATFORM:SUBTYPE (repeatable)
    #[arg(long = "assign")]
    assign: Vec<PlatformAssociation>,

    /// Assign this platform to every selected item
    #[arg(long)]
    platform: Vec<Platform>,

    /// Content type used with --platform
    #[arg(long, default_value = "Post")]
    subtype: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    if let Command::ExampleConfig = args.command {
        print!("{}", config::example());
        return Ok(());
    }

    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| cfg.database_url());
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let webhooks = Arc::new(WebhookClient::new(cfg.app.delivery_mode, cfg.request_timeout())?);
    let mut dashboard = Dashboard::new(
        Session::anonymous(),
        webhooks.clone(),
        cfg.webhook_registry()?,
        Arc::new(TracingNotifier),
        cfg.request_timeout(),
    );
    if let Some(email) = &args.user {
        let user = db::find_user_by_email(&pool, email)
            .await?
            .with_context(|| format!("no user with email {email}"))?;
        dashboard.login(user);
    }
    let session = dashboard.session().clone();

    match args.command {
        Command::Ideas(cmd) => ideas(&pool, &session, cmd).await?,
        Command::Content(cmd) => content(&pool, &session, cmd).await?,
        Command::Sources(cmd) => sources(&pool, &session, cmd).await?,
        Command::Prompts { kind, command } => prompts(&pool, kind.into(), command).await?,
        Command::Users(cmd) => users(&pool, cmd).await?,
        Command::Dispatch(dispatch_args) => dispatch(&pool, &mut dashboard, dispatch_args).await?,
        Command::Profile { file } => {
            let url = cfg
                .profile_webhook()?
                .context("automation.profile_webhook is not configured")?;
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let profile: AutomationProfile = serde_yaml::from_str(&raw).context("invalid profile YAML")?;
            let delivery =
                automation::submit_profile(webhooks.as_ref(), &url, &cfg.automation.source, &profile).await?;
            if delivery.confirmed {
                println!("Automation profile accepted.");
            } else {
                println!("Automation profile sent.");
            }
        }
        Command::ExampleConfig => {}
    }
    Ok(())
}

async fn ideas(pool: &db::Pool, session: &Session, cmd: IdeasCmd) -> Result<()> {
    match cmd {
        IdeasCmd::List => {
            for idea in db::list_ideas(pool).await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    idea.id,
                    idea.status.as_deref().unwrap_or("-"),
                    idea.priority_score.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
                    idea.content.as_deref().unwrap_or("")
                );
            }
        }
        IdeasCmd::Add { content, priority, status } => {
            let idea = db::insert_idea(
                pool,
                session.user_id(),
                &NewIdea {
                    content: Some(content),
                    priority_score: priority,
                    status,
                },
            )
            .await?;
            println!("Created idea {}", idea.id);
        }
        IdeasCmd::Update { id, content, priority, status, used } => {
            let patch = IdeaPatch {
                content,
                priority_score: priority,
                used_at: used.then(chrono::Utc::now),
                status,
            };
            db::update_idea(pool, id, &patch).await?;
            println!("Updated idea {id}");
        }
        IdeasCmd::Delete { id } => {
            db::delete_idea(pool, id).await?;
            println!("Deleted idea {id}");
        }
    }
    Ok(())
}

async fn content(pool: &db::Pool, session: &Session, cmd: ContentCmd) -> Result<()> {
    match cmd {
        ContentCmd::List => {
            for c in db::list_contents(pool).await? {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    c.id,
                    c.platform.as_deref().unwrap_or("-"),
                    c.kind.as_deref().unwrap_or("-"),
                    c.status.as_deref().unwrap_or("-"),
                    c.content.as_deref().unwrap_or("")
                );
            }
        }
        ContentCmd::Add(f) => {
            let new = NewContent {
                idea_id: f.idea,
                platform: f.platform.map(|p| p.to_string()),
                kind: f.kind,
                content_url: f.url,
                status: f.status,
                content: f.content,
            };
            let created = db::insert_content(pool, session.user_id(), &new).await?;
            println!("Created content {}", created.id);
        }
        ContentCmd::Update { id, fields: f } => {
            let patch = ContentPatch {
                idea_id: f.idea,
                platform: f.platform.map(|p| p.to_string()),
                kind: f.kind,
                content_url: f.url,
                status: f.status,
                content: f.content,
            };
            db::update_content(pool, id, &patch).await?;
            println!("Updated content {id}");
        }
        ContentCmd::Delete { id } => {
            db::delete_content(pool, id).await?;
            println!("Deleted content {id}");
        }
    }
    Ok(())
}

async fn sources(pool: &db::Pool, session: &Session, cmd: SourcesCmd) -> Result<()> {
    match cmd {
        SourcesCmd::List => {
            for s in db::list_sources(pool).await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    s.id,
                    s.source_type.as_str(),
                    s.name.as_deref().unwrap_or("-"),
                    s.url.as_deref().unwrap_or("")
                );
            }
        }
        SourcesCmd::Add { name, url } => {
            let owner = session.require_user().context("sources belong to a user; pass --user")?;
            let s = db::insert_source(pool, owner.id, &NewSource { name, url: Some(url) }).await?;
            println!("Created source {} ({})", s.id, s.source_type.as_str());
        }
        SourcesCmd::Update { id, name, url } => {
            let s = db::update_source(pool, id, &NewSource { name, url }).await?;
            println!("Updated source {} ({})", s.id, s.source_type.as_str());
        }
        SourcesCmd::Delete { id } => {
            db::delete_source(pool, id).await?;
            println!("Deleted source {id}");
        }
    }
    Ok(())
}

async fn prompts(pool: &db::Pool, kind: PromptKind, cmd: PromptsCmd) -> Result<()> {
    match cmd {
        PromptsCmd::List => {
            for p in db::list_prompts(pool, kind).await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    p.id,
                    p.status.as_deref().unwrap_or("-"),
                    p.name.as_deref().unwrap_or("-"),
                    p.prompt.as_deref().unwrap_or("")
                );
            }
        }
        PromptsCmd::Add { name, prompt, status } => {
            let p = db::insert_prompt(
                pool,
                kind,
                &NewPrompt {
                    name: Some(name),
                    prompt: Some(prompt),
                    status,
                },
            )
            .await?;
            println!("Created prompt {}", p.id);
        }
        PromptsCmd::Update { id, name, prompt, status } => {
            db::update_prompt(pool, kind, id, &PromptPatch { name, prompt, status }).await?;
            println!("Updated prompt {id}");
        }
        PromptsCmd::Delete { id } => {
            db::delete_prompt(pool, kind, id).await?;
            println!("Deleted prompt {id}");
        }
        PromptsCmd::Activate { id } => {
            db::set_active_prompt(pool, kind, id).await?;
            println!("Prompt {id} set as active");
        }
        PromptsCmd::Active => match db::active_prompt(pool, kind).await? {
            Some(p) => println!(
                "{}\t{}\t{}",
                p.id,
                p.name.as_deref().unwrap_or("-"),
                p.prompt.as_deref().unwrap_or("")
            ),
            None => println!("No active prompt"),
        },
    }
    Ok(())
}

async fn users(pool: &db::Pool, cmd: UsersCmd) -> Result<()> {
    match cmd {
        UsersCmd::List => {
            for u in db::list_users(pool).await? {
                println!("{}\t{}\t{}", u.id, u.email, u.name.as_deref().unwrap_or("-"));
            }
        }
        UsersCmd::Add { email, name, domain } => {
            let u = db::insert_user(pool, &NewUser { name, email, domain }).await?;
            println!("Created user {}", u.id);
        }
        UsersCmd::Update {
            id,
            email,
            name,
            domain,
            linkedin,
            facebook,
            instagram,
            twitter,
        } => {
            let patch = UserPatch {
                name,
                email,
                domain,
                linkedin_url: linkedin,
                facebook_url: facebook,
                instagram_url: instagram,
                twitter_url: twitter,
            };
            db::update_user(pool, id, &patch).await?;
            println!("Updated user {id}");
        }
        UsersCmd::Delete { id } => {
            db::delete_user(pool, id).await?;
            println!("Deleted user {id}");
        }
    }
    Ok(())
}

async fn dispatch(pool: &db::Pool, dashboard: &mut Dashboard, args: DispatchArgs) -> Result<()> {
    let tab = match args.tab {
        TabArg::Ideas => Tab::Ideas,
        TabArg::Content => Tab::Content,
    };

    for &id in &args.select {
        let exists = match tab {
            Tab::Ideas => db::get_idea(pool, id).await?.is_some(),
            Tab::Content => db::get_content(pool, id).await?.is_some(),
        };
        if !exists {
            bail!("{:?} item {} not found", tab, id);
        }
    }

    let store = dashboard.selection_mut(tab);
    for &id in &args.select {
        if !store.is_selected(id) {
            store.toggle_selected(id);
        }
    }
    for a in &args.assign {
        store.set_association(a.entity_id, a.platform, &a.subtype);
    }
    for &platform in &args.platform {
        store.assign_to_selected(platform, &args.subtype);
    }

    for a in dashboard.selection(tab).associations() {
        if !a.platform.content_types().iter().any(|t| t.eq_ignore_ascii_case(&a.subtype)) {
            warn!(platform = %a.platform, subtype = %a.subtype, "content type not offered for this platform");
        }
        if !dashboard.registry().is_integrated(a.platform) {
            warn!(platform = %a.platform, entity_id = a.entity_id, "no webhook configured, item will be handled separately");
        }
    }

    let report = dashboard.dispatch(tab).await?;
    info!(failures = report.has_failures(), "dispatch reported");
    print!("{report}");

    if tab == Tab::Content && !report.succeeded_ids.is_empty() {
        let n = db::mark_published(pool, &report.succeeded_ids).await?;
        info!(count = n, "content marked published");
    }
    Ok(())
}
