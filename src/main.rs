//! ibgib-space CLI
//!
//! Opens (or creates) the default space under the storage directory and runs
//! one command against it.
//!
//! ## Usage
//!
//! ```bash
//! # Create the special indexes (latest, roots, tags, ...)
//! ibgib-space init
//!
//! # Store a node and register it as the head of its timeline
//! ibgib-space put '{"ib":"comment hi","gib":"...","data":{"text":"hi"}}'
//!
//! # Inspect
//! ibgib-space get 'comment hi^ABC...'
//! ibgib-space graph 'comment hi^ABC...' --skip past
//! ibgib-space latest 'comment hi^ABC...'
//! ibgib-space special roots --rel8n root
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use ibgib_space::events::spawn_logging_listener;
use ibgib_space::space::{Bucket, SledSpace, Space};
use ibgib_space::{
    get_dependency_graph, Address, Config, EventBus, IbGib, SpaceContext, SpecialType, ZeroSpaceBootstrap,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ibgib-space")]
#[command(about = "Content-addressed ibgib store with timeline head tracking")]
struct Args {
    /// Path to config file
    #[arg(short, long, env = "IBGIB_SPACE_CONFIG")]
    config: Option<PathBuf>,

    /// Storage directory
    #[arg(long, env = "IBGIB_SPACE_DIR")]
    storage_dir: Option<PathBuf>,

    /// Name for the space if one has to be created
    #[arg(long)]
    space_name: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create any missing special indexes
    Init,

    /// Store an ibgib given as JSON and register it
    Put {
        json: String,
        /// Store in the meta bucket
        #[arg(long)]
        meta: bool,
        /// Skip registering the node in the latest map
        #[arg(long)]
        no_register: bool,
    },

    /// Print an ibgib
    Get { addr: Address },

    /// Print the addresses an ibgib depends on
    Graph {
        addr: Address,
        /// Rel8n names to skip
        #[arg(long)]
        skip: Vec<String>,
    },

    /// Print the head of an ibgib's timeline
    Latest { addr: Address },

    /// Register a stored ibgib in the latest map
    Register { addr: Address },

    /// Print a special index, creating it if needed
    Special {
        special_type: SpecialType,
        /// Print the members under this rel8n instead
        #[arg(long)]
        rel8n: Option<String>,
    },

    /// Create a tag and add it to the tags index
    Tag {
        text: String,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ibgib_space=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Load config
    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    // Apply CLI overrides
    if let Some(dir) = args.storage_dir {
        config.storage_dir = dir;
    }
    if let Some(name) = args.space_name {
        config.space_name = name;
    }

    tokio::fs::create_dir_all(&config.storage_dir).await?;
    let config_path = config.config_path();
    if !config_path.exists() {
        config.save(&config_path)?;
        info!(path = %config_path.display(), "Created default config");
    }

    let zero: Arc<dyn Space> = Arc::new(SledSpace::at_path("zero", config.zero_space_db_path()).await?);
    let space: Arc<dyn Space> =
        Arc::new(SledSpace::at_path(config.space_name.clone(), config.space_db_path()).await?);
    let bootstrap = Arc::new(ZeroSpaceBootstrap::new(zero.clone()));

    let ctx = SpaceContext::load_or_create(&config.space_name, space, zero, bootstrap)
        .await?
        .with_settings(config.registry_settings()?)
        .with_event_bus(Arc::new(EventBus::with_capacity(config.event_capacity)));
    let _listener = spawn_logging_listener(ctx.events().clone());

    run(&ctx, args.command).await
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn fetch(ctx: &SpaceContext, addr: &Address) -> anyhow::Result<IbGib> {
    ibgib_space::persist::get_from_space(ctx.space(), addr, None)
        .await
        .with_context(|| format!("fetching {}", addr))
}

async fn run(ctx: &SpaceContext, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Init => {
            ctx.initialize_specials().await?;
            println!("{}", ctx.space_root().await.addr());
        }
        Command::Put {
            json,
            meta,
            no_register,
        } => {
            let ibgib: IbGib = serde_json::from_str(&json).context("parsing ibgib JSON")?;
            if ibgib.is_primitive() {
                bail!("primitives are not stored");
            }
            ibgib.validate()?;
            ibgib_space::persist::put_in_space(ctx.space(), &[ibgib.clone()], Bucket::from_flags(meta, false), false)
                .await?;
            if !no_register {
                let outcome = ctx.try_register_new_ibgib(&ibgib).await?;
                info!(?outcome, "Registered");
            }
            println!("{}", ibgib.addr());
        }
        Command::Get { addr } => print_json(&fetch(ctx, &addr).await?)?,
        Command::Graph { addr, skip } => {
            let skip: Vec<&str> = skip.iter().map(String::as_str).collect();
            let graph = get_dependency_graph(ctx.space(), &addr, &skip).await?;
            for dep in graph.keys() {
                println!("{}", dep);
            }
        }
        Command::Latest { addr } => {
            let ibgib = fetch(ctx, &addr).await?;
            match ctx.get_latest_addr(&ibgib).await? {
                Some(latest) => println!("{}", latest),
                None => bail!("{} is not registered", addr),
            }
        }
        Command::Register { addr } => {
            let ibgib = fetch(ctx, &addr).await?;
            let outcome = ctx.try_register_new_ibgib(&ibgib).await?;
            println!("{:?}", outcome);
        }
        Command::Special { special_type, rel8n } => {
            let Some(special) = ctx.get_special_ibgib(special_type, true).await? else {
                bail!("{} index is being initialized elsewhere", special_type);
            };
            match rel8n {
                Some(name) => print_json(&ctx.get_special_rel8d_ibgibs(special_type, &name).await?)?,
                None => print_json(&special)?,
            }
        }
        Command::Tag {
            text,
            icon,
            description,
        } => {
            let (tag, _) = ctx
                .create_tag(&text, icon.as_deref(), description.as_deref())
                .await?;
            println!("{}", tag.addr());
        }
    }
    Ok(())
}
