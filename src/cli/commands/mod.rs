
use crate::config::credentials::{apply_env_overrides, missing_credentials};
use crate::config::{Config, get_config_path, load_config, save_config};
use crate::relations::progress::ProgressCallback;
use crate::relations::{InteractionMatrix, Metric, RelationService, ScopeRequest};
use crate::render::ColorScale;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "relmap")]
#[command(about = "Map who talks to whom in a Discord community, and how warmly")]
#[command(version)]
pub struct Cli {
    /// Config file (default: ~/.relmap/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
    /// Scan history and print the strongest interactions
    Map {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Discard any cached scan and start over
        #[arg(long)]
        refresh: bool,
        /// How many pairs to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Render a heatmap of one metric
    Matrix {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, short = 'm', default_value = "mean")]
        metric: String,
        /// Defaults to render.defaultColorScale
        #[arg(long)]
        color_scale: Option<String>,
    },
    /// Render the directed interaction graph
    Graph {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Defaults to mapping.minEdgeCount
        #[arg(long)]
        min_count: Option<u64>,
    },
    /// List metric and color scale names
    Metrics,
}

#[derive(Args, Debug, Clone, Default)]
struct ScopeArgs {
    /// Role whose members are mapped (default: @everyone)
    #[arg(long)]
    role: Option<u64>,
    /// Days of history to read (default: mapping.lookbackDays)
    #[arg(long, short = 'd')]
    days: Option<u32>,
    /// Only read this channel (id or name)
    #[arg(long, short = 'c')]
    channel: Option<String>,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { force } => {
            init(config_path, force)?;
        }
        Commands::Metrics => {
            print!("{}", catalog());
        }
        Commands::Map {
            scope,
            refresh,
            top,
        } => {
            let session = Session::connect(config_path).await?;
            let request = session.request(&scope).await?;
            let map = session
                .service
                .build_map(&request, refresh, Some(progress_logger()))
                .await?;
            let progress = map.progress().snapshot(std::time::Duration::ZERO);
            println!(
                "{}: {} members, {} messages read, {} channels skipped",
                map.group_name(),
                map.members().len(),
                progress.messages_seen,
                progress.channels_skipped
            );
            if let Some(matrix) = map.matrix() {
                for line in strongest(&matrix, top) {
                    println!("  {}", line);
                }
            }
        }
        Commands::Matrix {
            scope,
            metric,
            color_scale,
        } => {
            let session = Session::connect(config_path).await?;
            let request = session.request(&scope).await?;
            let path = session
                .service
                .matrix(
                    &request,
                    &metric,
                    color_scale.as_deref(),
                    Some(progress_logger()),
                )
                .await?;
            println!("{}", path.display());
        }
        Commands::Graph { scope, min_count } => {
            let session = Session::connect(config_path).await?;
            let request = session.request(&scope).await?;
            let path = session
                .service
                .graph(&request, min_count, Some(progress_logger()))
                .await?;
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => get_config_path()?,
    };
    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    let mut config = Config::default();
    save_config(&config, Some(path.as_path()))?;
    println!("Created config at {}", path.display());
    println!("Next: set discord.guildId");
    apply_env_overrides(&mut config);
    for hint in credential_hints(&config) {
        println!("  {}", hint);
    }
    Ok(())
}

/// One line per credential that neither the config nor the environment sets.
fn credential_hints(config: &Config) -> Vec<String> {
    missing_credentials(config)
        .into_iter()
        .map(|(name, env)| format!("{name} is not set: add it to the config or export {env}"))
        .collect()
}

fn catalog() -> String {
    let mut out = String::from("metrics:\n");
    for metric in Metric::ALL {
        out.push_str(&format!("  {}\n", metric));
    }
    out.push_str("color scales:\n");
    for scale in ColorScale::ALL {
        out.push_str(&format!("  {}\n", scale));
    }
    out
}

/// The `top` busiest author → target pairs, busiest first.
fn strongest(matrix: &InteractionMatrix, top: usize) -> Vec<String> {
    let mut pairs: Vec<_> = matrix.iter().collect();
    pairs.sort_by(|a, b| {
        b.2.count.cmp(&a.2.count).then_with(|| {
            Metric::Mean
                .apply(b.2)
                .total_cmp(&Metric::Mean.apply(a.2))
        })
    });
    pairs
        .into_iter()
        .take(top)
        .map(|(author, target, cell)| {
            format!(
                "{} -> {}: {} messages, mean {:+.2}",
                author.display_name,
                target.display_name,
                cell.count,
                Metric::Mean.apply(cell)
            )
        })
        .collect()
}

fn progress_logger() -> ProgressCallback {
    Arc::new(|snapshot| {
        Box::pin(async move {
            info!(
                "Still scanning after {}s: {} messages read, {} channels done",
                snapshot.elapsed_secs, snapshot.messages_seen, snapshot.channels_scanned
            );
        })
    })
}

/// A configured service bound to the Discord guild from the config.
struct Session {
    service: RelationService,
    #[cfg(feature = "channel-discord")]
    discord: Arc<crate::channels::discord::DiscordHistory>,
    guild_id: u64,
}

#[cfg(feature = "channel-discord")]
impl Session {
    async fn connect(config_path: Option<&Path>) -> Result<Self> {
        use crate::channels::discord::DiscordHistory;
        use crate::render::PlotRenderer;
        use crate::sentiment::HttpSentimentScorer;

        let config = load_config(config_path)?;
        for hint in credential_hints(&config) {
            tracing::warn!("{}", hint);
        }
        let discord = Arc::new(DiscordHistory::new(&config.discord)?);
        let bot = discord.bot_identity().await?;
        let service = RelationService::new(
            discord.clone(),
            Arc::new(HttpSentimentScorer::new(&config.sentiment)),
            Arc::new(PlotRenderer::new(&config.render)),
            &config,
            Some(bot),
        )?;
        Ok(Self {
            service,
            discord,
            guild_id: config.discord.guild_id,
        })
    }

    async fn request(&self, args: &ScopeArgs) -> Result<ScopeRequest> {
        let group = self
            .discord
            .resolve_group(args.role.unwrap_or(self.guild_id))
            .await?;
        let mut request = ScopeRequest::new(group);
        if let Some(days) = args.days {
            request = request.with_lookback(days);
        }
        if let Some(channel) = &args.channel {
            let id = match channel.parse::<u64>() {
                Ok(id) => crate::history::ChannelId(id),
                Err(_) => {
                    self.discord
                        .find_channel(channel)
                        .await?
                        .ok_or_else(|| anyhow::anyhow!("No text channel named '{}'", channel))?
                        .id
                }
            };
            request = request.in_channel(id);
        }
        Ok(request)
    }
}

#[cfg(not(feature = "channel-discord"))]
impl Session {
    async fn connect(_config_path: Option<&Path>) -> Result<Self> {
        anyhow::bail!("relmap was built without the channel-discord feature")
    }

    async fn request(&self, _args: &ScopeArgs) -> Result<ScopeRequest> {
        anyhow::bail!("relmap was built without the channel-discord feature")
    }
}
