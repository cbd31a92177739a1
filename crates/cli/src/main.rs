use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dnstree_core::dns::{self, DnsTransport};
use dnstree_core::message::ItemKind;
use dnstree_core::paginate::PageLimits;
use dnstree_core::{ClientConfig, ContentKind, Dispatcher, QueryClient, Resolved, ServerConfig, VirtualTree};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dnstree", about = "Browse a directory tree over DNS TXT records")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve a directory over DNS
    Serve {
        #[command(flatten)]
        tree: TreeArgs,
        /// UDP address to listen on
        #[arg(short, long, default_value = "0.0.0.0:8053")]
        listen: SocketAddr,
    },
    /// List a folder on a remote server
    Ls {
        #[command(flatten)]
        remote: RemoteArgs,
        /// Slash-separated folder path
        #[arg(default_value = "/")]
        path: String,
    },
    /// Print a file from a remote server
    Cat {
        #[command(flatten)]
        remote: RemoteArgs,
        /// Slash-separated file path
        path: String,
        /// Print torrent references as magnet links
        #[arg(long)]
        magnet: bool,
    },
    /// Print every node with the query name that reaches it
    Index {
        #[command(flatten)]
        tree: TreeArgs,
        /// Write the JSON index here instead of stdout
        #[arg(short, long)]
        json: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct TreeArgs {
    /// Root directory to serve
    #[arg(short, long)]
    root: PathBuf,
    /// Base name the server answers for
    #[arg(short, long, default_value = dnstree_core::config::DEFAULT_BASE_NAME)]
    base: String,
    /// Largest encoded list entry in bytes
    #[arg(long, default_value_t = PageLimits::default().item_max)]
    item_max: usize,
    /// Largest encoded listing page in bytes
    #[arg(long, default_value_t = PageLimits::default().page_max)]
    page_max: usize,
}

impl TreeArgs {
    fn config(&self) -> ServerConfig {
        ServerConfig {
            limits: PageLimits {
                item_max: self.item_max,
                page_max: self.page_max,
            },
            ..ServerConfig::with_base_name(&self.base)
        }
    }
}

#[derive(clap::Args, Debug)]
struct RemoteArgs {
    /// Name to ask for server info, usually the base name
    name: String,
    /// Resolver to query (repeatable); defaults to /etc/resolv.conf
    #[arg(short, long)]
    resolver: Vec<SocketAddr>,
    /// Per-resolver timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,
}

impl RemoteArgs {
    async fn connect(&self) -> anyhow::Result<QueryClient<DnsTransport>> {
        let mut config = if self.resolver.is_empty() {
            ClientConfig::from_resolv_conf("/etc/resolv.conf")
                .context("no --resolver given and /etc/resolv.conf unreadable")?
        } else {
            ClientConfig::new(self.resolver.clone())
        };
        config.timeout = Duration::from_millis(self.timeout_ms);
        QueryClient::connect(DnsTransport::new(config), &self.name)
            .await
            .with_context(|| format!("connecting to {}", self.name))
    }
}

fn build(tree: &TreeArgs) -> anyhow::Result<(Arc<VirtualTree>, ServerConfig)> {
    let vt = VirtualTree::build(&tree.root)
        .with_context(|| format!("indexing {}", tree.root.display()))?;
    Ok((Arc::new(vt), tree.config()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Serve { tree, listen } => {
            let (vt, config) = build(&tree)?;
            let dispatcher = Dispatcher::new(vt, config).context("building page cache")?;
            dns::serve(listen, Arc::new(dispatcher)).await?;
        }
        Command::Index { tree, json } => {
            let (vt, config) = build(&tree)?;
            // Same checks the server runs at startup.
            Dispatcher::new(vt.clone(), config.clone()).context("building page cache")?;
            let out = serde_json::to_string_pretty(&dnstree_core::export::to_json(&vt, &config))?;
            match json {
                Some(path) => {
                    std::fs::write(&path, out)
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!(path = %path.display(), "index written");
                }
                None => println!("{}", out),
            }
        }
        Command::Ls { remote, path } => {
            let client = remote.connect().await?;
            let Resolved::Dir { folder } = client.resolve(&path).await? else {
                bail!("{} is not a folder", path);
            };
            for item in client.list_dir(&folder).await? {
                match item.kind {
                    ItemKind::Dir => println!("{}/", item.name),
                    ItemKind::File => println!("{}", item.name),
                }
            }
        }
        Command::Cat {
            remote,
            path,
            magnet,
        } => {
            let client = remote.connect().await?;
            let Resolved::File { item, folder } = client.resolve(&path).await? else {
                bail!("{} is not a file", path);
            };
            let content = client.fetch_file(&item.label, &folder).await?;
            let mut out = std::io::stdout().lock();
            match content.kind {
                ContentKind::TorrentRef if magnet => {
                    writeln!(out, "{}", content.magnet(&item.name).unwrap_or_default())?
                }
                ContentKind::Text => out.write_all(&content.body)?,
                ContentKind::Href | ContentKind::TorrentRef => {
                    out.write_all(&content.body)?;
                    writeln!(out)?;
                }
            }
            out.flush()?;
        }
    }
    Ok(())
}
