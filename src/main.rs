//! tasklog - report-log server and task dashboard CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use tasklog::api;
use tasklog::config::Config;
use tasklog::filter::LogQuery;
use tasklog::models::{Priority, TaskStatus};
use tasklog::remote::RemoteClient;
use tasklog::reports::ReportLogService;
use tasklog::session::{HeaderProvider, SessionContext};
use tasklog::store::{AttachmentStore, LogStore};
use tasklog::views::{
    DEFAULT_PAGE_SIZE, Employment, StaffFilter, StaffListView, StaffSortKey, TaskFilter,
    TaskListView, TaskSortKey,
};

#[derive(Parser)]
#[command(name = "tasklog")]
#[command(about = "Report-log server and task dashboard backend")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the report-log server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Initialize a new config file
    Init {
        /// Output path for config file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export report logs as CSV
    Export {
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        end_date: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        search: Option<String>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List tasks from the remote backend
    Tasks {
        /// Session token for the remote API
        #[arg(long, env = "TASKLOG_TOKEN")]
        token: String,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = TaskSortArg::DueDate)]
        sort: TaskSortArg,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// List staff records from the remote backend
    Staff {
        /// Session token for the remote API
        #[arg(long, env = "TASKLOG_TOKEN")]
        token: String,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        fired: bool,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Pending,
    InProgress,
    InReview,
    Completed,
    Rejected,
}

impl From<StatusArg> for TaskStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => TaskStatus::Pending,
            StatusArg::InProgress => TaskStatus::InProgress,
            StatusArg::InReview => TaskStatus::InReview,
            StatusArg::Completed => TaskStatus::Completed,
            StatusArg::Rejected => TaskStatus::Rejected,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PriorityArg {
    Low,
    Medium,
    High,
    Urgent,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::High => Priority::High,
            PriorityArg::Urgent => Priority::Urgent,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TaskSortArg {
    Title,
    DueDate,
    Priority,
    Status,
    CreatedAt,
}

impl From<TaskSortArg> for TaskSortKey {
    fn from(arg: TaskSortArg) -> Self {
        match arg {
            TaskSortArg::Title => TaskSortKey::Title,
            TaskSortArg::DueDate => TaskSortKey::DueDate,
            TaskSortArg::Priority => TaskSortKey::Priority,
            TaskSortArg::Status => TaskSortKey::Status,
            TaskSortArg::CreatedAt => TaskSortKey::CreatedAt,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tasklog=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let load_config = |path: &Option<PathBuf>| -> Result<Config> {
        match path {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    };

    match cli.command {
        Commands::Serve { port, bind } => {
            let mut cfg = load_config(&cli.config)?;

            // Override with CLI args
            if let Some(p) = port {
                cfg.server.port = p;
            }
            if let Some(b) = bind {
                cfg.server.bind = b;
            }

            run_server(cfg).await
        }

        Commands::Init { output } => {
            let path = output.unwrap_or_else(|| PathBuf::from("config.toml"));
            Config::default().save_to(&path)?;

            println!("Created config file: {}", path.display());
            println!();
            println!("Next steps:");
            println!("  1. Point [remote] base_url at the task backend");
            println!("  2. Set [auth] jwt_secret to verify session tokens");
            println!(
                "  3. Start the server: tasklog --config {} serve",
                path.display()
            );

            Ok(())
        }

        Commands::Export {
            start_date,
            end_date,
            status,
            department,
            search,
            output,
        } => {
            let cfg = load_config(&cli.config)?;
            let query = LogQuery {
                start_date,
                end_date,
                status,
                department,
                search,
            };
            let filter = query.parse()?;
            let csv = report_service(&cfg).export_csv(&filter).await?;

            match output {
                Some(path) => {
                    std::fs::write(&path, csv).context("Failed to write export")?;
                    println!("Exported report logs to {}", path.display());
                }
                None => print!("{}", csv),
            }
            Ok(())
        }

        Commands::Tasks {
            token,
            status,
            priority,
            search,
            sort,
            desc,
            page,
        } => {
            let cfg = load_config(&cli.config)?;
            let client = remote_client(&cfg, token)?;

            let mut view = TaskListView::new(
                TaskFilter {
                    status: status.map(Into::into),
                    priority: priority.map(Into::into),
                    assignee: None,
                    search,
                },
                DEFAULT_PAGE_SIZE,
            );
            view.begin_loading();
            view.finish_loading(client.list_tasks().await);
            if let tasklog::views::LoadState::Error(message) = view.state() {
                anyhow::bail!("{}", message);
            }

            let key: TaskSortKey = sort.into();
            view.sort_by(key);
            if desc {
                view.sort_by(key);
            }
            view.set_page(page);

            let current = view.current_page();
            for task in &current.items {
                let due = task
                    .due_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<24} {:<10} {:<12} {:<10} {}",
                    task.id,
                    format!("{:?}", task.priority).to_lowercase(),
                    format!("{:?}", task.status),
                    due,
                    task.title
                );
            }
            println!(
                "\nPage {}/{} ({} tasks)",
                current.page,
                current.total_pages.max(1),
                current.total
            );
            Ok(())
        }

        Commands::Staff {
            token,
            department,
            fired,
            search,
            page,
        } => {
            let cfg = load_config(&cli.config)?;
            let client = remote_client(&cfg, token)?;

            let mut view = StaffListView::new(
                StaffFilter {
                    department,
                    employment: fired.then_some(Employment::Fired),
                    search,
                },
                DEFAULT_PAGE_SIZE,
            );
            view.begin_loading();
            view.finish_loading(client.list_staff().await);
            if let tasklog::views::LoadState::Error(message) = view.state() {
                anyhow::bail!("{}", message);
            }

            view.sort_by(StaffSortKey::Name);
            view.set_page(page);

            let current = view.current_page();
            for member in &current.items {
                println!(
                    "{:<10} {:<24} {:<28} {:<18} {:?}",
                    member.staff_id,
                    member.name,
                    member.email,
                    member.department,
                    Employment::of(member)
                );
            }
            println!(
                "\nPage {}/{} ({} staff)",
                current.page,
                current.total_pages.max(1),
                current.total
            );
            Ok(())
        }
    }
}

fn report_service(config: &Config) -> ReportLogService {
    ReportLogService::new(
        LogStore::new(&config.storage.logs_path),
        AttachmentStore::new(
            &config.storage.uploads_dir,
            &config.storage.uploads_url_prefix,
        ),
    )
}

fn remote_client(config: &Config, token: String) -> Result<RemoteClient> {
    let session = SessionContext::default();
    session.login(token, None);
    let headers: Arc<dyn HeaderProvider> = Arc::new(session);
    RemoteClient::new(&config.remote, headers).context("Failed to create remote client")
}

async fn run_server(config: Config) -> Result<()> {
    AttachmentStore::new(
        &config.storage.uploads_dir,
        &config.storage.uploads_url_prefix,
    )
    .init()
    .await?;

    let state = api::AppState::new(report_service(&config), config.clone());
    let app = api::create_router(state);

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        logs = %config.storage.logs_path.display(),
        uploads = %config.storage.uploads_dir.display(),
        "tasklog server listening on http://{}",
        addr
    );

    axum::serve(listener, app).await?;

    Ok(())
}
