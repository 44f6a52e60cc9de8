//! HDN CLI - launches the execution service's REST API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use hdn_core::admission::ExecutionAdmission;
use hdn_core::api::{router, ApiState};
use hdn_core::config::Config;
use hdn_core::invocation::InvocationEngine;
use hdn_core::memory::{EpisodicStore, KnowledgeGraph, MemoryFanout, WorkingMemoryStore};
use hdn_core::registry::ToolRegistry as PersistedRegistry;
use hdn_core::store::MemoryStore;
use hdn_core::tools::filesystem::{
    DeleteFile, GlobFiles, GrepFiles, ListDirectory, MoveFile, ReadFile, SearchFiles, WriteFile,
};
use hdn_core::tools::shell::{ExecuteCommand, KillShell, ShellProcessRegistry};
use hdn_core::tools::web::{WebFetch, WebSearch};
use hdn_core::tools::ToolRegistry as BuiltinRegistry;
use hdn_core::workflow::WorkflowOrchestrator;

#[derive(Parser)]
#[command(name = "hdn-cli", version, about = "HDN execution service")]
struct Cli {
    /// Path to an optional TOML config file; environment variables always
    /// override values loaded from it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve {
        /// Address to bind the HTTP listener to.
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,

        /// Workspace directory the builtin filesystem/shell tools operate
        /// in. Defaults to the current directory.
        #[arg(long)]
        workspace: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { addr, workspace } => serve(addr, workspace, config).await,
    }
}

async fn serve(addr: SocketAddr, workspace: Option<PathBuf>, config: Config) -> anyhow::Result<()> {
    let workspace = workspace.unwrap_or(std::env::current_dir()?);

    let store = MemoryStore::new();
    let registry = Arc::new(PersistedRegistry::new(store.clone()));
    registry.discover().await?;

    let mut builtins = BuiltinRegistry::new();
    let shell_registry = Arc::new(ShellProcessRegistry::new());
    builtins.register(Arc::new(ReadFile::new(workspace.clone())));
    builtins.register(Arc::new(WriteFile::new(workspace.clone())));
    builtins.register(Arc::new(GlobFiles::new(workspace.clone())));
    builtins.register(Arc::new(GrepFiles::new(workspace.clone())));
    builtins.register(Arc::new(ListDirectory::new(workspace.clone())));
    builtins.register(Arc::new(DeleteFile::new(workspace.clone())));
    builtins.register(Arc::new(MoveFile::new(workspace.clone())));
    builtins.register(Arc::new(SearchFiles::new(workspace.clone())));
    builtins.register(Arc::new(
        ExecuteCommand::new(workspace.clone()).with_registry(shell_registry.clone()),
    ));
    builtins.register(Arc::new(KillShell::new(shell_registry)));
    builtins.register(Arc::new(WebFetch::new()));
    builtins.register(Arc::new(WebSearch::new()));
    let builtins = Arc::new(builtins);

    let admission = Arc::new(ExecutionAdmission::new(
        config.admission.max_concurrent_executions,
    ));
    let invocation = Arc::new(InvocationEngine::new(
        registry.clone(),
        builtins,
        admission.clone(),
        store.clone(),
    ));
    let workflows = Arc::new(WorkflowOrchestrator::new(store.clone()));
    let memory = Arc::new(MemoryFanout::new(
        Arc::new(WorkingMemoryStore::default()),
        Arc::new(EpisodicStore::new()),
        Arc::new(KnowledgeGraph::new()),
    ));

    let state = ApiState {
        registry,
        invocation,
        workflows,
        memory,
        admission,
        store,
    };

    tracing::info!(%addr, workspace = %workspace.display(), "starting hdn execution service");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}
