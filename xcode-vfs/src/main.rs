use anyhow::Result;
use clap::Parser;
use xcode_vfs::config::CliArgs;
use xcode_vfs::exec::{ExecutionBridge, PythonProcessService};
use xcode_vfs::server::VfsServer;
use xcode_vfs::session::Session;
use xcode_vfs::transport::NdjsonTransport;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Logs go to stderr; stdout carries protocol frames only
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let store = args.open_store()?;
    let service = PythonProcessService::new(args.python.clone(), args.exec_timeout());
    let bridge = ExecutionBridge::new(Box::new(service));
    let session = Session::open(store, &args.root_name, bridge)?;

    tracing::info!(
        key = %session.store().key(),
        nodes = session.workspace().len(),
        "xcode-vfs ready"
    );

    let mut server = VfsServer::new(session, NdjsonTransport::new());
    if let Err(e) = server.run(tokio::io::stdin()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
