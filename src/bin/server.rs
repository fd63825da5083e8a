use clap::Parser;
use eyre::{eyre, WrapErr};
use pantalone::{
    server::{bind_socket, run},
    MockOptions, MockServer, ResourceSchema,
};
use std::{net::SocketAddr, path::PathBuf};
use tracing::{info, level_filters::LevelFilter, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Opts {
    #[clap(short, long, env = "SCHEMA")]
    schema: PathBuf,
    #[clap(long, env = "PREFIX")]
    prefix: Option<String>,
    #[clap(short, long, default_value = "0", env = "MOCK_PORT")]
    port: u16,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let opts = Opts::parse();

    let subscriber = FmtSubscriber::builder()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_max_level(Level::INFO)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let document = std::fs::read_to_string(&opts.schema)
        .wrap_err_with(|| format!("reading schema {}", opts.schema.display()))?;
    let schema = ResourceSchema::from_json_str(&document)?;
    let options = MockOptions {
        prefix: opts.prefix,
    };

    let mut server = MockServer::with_options(schema, options);
    server.reset();

    let binding = bind_socket(SocketAddr::from(([127, 0, 0, 1], opts.port)))
        .await
        .map_err(|err| eyre!(err))?;
    info!("Mock on http://127.0.0.1:{}/", binding.port);

    tokio::select! {
        result = run(binding.listener, server.client()) => result.map_err(|err| eyre!(err))?,
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }

    info!(handled = server.handled_requests().len(), "requests served");
    server.shutdown()?;
    Ok(())
}
