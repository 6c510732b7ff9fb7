//! Search Lab
//!
//! Backend for an interactive MongoDB Atlas Search lab.
//!
//! # Usage
//!
//! ```bash
//! # Serve the API and the built front-end
//! MONGODB_USERNAME=reader MONGODB_PASSWORD=... MONGODB_LOCATION=cluster0.example.mongodb.net \
//!     search-lab serve --static-dir build
//!
//! # Print, or create, the Atlas Search indexes the exercises need
//! search-lab indexes
//! search-lab indexes --apply
//!
//! # Run exercises against a running server
//! search-lab exercise -f exercises/atlas-search.toml --name 1 --show-solution
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use search_lab::cli::{CliInterface, Commands};
use search_lab::error::{Result, SearchLabError};
use search_lab::executor::{QueryBackend, QueryDispatcher};
use search_lab::exercise::{ExerciseClient, ExerciseReport, ExerciseSet};
use search_lab::formatter::{Colorizer, JsonFormatter};
use search_lab::indexes::SearchIndexCatalog;
use search_lab::server::{self, AppState};
use search_lab::ConnectionManager;

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Parse arguments, load configuration, initialize logging, then dispatch
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;
    initialize_logging(&cli);

    if let Some(path) = cli.config_path() {
        debug!("Configuration loaded from {}", path.display());
    }

    match cli.command() {
        Commands::Version => {
            cli.show_version();
            Ok(())
        }
        Commands::Serve { .. } => run_server(&cli).await,
        Commands::Indexes { apply } => run_indexes(&cli, apply).await,
        Commands::Exercise {
            file,
            name,
            query,
            show_solution,
            server,
        } => {
            let server = server.unwrap_or_else(|| cli.default_server_url());
            let set = ExerciseSet::from_file(&file)?;
            run_exercises(&cli, &set, name.as_deref(), query.as_deref(), show_solution, &server)
                .await
        }
    }
}

/// Connect (best effort) and serve until Ctrl+C or SIGTERM
async fn run_server(cli: &CliInterface) -> Result<()> {
    let config = cli.config();
    let manager = Arc::new(ConnectionManager::new(config.connection.clone()));

    if let Err(e) = manager.connect().await {
        warn!("Starting without a database connection: {}", e);
    }

    let backend: Arc<dyn QueryBackend> = Arc::new(QueryDispatcher::new(manager));
    let state = Arc::new(AppState::new(
        backend,
        config.query.default_collection.clone(),
    ));

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    server::serve(&config.server, state, shutdown).await
}

/// Print the index script, or create the indexes with `--apply`
async fn run_indexes(cli: &CliInterface, apply: bool) -> Result<()> {
    if !apply {
        print!("{}", SearchIndexCatalog::to_shell_script());
        return Ok(());
    }

    let manager = ConnectionManager::new(cli.config().connection.clone());
    manager.connect().await?;
    let db = manager.database().await?;

    let created = SearchIndexCatalog::apply(&db).await?;
    let colorizer = Colorizer::new(cli.use_colors());
    for name in &created {
        println!("{}", colorizer.success(&format!("Created search index '{name}'")));
    }
    info!(
        "Index builds run in the background on '{}'; check their status in Atlas",
        manager.database_name()
    );
    Ok(())
}

/// Run one named exercise, or all of them
async fn run_exercises(
    cli: &CliInterface,
    set: &ExerciseSet,
    name: Option<&str>,
    query: Option<&str>,
    show_solution: bool,
    server: &str,
) -> Result<()> {
    let selected: Vec<_> = match name {
        Some(name) => vec![
            set.find(name)
                .ok_or_else(|| SearchLabError::Generic(format!("Exercise '{name}' not found")))?,
        ],
        None => set.exercises.iter().collect(),
    };

    let client = ExerciseClient::new(server)?;
    let colorizer = Colorizer::new(cli.use_colors());
    let json = JsonFormatter::new(true, cli.use_colors());

    let mut failed = 0;
    for exercise in &selected {
        let outcome = client.run(exercise, query).await;
        if !outcome.is_success() {
            failed += 1;
        }

        let report = ExerciseReport {
            exercise,
            outcome: &outcome,
            show_solution,
        };
        println!("{}\n", report.render(&colorizer, &json));
    }

    if failed > 0 {
        return Err(SearchLabError::Generic(format!(
            "{failed} of {} exercise(s) failed",
            selected.len()
        )));
    }
    Ok(())
}

/// Cancel `token` on Ctrl+C or SIGTERM
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    token.cancel();
}

/// Initialize logging.
///
/// `-q`, `-v` and `--vv` win over `RUST_LOG`, which wins over
/// `logging.level`. Logs go to stderr so exercise output stays clean.
fn initialize_logging(cli: &CliInterface) {
    let logging = &cli.config().logging;

    let filter = match cli.log_level_override() {
        Some(level) => EnvFilter::new(level.to_tracing_level().as_str()),
        None => EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(logging.level.to_tracing_level()).into())
            .from_env_lossy(),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
