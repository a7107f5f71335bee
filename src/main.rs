use std::{process, sync::Arc, time::Duration};

use bookshelf::{
    application::{books::BookService, error::AppError, repos::BooksRepo},
    cache::{CacheAccessor, CacheConfig},
    config::{self, EventSink},
    events::{EventPublisher, LogPublisher, WebhookPublisher},
    infra::{
        db::SqliteRepositories,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_repositories(&settings).await?;
    info!(target = "bookshelf::migrate", "Migrations applied");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let books_repo: Arc<dyn BooksRepo> = repositories.clone();

    let cache_config = CacheConfig::from(&settings.cache);
    let accessor = match cache_config
        .build_store()
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?
    {
        Some(store) => CacheAccessor::new(store, books_repo),
        None => CacheAccessor::disabled(books_repo),
    };

    let publisher = build_publisher(&settings.events)?;
    info!(
        target = "bookshelf::events",
        sink = publisher.sink_name(),
        topic = %settings.events.topic,
        "Event publisher ready"
    );

    let books = Arc::new(BookService::new(
        accessor,
        publisher,
        settings.events.topic.clone(),
    ));

    let state = HttpState {
        books,
        db: repositories,
    };

    serve_http(&settings, state).await
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<SqliteRepositories>, AppError> {
    let pool = SqliteRepositories::connect(
        &settings.database.url,
        settings.database.max_connections.get(),
    )
    .await
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    SqliteRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(SqliteRepositories::new(pool)))
}

fn build_publisher(
    events: &config::EventsSettings,
) -> Result<Arc<dyn EventPublisher>, AppError> {
    match events.sink {
        EventSink::Log => Ok(Arc::new(LogPublisher)),
        EventSink::Webhook => {
            let url = events
                .webhook_url
                .as_deref()
                .ok_or_else(|| InfraError::configuration("events.webhook_url is not configured"))?;
            let publisher = WebhookPublisher::new(url, events.timeout).map_err(InfraError::from)?;
            Ok(Arc::new(publisher))
        }
    }
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "bookshelf::http",
        addr = %settings.server.addr,
        "Listening"
    );

    let shutdown = Arc::new(Notify::new());
    let signalled = shutdown.clone();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signalled.notify_one();
        })
        .into_future();

    tokio::pin!(server);
    let grace = settings.server.graceful_shutdown;

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
        }
        _ = drain_deadline(shutdown, grace) => {
            warn!(
                target = "bookshelf::http",
                grace_seconds = grace.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

async fn drain_deadline(shutdown: Arc<Notify>, grace: Duration) {
    shutdown.notified().await;
    tokio::time::sleep(grace).await;
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target = "bookshelf::http", "Shutdown signal received");
}
