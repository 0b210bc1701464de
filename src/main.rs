//! Awesome ORM - command-line entry point.
//!
//! Lists or counts blog records through the mapping layer, against MySQL or
//! an SQLite file.

use awesome_orm::config::{Command, Config, ConnectTarget, Entity};
use awesome_orm::entities::{self, Blog, Comment, User};
use awesome_orm::{DbPool, Model, OrmResult, QueryOptions, Value, crud};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdout carries the records.
    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_tracing(&config);

    info!("Starting awesome-orm v{}", env!("CARGO_PKG_VERSION"));
    entities::register_all();

    let pool = match config.connect_target()? {
        ConnectTarget::MySql(pool_config) => DbPool::create(&pool_config).await?,
        ConnectTarget::Sqlite(sqlite_config) => DbPool::connect_sqlite(&sqlite_config).await?,
    };

    let result = run(&pool, config.command).await;
    pool.close().await;

    if let Err(e) = result {
        error!(error = %e, suggestion = ?e.suggestion(), "command failed");
        return Err(e.into());
    }
    Ok(())
}

async fn run(pool: &DbPool, command: Command) -> OrmResult<()> {
    match command {
        Command::List {
            entity,
            filter,
            args,
            order_by,
            limit,
        } => {
            let mut options = QueryOptions::new();
            if let Some(filter) = filter {
                options = options.filter(filter, string_args(args));
            }
            if let Some(order_by) = order_by {
                options = options.order_by(order_by);
            }
            options.limit = limit;

            match entity {
                Entity::Users => print_all::<User>(pool, &options).await,
                Entity::Blogs => print_all::<Blog>(pool, &options).await,
                Entity::Comments => print_all::<Comment>(pool, &options).await,
            }
        }
        Command::Count {
            entity,
            filter,
            args,
        } => {
            let args = string_args(args);
            let filter = filter.as_deref();
            let count = match entity {
                Entity::Users => crud::find_number::<User>(pool, "count(*)", filter, &args).await?,
                Entity::Blogs => crud::find_number::<Blog>(pool, "count(*)", filter, &args).await?,
                Entity::Comments => {
                    crud::find_number::<Comment>(pool, "count(*)", filter, &args).await?
                }
            };
            println!("{}", count.unwrap_or(Value::Int(0)));
            Ok(())
        }
    }
}

async fn print_all<M: Model>(pool: &DbPool, options: &QueryOptions) -> OrmResult<()> {
    let records = crud::find_all::<M>(pool, options).await?;
    for record in &records {
        let line = serde_json::to_string(record.record())
            .map_err(|e| awesome_orm::OrmError::internal(e.to_string()))?;
        println!("{}", line);
    }
    info!(count = records.len(), "records listed");
    Ok(())
}

fn string_args(args: Vec<String>) -> Vec<Value> {
    args.into_iter().map(Value::String).collect()
}
