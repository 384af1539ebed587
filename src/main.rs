use std::{
    fs,
    io::{self, Read, Write},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use time::format_description::well_known::Rfc3339;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, span, Instrument, Level};
use tracing_subscriber::EnvFilter;

use objectcerts::{provision, Storage, StorageConfig};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .json()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let span = span!(Level::INFO, "main", context = "main");
    let matches = command().get_matches();

    match run(&matches).instrument(span).await {
        Err(err) => {
            error!(error_message=%format!("{:#}", err), error_group="command");
            ExitCode::FAILURE
        }
        Ok(()) => ExitCode::SUCCESS,
    }
}

fn command() -> Command {
    let key = || Arg::new("KEY").required(true).index(1);

    Command::new("objectcerts")
        .version(clap::crate_version!())
        .about("Inspect certificate storage kept in an object store")
        .subcommand_required(true)
        .arg(
            Arg::new("bucket")
                .long("bucket")
                .global(true)
                .help("Bucket name, optionally s3:// or gs://"),
        )
        .arg(Arg::new("prefix").long("prefix").global(true))
        .arg(Arg::new("endpoint").long("endpoint").global(true))
        .arg(Arg::new("region").long("region").global(true))
        .arg(Arg::new("insecure").long("insecure").global(true).action(ArgAction::SetTrue))
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("File with storage directives"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .global(true)
                .value_parser(clap::value_parser!(u64))
                .help("Cancel the operation after this many seconds"),
        )
        .subcommand(
            Command::new("store")
                .about("Store a file, or stdin, under KEY")
                .arg(key())
                .arg(Arg::new("FILE").index(2).value_parser(clap::value_parser!(PathBuf))),
        )
        .subcommand(
            Command::new("load")
                .about("Write the value of KEY to stdout")
                .arg(key()),
        )
        .subcommand(Command::new("delete").arg(key()))
        .subcommand(Command::new("exists").arg(key()))
        .subcommand(
            Command::new("list")
                .arg(Arg::new("PREFIX").index(1).default_value(""))
                .arg(
                    Arg::new("recursive")
                        .long("recursive")
                        .short('r')
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("stat").arg(key()))
        .subcommand(Command::new("lock").arg(key()))
        .subcommand(Command::new("unlock").arg(key()))
        .subcommand(Command::new("describe"))
}

fn storage_config(matches: &ArgMatches) -> anyhow::Result<StorageConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            StorageConfig::from_directives(&text)?
        }
        None => StorageConfig::default(),
    };

    if let Some(bucket) = matches.get_one::<String>("bucket") {
        config.bucket = bucket.clone();
    }
    if let Some(prefix) = matches.get_one::<String>("prefix") {
        config.prefix = prefix.clone();
    }
    if let Some(endpoint) = matches.get_one::<String>("endpoint") {
        config.endpoint = Some(endpoint.clone());
    }
    if let Some(region) = matches.get_one::<String>("region") {
        config.region = Some(region.clone());
    }
    if matches.get_flag("insecure") {
        config.insecure = true;
    }

    Ok(config)
}

fn cancellation(matches: &ArgMatches) -> CancellationToken {
    let ctx = CancellationToken::new();

    if let Some(secs) = matches.get_one::<u64>("timeout") {
        let token = ctx.clone();
        let timeout = Duration::from_secs(*secs);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            token.cancel();
        });
    }

    let token = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    ctx
}

fn key_arg(sub: &ArgMatches) -> anyhow::Result<&str> {
    sub.get_one::<String>("KEY")
        .map(String::as_str)
        .context("missing KEY")
}

async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let (name, sub) = matches.subcommand().context("missing command")?;
    let config = storage_config(sub)?;
    let storage = provision(&config).await?;
    let ctx = cancellation(sub);
    info!(command = name, storage = %storage, "called");

    match name {
        "store" => {
            let key = key_arg(sub)?;
            let value = match sub.get_one::<PathBuf>("FILE") {
                Some(path) => fs::read(path)
                    .with_context(|| format!("failed to read: {}", path.display()))?,
                None => {
                    let mut buf = Vec::new();
                    io::stdin().read_to_end(&mut buf)?;
                    buf
                }
            };
            storage.store(&ctx, key, &value).await?;
        }
        "load" => {
            let bytes = storage.load(&ctx, key_arg(sub)?).await?;
            io::stdout().write_all(&bytes)?;
        }
        "delete" => storage.delete(&ctx, key_arg(sub)?).await?,
        "exists" => println!("{}", storage.exists(&ctx, key_arg(sub)?).await),
        "list" => {
            let prefix = sub.get_one::<String>("PREFIX").map(String::as_str).unwrap_or("");
            for key in storage.list(&ctx, prefix, sub.get_flag("recursive")).await? {
                println!("{}", key);
            }
        }
        "stat" => {
            let info = storage.stat(&ctx, key_arg(sub)?).await?;
            if info.is_zero() {
                anyhow::bail!("no metadata for: {}", key_arg(sub)?);
            }
            let modified = time::OffsetDateTime::from(info.modified).format(&Rfc3339)?;
            println!(
                "key={} size={} modified={} terminal={}",
                info.key, info.size, modified, info.is_terminal
            );
        }
        "lock" => storage.lock(&ctx, key_arg(sub)?).await?,
        "unlock" => storage.unlock(&ctx, key_arg(sub)?).await?,
        "describe" => println!("{}", storage),
        other => anyhow::bail!("unknown command: {}", other),
    }

    Ok(())
}
