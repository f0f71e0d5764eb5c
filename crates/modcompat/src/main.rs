use ::log::*;
use anyhow::Context;
use modcompat::{
    config::{self, Config},
    opts::{Command, Opts},
    store::{self, Store, StoreLocation},
    sweep::CancellationFlag,
    Engine,
};
use serde::Serialize;
use std::{fs::File, io};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::get()?;
    let store = store::Builder::from_location(StoreLocation::from(opts.store.as_path()))
        .build()
        .await?;
    let config = build_config(&opts, &store).await?;

    modcompat::log::setup_logging(&config)?;
    debug!("{:?}", opts);
    debug!("{:?}", config);

    let mut engine = Engine::new(config, store);
    if let Some(as_of) = opts.as_of {
        engine = engine.as_of(as_of);
    }

    let cancel = CancellationFlag::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current chunk");
            signal_cancel.cancel();
        }
    });

    match opts.command {
        Command::Resolve(version_id) => print_json(&engine.resolve(version_id).await?),
        Command::Sweep(target) => print_json(&engine.sweep(target, &cancel).await?),
        Command::SweepPackage(identifier) => {
            print_json(&engine.sweep_package(&identifier, &cancel).await?)
        }
        Command::Tree(version_id) => print_json(&engine.build_tree(version_id).await?),
        Command::Compatible(addon_version_id) => {
            print_json(&engine.compatible_host_versions(addon_version_id).await?)
        }
        Command::PropagatePins => print_json(&engine.propagate_pins().await?),
        Command::Import(path) => {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open catalog snapshot {}", path.display()))?;
            print_json(&engine.import(io::BufReader::new(file)).await?)
        }
    }
}

/// Builds the program config from the config file, the store options, the environment and the
/// command line, skipping the ones the command line says to skip. A missing config file is
/// skipped as well.
async fn build_config(opts: &Opts, store: &Store) -> anyhow::Result<Config> {
    let mut builder = config::Builder::new();

    if !opts.no_conf {
        match File::open(&opts.config) {
            Ok(mut file) => builder = builder.apply_config_file(&mut file)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to open config file {}", opts.config.display())
                })
            }
        }
    }

    builder = builder.apply_store(store).await?;

    if !opts.no_env {
        builder = builder.apply_env()?;
    }

    builder.apply_opts(opts).build()
}

fn print_json<T>(value: &T) -> anyhow::Result<()>
where
    T: Serialize,
{
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
