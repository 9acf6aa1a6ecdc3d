use std::collections::BTreeMap;

use bucket_inspector::accounts;
use bucket_inspector::cli::{Cli, Command, DiffArgs, ReportArgs, ScanArgs};
use bucket_inspector::config::{FileSettings, Settings, StoreSpec};
use bucket_inspector::notify::Notifier;
use bucket_inspector::platform::CheckIp;
use bucket_inspector::report::{self, ScanOutcome};
use bucket_inspector::scan::check::AccountConfig;
use bucket_inspector::scan::endpoint::{HttpEndpoint, Prober};
use bucket_inspector::scan::Runner;
use bucket_inspector::store::dir::DirStore;
use bucket_inspector::store::sqlite::SqliteStore;
use bucket_inspector::store::{diff, horizon_start, whitelist, ObjectStore, SnapshotStore};
use bucket_inspector::Result;
use clap::Parser;
use serde_json::Value;
use tracing::warn;

fn open_output(spec: &StoreSpec) -> Result<SnapshotStore<Box<dyn ObjectStore>>> {
    let objects: Box<dyn ObjectStore> = match spec {
        StoreSpec::Dir(path) => Box::new(DirStore::new(path)),
        StoreSpec::Sqlite(path) => Box::new(SqliteStore::open(path)?),
    };
    Ok(SnapshotStore::new(objects))
}

fn scan_command(file: FileSettings, args: &ScanArgs) -> Result<()> {
    let settings = Settings::from_scan_args(file, args)?;
    let config_store = DirStore::new(&settings.config_store);

    let configs = accounts::load_configs(&config_store)?;
    if configs.is_empty() {
        warn!("No account configs in {}", settings.config_store.display());
    }
    let account_ids: Vec<Value> = configs
        .keys()
        .map(|key| Value::from(accounts::account_id(key)))
        .collect();
    let configs: Vec<AccountConfig> = configs.into_values().collect();

    let runner = Runner::new(
        open_output(&settings.output)?,
        Prober::new(HttpEndpoint::new()),
        CheckIp::new(&settings.check_ip_url),
        &configs,
    );

    let mut extra = BTreeMap::new();
    extra.insert("accounts".to_string(), Value::Array(account_ids));
    let snapshot = runner.run_and_upload(extra)?;
    let key = snapshot.key();
    let link = runner.store().location(&key);

    let whitelist = whitelist::load(&config_store)?;
    let notifier = Notifier::new(settings.hook_url.clone());

    let outcome = if settings.diff_only {
        let previous = runner.store().resolve_previous(&key, settings.horizon)?;
        let delta = diff::diff(&snapshot, previous.as_ref(), whitelist.as_ref());
        notifier.send_diff(&delta, &link)?;
        ScanOutcome::Diff(delta)
    } else {
        let issues = diff::set_of_issues(&snapshot, whitelist.as_ref());
        notifier.send_full(&issues, &link)?;
        ScanOutcome::Full(issues)
    };

    report::print_scan(&snapshot, &link, &outcome, settings.json_output);
    Ok(())
}

fn report_command(file: &FileSettings, args: &ReportArgs) -> Result<()> {
    let settings = Settings::from_store_args(file, &args.store, args.json)?;
    let store = open_output(&settings.output)?;

    if args.list {
        let keys = store.list_recent(horizon_start(settings.horizon)?)?;
        if settings.json_output {
            println!("{}", Value::from(keys));
        } else {
            print!("{}", report::table::render_keys(&keys));
        }
        return Ok(());
    }

    let snapshot = match &args.key {
        Some(key) => store.get(key)?,
        None => match store.latest(settings.horizon)? {
            Some(snapshot) => snapshot,
            None => {
                eprintln!("No snapshots found. Run 'bucket-inspector scan' to create one.");
                std::process::exit(1);
            }
        },
    };

    report::print_snapshot(&snapshot, settings.json_output)?;
    if !settings.json_output {
        println!("\nstored at: {}", store.location(&snapshot.key()));
    }
    Ok(())
}

fn diff_command(file: &FileSettings, args: &DiffArgs) -> Result<()> {
    // validate that --from and --to are used together
    if args.from.is_some() != args.to.is_some() {
        eprintln!("Both --from and --to must be specified together.");
        std::process::exit(1);
    }

    let settings = Settings::from_store_args(file, &args.store, args.json)?;
    let store = open_output(&settings.output)?;
    let whitelist = whitelist::load(&DirStore::new(&settings.config_store))?;

    let (previous, current) = match (&args.from, &args.to) {
        (Some(from), Some(to)) => (Some(store.get(from)?), store.get(to)?),
        _ => {
            let Some(current) = store.latest(settings.horizon)? else {
                eprintln!("No snapshots found. Run 'bucket-inspector scan' to create one.");
                std::process::exit(1);
            };
            let previous = store.resolve_previous(&current.key(), settings.horizon)?;
            if previous.is_none() {
                eprintln!("No earlier snapshot within the horizon; nothing to compare.");
            }
            (previous, current)
        }
    };

    if !settings.json_output {
        println!("\nComparing snapshots:");
        match &previous {
            Some(previous) => println!("  From: {}", previous.key()),
            None => println!("  From: (none)"),
        }
        println!("  To:   {}", current.key());
        println!();
    }

    let delta = diff::diff(&current, previous.as_ref(), whitelist.as_ref());
    report::print_delta(&delta, settings.json_output);
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let file = match FileSettings::load(cli.settings.as_deref()) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error loading settings: {e}");
            std::process::exit(1);
        }
    };

    let result = match &cli.command {
        Command::Scan(args) => scan_command(file, args),
        Command::Report(args) => report_command(&file, args),
        Command::Diff(args) => diff_command(&file, args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
