//! Loads the reminders (from the server, or from the local cache when it is unreachable) and prints them.
//!
//! Run with `sync` as the first argument to also push the local reminders to the server,
//! or with `watch` to wait (probing the server periodically) until it is reachable.

use std::sync::Arc;

use pet_reminders::config::Settings;
use pet_reminders::utils::print_reminder_list;
use pet_reminders::{Connectivity, ReminderSynchronizer};

#[tokio::main]
async fn main() {
    env_logger::init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        },
    };
    let synchronizer = match ReminderSynchronizer::from_settings(&settings) {
        Ok(s) => s,
        Err(err) => {
            log::error!("Unable to create the synchronizer: {}", err);
            std::process::exit(1);
        },
    };

    println!("Loading reminders from {}...", settings.api_base);
    match synchronizer.start().await {
        Connectivity::Online => println!("Connected."),
        Connectivity::Offline => println!("Server unreachable, showing the local copy (from {:?}).", settings.cache_folder),
    }

    let synchronizer = Arc::new(synchronizer);
    match std::env::args().nth(1).as_deref() {
        Some("sync") => {
            println!("Reconciling...");
            println!("Depending on your RUST_LOG value, you may see more or less details about the progress.");
            if let Err(err) = synchronizer.reconcile().await {
                log::warn!("Reconciliation did not complete ({}). You can safely start a new one.", err);
            }
        },
        Some("watch") if synchronizer.is_online() == false => {
            println!("Waiting for the server (checking every {:?})...", synchronizer.probe_interval());
            let mut connectivity = synchronizer.subscribe_connectivity();
            let probe_loop = synchronizer.spawn_probe_loop();
            while *connectivity.borrow_and_update() != Connectivity::Online {
                if connectivity.changed().await.is_err() {
                    break;
                }
            }
            synchronizer.shutdown();
            probe_loop.abort();
            println!("Connected, local changes have been pushed.");
        },
        _ => (),
    }

    println!();
    print_reminder_list(&synchronizer.list().await);
}
