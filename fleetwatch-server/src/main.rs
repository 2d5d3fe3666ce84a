use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::time::Duration;
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle, Toplevel};

use fleetwatch_server::{scheduler::Scheduler, web::Web, Cli, Session, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    log::info!("fleetwatch-server {} starting", VERSION);

    let session = Session::new(args.clone());

    if !args.track.is_empty() {
        let loaded = session.load_track_files(&args.track);
        log::info!("Loaded {} of {} track files", loaded.len(), args.track.len());
    }
    if args.autoplay {
        let started = session.engine().write().unwrap().start_all();
        log::info!("Autoplay: {} vessels playing", started);
    }

    Toplevel::new(|s: SubsystemHandle| async move {
        let scheduler = Scheduler::new(&session);
        let web = Web::new(session);

        s.start(SubsystemBuilder::new("Scheduler", |subsys| scheduler.run(subsys)));
        s.start(SubsystemBuilder::new("Webserver", |subsys| web.run(subsys)));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_secs(5))
    .await
    .into_diagnostic()
}
