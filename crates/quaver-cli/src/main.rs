//! Quaver CLI - Playback queue inspector

mod cli;
mod session;
mod settings;
mod view;

use std::io::{ self, BufRead, Write };

use anyhow::{ Context, Result };
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing_subscriber::EnvFilter;

use cli::Args;
use session::Outcome;
use settings::Settings;

use quaver_core::{ JsonStore, PlaybackQueueManager };


/// Installs the stderr log subscriber. `QUAVER_LOG` overrides the filter.
fn init_logging() {
    let filter = EnvFilter::try_from_env( "QUAVER_LOG" )
        .unwrap_or_else( |_| EnvFilter::new( "warn" ) );

    tracing_subscriber::fmt()
        .with_env_filter( filter )
        .with_writer( io::stderr )
        .init();
}


fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let settings = Settings::load();
    if Settings::settings_path().is_some_and( |p| !p.exists() ) {
        // Write a template so the options are discoverable
        settings.save();
    }

    let store_path = settings.resolve_store_path( args.store.clone() )
        .context( "No data directory available; pass --store" )?;
    let store = JsonStore::open( &store_path )
        .with_context( || format!( "Failed to open queue store {}", store_path.display() ) )?;
    tracing::info!( "Using queue store {:?}", store_path );

    let mut manager = match args.seed {
        Some( seed ) => PlaybackQueueManager::restore_with_rng( store, SmallRng::seed_from_u64( seed ) )?,
        None => PlaybackQueueManager::restore( store )?,
    };
    let offline = args.offline || settings.offline_mode;

    let mut stdout = io::stdout().lock();
    let lines = args.command_lines();
    let input: Box<dyn Iterator<Item = io::Result<String>>> = if lines.is_empty() {
        Box::new( io::stdin().lock().lines() )
    } else {
        Box::new( lines.into_iter().map( io::Result::Ok ) )
    };

    for line in input {
        match session::execute_line( &mut manager, &line?, offline ) {
            Outcome::Continue( Some( message ) ) => writeln!( stdout, "{}", message )?,
            Outcome::Continue( None ) => {}
            Outcome::Quit => break,
        }
    }

    Ok(())
}
