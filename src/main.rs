use std::process;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use pyebwa::cli::args::Cli;
use pyebwa::cli::commands::execute_command;
use pyebwa::cli::output;
use pyebwa::cli::CliError;
use pyebwa::config::Settings;
use pyebwa::infrastructure::ServiceContainer;

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let result = Settings::load(None)
        .map_err(CliError::from)
        .and_then(|settings| execute_command(&cli, &ServiceContainer::new(settings)));

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            output::error(&e);
            process::exit(e.exit_code());
        }
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        3 => LevelFilter::TRACE,
        _ => {
            eprintln!("Don't be crazy, max is -v -v -v");
            LevelFilter::TRACE
        }
    };

    // Dependencies only log at debug and above
    let noisy_modules = ["rayon", "config"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    // Create a subscriber with formatted output directed to stderr
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    let filtered_layer = fmt_layer.with_filter(filter).with_filter(module_filter);

    tracing_subscriber::registry().with(filtered_layer).init();

    match filter {
        LevelFilter::INFO => tracing::info!("Debug mode: info"),
        LevelFilter::DEBUG => tracing::debug!("Debug mode: debug"),
        LevelFilter::TRACE => tracing::debug!("Debug mode: trace"),
        _ => {}
    }
}
