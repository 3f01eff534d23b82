use std::error::Error as _;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use log::{error, info};

use l2vpn_scale::cli::Cli;
use l2vpn_scale::{Delivery, ErrorKind, execute};

fn init_logging(level: Option<&str>) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = level {
        builder.parse_filters(level);
    }
    builder.init();
}

async fn run(cli: &Cli) -> l2vpn_scale::Result<Vec<Delivery>> {
    // Sink first: a live run without credentials stops before any rendering
    let sink = cli.command.run_args().sink()?;
    let plan = cli.command.run_plan()?;
    execute(&plan, &sink).await
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {e}");
            return ExitCode::from(ErrorKind::Io.exit_code());
        }
    };

    let started = Instant::now();
    match runtime.block_on(run(&cli)) {
        Ok(deliveries) => {
            for delivery in &deliveries {
                match delivery {
                    Delivery::Written { host, path } => info!("{host}: {}", path.display()),
                    Delivery::Applied { host, commands } => info!("{host}: {commands} command(s) accepted"),
                }
            }
            info!("Run took {:?}", started.elapsed());
            ExitCode::SUCCESS
        }
        Err(e) => {
            let mut message = e.to_string();
            let mut source = e.source();
            while let Some(cause) = source {
                let cause_text = cause.to_string();
                if !message.contains(&cause_text) {
                    message.push_str(&format!("\n  caused by: {cause_text}"));
                }
                source = cause.source();
            }
            error!("Run failed after {:?}", started.elapsed());
            eprintln!("Error: {message}");
            ExitCode::from(e.kind().exit_code())
        }
    }
}
