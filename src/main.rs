//! nbt - browse transport benchmark runs from the command line

use clap::Parser;
use netbench_telemetry::{
    app::App,
    cli::Cli,
    error::ErrorReporter,
    PKG_NAME, VERSION,
};
use std::process;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(99);
    }));

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose);

    if cli.debug {
        eprintln!("{} v{} ({})", PKG_NAME, VERSION, env!("TARGET_TRIPLE"));
        match env!("GIT_COMMIT") {
            "" => eprintln!("Built {}", env!("BUILD_TIME")),
            commit => eprintln!("Built {} from {}", env!("BUILD_TIME"), commit),
        }
    }

    let app = match App::new(cli).await {
        Ok(app) => app,
        Err(e) => {
            reporter.report_error(&e);
            process::exit(e.exit_code());
        }
    };

    match app.run().await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output.trim_end());
            }
        }
        Err(e) => {
            let reporter = ErrorReporter::new(app.config().enable_color, app.config().verbose);
            reporter.report_error(&e);
            process::exit(e.exit_code());
        }
    }
}
