// src/main.rs

use homekit::logging::{self, LogOptions};
use homekit::{cli, load_config, run};

#[tokio::main]
async fn main() {
    let code = match run_main().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("homekit error: {err:?}");
            1
        }
    };
    // Negative sentinels (internal faults) are not valid process exit codes.
    std::process::exit(if code < 0 { 1 } else { code });
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    let config = load_config(&args)?;
    logging::init_logging(LogOptions {
        cli_level: args.log_level,
        config_level: config.log_level,
        format: args.log_format,
        no_color: args.no_color,
    })?;
    Ok(run(args, config).await?)
}
