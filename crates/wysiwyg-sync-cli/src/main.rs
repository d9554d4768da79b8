use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::{env, process};
use wysiwyg_sync_config::Config;

mod script;
mod session;

use session::Session;

fn init_logging(config: &Config) -> Result<()> {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(config.log_level_filter())
                .with_tag("WysiwygSync"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        let mut builder = env_logger::Builder::from_default_env();
        builder.filter_level(config.log_level_filter());
        if let Some(log_file) = &config.log_file {
            let file = File::options()
                .create(true)
                .append(true)
                .open(log_file)
                .with_context(|| format!("Failed to open log file {}", log_file.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        builder.init();
    }

    Ok(())
}

/// Replay every line of `input`. Stops at the first line that does not parse.
fn replay<R: BufRead, W: Write>(input: R, session: &mut Session, out: &mut W) -> Result<()> {
    for (number, line) in input.lines().enumerate() {
        let line = line?;
        let command = script::parse_line(&line)
            .with_context(|| format!("Line {}: {:?}", number + 1, line))?;
        if let Some(command) = command {
            session.run(command, out)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [script-file]", args[0]);
        eprintln!("Reads commands from stdin when no script is given");
        process::exit(1);
    }

    let config = match Config::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };
    init_logging(&config)?;
    log::info!(
        "wysiwyg-sync-cli starting, config path {}",
        Config::config_path().display()
    );

    let mut session = Session::new(config.editor_settings());
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.get(1) {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open script {path}"))?;
            replay(BufReader::new(file), &mut session, &mut out)
        }
        None => replay(io::stdin().lock(), &mut session, &mut out),
    }
}
