use std::any::Any;
use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result, anyhow};
use objcli::{ClapEngine, CliError, ModelConfig, Registry};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "objcli - run a declarative action/object command line\n\n\
Usage: objcli --model <file.toml> [--debug] <argv...>\n\n\
Options (before the model's own arguments):\n  \
  --model <file>    TOML model declaring actions, objects and lists\n  \
  --debug           Log resolution and parsing to stderr\n  \
  --help, -h        Show this message\n\n\
Everything after these options is parsed with the model. The selected\n\
command, context and stored records are printed as JSON.\n\n\
Examples:\n  \
  objcli --model repos.toml create repo web --title Website\n  \
  objcli --model repos.toml create repos web,api:API\n  \
  objcli --model repos.toml create --help\n";

fn install_broken_pipe_handler() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let payload = info.payload();
        let is_broken = <dyn Any>::downcast_ref::<&str>(payload)
            .is_some_and(|s| s.contains("Broken pipe"))
            || <dyn Any>::downcast_ref::<String>(payload)
                .is_some_and(|s| s.contains("Broken pipe"));

        if is_broken {
            std::process::exit(0);
        }

        default_hook(info);
    }));
}

/// Launcher options; `argv` is what the model parses.
#[derive(Debug, Default)]
struct Launch {
    model: Option<PathBuf>,
    debug: bool,
    help: bool,
    argv: Vec<String>,
}

fn parse_launch(args: impl IntoIterator<Item = String>) -> Result<Launch> {
    let mut launch = Launch::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--model" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--model requires a file path"))?;
                launch.model = Some(PathBuf::from(path));
            }
            "--debug" => launch.debug = true,
            "--help" | "-h" if launch.model.is_none() => launch.help = true,
            _ => {
                if let Some(path) = arg.strip_prefix("--model=") {
                    launch.model = Some(PathBuf::from(path));
                    continue;
                }
                launch.argv.push(arg);
                launch.argv.extend(args.by_ref());
            }
        }
    }
    Ok(launch)
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "objcli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(launch: Launch) -> Result<()> {
    let path = launch
        .model
        .ok_or_else(|| anyhow!("missing --model <file.toml>\n\n{USAGE}"))?;
    let config = ModelConfig::load_from_path(&path)?;

    let name = config.name.clone().unwrap_or_else(|| "objcli".to_string());
    let engine = ClapEngine::new(name, config.about.clone()).version(env!("CARGO_PKG_VERSION"));
    let mut registry = Registry::new(engine);
    config
        .apply(&mut registry)
        .with_context(|| format!("invalid model '{}'", path.display()))?;

    let outcome = match registry.parse(&launch.argv) {
        Ok(outcome) => outcome,
        Err(err @ CliError::Engine { .. }) if err.is_informational() => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let output = json!({
        "command": outcome.command,
        "context": outcome.context,
        "values": registry.values(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn main() -> ExitCode {
    install_broken_pipe_handler();

    let launch = match parse_launch(std::env::args().skip(1)) {
        Ok(launch) => launch,
        Err(err) => {
            eprintln!("objcli: {err}");
            return ExitCode::FAILURE;
        }
    };
    if launch.help {
        print!("{USAGE}");
        return ExitCode::SUCCESS;
    }
    init_tracing(launch.debug);

    match run(launch) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("objcli: {err:#}");
            ExitCode::FAILURE
        }
    }
}
