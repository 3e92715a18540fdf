//! `device-shell` — interactive declarative-configuration shell.

use clap::Parser;
use device_shell::config::ShellConfig;
use device_shell::fs::RealFs;
use device_shell::process::RealProcessSpawner;
use device_shell::shell::{LineOutcome, NoopTerminalGuard, Shell, StdinLineSource};

#[derive(Parser, Debug)]
#[command(name = "device-shell", about = "Interactive declarative-configuration shell")]
struct Cli {
    /// Run a single command line instead of entering the interactive loop.
    #[arg(short = 'c', long = "command")]
    command: Option<String>,

    /// Emit structured JSON instead of human-readable diagnostics.
    #[arg(long)]
    json: bool,

    /// Treat COMP_LINE/COMP_POINT as a completion request.
    #[arg(long = "comp-line")]
    comp_line: Option<String>,

    /// Byte offset into `--comp-line` to truncate at before resolving.
    /// Defaults to the end of the line when omitted.
    #[arg(long = "comp-point")]
    comp_point: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = ShellConfig::from_env();
    let fs = RealFs::new();
    let spawner = RealProcessSpawner::new();
    let mut shell = Shell::new(&fs, &spawner, config);

    if let Some(comp_line) = cli.comp_line {
        for candidate in shell.complete_line(&comp_line, cli.comp_point) {
            println!("{candidate}");
        }
        return;
    }

    if let Some(command) = cli.command {
        match shell.process_line(&command) {
            LineOutcome::Diagnostic(msg) => {
                if cli.json {
                    println!("{}", serde_json::json!({ "error": msg }));
                } else {
                    eprintln!("{msg}");
                }
                std::process::exit(1);
            }
            LineOutcome::Executed { exit_code } => std::process::exit(exit_code),
            LineOutcome::Navigated | LineOutcome::EndOfInput => std::process::exit(0),
        }
    }

    let mut source = StdinLineSource;
    let mut terminal = NoopTerminalGuard;
    shell.run_interactive(&mut source, &mut terminal);
}
