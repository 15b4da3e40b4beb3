mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_MANIFEST_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "tilekit",
    version,
    about = "Package, inspect, and publish content-addressed web tiles"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Verify an app password against the service and store it.
    Login {
        /// Account handle, e.g. "alice.example.com".
        handle: String,
        /// App password for the account.
        app_password: String,
        /// Repository service URL (overrides the default).
        #[arg(long)]
        service: Option<String>,
    },
    /// Forget stored credentials for a handle.
    Logout {
        /// Account handle.
        handle: String,
    },
    /// List stored accounts.
    Users,
    /// Set the default account used by publish.
    DefaultUser {
        /// Account handle.
        handle: String,
    },
    /// Pack a directory into a tile container.
    Pack {
        /// Directory containing manifest.json and the resource files.
        dir: PathBuf,
        /// Output container path.
        #[arg(default_value = "out.tile")]
        out: PathBuf,
    },
    /// Print a container's manifest and validation report.
    Inspect {
        /// Container file.
        file: PathBuf,
    },
    /// Resolve a path inside a container and write the body to stdout.
    Resolve {
        /// Container file.
        file: PathBuf,
        /// Tile path, e.g. "/" or "/img/x.jpg".
        path: String,
    },
    /// Publish a directory as a tile record in a remote repository.
    Publish {
        /// Directory containing manifest.json and the resource files.
        dir: PathBuf,
        /// Account handle to publish as (default: the default user).
        #[arg(long)]
        user: Option<String>,
        /// Reuse the record key from the last publish of this directory.
        #[arg(long, default_value_t = false)]
        stable_id: bool,
        /// Repository service URL (overrides the default).
        #[arg(long)]
        service: Option<String>,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("TILEKIT_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    let json_output = cli.json;

    let result = match cli.command {
        Commands::Login {
            handle,
            app_password,
            service,
        } => commands::login::run(&handle, &app_password, service.as_deref(), json_output),
        Commands::Logout { handle } => commands::logout::run(&handle, json_output),
        Commands::Users => commands::users::run(json_output),
        Commands::DefaultUser { handle } => commands::default_user::run(&handle, json_output),
        Commands::Pack { dir, out } => commands::pack::run(&dir, &out, json_output),
        Commands::Inspect { file } => commands::inspect::run(&file, json_output),
        Commands::Resolve { file, path } => commands::resolve::run(&file, &path, json_output),
        Commands::Publish {
            dir,
            user,
            stable_id,
            service,
        } => commands::publish::run(
            &dir,
            user.as_deref(),
            stable_id,
            service.as_deref(),
            json_output,
        ),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("manifest error:")
                || msg.starts_with("manifest failed validation")
            {
                EXIT_MANIFEST_ERROR
            } else if msg.starts_with("remote config error:") {
                EXIT_CONFIG_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
