// SPDX-License-Identifier: MIT OR Apache-2.0

mod config;
mod render;

use std::io::{self, Read, Write};

use clap::{Parser, Subcommand};
use libspicetify_installer::{
    AnsiRenderer, Controller, ExecutionReport, Host, InstallerBadge, JsonOutput, Operation,
    StyleRun, SystemHost, ToolBadge, UpdateAction, VersionInfo, Verbosity,
};
use serde::Serialize;

use crate::{config::CliConfig, render::RunJson};

mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const PARTIAL_FAILURE: i32 = 1;
    pub const FATAL_ERROR: i32 = 2;
}

mod ansi {
    pub const BOLD: &str = "\x1b[1m";
    pub const RESET: &str = "\x1b[0m";

    #[inline]
    pub fn bold(s: &str) -> String {
        format!("{BOLD}{s}{RESET}")
    }
}

type CmdResult = Result<i32, libspicetify_installer::Error>;

#[derive(Parser)]
#[command(name = "spicetify-installer")]
#[command(about = "install, repair, back up and uninstall spicetify")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// output results as json
    #[arg(long, global = true)]
    json: bool,

    /// skip github release lookups
    #[arg(long, global = true)]
    offline: bool,

    /// open configuration file in editor
    #[arg(long)]
    edit_config: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// list the available operations
    List,
    /// run an operation (install, repair, backup, uninstall)
    Run {
        operation: String,
    },
    /// show installer and spicetify versions and available updates
    Versions,
    /// show where spicetify is installed
    Locate,
    /// download and start the latest installer release
    SelfUpdate {
        /// update even when this build is newer than the latest release
        #[arg(long)]
        force: bool,
    },
    /// open the spicetify faq in the browser
    Faq,
    /// render text with ansi color codes read from stdin
    Render {
        /// print html markup
        #[arg(long, conflicts_with = "runs")]
        html: bool,

        /// print the styled runs as json
        #[arg(long)]
        runs: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if cli.edit_config {
        if let Err(e) = CliConfig::edit_config() {
            output_error(&cli, &e.to_string());
            std::process::exit(exit_codes::FATAL_ERROR);
        }
        return;
    }

    let mut config = match CliConfig::load() {
        Ok(c) => c,
        Err(e) => {
            output_error(&cli, &format!("failed to load config: {e}"));
            std::process::exit(exit_codes::FATAL_ERROR);
        }
    };

    if cli.offline {
        config.inner = config.inner.with_check_online(false);
    }

    let verbosity = if cli.verbose {
        Verbosity::Verbose
    } else {
        config.verbosity
    };

    let result = match cli.command.as_ref().unwrap_or(&Commands::List) {
        Commands::List => cmd_list(&cli, &config, verbosity),
        Commands::Run { operation } => cmd_run(&cli, &config, operation, verbosity),
        Commands::Versions => cmd_versions(&cli, &config, verbosity),
        Commands::Locate => cmd_locate(&cli, &config),
        Commands::SelfUpdate { force } => cmd_self_update(&cli, &config, *force, verbosity),
        Commands::Faq => cmd_faq(&cli, &config),
        Commands::Render { html, runs } => cmd_render(*html, *runs),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output_error(&cli, &e.to_string());
            std::process::exit(exit_codes::FATAL_ERROR);
        }
    }
}

fn output_error(cli: &Cli, msg: &str) {
    if cli.json {
        let output: JsonOutput<()> = JsonOutput::err(msg);
        if let Ok(json) = serde_json::to_string(&output) {
            println!("{json}");
        }
    } else {
        eprintln!("{} {msg}", ansi::bold("error:"));
    }
}

fn print_json<T: Serialize>(data: T) -> CmdResult {
    let output = JsonOutput::ok(data);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(exit_codes::SUCCESS)
}

fn use_color() -> bool {
    atty::is(atty::Stream::Stdout)
}

fn controller(config: &CliConfig) -> Result<Controller<SystemHost>, libspicetify_installer::Error> {
    let host = SystemHost::new(config.inner.clone())?;
    Ok(Controller::new(host, config.inner.clone()))
}

#[derive(Serialize)]
struct OperationJson {
    operation: Operation,
    name: &'static str,
    command: String,
    description: &'static str,
}

fn cmd_list(cli: &Cli, config: &CliConfig, verbosity: Verbosity) -> CmdResult {
    let operations: Vec<OperationJson> = Operation::all()
        .iter()
        .map(|op| OperationJson {
            operation: *op,
            name: op.name(),
            command: op.command(config),
            description: op.description(),
        })
        .collect();

    if cli.json {
        return print_json(&operations);
    }

    if verbosity == Verbosity::Quiet {
        for op in &operations {
            println!("{}", op.name);
        }
        return Ok(exit_codes::SUCCESS);
    }

    let name_width = operations.iter().map(|o| o.name.len()).max().unwrap_or(10).max(10);

    println!("{:<name_width$}  DESCRIPTION", "NAME");
    println!("{}", "-".repeat(name_width + 40));

    for op in &operations {
        println!("{:<name_width$}  {}", op.name, op.description);
        if verbosity == Verbosity::Verbose {
            println!("{:<name_width$}  > {}", "", op.command);
        }
    }

    Ok(exit_codes::SUCCESS)
}

#[derive(Serialize)]
struct RunJsonOutput {
    #[serde(flatten)]
    report: ExecutionReport,
    output: String,
}

fn cmd_run(cli: &Cli, config: &CliConfig, operation: &str, verbosity: Verbosity) -> CmdResult {
    let operation: Operation = operation.parse()?;
    let mut controller = controller(config)?;
    controller.select(operation);

    let color = use_color();
    let stream = !cli.json && verbosity != Verbosity::Quiet;

    let mut sink = |runs: &[StyleRun]| {
        if stream {
            print!("{}", render::to_terminal(runs, color));
            io::stdout().flush().ok();
        }
    };

    let Some(report) = controller.execute(&mut sink) else {
        return Err(libspicetify_installer::Error::other(
            "an operation is already running",
        ));
    };

    if cli.json {
        let output: String = controller.output().iter().map(|r| r.text.as_str()).collect();
        let code = report.exit_code();
        print_json(RunJsonOutput { report, output })?;
        return Ok(code);
    }

    if verbosity == Verbosity::Quiet {
        match &report.error {
            None => println!("{}", ansi::bold("success")),
            Some(e) => eprintln!("{} {e}", ansi::bold("failed:")),
        }
    }

    Ok(report.exit_code())
}

#[derive(Serialize)]
struct VersionsJson<'a> {
    info: &'a VersionInfo,
    installer: Option<InstallerBadge>,
    tool: ToolBadge,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<String>,
}

fn cmd_versions(cli: &Cli, config: &CliConfig, verbosity: Verbosity) -> CmdResult {
    let mut controller = controller(config)?;
    controller.refresh_versions();

    let installer = controller.installer_badge();
    let tool = controller.tool_badge();
    let notice = controller.update_notice().map(|n| n.to_string());
    let info = controller.versions().cloned().unwrap_or_default();

    if cli.json {
        return print_json(VersionsJson {
            info: &info,
            installer,
            tool,
            notice,
        });
    }

    if let Some(badge) = &installer {
        match &badge.title {
            Some(title) if verbosity != Verbosity::Quiet => {
                println!("{} {} ({title})", ansi::bold("installer:"), badge.label)
            }
            _ => println!("{} {}", ansi::bold("installer:"), badge.label),
        }
    }
    println!("{} {}", ansi::bold("spicetify:"), tool.label);

    if verbosity == Verbosity::Verbose
        && let Some(latest) = &info.latest_tool_version
    {
        println!("{} latest spicetify release is v{latest}", ansi::bold("info:"));
    }

    if let Some(notice) = notice {
        println!();
        println!("{} {notice}", ansi::bold("notice:"));
    }

    Ok(exit_codes::SUCCESS)
}

fn cmd_locate(cli: &Cli, config: &CliConfig) -> CmdResult {
    let report = libspicetify_installer::locate_tool(config);

    if cli.json {
        return print_json(&report);
    }

    print!("{report}");

    if report.is_installed() {
        Ok(exit_codes::SUCCESS)
    } else {
        Ok(exit_codes::PARTIAL_FAILURE)
    }
}

fn cmd_self_update(cli: &Cli, config: &CliConfig, force: bool, verbosity: Verbosity) -> CmdResult {
    let mut controller = controller(config)?;
    let action = controller.update_action();

    let apply = match &action {
        UpdateAction::OfferInstallerUpdate { latest, .. } => {
            if !cli.json && verbosity != Verbosity::Quiet {
                println!("{} updating to v{latest}", ansi::bold("update:"));
            }
            true
        }
        UpdateAction::ShowUnreleasedWarning { current, latest } => {
            if !cli.json {
                eprintln!(
                    "{} you are running v{current}, which is newer than the latest release v{latest}",
                    ansi::bold("warn:")
                );
                if !force {
                    eprintln!("run with --force to install the latest stable release");
                }
            }
            force
        }
        UpdateAction::OfferToolUpdate => {
            if !cli.json && verbosity != Verbosity::Quiet {
                println!(
                    "{} a spicetify update is available, run `spicetify-installer run install`",
                    ansi::bold("info:")
                );
            }
            false
        }
        UpdateAction::Nothing => {
            if !cli.json && verbosity != Verbosity::Quiet {
                println!("{} no updates available", ansi::bold("info:"));
            }
            false
        }
    };

    if apply {
        let show_progress = !cli.json && verbosity == Verbosity::Verbose;
        let id = show_progress.then(|| {
            controller
                .host()
                .subscribe_progress(Box::new(|v: u8| eprintln!("{} {v}%", ansi::bold("progress:"))))
        });

        let result = controller.apply_self_update();
        if let Some(id) = id {
            controller.host().unsubscribe_progress(id);
        }
        result?;

        if !cli.json && verbosity != Verbosity::Quiet {
            println!("{} installer started, this window can be closed", ansi::bold("success:"));
        }
    }

    if cli.json {
        return print_json(&action);
    }

    Ok(exit_codes::SUCCESS)
}

fn cmd_faq(cli: &Cli, config: &CliConfig) -> CmdResult {
    let host = SystemHost::new(config.inner.clone())?;
    host.open_faq()?;

    if cli.json {
        return print_json(&config.faq_url);
    }

    println!("{} opened {}", ansi::bold("info:"), config.faq_url);
    Ok(exit_codes::SUCCESS)
}

fn cmd_render(html: bool, runs: bool) -> CmdResult {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;

    let rendered = AnsiRenderer::new().render(&input);

    if html {
        print!("{}", rendered.to_markup());
    } else if runs {
        let runs = rendered.runs();
        let json: Vec<RunJson> = runs.iter().map(RunJson::from).collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        print!("{}", render::to_terminal(&rendered.runs(), use_color()));
    }

    io::stdout().flush()?;
    Ok(exit_codes::SUCCESS)
}
