//! Markpane - a read-only markdown viewer with live reload.
//!
//! # Usage
//!
//! ```bash
//! markpane README.md
//! markpane --no-watch README.md
//! markpane --nav docs/
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use markpane::app::App;
use markpane::bridge::DesktopProvider;
use markpane::config::{
    ConfigFlags, ThemeMode, clear_config_flags, global_config_path, load_config_flags,
    local_override_path, save_config_flags,
};
use markpane::events::instance::{self, InstanceRequest};
use markpane::events::{self, OpenTarget, PendingOpen};
use markpane::watch::NotifyWatchService;

/// A read-only markdown viewer with live reload
#[derive(Parser, Debug)]
#[command(name = "markpane", version, about, long_about = None)]
struct Cli {
    /// Markdown file or folder to open
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Re-render when the open file changes on disk
    #[arg(long)]
    watch: bool,

    /// Disable change watching
    #[arg(long, conflicts_with = "watch")]
    no_watch: bool,

    /// Start with the navigation panel open
    #[arg(long)]
    nav: bool,

    /// Start with the navigation panel closed
    #[arg(long, conflicts_with = "nav")]
    no_nav: bool,

    /// Color theme (auto follows the desktop environment)
    #[arg(long, value_enum)]
    theme: Option<ThemeMode>,

    /// Save current command-line flags as defaults in .markpanerc
    #[arg(long)]
    save: bool,

    /// Clear saved defaults in .markpanerc
    #[arg(long)]
    clear: bool,
}

fn flags_from_cli(cli: &Cli) -> ConfigFlags {
    ConfigFlags {
        watch: cli.watch,
        no_watch: cli.no_watch,
        nav: cli.nav,
        no_nav: cli.no_nav,
        theme: cli.theme,
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = flags_from_cli(&cli);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    let target = cli
        .path
        .as_ref()
        .map(|path| {
            OpenTarget::from_path(path)
                .with_context(|| format!("not a markdown file or folder: {}", path.display()))
        })
        .transpose()?;

    // A running instance takes this invocation's target and explicit flags.
    let port_file = instance::default_port_file();
    let request = InstanceRequest {
        open: target.as_ref().map(instance::open_request_value),
        options: cli_flags.startup_options(),
    };
    if !request.is_empty() && instance::notify_primary(&port_file, &request) {
        return Ok(());
    }

    let pending = PendingOpen::new();
    if let Some(target) = target {
        pending.push(target);
    }

    let (senders, channels) = events::event_channels();
    let listening = match instance::spawn_listener(&port_file, senders.clone()) {
        Ok(()) => true,
        Err(err) => {
            eprintln!("running standalone, no instance listener: {err:#}");
            false
        }
    };
    let watches = NotifyWatchService::new(senders.file_changed, senders.folder_changed);
    let mut app = App::new(DesktopProvider, watches);

    app.startup(effective.startup_options(), &pending);
    if app.session().active_file().is_none() && app.session().active_folder().is_none() {
        app.open_file_dialog();
    }
    if let Some(notice) = app.take_notice() {
        eprintln!("{}", notice.message);
    }
    println!("{}", app.surface().full_html());

    // Nothing to watch and nobody can reach us: nothing left to do.
    if !listening && !app.session().auto_refresh() && app.session().active_folder().is_none() {
        return Ok(());
    }

    // Dispatch loop: drain queued events in delivery order, reprint when
    // the mounted content moved.
    loop {
        std::thread::sleep(Duration::from_millis(250));
        let before = app.surface().full_html();
        app.drain_events(&channels);
        if let Some(notice) = app.take_notice() {
            eprintln!("{}", notice.message);
        }
        let after = app.surface().full_html();
        if after != before {
            println!("{after}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_from_cli_carries_every_flag() {
        let cli = Cli::parse_from([
            "markpane",
            "--watch",
            "--no-nav",
            "--theme",
            "dark",
            "README.md",
        ]);
        let flags = flags_from_cli(&cli);
        assert!(flags.watch);
        assert!(!flags.no_watch);
        assert!(flags.no_nav);
        assert!(!flags.nav);
        assert_eq!(flags.theme, Some(ThemeMode::Dark));
    }

    #[test]
    fn test_theme_is_absent_unless_given() {
        let cli = Cli::parse_from(["markpane"]);
        assert_eq!(flags_from_cli(&cli).theme, None);
    }
}
