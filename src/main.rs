mod activity;
mod app;
mod config;
mod error;
mod event;
mod github;
mod logging;
mod oauth;
mod provision;
mod room;
mod session;
#[cfg(test)]
mod test_utils;
mod ticker;
mod ui;

use activity::backend::{ActivityBackend, HttpActivityBackend};
use app::App;
use clap::{Parser, Subcommand};
use config::Config;
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyEventKind, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use error::Result;
use event::AppEvent;
use futures::StreamExt;
use oauth::BrowserRedirector;
use provision::{channel, community::CommunityTarget, Provisioner};
use room::RoomId;
use session::SessionJar;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "rc4git", about = "Team chat wired to GitHub activity")]
struct Cli {
    #[arg(long, global = true, help = "Origin of the activity API")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Follow a room's live GitHub activity feed
    Activity {
        #[arg(help = "Room path, e.g. /channel/acme_widgets")]
        path: String,
    },
    /// List owners that already have a community
    Communities,
    /// List repositories a channel can be created for
    Repos {
        #[arg(long, help = "Only repositories owned by this community")]
        community: Option<String>,
        #[arg(long, help = "Include private repositories")]
        all: bool,
    },
    /// Create a channel for a repository
    CreateChannel {
        #[arg(long)]
        community: String,
        #[arg(long)]
        repo: String,
        #[arg(long, help = "Create a private group instead of a public channel")]
        private: bool,
    },
    /// Create a community for yourself or an organization
    CreateCommunity {
        #[arg(long, help = "Organization login; omit for your own community")]
        org: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(cli.api_url);

    if let Err(e) = logging::init(&config.log_path()) {
        eprintln!("warning: logging disabled: {e}");
    }

    let jar = match SessionJar::load(&config.session_path()) {
        Ok(jar) => jar,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Activity { path } => run_activity(config, jar, &path).await,
        Command::Communities => {
            let provisioner = provisioner_or_exit(&config, &jar);
            match list_communities(&provisioner).await {
                Ok(owners) => owners.iter().for_each(|o| println!("{o}")),
                Err(e) => fail("Error loading communities!", &e),
            }
            Ok(())
        }
        Command::Repos { community, all } => {
            run_repos(config, jar, community.as_deref(), all).await;
            Ok(())
        }
        Command::CreateChannel {
            community,
            repo,
            private,
        } => {
            let provisioner = provisioner_or_exit(&config, &jar);
            match provisioner.create_channel(&community, &repo, !private).await {
                Ok(created) => {
                    println!("{}", provision::CHANNEL_CREATED);
                    println!("{}", created.embed_link);
                }
                Err(e) => fail(provision::CHANNEL_FAILED, &e),
            }
            Ok(())
        }
        Command::CreateCommunity { org } => {
            let provisioner = provisioner_or_exit(&config, &jar);
            let target = org.map_or(CommunityTarget::User, CommunityTarget::Organization);
            match provisioner.create_community(&target).await {
                Ok(_) => println!("{}", provision::COMMUNITY_CREATED),
                Err(e) => fail(provision::COMMUNITY_FAILED, &e),
            }
            Ok(())
        }
    }
}

fn provisioner_or_exit(config: &Config, jar: &SessionJar) -> Provisioner {
    match Provisioner::from_session(config, jar) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn fail(message: &str, error: &error::Rc4GitError) -> ! {
    tracing::error!(%error, "{message}");
    eprintln!("{message}");
    std::process::exit(1);
}

async fn list_communities(provisioner: &Provisioner) -> Result<Vec<String>> {
    let orgs = provisioner.organizations().await?;
    provisioner.communities(&orgs).await
}

async fn run_repos(config: Config, mut jar: SessionJar, community: Option<&str>, all: bool) {
    if all && !jar.has_private_repo_token() {
        match oauth::request_scope_upgrade(&mut jar, &config, &BrowserRedirector, "/create-channel") {
            Ok(url) => println!("Authorize private repository access: {url}"),
            Err(e) => fail("Could not start authorization!", &e),
        }
        return;
    }

    let provisioner = provisioner_or_exit(&config, &jar);
    let repos = match provisioner.repositories(all).await {
        Ok(repos) => repos,
        Err(e) => fail("Error loading repositories!", &e),
    };
    let listed = match community {
        Some(owner) => channel::repo_options(&repos, owner),
        None => repos,
    };
    for repo in listed {
        println!("{repo}");
    }
}

async fn run_activity(
    config: Config,
    jar: SessionJar,
    path: &str,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let room = match RoomId::from_path(path) {
        Ok(room) => room,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let backend: Arc<dyn ActivityBackend> = match HttpActivityBackend::new(&config, &jar) {
        Ok(b) => Arc::new(b),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    // Install panic hook before entering raw mode so terminal is restored on panic
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        default_hook(info);
    }));

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let term_backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(term_backend)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();

    let ticker = tokio::spawn(ticker::start_ticker(tx.clone(), 250));

    let input_tx = tx.clone();
    let input = tokio::spawn(async move {
        let mut reader = EventStream::new();
        while let Some(Ok(event)) = reader.next().await {
            let app_event = match event {
                Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
                Event::Mouse(mouse) if matches!(mouse.kind, MouseEventKind::Down(_)) => {
                    Some(AppEvent::Click)
                }
                Event::Resize(_, _) => Some(AppEvent::Resize),
                _ => None,
            };
            if let Some(e) = app_event {
                if input_tx.send(e).is_err() {
                    break;
                }
            }
        }
    });

    let mut app = App::new(config, jar, room, backend, Arc::new(BrowserRedirector), tx);
    app.start();

    loop {
        terminal.draw(|f| app.render(f))?;

        let first = match rx.recv().await {
            Some(e) => e,
            None => break,
        };

        app.handle_event(first);
        while let Ok(pending) = rx.try_recv() {
            app.handle_event(pending);
        }

        if app.should_quit {
            break;
        }
    }

    app.shutdown();
    ticker.abort();
    input.abort();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}
