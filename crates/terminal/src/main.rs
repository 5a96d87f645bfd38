use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use common::{config::AppConfig, logger, models::{Notification, View}};
use terminal::{
    commands::{self, Command, Flow},
    context::AppContext,
    services::notification_service::NotificationService,
    views::Frame,
};

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::setup_logger();
    let config = AppConfig::from_env()?;
    debug!("System starting up...");

    let ctx = AppContext::build(config).await?;

    let notifications = NotificationService::new(&ctx.config, ctx.settings.clone());
    tokio::spawn(notifications.start(ctx.notify_tx.subscribe()));
    tokio::spawn(print_frames(ctx.views.subscribe_frames()));

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut first_login = true;

    loop {
        if !ensure_session(&ctx, &mut input, first_login).await? {
            break;
        }
        first_login = false;

        let _supervisor = ctx.start_session_tasks().await;
        // Failures were already reported as notifications.
        let _ = ctx.views.switch_to(View::Dashboard).await;
        println!("Type 'help' for commands.");

        match command_loop(&ctx, &mut input).await? {
            Flow::Quit => {
                ctx.shutdown().await;
                break;
            }
            Flow::Logout | Flow::Continue => ctx.lifecycle.logout().await,
        }
    }

    info!("Dashboard stopped");
    Ok(())
}

/// Restores a persisted session, or logs in. `false` when input ran out.
async fn ensure_session(ctx: &AppContext, input: &mut Input, first_login: bool) -> anyhow::Result<bool> {
    if ctx.lifecycle.restore().await? {
        return Ok(true);
    }

    // Configured credentials are tried once per run, a forced logout prompts.
    if first_login {
        if let (Some(username), Some(password)) = (&ctx.config.username, &ctx.config.password) {
            match ctx.lifecycle.login(&ctx.api, username, password).await {
                Ok(()) => return Ok(true),
                Err(e) => warn!("Login with configured credentials failed: {}", e),
            }
        }
    }

    loop {
        let Some(username) = prompt(input, "Username: ").await? else {
            return Ok(false);
        };
        let Some(password) = prompt(input, "Password: ").await? else {
            return Ok(false);
        };

        match ctx.lifecycle.login(&ctx.api, username.trim(), password.trim()).await {
            Ok(()) => return Ok(true),
            Err(e) => {
                let _ = ctx.notify_tx.send(Notification::error(format!("Login failed: {}", e)));
            }
        }
    }
}

async fn prompt(input: &mut Input, label: &str) -> anyhow::Result<Option<String>> {
    print!("{}", label);
    std::io::stdout().flush()?;
    Ok(input.next_line().await?)
}

/// Reads commands until the user leaves or the session ends under us.
async fn command_loop(ctx: &AppContext, input: &mut Input) -> anyhow::Result<Flow> {
    let mut logged_in = ctx.lifecycle.subscribe();

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else {
                    return Ok(Flow::Quit);
                };
                if line.trim().is_empty() {
                    continue;
                }

                let command = match line.parse::<Command>() {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };

                match commands::execute(ctx, command).await {
                    Ok((Flow::Continue, Some(output))) => println!("{}", output),
                    Ok((Flow::Continue, None)) => {}
                    Ok((flow, _)) => return Ok(flow),
                    Err(e) if e.is_unauthorized() => return Ok(Flow::Logout),
                    Err(e) => {
                        let _ = ctx.notify_tx.send(Notification::error(e.to_string()));
                    }
                }
            }
            _ = logged_in.wait_for(|active| !*active) => {
                warn!("Session ended");
                return Ok(Flow::Logout);
            }
            _ = tokio::signal::ctrl_c() => {
                return Ok(Flow::Quit);
            }
        }
    }
}

async fn print_frames(mut frames: watch::Receiver<Frame>) {
    while frames.changed().await.is_ok() {
        let frame = frames.borrow_and_update().clone();
        println!("\n{}\n", frame.body);
    }
}
