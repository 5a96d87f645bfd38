use std::str::FromStr;

use common::models::{ChannelState, View};
use thiserror::Error;
use tracing::debug;

use crate::{context::AppContext, error::AppError, views::render};

pub const HELP: &str = "\
Views:    dashboard | signals | portfolio | analytics | markets | news | settings
refresh                       reload the current view
generate <SYMBOL> [TIMEFRAME] request a fresh signal (default 1h)
prices <SYM> [SYM...]         latest prices
sentiment <SYM> [SYM...]      news sentiment
backtest [DAYS]               run a backtest (default 30)
set <key> <value>             change a setting
status                        backend health and live channel state
logout | quit | help";

const DEFAULT_TIMEFRAME: &str = "1h";
const DEFAULT_BACKTEST_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show(View),
    Refresh,
    Generate { symbol: String, timeframe: String },
    Prices(Vec<String>),
    Sentiment(Vec<String>),
    Backtest(u32),
    Set { key: String, value: String },
    Status,
    Logout,
    Quit,
    Help,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(ParseError::Empty);
        };
        let rest: Vec<String> = words.map(str::to_string).collect();
        let head = head.to_ascii_lowercase();

        if let Ok(view) = head.parse::<View>() {
            return Ok(Command::Show(view));
        }

        match head.as_str() {
            "refresh" | "r" => Ok(Command::Refresh),
            "generate" | "gen" => match rest.as_slice() {
                [symbol] => Ok(Command::Generate {
                    symbol: symbol.to_uppercase(),
                    timeframe: DEFAULT_TIMEFRAME.to_string(),
                }),
                [symbol, timeframe] => Ok(Command::Generate {
                    symbol: symbol.to_uppercase(),
                    timeframe: timeframe.clone(),
                }),
                _ => Err(ParseError::Usage("generate <SYMBOL> [TIMEFRAME]")),
            },
            "prices" if !rest.is_empty() => Ok(Command::Prices(upper(rest))),
            "prices" => Err(ParseError::Usage("prices <SYM> [SYM...]")),
            "sentiment" if !rest.is_empty() => Ok(Command::Sentiment(upper(rest))),
            "sentiment" => Err(ParseError::Usage("sentiment <SYM> [SYM...]")),
            "backtest" => match rest.as_slice() {
                [] => Ok(Command::Backtest(DEFAULT_BACKTEST_DAYS)),
                [days] => days
                    .parse()
                    .map(Command::Backtest)
                    .map_err(|_| ParseError::Usage("backtest [DAYS]")),
                _ => Err(ParseError::Usage("backtest [DAYS]")),
            },
            "set" => match rest.as_slice() {
                [key, value @ ..] if !value.is_empty() => Ok(Command::Set {
                    key: key.clone(),
                    value: value.join(" "),
                }),
                _ => Err(ParseError::Usage("set <key> <value>")),
            },
            "status" => Ok(Command::Status),
            "logout" => Ok(Command::Logout),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            "help" | "?" => Ok(Command::Help),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

fn upper(symbols: Vec<String>) -> Vec<String> {
    symbols.into_iter().map(|s| s.to_uppercase()).collect()
}

/// What the command loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Logout,
    Quit,
}

/// Runs one command. Output that is not a view frame is returned as text.
/// Errors returned here have not been shown to the user yet.
pub async fn execute(ctx: &AppContext, command: Command) -> Result<(Flow, Option<String>), AppError> {
    debug!("Executing {:?}", command);
    let output = match command {
        Command::Show(view) => return view_result(ctx.views.switch_to(view).await),
        Command::Refresh => return view_result(ctx.views.reload(ctx.views.active_view()).await),
        Command::Generate { symbol, timeframe } => {
            let data = ctx.api.generate_signal(&symbol, &timeframe).await?.into_data();
            Some(render::block(&format!("SIGNAL {} {}", symbol, timeframe), &data))
        }
        Command::Prices(symbols) => {
            let data = ctx.api.market_prices(&symbols).await?.into_data();
            Some(render::block("PRICES", &data))
        }
        Command::Sentiment(symbols) => {
            let data = ctx.api.sentiment(&symbols).await?.into_data();
            Some(render::block("SENTIMENT", &data))
        }
        Command::Backtest(days) => {
            let data = ctx.api.backtest(days).await?.into_data();
            Some(render::block(&format!("BACKTEST {} DAYS", days), &data))
        }
        Command::Set { key, value } => {
            ctx.update_setting(&key, &value).await?;
            Some(format!("{} = {}", key, value))
        }
        Command::Status => {
            let health = match ctx.api.health().await {
                Ok(body) => render::block("BACKEND", &body),
                Err(e) => format!("== BACKEND ==\nunreachable: {}", e),
            };
            let channel = *ctx.channel_state().borrow();
            Some(format!("{}\nLive channel: {}", health, channel_label(channel)))
        }
        Command::Logout => return Ok((Flow::Logout, None)),
        Command::Quit => return Ok((Flow::Quit, None)),
        Command::Help => Some(HELP.to_string()),
    };
    Ok((Flow::Continue, output))
}

/// The view controller reports its own failures, only a lost session
/// matters here.
fn view_result(result: Result<(), AppError>) -> Result<(Flow, Option<String>), AppError> {
    match result {
        Err(e) if e.is_unauthorized() => Ok((Flow::Logout, None)),
        _ => Ok((Flow::Continue, None)),
    }
}

fn channel_label(state: ChannelState) -> &'static str {
    match state {
        ChannelState::Disconnected => "disconnected",
        ChannelState::Connecting => "connecting",
        ChannelState::Connected => "connected",
    }
}
