//! Pure renderers: fetched JSON in, display text out.
//!
//! Missing or oddly typed fields never fail a render, they show as `-`.

use std::fmt::Write;

use common::models::View;
use serde_json::Value;

pub const MISSING: &str = "-";
pub const LOADING: &str = "Loading...";

pub fn title(view: View) -> &'static str {
    match view {
        View::Dashboard => "DASHBOARD",
        View::Signals => "LATEST SIGNALS",
        View::Portfolio => "PORTFOLIO",
        View::Analytics => "ANALYTICS",
        View::Markets => "MARKET SCAN",
        View::News => "NEWS",
        View::Settings => "SETTINGS",
    }
}

/// What a view shows before its data has arrived.
pub fn placeholder(view: View) -> String {
    format!("== {} ==\n{}", title(view), LOADING)
}

pub fn render(view: View, data: &Value) -> String {
    let body = match view {
        View::Dashboard => dashboard(data),
        View::Signals => signals(data),
        View::Portfolio => portfolio(data),
        View::Analytics => analytics(data),
        View::Markets => markets(data),
        View::News => news(data),
        View::Settings => settings(data),
    };
    format!("== {} ==\n{}", title(view), body.trim_end())
}

/// Generic block for one-off command output.
pub fn block(heading: &str, data: &Value) -> String {
    let mut out = format!("== {} ==\n", heading);
    key_values(&mut out, data, 0);
    out.trim_end().to_string()
}

fn text(data: &Value, pointer: &str) -> String {
    match data.pointer(pointer) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => MISSING.to_string(),
    }
}

fn number(data: &Value, pointer: &str, decimals: usize) -> String {
    match data.pointer(pointer).and_then(Value::as_f64) {
        Some(n) => format!("{:.*}", decimals, n),
        None => MISSING.to_string(),
    }
}

fn percent(data: &Value, pointer: &str) -> String {
    match data.pointer(pointer).and_then(Value::as_f64) {
        Some(n) => format!("{:.1}%", n.clamp(0.0, 100.0)),
        None => MISSING.to_string(),
    }
}

/// For ratios the backend sends as fractions (0.12 = 12%).
fn fraction(data: &Value, pointer: &str) -> String {
    match data.pointer(pointer).and_then(Value::as_f64) {
        Some(n) => format!("{:.2}%", n * 100.0),
        None => MISSING.to_string(),
    }
}

fn list<'a>(data: &'a Value, pointer: &str) -> &'a [Value] {
    data.pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn signal_line(signal: &Value) -> String {
    format!(
        "{:<8} {:<4} entry {} | tp {} | sl {} | conf {} | risk {} | {} | {}",
        text(signal, "/symbol"),
        text(signal, "/direction"),
        number(signal, "/entry_price", 5),
        number(signal, "/tp_price", 5),
        number(signal, "/sl_price", 5),
        percent(signal, "/confidence"),
        percent(signal, "/risk_percent"),
        text(signal, "/timeframe"),
        text(signal, "/timestamp"),
    )
}

fn dashboard(data: &Value) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Session:       {}", text(data, "/active_session"));
    let _ = writeln!(out, "Tracked pairs: {}", text(data, "/total_pairs"));
    let _ = writeln!(
        out,
        "Signals:       {} (avg confidence {})",
        text(data, "/performance/total_signals"),
        percent(data, "/performance/avg_confidence")
    );
    let _ = writeln!(out, "Updated:       {}", text(data, "/last_updated"));
    let _ = writeln!(out, "Recent:");

    let recent = list(data, "/recent_signals");
    if recent.is_empty() {
        let _ = writeln!(out, "  {}", MISSING);
    }
    for signal in recent {
        let _ = writeln!(out, "  {}", signal_line(signal));
    }
    out
}

fn signals(data: &Value) -> String {
    let items = match data {
        Value::Array(items) => items.as_slice(),
        _ => &[],
    };
    if items.is_empty() {
        return "No signals yet".to_string();
    }

    let mut out = String::new();
    for signal in items {
        let _ = writeln!(out, "{}", signal_line(signal));
        if let Some(analysis) = signal.get("analysis").and_then(Value::as_str) {
            let _ = writeln!(out, "    {}", analysis);
        }
    }
    out
}

fn portfolio(data: &Value) -> String {
    let mut out = String::new();

    let mut weights: Vec<(&String, f64)> = data
        .get("weights")
        .and_then(Value::as_object)
        .map(|w| {
            w.iter()
                .filter_map(|(symbol, weight)| weight.as_f64().map(|v| (symbol, v)))
                .collect()
        })
        .unwrap_or_default();
    weights.sort_by(|a, b| b.1.total_cmp(&a.1));

    let _ = writeln!(out, "Allocation:");
    if weights.is_empty() {
        let _ = writeln!(out, "  {}", MISSING);
    }
    for (symbol, weight) in weights {
        let _ = writeln!(out, "  {:<10} {:>6.2}%", symbol, weight * 100.0);
    }

    let _ = writeln!(out, "Annual return:     {}", fraction(data, "/metrics/annual_return"));
    let _ = writeln!(out, "Annual volatility: {}", fraction(data, "/metrics/annual_volatility"));
    let _ = writeln!(out, "Sharpe ratio:      {}", number(data, "/metrics/sharpe_ratio", 2));
    let _ = writeln!(out, "Max drawdown:      {}", fraction(data, "/metrics/max_drawdown"));
    out
}

fn analytics(data: &Value) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Period:         {} days", text(data, "/period_days"));
    let _ = writeln!(out, "Total signals:  {}", text(data, "/signal_stats/total_signals"));
    let _ = writeln!(out, "Avg confidence: {}", percent(data, "/signal_stats/avg_confidence"));
    let _ = writeln!(
        out,
        "BUY / SELL:     {} / {}",
        text(data, "/signal_stats/direction_breakdown/BUY"),
        text(data, "/signal_stats/direction_breakdown/SELL")
    );
    let _ = writeln!(out, "Trading:");
    key_values(&mut out, data.get("trading_stats").unwrap_or(&Value::Null), 1);
    let _ = writeln!(out, "Today:");
    key_values(&mut out, data.get("daily_report").unwrap_or(&Value::Null), 1);
    out
}

fn markets(data: &Value) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Scanned {} (forex {}, crypto {}), high confidence {}",
        text(data, "/total_scanned"),
        text(data, "/forex_count"),
        text(data, "/crypto_count"),
        text(data, "/high_confidence")
    );
    let _ = writeln!(out, "At: {}", text(data, "/scan_timestamp"));
    for signal in list(data, "/top_signals") {
        let _ = writeln!(out, "  {}", signal_line(signal));
    }
    out
}

fn news(data: &Value) -> String {
    let mut out = String::new();
    let articles = list(data, "/articles");
    if articles.is_empty() {
        let _ = writeln!(out, "No articles");
    }
    for article in articles {
        // NewsAPI nests the source name, other feeds send a plain string.
        let source = match article.pointer("/source/name") {
            Some(Value::String(name)) => name.clone(),
            _ => text(article, "/source"),
        };
        let _ = writeln!(out, "* {} ({})", text(article, "/title"), source);
    }
    let _ = writeln!(out, "Sentiment:");
    key_values(&mut out, data.get("analysis").unwrap_or(&Value::Null), 1);
    out
}

fn settings(data: &Value) -> String {
    let toggle = |pointer: &str| match data.pointer(pointer).and_then(Value::as_bool) {
        Some(true) => "on".to_string(),
        Some(false) => "off".to_string(),
        None => MISSING.to_string(),
    };

    let mut out = String::new();
    let _ = writeln!(out, "pushNotifications  {}", toggle("/pushNotifications"));
    let _ = writeln!(out, "emailNotifications {}", toggle("/emailNotifications"));
    let _ = writeln!(out, "minConfidence      {}", percent(data, "/minConfidence"));
    let _ = writeln!(out, "theme              {}", text(data, "/theme"));
    let _ = writeln!(out, "currency           {}", text(data, "/currency"));
    out
}

fn key_values(out: &mut String, data: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    match data {
        Value::Object(map) if !map.is_empty() => {
            for (key, value) in map {
                match value {
                    Value::Object(_) | Value::Array(_) => {
                        let _ = writeln!(out, "{}{}:", indent, key);
                        key_values(out, value, depth + 1);
                    }
                    _ => {
                        let _ = writeln!(out, "{}{}: {}", indent, key, scalar(value));
                    }
                }
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for item in items {
                match item {
                    Value::Object(_) | Value::Array(_) => key_values(out, item, depth + 1),
                    _ => {
                        let _ = writeln!(out, "{}- {}", indent, scalar(item));
                    }
                }
            }
        }
        Value::Object(_) | Value::Array(_) | Value::Null => {
            let _ = writeln!(out, "{}{}", indent, MISSING);
        }
        other => {
            let _ = writeln!(out, "{}{}", indent, scalar(other));
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) if s.is_empty() => MISSING.to_string(),
        Value::String(s) => s.clone(),
        Value::Null => MISSING.to_string(),
        other => other.to_string(),
    }
}
