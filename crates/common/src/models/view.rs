use std::fmt;
use std::str::FromStr;

/// The screens of the dashboard. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum View {
    #[default]
    Dashboard,
    Signals,
    Portfolio,
    Analytics,
    Markets,
    News,
    Settings,
}

impl View {
    pub const ALL: [View; 7] = [
        View::Dashboard,
        View::Signals,
        View::Portfolio,
        View::Analytics,
        View::Markets,
        View::News,
        View::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Dashboard => "dashboard",
            View::Signals => "signals",
            View::Portfolio => "portfolio",
            View::Analytics => "analytics",
            View::Markets => "markets",
            View::News => "news",
            View::Settings => "settings",
        }
    }

    /// Views that a `new_signal` push makes stale.
    pub fn shows_signals(&self) -> bool {
        matches!(self, View::Dashboard | View::Signals)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        View::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown view '{}'", s))
    }
}
