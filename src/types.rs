use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Partition of the asset store.
///
/// The store itself accepts any namespace string; an unrecognised one simply
/// resolves to nothing. This enum exists for callers that want a typed handle
/// on the namespaces shipped in the embedded bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetNamespace {
    Scripts,
    Templates,
    Workspaces,
}

impl AssetNamespace {
    pub const ALL: [AssetNamespace; 3] = [
        AssetNamespace::Scripts,
        AssetNamespace::Templates,
        AssetNamespace::Workspaces,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetNamespace::Scripts => "scripts",
            AssetNamespace::Templates => "templates",
            AssetNamespace::Workspaces => "workspaces",
        }
    }
}

impl AsRef<str> for AssetNamespace {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for AssetNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetNamespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_matches('/').to_lowercase().as_str() {
            "scripts" => Ok(AssetNamespace::Scripts),
            "templates" => Ok(AssetNamespace::Templates),
            "workspaces" => Ok(AssetNamespace::Workspaces),
            other => Err(format!(
                "invalid asset namespace: {other} (expected \"scripts\", \"templates\" or \"workspaces\")"
            )),
        }
    }
}

/// Output format of the diagnostic log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Parse a duration such as `50ms`, `30s`, `5m` or `1h`.
///
/// A bare `0` is accepted and means "no deadline" to the executors.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{}' is too large", s))
}
