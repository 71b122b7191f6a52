use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Agent health as shown by the desktop helper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    #[serde(alias = "good")]
    Healthy,
    #[serde(alias = "warn")]
    Degraded,
    #[serde(alias = "fail")]
    Blocking,
    Idle,
}

impl StatusLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusLevel::Healthy => "healthy",
            StatusLevel::Degraded => "degraded",
            StatusLevel::Blocking => "blocking",
            StatusLevel::Idle => "idle",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            StatusLevel::Healthy | StatusLevel::Idle => "agent is running",
            StatusLevel::Degraded => "agent has detected problems",
            StatusLevel::Blocking => "agent is blocking access",
        }
    }
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "healthy" | "good" => Ok(StatusLevel::Healthy),
            "degraded" | "warn" => Ok(StatusLevel::Degraded),
            "blocking" | "fail" => Ok(StatusLevel::Blocking),
            "idle" => Ok(StatusLevel::Idle),
            other => Err(format!("unknown status level: {other}")),
        }
    }
}

/// Body of `POST /status`. Unknown fields are rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusRequest {
    pub status: StatusLevel,
}

#[cfg(test)]
mod tests;
