use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

/// Plataformas externas de las que se ingieren marcajes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    DingTalk,
    WeCom,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::DingTalk, Provider::WeCom];

    /// Etiqueta estable usada en request ids y en la columna `provider`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::DingTalk => "dingtalk",
            Provider::WeCom => "wecom",
        }
    }
}

impl FromStr for Provider {
    type Err = DomainError;

    /// Acepta mayúsculas/minúsculas y espacios alrededor; `wework` es alias
    /// histórico de WeCom.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dingtalk" => Ok(Provider::DingTalk),
            "wecom" | "wework" => Ok(Provider::WeCom),
            _ => Err(DomainError::UnknownProvider(s.trim().to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
