use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::LinkStatus;

/// Resultado terminal de ingerir un marcaje.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestOutcome {
    Ingested,
    Unmapped,
    Ignored,
    Disabled,
}

impl IngestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestOutcome::Ingested => "ingested",
            IngestOutcome::Unmapped => "unmapped",
            IngestOutcome::Ignored => "ignored",
            IngestOutcome::Disabled => "disabled",
        }
    }
}

impl fmt::Display for IngestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResult {
    pub outcome: IngestOutcome,
    pub status: LinkStatus,
    pub person_id: Option<String>,
    /// Sólo presente cuando `outcome == Ingested`.
    pub event_id: Option<Uuid>,
}
