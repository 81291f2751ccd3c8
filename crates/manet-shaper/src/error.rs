//! Shaper-specific error kind (§7: `ShaperError` triggers a per-interface
//! failure record, never a batch abort).

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ShaperError {
    #[error("tc command failed on {iface} ({stage}): {detail}")]
    CommandFailed {
        iface: String,
        stage: &'static str,
        detail: String,
    },
}

impl ShaperError {
    pub fn iface(&self) -> &str {
        match self {
            ShaperError::CommandFailed { iface, .. } => iface,
        }
    }
}

impl From<ShaperError> for manet_types::ChannelError {
    fn from(err: ShaperError) -> Self {
        manet_types::ChannelError::Shaper {
            iface: err.iface().to_string(),
            source: err.to_string(),
        }
    }
}
