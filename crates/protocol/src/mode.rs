//! Subscription modes
//!
//! Wire-level subscription knobs shared by configuration and the session:
//! how the list as a whole behaves (`SubscribeMode`) and how individual
//! paths are sampled (`StreamMode`).

use std::fmt;
use std::str::FromStr;

use gtel_proto::gnmi;

use crate::error::{CodecError, Result};

/// How the subscription list as a whole behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeMode {
    /// Long-lived stream: initial dump, sync boundary, then updates
    Stream,
    /// One snapshot, then the session closes
    Once,
    /// Snapshots on demand via poll()
    Poll,
}

impl SubscribeMode {
    pub fn to_wire(self) -> gnmi::subscription_list::Mode {
        match self {
            Self::Stream => gnmi::subscription_list::Mode::Stream,
            Self::Once => gnmi::subscription_list::Mode::Once,
            Self::Poll => gnmi::subscription_list::Mode::Poll,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Once => "once",
            Self::Poll => "poll",
        }
    }
}

impl FromStr for SubscribeMode {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stream" => Ok(Self::Stream),
            "once" => Ok(Self::Once),
            "poll" => Ok(Self::Poll),
            other => Err(CodecError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for SubscribeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How individual paths are sampled within a STREAM subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Device decides
    TargetDefined,
    /// Event-driven updates on change
    OnChange,
    /// Periodic samples at the configured interval
    Sample,
}

impl StreamMode {
    pub fn to_wire(self) -> gnmi::SubscriptionMode {
        match self {
            Self::TargetDefined => gnmi::SubscriptionMode::TargetDefined,
            Self::OnChange => gnmi::SubscriptionMode::OnChange,
            Self::Sample => gnmi::SubscriptionMode::Sample,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TargetDefined => "target_defined",
            Self::OnChange => "on_change",
            Self::Sample => "sample",
        }
    }
}

impl FromStr for StreamMode {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "target_defined" | "target-defined" => Ok(Self::TargetDefined),
            "on_change" | "on-change" => Ok(Self::OnChange),
            "sample" => Ok(Self::Sample),
            other => Err(CodecError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for StreamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
