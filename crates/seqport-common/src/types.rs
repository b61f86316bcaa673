//! Core enumerations shared across seqport.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// One of the fixed camera channels recorded per case.
///
/// Variant order is the canonical processing and reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "Cart_Center_2")]
    CartCenter2,
    #[serde(rename = "Cart_LT_4")]
    CartLt4,
    #[serde(rename = "Cart_RT_1")]
    CartRt1,
    #[serde(rename = "General_3")]
    General3,
    Monitor,
    #[serde(rename = "Patient_Monitor")]
    PatientMonitor,
    #[serde(rename = "Ventilator_Monitor")]
    VentilatorMonitor,
    #[serde(rename = "Injection_Port")]
    InjectionPort,
}

impl Channel {
    /// All channels in canonical order.
    pub const ALL: [Channel; 8] = [
        Channel::CartCenter2,
        Channel::CartLt4,
        Channel::CartRt1,
        Channel::General3,
        Channel::Monitor,
        Channel::PatientMonitor,
        Channel::VentilatorMonitor,
        Channel::InjectionPort,
    ];

    /// Directory and store column name of the channel.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::CartCenter2 => "Cart_Center_2",
            Channel::CartLt4 => "Cart_LT_4",
            Channel::CartRt1 => "Cart_RT_1",
            Channel::General3 => "General_3",
            Channel::Monitor => "Monitor",
            Channel::PatientMonitor => "Patient_Monitor",
            Channel::VentilatorMonitor => "Ventilator_Monitor",
            Channel::InjectionPort => "Injection_Port",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::invalid_input(format!("unknown channel: {s}")))
    }
}

/// Per-channel recorded-artifact state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum StatusCode {
    /// At least one file at or above the size threshold.
    Present = 1,
    /// Files exist but all are below the threshold.
    Undersized = 2,
    /// No matching files.
    Missing = 3,
    /// Format anomaly. Only ever set outside the scanner.
    FormatAnomaly = 4,
}

impl StatusCode {
    /// Classify a channel directory from its largest matching file.
    ///
    /// `largest` is `None` when no file matched.
    pub fn classify(largest: Option<u64>, threshold_bytes: u64) -> Self {
        match largest {
            Some(size) if size >= threshold_bytes => StatusCode::Present,
            Some(_) => StatusCode::Undersized,
            None => StatusCode::Missing,
        }
    }

    /// Integer value stored in status columns.
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Decode a stored integer, if it is a known status.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(StatusCode::Present),
            2 => Some(StatusCode::Undersized),
            3 => Some(StatusCode::Missing),
            4 => Some(StatusCode::FormatAnomaly),
            _ => None,
        }
    }
}

impl From<StatusCode> for i64 {
    fn from(code: StatusCode) -> Self {
        code.code()
    }
}

impl TryFrom<i64> for StatusCode {
    type Error = Error;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        StatusCode::from_code(code)
            .ok_or_else(|| Error::invalid_input(format!("unknown status code: {code}")))
    }
}

/// Output container format requested from the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Mp4,
    Avi,
}

impl ContainerFormat {
    /// Every supported format, in preference order.
    pub const ALL: [ContainerFormat; 2] = [ContainerFormat::Mp4, ContainerFormat::Avi];

    /// Format tag passed to the converter, also the file extension.
    pub fn tag(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Avi => "avi",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ContainerFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp4" => Ok(ContainerFormat::Mp4),
            "avi" => Ok(ContainerFormat::Avi),
            _ => Err(Error::invalid_input(format!("unknown container format: {s}"))),
        }
    }
}
