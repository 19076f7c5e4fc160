//! Native genre labels and their reduction to the coarse output labels.
//!
//! The wrapped model predicts one of nine fine-grained text genres
//! ([`NativeLabel`]). End users only see the reduced [`FinalLabel`]:
//!
//! | Native label | Final label |
//! |--------------|-------------|
//! | `Prose/Lyrical`, `Promotion` | `Fiction` |
//! | `Other` | `Other` |
//! | everything else | `Non-Fiction` |

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A genre label produced directly by the classification model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeLabel {
    InformationExplanation,
    News,
    Instruction,
    OpinionArgumentation,
    Forum,
    ProseLyrical,
    Legal,
    Promotion,
    Other,
}

impl NativeLabel {
    /// Every native label, in the canonical order.
    pub const ALL: [NativeLabel; 9] = [
        NativeLabel::InformationExplanation,
        NativeLabel::News,
        NativeLabel::Instruction,
        NativeLabel::OpinionArgumentation,
        NativeLabel::Forum,
        NativeLabel::ProseLyrical,
        NativeLabel::Legal,
        NativeLabel::Promotion,
        NativeLabel::Other,
    ];

    /// The label string as it appears in the model configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InformationExplanation => "Information/Explanation",
            Self::News => "News",
            Self::Instruction => "Instruction",
            Self::OpinionArgumentation => "Opinion/Argumentation",
            Self::Forum => "Forum",
            Self::ProseLyrical => "Prose/Lyrical",
            Self::Legal => "Legal",
            Self::Promotion => "Promotion",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for NativeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NativeLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A label string that is not part of the native label set.
///
/// Seeing this at runtime means the model's label configuration and this
/// crate's label table disagree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown native label: '{0}'")]
pub struct UnknownLabel(pub String);

impl FromStr for NativeLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NativeLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// The reduced label shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinalLabel {
    Fiction,
    NonFiction,
    Other,
}

impl FinalLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fiction => "Fiction",
            Self::NonFiction => "Non-Fiction",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for FinalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FinalLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Collapse a native label into its final label.
pub fn reduce(label: NativeLabel) -> FinalLabel {
    match label {
        NativeLabel::Other => FinalLabel::Other,
        NativeLabel::ProseLyrical | NativeLabel::Promotion => FinalLabel::Fiction,
        NativeLabel::InformationExplanation
        | NativeLabel::News
        | NativeLabel::Instruction
        | NativeLabel::OpinionArgumentation
        | NativeLabel::Forum
        | NativeLabel::Legal => FinalLabel::NonFiction,
    }
}

/// Print the native → final mapping table (`genre labels`).
pub fn print_label_table() {
    println!("{:<26} FINAL", "NATIVE");
    for label in NativeLabel::ALL {
        println!("{:<26} {}", label.as_str(), reduce(label));
    }
}
