use serde::Deserialize;
use std::str::FromStr;
use strum::{Display, EnumString, VariantNames};

/// Lifecycle of a page controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum LoopState {
    #[default]
    Idle,
    Loading,
    Ready,
    Running,
    Stopped,
    Failed,
}

impl LoopState {
    /// Whether a new camera session may start
    pub const fn can_start(&self) -> bool {
        matches!(self, LoopState::Ready | LoopState::Stopped)
    }

    /// Whether an upload may run; uploading tears a live session down
    pub const fn can_upload(&self) -> bool {
        matches!(self, LoopState::Ready | LoopState::Stopped | LoopState::Running)
    }
}

/// Input mode selected on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum SourceTab {
    #[default]
    Webcam,
    Upload,
}

/// Custom deserializer with helpful error message
pub fn deserialize_source_tab<'de, D>(deserializer: D) -> Result<SourceTab, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    SourceTab::from_str(&value).map_err(|_| {
        serde::de::Error::invalid_value(
            serde::de::Unexpected::Str(&value),
            &format!("one of {}", SourceTab::VARIANTS.join(", ")).as_str(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_requires_loaded_model() {
        assert!(LoopState::Ready.can_start());
        assert!(LoopState::Stopped.can_start());
        assert!(!LoopState::Running.can_start());
        assert!(!LoopState::Loading.can_start());
        assert!(!LoopState::Failed.can_upload());
        assert!(LoopState::Running.can_upload());
    }

    #[test]
    fn test_source_tab_parses() {
        assert_eq!(SourceTab::from_str("upload").unwrap(), SourceTab::Upload);
        assert_eq!(SourceTab::Webcam.to_string(), "webcam");
    }
}
