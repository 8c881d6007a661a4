use std::fmt;

use crate::domain::AppError;
use crate::utils::is_valid_package_name;

/// A reverse-DNS application identifier that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageName(String);

impl PackageName {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if is_valid_package_name(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(AppError::InvalidPackageName(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPhase {
    Idle,
    Submitting,
    InProgress,
    Succeeded,
    Failed,
    Errored,
}

impl DownloadPhase {
    /// A request is on the wire and no terminal event has arrived yet.
    pub fn is_in_flight(self) -> bool {
        matches!(self, DownloadPhase::Submitting | DownloadPhase::InProgress)
    }
}

/// Validation marker drawn around the input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldDecoration {
    #[default]
    Neutral,
    Valid,
    Invalid,
}

/// What the submit button currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonAffordance {
    #[default]
    Ready,
    Busy,
    Danger,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// What happens once the user confirms a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    Dismiss,
    Reenable,
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
    pub on_confirm: Acknowledgement,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: "Successful download".to_string(),
            message: message.into(),
            on_confirm: Acknowledgement::Dismiss,
        }
    }

    pub fn bad_package(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: "No application found".to_string(),
            message: message.into(),
            on_confirm: Acknowledgement::Reenable,
        }
    }

    pub fn download_error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: "Download error".to_string(),
            message: message.into(),
            on_confirm: Acknowledgement::Reload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_name_parse() {
        let name = PackageName::parse("com.spotify.music").unwrap();
        assert_eq!(name.as_str(), "com.spotify.music");
        assert_eq!(name.to_string(), "com.spotify.music");

        assert_eq!(
            PackageName::parse("not a package"),
            Err(AppError::InvalidPackageName("not a package".to_string()))
        );
    }

    #[test]
    fn test_in_flight_phases() {
        assert!(DownloadPhase::Submitting.is_in_flight());
        assert!(DownloadPhase::InProgress.is_in_flight());
        assert!(!DownloadPhase::Idle.is_in_flight());
        assert!(!DownloadPhase::Succeeded.is_in_flight());
    }

    #[test]
    fn test_notice_acknowledgements() {
        assert_eq!(Notice::success("ok").on_confirm, Acknowledgement::Dismiss);
        assert_eq!(Notice::bad_package("?").on_confirm, Acknowledgement::Reenable);
        assert_eq!(Notice::download_error("!").on_confirm, Acknowledgement::Reload);
        assert_eq!(Notice::download_error("!").kind, NoticeKind::Error);
    }
}
