//! Capabilities the controllers drive. The desktop view implements them for
//! real; tests implement them with plain recorders.

use crate::api::{ChannelSender, ClientEvent};
use crate::domain::{AppError, ButtonAffordance, FieldDecoration, Notice, PackageName};

/// The animated hint text of the input field.
pub trait PlaceholderSurface {
    fn placeholder(&self) -> &str;
    fn set_placeholder(&mut self, text: String);
}

/// Everything the download controller may change on the form.
pub trait FieldSurface: PlaceholderSurface {
    fn value(&self) -> &str;
    fn set_enabled(&mut self, enabled: bool);
    fn set_decoration(&mut self, decoration: FieldDecoration);
    fn decoration(&self) -> FieldDecoration;
    fn set_affordance(&mut self, affordance: ButtonAffordance);
    fn affordance(&self) -> ButtonAffordance;
    fn set_warning_visible(&mut self, visible: bool);
    fn warning_visible(&self) -> bool;
    fn reveal_progress(&mut self);
    fn progress_visible(&self) -> bool;
    fn set_progress(&mut self, percent: u8);
    fn set_progress_animated(&mut self, animated: bool);
}

pub trait ModalPresenter {
    fn present(&mut self, notice: Notice);
}

/// Outbound half of the realtime channel.
pub trait StartRequestSink {
    fn start_download(&mut self, package_name: &PackageName) -> Result<(), AppError>;
}

impl StartRequestSink for ChannelSender {
    fn start_download(&mut self, package_name: &PackageName) -> Result<(), AppError> {
        self.send(ClientEvent::StartDownload(package_name.as_str().to_string()))
            .map_err(|e| AppError::Transport(e.to_string()))
    }
}

impl<S: StartRequestSink> StartRequestSink for Option<S> {
    fn start_download(&mut self, package_name: &PackageName) -> Result<(), AppError> {
        match self {
            Some(sink) => sink.start_download(package_name),
            None => Err(AppError::Transport(
                "Not connected to the download server.".to_string(),
            )),
        }
    }
}
