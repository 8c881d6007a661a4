use tracing::{debug, info, warn};

use super::surface::{FieldSurface, ModalPresenter, StartRequestSink};
use super::timers::Scheduler;
use super::typewriter::TypewriterSession;
use crate::api::ServerEvent;
use crate::domain::{
    Acknowledgement, AppError, ButtonAffordance, DownloadPhase, FieldDecoration, Notice,
    PackageName,
};

/// What the caller has to do after a notice was confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    Continue,
    Reload,
}

/// Submission state machine for the package field.
///
/// Progress reaching 100 and the success notice are tracked separately and
/// may arrive in either order.
#[derive(Debug)]
pub struct DownloadSession {
    phase: DownloadPhase,
    progress_percent: u8,
    package_name: Option<PackageName>,
    progress_complete: bool,
    success_notified: bool,
}

impl Default for DownloadSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadSession {
    pub fn new() -> Self {
        Self {
            phase: DownloadPhase::Idle,
            progress_percent: 0,
            package_name: None,
            progress_complete: false,
            success_notified: false,
        }
    }

    pub fn phase(&self) -> DownloadPhase {
        self.phase
    }

    #[cfg(test)]
    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    #[cfg(test)]
    pub fn package_name(&self) -> Option<&PackageName> {
        self.package_name.as_ref()
    }

    /// Both terminal signals of a successful download have been seen.
    pub fn is_complete(&self) -> bool {
        self.progress_complete && self.success_notified
    }

    /// Validate the raw input and, when it is a package name, ask the server
    /// to start downloading it.
    pub fn submit(
        &mut self,
        raw_input: &str,
        field: &mut impl FieldSurface,
        channel: &mut impl StartRequestSink,
        presenter: &mut impl ModalPresenter,
    ) -> Result<(), AppError> {
        if self.phase != DownloadPhase::Idle {
            debug!("submit ignored while {:?}", self.phase);
            return Ok(());
        }

        let package_name = match PackageName::parse(raw_input) {
            Ok(name) => name,
            Err(e) => {
                debug!("rejected input {:?}", raw_input);
                field.set_decoration(FieldDecoration::Invalid);
                field.set_affordance(ButtonAffordance::Danger);
                field.set_warning_visible(true);
                return Err(e);
            }
        };

        field.set_decoration(FieldDecoration::Valid);
        field.set_enabled(false);
        field.set_affordance(ButtonAffordance::Busy);
        field.set_warning_visible(false);

        info!("requesting download of {}", package_name);
        self.phase = DownloadPhase::Submitting;
        self.progress_percent = 0;
        self.progress_complete = false;
        self.success_notified = false;
        let sent = channel.start_download(&package_name);
        self.package_name = Some(package_name);

        if let Err(e) = sent {
            warn!("start request could not be sent: {}", e);
            self.fail_transport(e.to_string(), presenter);
            return Err(e);
        }
        Ok(())
    }

    /// Apply a pushed event. Server-reported failures come back as the
    /// matching `AppError` once the notice is up.
    pub fn handle_event(
        &mut self,
        event: ServerEvent,
        field: &mut impl FieldSurface,
        presenter: &mut impl ModalPresenter,
    ) -> Result<(), AppError> {
        match event {
            ServerEvent::Progress(percent) => self.on_progress(percent, field),
            ServerEvent::Success(message) => {
                if !self.phase.is_in_flight() {
                    warn!("success {:?} ignored while {:?}", message, self.phase);
                    return Ok(());
                }
                info!("download finished: {}", message);
                self.success_notified = true;
                self.phase = DownloadPhase::Succeeded;
                presenter.present(Notice::success(message));
                self.log_if_complete();
            }
            ServerEvent::BadPackage(message) => {
                if !self.phase.is_in_flight() {
                    warn!("bad package {:?} ignored while {:?}", message, self.phase);
                    return Ok(());
                }
                info!("server rejected package: {}", message);
                self.phase = DownloadPhase::Failed;
                presenter.present(Notice::bad_package(message.clone()));
                return Err(AppError::ApplicationNotFound(message));
            }
            ServerEvent::Error(message) => {
                // Succeeded stays terminal, Errored already waits for a reload.
                if matches!(self.phase, DownloadPhase::Succeeded | DownloadPhase::Errored) {
                    warn!("error {:?} ignored while {:?}", message, self.phase);
                    return Ok(());
                }
                self.fail_transport(message.clone(), presenter);
                return Err(AppError::Transport(message));
            }
        }
        Ok(())
    }

    fn log_if_complete(&self) {
        if self.is_complete() {
            if let Some(name) = &self.package_name {
                info!("{} fully downloaded", name);
            }
        }
    }

    /// The realtime connection went away.
    pub fn on_disconnect(&mut self, reason: &str, presenter: &mut impl ModalPresenter) {
        if self.phase.is_in_flight() {
            if let Some(name) = &self.package_name {
                warn!("lost {} at {}%", name, self.progress_percent);
            }
            self.fail_transport(reason.to_string(), presenter);
        } else {
            debug!("disconnected while {:?}: {}", self.phase, reason);
        }
    }

    pub fn acknowledge(
        &mut self,
        acknowledgement: Acknowledgement,
        field: &mut impl FieldSurface,
    ) -> AckOutcome {
        match acknowledgement {
            Acknowledgement::Dismiss => AckOutcome::Continue,
            Acknowledgement::Reenable => {
                field.set_decoration(FieldDecoration::Invalid);
                field.set_enabled(true);
                field.set_affordance(ButtonAffordance::Danger);
                self.phase = DownloadPhase::Idle;
                AckOutcome::Continue
            }
            Acknowledgement::Reload => AckOutcome::Reload,
        }
    }

    /// The field gained focus.
    pub fn on_focus(
        &mut self,
        field: &mut impl FieldSurface,
        typewriter: &mut TypewriterSession,
        scheduler: &mut impl Scheduler,
    ) {
        Self::reset_field_hints(field, typewriter, scheduler);
        field.set_warning_visible(false);
    }

    /// The field content changed.
    pub fn on_input(
        &mut self,
        field: &mut impl FieldSurface,
        typewriter: &mut TypewriterSession,
        scheduler: &mut impl Scheduler,
    ) {
        Self::reset_field_hints(field, typewriter, scheduler);
        if field.warning_visible() {
            field.set_warning_visible(false);
        }
    }

    /// The field lost focus. An empty field gets its animated hint back.
    pub fn on_blur(
        &mut self,
        field: &mut impl FieldSurface,
        typewriter: &mut TypewriterSession,
        scheduler: &mut impl Scheduler,
    ) {
        if field.value().is_empty() {
            typewriter.start(scheduler);
        }
    }

    fn on_progress(&mut self, percent: u8, field: &mut impl FieldSurface) {
        match self.phase {
            DownloadPhase::Submitting | DownloadPhase::InProgress => {
                self.phase = DownloadPhase::InProgress;
            }
            DownloadPhase::Succeeded => {}
            other => {
                warn!("progress {}% ignored while {:?}", percent, other);
                return;
            }
        }

        let percent = percent.min(100);
        self.progress_percent = percent;
        if percent > 0 && !field.progress_visible() {
            field.reveal_progress();
        }
        field.set_progress(percent);

        if percent == 100 {
            self.progress_complete = true;
            field.set_affordance(ButtonAffordance::Complete);
            field.set_progress_animated(false);
            self.log_if_complete();
        }
    }

    fn fail_transport(&mut self, message: String, presenter: &mut impl ModalPresenter) {
        warn!("download error: {}", message);
        self.phase = DownloadPhase::Errored;
        presenter.present(Notice::download_error(message));
    }

    fn reset_field_hints(
        field: &mut impl FieldSurface,
        typewriter: &mut TypewriterSession,
        scheduler: &mut impl Scheduler,
    ) {
        typewriter.stop(scheduler);
        field.set_placeholder(String::new());
        if field.decoration() == FieldDecoration::Invalid {
            field.set_decoration(FieldDecoration::Neutral);
        }
        if field.affordance() == ButtonAffordance::Danger {
            field.set_affordance(ButtonAffordance::Ready);
        }
    }
}
