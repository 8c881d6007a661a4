use std::collections::HashMap;
use std::time::Duration;

use iced::{event, mouse, task, Event, Subscription, Task};
use tracing::{debug, info, warn};

use crate::api::{ChannelConfig, ChannelEvent, ChannelSender, RealtimeClient};
use crate::application::{
    AckOutcome, DownloadSession, Scheduler, TimerHandle, TypewriterConfig, TypewriterSession,
};
use crate::ui::{DownloadMessage, DownloadView};

pub struct DownloadApp {
    view: DownloadView,
    session: DownloadSession,
    typewriter: TypewriterSession,
    timers: TaskScheduler,
    config: ChannelConfig,
    channel: Option<ChannelSender>,
    // Abort handle for the realtime stream
    connection: Option<task::Handle>,
    field_hovered: bool,
    field_focused: bool,
}

impl DownloadApp {
    pub fn new(config: ChannelConfig) -> (Self, Task<Message>) {
        Self::boot(config, TaskScheduler::default())
    }

    // The scheduler survives reloads so timer handles are never reused.
    fn boot(config: ChannelConfig, timers: TaskScheduler) -> (Self, Task<Message>) {
        let mut app = Self {
            view: DownloadView::default(),
            session: DownloadSession::new(),
            typewriter: TypewriterSession::new(TypewriterConfig::default()),
            timers,
            config,
            channel: None,
            connection: None,
            field_hovered: false,
            field_focused: false,
        };

        app.typewriter.start(&mut app.timers);

        let client = RealtimeClient::new(app.config.clone());
        let (connect, handle) = Task::run(client.events(), Message::Channel).abortable();
        app.connection = Some(handle);

        let timers = app.timers.take();
        (app, Task::batch([connect, timers]))
    }

    /// Throw away all client state and start over, like reloading the page.
    fn reload(&mut self) -> Task<Message> {
        info!("reloading client");
        self.typewriter.stop(&mut self.timers);
        if let Some(connection) = self.connection.take() {
            connection.abort();
        }
        let timers = std::mem::take(&mut self.timers);
        let (fresh, task) = Self::boot(self.config.clone(), timers);
        *self = fresh;
        task
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    /// A placeholder animation timer fired
    TypewriterTick(TimerHandle),
    Channel(ChannelEvent),
    /// Left mouse button pressed anywhere in the window
    PointerPressed,
}

/// Typewriter timers backed by abortable sleeping tasks
#[derive(Default)]
struct TaskScheduler {
    next_id: u64,
    pending: HashMap<TimerHandle, task::Handle>,
    ready: Vec<Task<Message>>,
}

impl TaskScheduler {
    fn fired(&mut self, handle: TimerHandle) {
        self.pending.remove(&handle);
    }

    /// Tasks scheduled since the last call, for the runtime to execute.
    fn take(&mut self) -> Task<Message> {
        Task::batch(self.ready.drain(..))
    }
}

impl Scheduler for TaskScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle::new(self.next_id);
        let (sleep, abort) = Task::perform(
            async move { tokio::time::sleep(delay).await },
            move |_| Message::TypewriterTick(handle),
        )
        .abortable();
        self.pending.insert(handle, abort);
        self.ready.push(sleep);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(abort) = self.pending.remove(&handle) {
            abort.abort();
        }
    }
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    let task = match message {
        Message::UiMessage(ui_msg) => handle_ui(app, ui_msg),
        Message::TypewriterTick(handle) => {
            app.timers.fired(handle);
            app.typewriter
                .on_timer(handle, &mut app.view.form, &mut app.timers);
            Task::none()
        }
        Message::Channel(event) => handle_channel(app, event),
        Message::PointerPressed => {
            if app.view.notices.is_open() {
                return Task::none();
            }
            if app.field_hovered && app.view.form.enabled && !app.field_focused {
                app.field_focused = true;
                app.session
                    .on_focus(&mut app.view.form, &mut app.typewriter, &mut app.timers);
            } else if !app.field_hovered && app.field_focused {
                app.field_focused = false;
                app.session
                    .on_blur(&mut app.view.form, &mut app.typewriter, &mut app.timers);
            }
            Task::none()
        }
    };

    Task::batch([task, app.timers.take()])
}

fn handle_ui(app: &mut DownloadApp, ui_msg: DownloadMessage) -> Task<Message> {
    app.view.update(ui_msg.clone());

    match ui_msg {
        DownloadMessage::PackageNameChanged(_) => {
            app.field_focused = true;
            app.session
                .on_input(&mut app.view.form, &mut app.typewriter, &mut app.timers);
        }
        DownloadMessage::DownloadPressed => {
            let raw = app.view.form.package_name.clone();
            if let Err(e) = app.session.submit(
                &raw,
                &mut app.view.form,
                &mut app.channel,
                &mut app.view.notices,
            ) {
                if e.is_recoverable() {
                    debug!("submit rejected: {}", e);
                } else {
                    warn!("submit failed: {}", e);
                }
            }
            if !app.view.form.enabled {
                app.field_focused = false;
            }
        }
        DownloadMessage::FieldHovered(hovered) => {
            app.field_hovered = hovered;
        }
        DownloadMessage::NoticeConfirmed => {
            if let Some(ack) = app.view.notices.confirm() {
                if app.session.acknowledge(ack, &mut app.view.form) == AckOutcome::Reload {
                    return app.reload();
                }
            }
        }
    }
    Task::none()
}

fn handle_channel(app: &mut DownloadApp, event: ChannelEvent) -> Task<Message> {
    match event {
        ChannelEvent::Connected(sender) => {
            info!("connected to download server");
            app.channel = Some(sender);
        }
        ChannelEvent::Server(event) => {
            if let Err(e) =
                app.session
                    .handle_event(event, &mut app.view.form, &mut app.view.notices)
            {
                if e.is_recoverable() {
                    info!("{} (phase {:?})", e, app.session.phase());
                } else {
                    warn!("{} (phase {:?})", e, app.session.phase());
                }
            }
        }
        ChannelEvent::Closed(reason) => {
            info!("realtime channel closed: {}", reason);
            app.channel = None;
            app.connection = None;
            app.session.on_disconnect(&reason, &mut app.view.notices);
        }
    }
    Task::none()
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::UiMessage)
}

pub fn subscription(_app: &DownloadApp) -> Subscription<Message> {
    event::listen_with(|event, _status, _window| match event {
        Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
            Some(Message::PointerPressed)
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ServerEvent;
    use crate::application::typewriter::Mode;
    use crate::domain::{ButtonAffordance, DownloadPhase, FieldDecoration};

    fn app() -> DownloadApp {
        let (app, _task) = DownloadApp::new(ChannelConfig::default());
        app
    }

    fn server(app: &mut DownloadApp, event: ServerEvent) {
        let _ = update(app, Message::Channel(ChannelEvent::Server(event)));
    }

    #[test]
    fn test_task_scheduler_tracks_pending_timers() {
        let mut timers = TaskScheduler::default();
        let a = timers.schedule(Duration::from_millis(10));
        let b = timers.schedule(Duration::from_millis(10));
        assert_ne!(a, b);
        assert_eq!(timers.pending.len(), 2);
        assert_eq!(timers.ready.len(), 2);

        timers.cancel(a);
        timers.cancel(a);
        assert_eq!(timers.pending.len(), 1);
        timers.fired(b);
        assert!(timers.pending.is_empty());

        let _ = timers.take();
        assert!(timers.ready.is_empty());
    }

    #[test]
    fn test_boot_starts_typewriter() {
        let app = app();
        assert_eq!(app.typewriter.mode(), Mode::Deleting);
        assert_eq!(app.timers.pending.len(), 1);
        assert!(app.connection.is_some());
        assert_eq!(app.session.phase(), DownloadPhase::Idle);
    }

    #[test]
    fn test_clicking_into_field_stops_animation() {
        let mut app = app();
        app.view.form.placeholder = "com.spo".to_string();

        let _ = update(&mut app, Message::UiMessage(DownloadMessage::FieldHovered(true)));
        let _ = update(&mut app, Message::PointerPressed);

        assert!(app.field_focused);
        assert_eq!(app.typewriter.mode(), Mode::Stopped);
        assert!(app.timers.pending.is_empty());
        assert_eq!(app.view.form.placeholder, "");

        // A tick that was already in flight changes nothing.
        let _ = update(&mut app, Message::TypewriterTick(TimerHandle::new(1)));
        assert_eq!(app.view.form.placeholder, "");

        // Clicking elsewhere with an empty field brings the animation back.
        let _ = update(&mut app, Message::UiMessage(DownloadMessage::FieldHovered(false)));
        let _ = update(&mut app, Message::PointerPressed);
        assert!(!app.field_focused);
        assert_eq!(app.typewriter.mode(), Mode::Deleting);
    }

    #[test]
    fn test_submit_without_connection_offers_reload() {
        let mut app = app();
        let _ = update(
            &mut app,
            Message::UiMessage(DownloadMessage::PackageNameChanged("com.spotify.music".into())),
        );
        let _ = update(&mut app, Message::UiMessage(DownloadMessage::DownloadPressed));

        assert_eq!(app.session.phase(), DownloadPhase::Errored);
        assert!(app.view.notices.is_open());

        let _ = update(&mut app, Message::UiMessage(DownloadMessage::NoticeConfirmed));
        assert_eq!(app.session.phase(), DownloadPhase::Idle);
        assert!(app.view.form.enabled);
        assert_eq!(app.view.form.package_name, "");
        assert!(!app.view.notices.is_open());
        assert_eq!(app.typewriter.mode(), Mode::Deleting);
    }

    #[test]
    fn test_invalid_submit_marks_field() {
        let mut app = app();
        let _ = update(
            &mut app,
            Message::UiMessage(DownloadMessage::PackageNameChanged("not a package".into())),
        );
        let _ = update(&mut app, Message::UiMessage(DownloadMessage::DownloadPressed));

        assert_eq!(app.session.phase(), DownloadPhase::Idle);
        assert_eq!(app.view.form.decoration, FieldDecoration::Invalid);
        assert_eq!(app.view.form.affordance, ButtonAffordance::Danger);
        assert!(app.view.form.warning_visible);
        assert!(!app.view.notices.is_open());
    }

    #[test]
    fn test_bad_package_flow() {
        let mut app = app();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        app.channel = Some(ChannelSender::new(tx));
        let _ = update(
            &mut app,
            Message::UiMessage(DownloadMessage::PackageNameChanged("com.missing.app".into())),
        );
        let _ = update(&mut app, Message::UiMessage(DownloadMessage::DownloadPressed));
        assert_eq!(app.session.phase(), DownloadPhase::Submitting);
        assert!(!app.view.form.enabled);

        server(&mut app, ServerEvent::Progress(10));
        assert!(app.view.form.progress_visible);
        server(&mut app, ServerEvent::BadPackage("Unable to retrieve application".into()));
        let _ = update(&mut app, Message::UiMessage(DownloadMessage::NoticeConfirmed));

        assert!(app.view.form.enabled);
        assert_eq!(app.view.form.decoration, FieldDecoration::Invalid);
        assert_eq!(app.view.form.affordance, ButtonAffordance::Danger);
        assert_eq!(app.view.form.package_name, "com.missing.app");
    }

    #[test]
    fn test_disconnect_mid_download_is_an_error() {
        let mut app = app();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        app.channel = Some(ChannelSender::new(tx));
        let _ = update(
            &mut app,
            Message::UiMessage(DownloadMessage::PackageNameChanged("com.whatsapp".into())),
        );
        let _ = update(&mut app, Message::UiMessage(DownloadMessage::DownloadPressed));
        let _ = update(
            &mut app,
            Message::Channel(ChannelEvent::Closed("connection reset".into())),
        );

        assert!(app.channel.is_none());
        assert_eq!(app.session.phase(), DownloadPhase::Errored);
        assert_eq!(
            app.view.notices.current().map(|n| n.message.as_str()),
            Some("connection reset")
        );
    }
}
