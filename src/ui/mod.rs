use std::collections::VecDeque;

use iced::{
    widget::{
        button, center, column, container, mouse_area, opaque, progress_bar, row, stack, text,
        text_input, Space,
    },
    Color, Element, Length, Theme,
};

use crate::application::{FieldSurface, ModalPresenter, PlaceholderSurface};
use crate::domain::{Acknowledgement, ButtonAffordance, FieldDecoration, Notice, NoticeKind};

const DANGER: Color = Color::from_rgb(0.86, 0.21, 0.27);
const SUCCESS: Color = Color::from_rgb(0.16, 0.65, 0.27);

/// State of the package field, its button, warning line and progress bar
pub struct FormState {
    pub package_name: String,
    pub placeholder: String,
    pub enabled: bool,
    pub decoration: FieldDecoration,
    pub affordance: ButtonAffordance,
    pub warning_visible: bool,
    pub progress_visible: bool,
    pub progress_percent: u8,
    pub progress_animated: bool,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            package_name: String::new(),
            placeholder: String::new(),
            enabled: true,
            decoration: FieldDecoration::Neutral,
            affordance: ButtonAffordance::Ready,
            warning_visible: false,
            progress_visible: false,
            progress_percent: 0,
            progress_animated: true,
        }
    }
}

impl PlaceholderSurface for FormState {
    fn placeholder(&self) -> &str {
        &self.placeholder
    }

    fn set_placeholder(&mut self, text: String) {
        self.placeholder = text;
    }
}

impl FieldSurface for FormState {
    fn value(&self) -> &str {
        &self.package_name
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn set_decoration(&mut self, decoration: FieldDecoration) {
        self.decoration = decoration;
    }

    fn decoration(&self) -> FieldDecoration {
        self.decoration
    }

    fn set_affordance(&mut self, affordance: ButtonAffordance) {
        self.affordance = affordance;
    }

    fn affordance(&self) -> ButtonAffordance {
        self.affordance
    }

    fn set_warning_visible(&mut self, visible: bool) {
        self.warning_visible = visible;
    }

    fn warning_visible(&self) -> bool {
        self.warning_visible
    }

    fn reveal_progress(&mut self) {
        self.progress_visible = true;
    }

    fn progress_visible(&self) -> bool {
        self.progress_visible
    }

    fn set_progress(&mut self, percent: u8) {
        self.progress_percent = percent.min(100);
    }

    fn set_progress_animated(&mut self, animated: bool) {
        self.progress_animated = animated;
    }
}

/// Notices waiting for confirmation, shown one at a time
#[derive(Default)]
pub struct NoticeBoard {
    queue: VecDeque<Notice>,
}

impl NoticeBoard {
    pub fn current(&self) -> Option<&Notice> {
        self.queue.front()
    }

    pub fn is_open(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Close the visible notice and hand back its confirmation action.
    pub fn confirm(&mut self) -> Option<Acknowledgement> {
        self.queue.pop_front().map(|notice| notice.on_confirm)
    }
}

impl ModalPresenter for NoticeBoard {
    fn present(&mut self, notice: Notice) {
        self.queue.push_back(notice);
    }
}

/// Main view state
#[derive(Default)]
pub struct DownloadView {
    pub form: FormState,
    pub notices: NoticeBoard,
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    PackageNameChanged(String),
    DownloadPressed,
    FieldHovered(bool),
    NoticeConfirmed,
}

impl DownloadView {
    pub fn update(&mut self, message: DownloadMessage) {
        match message {
            DownloadMessage::PackageNameChanged(name) => {
                if self.form.enabled {
                    self.form.package_name = name;
                }
            }
            DownloadMessage::DownloadPressed
            | DownloadMessage::FieldHovered(_)
            | DownloadMessage::NoticeConfirmed => {
                // Will be handled by the app
            }
        }
    }

    pub fn view(&self) -> Element<'_, DownloadMessage> {
        let form = &self.form;

        let mut input = text_input(&form.placeholder, &form.package_name)
            .padding(10)
            .size(18)
            .style(field_style(form.decoration));
        if form.enabled {
            input = input
                .on_input(DownloadMessage::PackageNameChanged)
                .on_submit(DownloadMessage::DownloadPressed);
        }
        let input = mouse_area(input)
            .on_enter(DownloadMessage::FieldHovered(true))
            .on_exit(DownloadMessage::FieldHovered(false));

        let download = button(text(button_label(form.affordance)).size(16))
            .on_press_maybe(form.enabled.then_some(DownloadMessage::DownloadPressed))
            .padding([10, 20])
            .style(match form.affordance {
                ButtonAffordance::Ready => button::secondary,
                ButtonAffordance::Busy => button::primary,
                ButtonAffordance::Danger => button::danger,
                ButtonAffordance::Complete => button::success,
            });

        let warning: Element<'_, DownloadMessage> = if form.warning_visible {
            text("Please specify a valid package name (e.g. com.spotify.music).")
                .size(14)
                .color(DANGER)
                .into()
        } else {
            Space::new().height(Length::Fixed(18.0)).into()
        };

        let progress: Element<'_, DownloadMessage> = if form.progress_visible {
            progress_bar(0.0..=100.0, f32::from(form.progress_percent))
                .style(if form.progress_animated {
                    progress_bar::primary
                } else {
                    progress_bar::success
                })
                .into()
        } else {
            Space::new().height(Length::Fixed(10.0)).into()
        };

        let page: Element<'_, DownloadMessage> = column![
            text("Play Store Downloader").size(32),
            Space::new().height(Length::Fixed(20.0)),
            text("Package name:").size(16),
            row![input, download].spacing(10),
            warning,
            Space::new().height(Length::Fixed(10.0)),
            progress,
        ]
        .padding(20)
        .spacing(10)
        .into();

        match self.notices.current() {
            Some(notice) => stack![page, opaque(notice_overlay(notice))].into(),
            None => page,
        }
    }
}

fn button_label(affordance: ButtonAffordance) -> &'static str {
    match affordance {
        ButtonAffordance::Ready | ButtonAffordance::Danger => "Download",
        ButtonAffordance::Busy => "Downloading...",
        ButtonAffordance::Complete => "\u{2714} Done",
    }
}

fn field_style(
    decoration: FieldDecoration,
) -> impl Fn(&Theme, text_input::Status) -> text_input::Style {
    move |theme, status| {
        let mut style = text_input::default(theme, status);
        match decoration {
            FieldDecoration::Neutral => {}
            FieldDecoration::Valid => {
                style.border.color = SUCCESS;
            }
            FieldDecoration::Invalid => {
                style.border.color = DANGER;
                style.value = DANGER;
            }
        }
        style
    }
}

fn notice_overlay(notice: &Notice) -> Element<'_, DownloadMessage> {
    let accent = match notice.kind {
        NoticeKind::Success => SUCCESS,
        NoticeKind::Error => DANGER,
    };
    let card = container(
        column![
            text(&notice.title).size(24).color(accent),
            text(&notice.message).size(16),
            button(text("OK"))
                .on_press(DownloadMessage::NoticeConfirmed)
                .padding([8, 24])
                .style(match notice.kind {
                    NoticeKind::Success => button::success,
                    NoticeKind::Error => button::danger,
                }),
        ]
        .spacing(16),
    )
    .padding(24)
    .max_width(420)
    .style(container::rounded_box);

    center(card)
        .style(|_theme| container::Style {
            background: Some(
                Color {
                    a: 0.6,
                    ..Color::BLACK
                }
                .into(),
            ),
            ..container::Style::default()
        })
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_board_is_fifo() {
        let mut board = NoticeBoard::default();
        assert!(!board.is_open());
        board.present(Notice::success("ok"));
        board.present(Notice::download_error("boom"));

        assert_eq!(board.current().map(|n| n.title.as_str()), Some("Successful download"));
        assert_eq!(board.confirm(), Some(Acknowledgement::Dismiss));
        assert_eq!(board.confirm(), Some(Acknowledgement::Reload));
        assert_eq!(board.confirm(), None);
    }

    #[test]
    fn test_disabled_form_ignores_edits() {
        let mut view = DownloadView::default();
        view.update(DownloadMessage::PackageNameChanged("com.".to_string()));
        assert_eq!(view.form.value(), "com.");

        view.form.set_enabled(false);
        view.update(DownloadMessage::PackageNameChanged("com.x".to_string()));
        assert_eq!(view.form.value(), "com.");
    }

    #[test]
    fn test_progress_is_clamped() {
        let mut form = FormState::default();
        form.set_progress(140);
        assert_eq!(form.progress_percent, 100);
    }
}
