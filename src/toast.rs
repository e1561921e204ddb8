use std::time::{Duration, Instant};

use iced::widget::{column, container, text};
use iced::{Background, Border, Color, Element, Length, alignment};

/// How long a toast stays on screen
const TOAST_DURATION: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: Level,
    shown_at: Instant,
}

/// Queue of transient notifications, pruned on timer ticks.
#[derive(Debug, Default)]
pub struct Toasts {
    entries: Vec<Toast>,
}

impl Toasts {
    pub fn push(&mut self, level: Level, message: impl Into<String>) {
        self.entries.push(Toast {
            message: message.into(),
            level,
            shown_at: Instant::now(),
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Level::Error, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Level::Success, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Level::Info, message);
    }

    /// Drop entries past their display duration.
    pub fn prune(&mut self) {
        self.entries
            .retain(|toast| toast.shown_at.elapsed() < TOAST_DURATION);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.entries.iter()
    }
}

fn level_colors(level: Level) -> (Color, Color) {
    match level {
        Level::Info => (Color::from_rgb8(0x2b, 0x31, 0x3f), Color::WHITE),
        Level::Success => (Color::from_rgb8(0x1f, 0x4d, 0x2e), Color::WHITE),
        Level::Error => (Color::from_rgb8(0x5c, 0x1f, 0x1f), Color::WHITE),
    }
}

/// Overlay stacking all active toasts at the top of the window.
pub fn view<'a, Message: 'a>(toasts: &'a Toasts) -> Element<'a, Message> {
    let mut stack = column![].spacing(8).padding(12);

    for toast in toasts.iter() {
        let (background, foreground) = level_colors(toast.level);

        stack = stack.push(
            container(text(&toast.message).size(14).style(move |_| {
                iced::widget::text::Style {
                    color: Some(foreground),
                }
            }))
            .padding(10)
            .style(move |_| container::Style {
                background: Some(Background::Color(background)),
                border: Border {
                    radius: 6.0.into(),
                    ..Border::default()
                },
                ..container::Style::default()
            }),
        );
    }

    container(stack)
        .width(Length::Fill)
        .align_x(alignment::Horizontal::Center)
        .into()
}
