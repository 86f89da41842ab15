/// Window chrome
///
/// The window is created without native decorations, so the header row
/// carries its own minimize / maximize / close buttons.
use iced::widget::{button, container, row, text, Space};
use iced::{window, Alignment, Element, Length, Task};

use crate::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowControl {
    Minimize,
    Maximize,
    Close,
}

impl WindowControl {
    /// Send the control to the most recently focused window
    pub fn task<T: Send + 'static>(self) -> Task<T> {
        window::get_latest().and_then(move |id| match self {
            WindowControl::Minimize => window::minimize(id, true),
            WindowControl::Maximize => window::toggle_maximize(id),
            WindowControl::Close => window::close(id),
        })
    }
}

/// Title bar with the window controls on the right
pub fn header<'a>(title: &'a str) -> Element<'a, Message> {
    let controls = row![
        button(text("_").size(14))
            .on_press(Message::Window(WindowControl::Minimize))
            .style(button::text),
        button(text("▢").size(14))
            .on_press(Message::Window(WindowControl::Maximize))
            .style(button::text),
        button(text("✕").size(14))
            .on_press(Message::Window(WindowControl::Close))
            .style(button::danger),
    ]
    .spacing(4);

    container(
        row![
            text(title).size(18),
            Space::with_width(Length::Fill),
            controls,
        ]
        .align_y(Alignment::Center),
    )
    .padding([6, 12])
    .width(Length::Fill)
    .into()
}
