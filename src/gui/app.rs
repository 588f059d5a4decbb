use iced::widget::{button, column, container, row, text};
use iced::{Alignment::Center, Element, Length, Subscription, Task, Theme};

use super::screens::{Screen, ScreenData, ScreenMessage, Tab};
use super::{AppState, Message};

pub struct BilletesApp {
    state: AppState,
    screen: ScreenData,
}

fn unwrap_screen_message(message: ScreenMessage<ScreenData>) -> Message {
    match message {
        ScreenMessage::ScreenMessage(message) => message,
        ScreenMessage::ParentMessage(never) => match never {},
    }
}

impl BilletesApp {
    pub fn new(state: AppState) -> (Self, Task<Message>) {
        (
            Self {
                state,
                screen: ScreenData::for_tab(Tab::Upload),
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        self.screen
            .update(message, &mut self.state)
            .map(unwrap_screen_message)
    }

    pub fn subscription(&self) -> Subscription<Message> {
        self.screen.subscription().map(unwrap_screen_message)
    }

    pub fn view(&self) -> Element<'_, Message> {
        let header = column![
            text("💵 Clasificador de Billetes Colombianos").size(32),
            text("Detecta y clasifica billetes colombianos usando Inteligencia Artificial"),
        ]
        .spacing(8)
        .align_x(Center);

        let active = self.screen.tab();
        let tabs = row(Tab::ALL.into_iter().map(|tab| {
            let style = if tab == active {
                button::primary
            } else {
                button::secondary
            };
            button(text(tab.label()))
                .style(style)
                .padding([10, 20])
                .on_press(Message::SelectTab(tab))
                .into()
        }))
        .spacing(12);

        let footer = column![
            text("Powered by YOLOv8 + FastAPI + Rust").size(12),
            text(format!("Servidor: {}", self.state.config.api_url)).size(12),
        ]
        .spacing(4)
        .align_x(Center);

        let content = column![
            header,
            tabs,
            container(self.screen.view().map(unwrap_screen_message)).height(Length::Fill),
            footer,
        ]
        .spacing(20)
        .padding(20)
        .align_x(Center);

        container(content)
            .center_x(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    pub fn theme(&self) -> Theme {
        Theme::Dark
    }
}
