use iced::{
    Color, Element, Length, Theme, border,
    widget::{column, container, container::Style, image, row, text},
};

use crate::render::{DetectionCard, Origin, RenderedResult, ResultView};

fn tinted(color: Color) -> impl Fn(&Theme) -> Style {
    move |theme: &Theme| {
        container::bordered_box(theme)
            .border(border::rounded(8).color(color).width(2))
            .background(Color { a: 0.15, ..color })
    }
}

/// Error banner shown above a screen's controls.
pub fn alert<'a, Message: 'a>(message: &'a str) -> Element<'a, Message> {
    container(text(format!("❌ {message}")))
        .padding(12)
        .width(Length::Fill)
        .style(|theme: &Theme| tinted(theme.palette().danger)(theme))
        .into()
}

/// Softer banner for hints.
pub fn notice<'a, Message: 'a>(message: &'a str) -> Element<'a, Message> {
    container(text(message).size(14))
        .padding(10)
        .width(Length::Fill)
        .style(container::rounded_box)
        .into()
}

fn stat<'a, Message: 'a>(label: &'a str, value: String) -> Element<'a, Message> {
    container(column![text(label).size(14), text(value).size(24)].spacing(4))
        .padding(12)
        .width(Length::Fill)
        .style(container::bordered_box)
        .into()
}

/// Full cards carry the message and a confidence line; compact ones only the
/// label, which already includes the confidence.
pub fn detection_card<'a, Message: 'a>(
    card: &'a DetectionCard,
    title: &'a str,
    compact: bool,
) -> Element<'a, Message> {
    let origin = card.origin;
    let mut details = column![text(title)].spacing(4);
    if !compact {
        details = details.push(text(card.confidence.as_str()).size(14));
    }
    container(row![text(card.icon).size(28), details].spacing(12))
    .padding(10)
    .width(Length::Fill)
    .style(move |theme: &Theme| {
        let color = match origin {
            Origin::Colombian => theme.palette().success,
            Origin::Foreign => theme.palette().danger,
        };
        tinted(color)(theme)
    })
    .into()
}

/// Annotated image, totals and one card per detection.
pub fn result_panel<'a, Message: 'a>(
    title: &'a str,
    rendered: &'a RenderedResult,
    annotated: Option<&image::Handle>,
) -> Element<'a, Message> {
    let mut content = column![text(title).size(22)].spacing(12);

    if let Some(handle) = annotated {
        content = content.push(image(handle.clone()).width(Length::Fill));
    }

    content = content.push(
        row![
            stat("Billetes Detectados", rendered.detected.clone()),
            stat("Valor Total", rendered.total_display()),
            stat(rendered.timing_label, rendered.timing.clone()),
        ]
        .spacing(12),
    );

    if !rendered.cards.is_empty() {
        content = content.push(text("🔍 Detecciones:").size(18));
        let compact = rendered.view == ResultView::Live;
        for card in &rendered.cards {
            content = content.push(detection_card(card, rendered.card_title(card), compact));
        }
    }

    content.into()
}
