//! View-model for detection results, shared by the GUI screens and the CLI.

use crate::models::{Detection, DetectionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Colombian,
    Foreign,
}

/// Which view a result is rendered for. Upload responses carry inference time
/// and show full cards with the currency name; live frames carry server FPS
/// and show compact cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultView {
    Upload,
    Live,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionCard {
    pub origin: Origin,
    pub icon: &'static str,
    /// Backend-provided description ("Billete colombiano de $50000 COP")
    pub message: String,
    /// Compact form used by the live view ("50000 (92%)")
    pub label: String,
    pub confidence: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedResult {
    pub view: ResultView,
    pub detected: String,
    pub total: String,
    pub timing_label: &'static str,
    pub timing: String,
    pub cards: Vec<DetectionCard>,
}

impl RenderedResult {
    /// Total as displayed; only the upload view names the currency.
    pub fn total_display(&self) -> String {
        match self.view {
            ResultView::Upload => format!("{} COP", self.total),
            ResultView::Live => self.total.clone(),
        }
    }

    /// Headline of a card: the full message on upload, the compact label live.
    pub fn card_title<'a>(&self, card: &'a DetectionCard) -> &'a str {
        match self.view {
            ResultView::Upload => &card.message,
            ResultView::Live => &card.label,
        }
    }
}

pub fn render_result(result: &DetectionResult, view: ResultView) -> RenderedResult {
    let (timing_label, timing) = match view {
        ResultView::Upload => (
            "Tiempo",
            format!("{}ms", result.inference_time.unwrap_or_default()),
        ),
        ResultView::Live => ("FPS", format!("{}", result.fps.unwrap_or_default())),
    };

    RenderedResult {
        view,
        detected: result.total_detected.to_string(),
        total: format_currency(result.total_value),
        timing_label,
        timing,
        cards: result.detections.iter().map(render_detection).collect(),
    }
}

pub fn render_detection(detection: &Detection) -> DetectionCard {
    let origin = if detection.is_colombian {
        Origin::Colombian
    } else {
        Origin::Foreign
    };
    let icon = match origin {
        Origin::Colombian => "💵",
        Origin::Foreign => "❓",
    };
    let message = if detection.message.is_empty() {
        match origin {
            Origin::Colombian => format!("Billete colombiano de ${} COP", detection.label),
            Origin::Foreign => {
                format!("Billete no colombiano o desconocido: {}", detection.label)
            }
        }
    } else {
        detection.message.clone()
    };

    DetectionCard {
        origin,
        icon,
        message,
        label: format!("{} ({}%)", detection.label, detection.confidence),
        confidence: format!("Confianza: {}%", detection.confidence),
    }
}

/// Format an amount the way es-CO does: `.` groups thousands, `,` separates
/// decimals (at most three, trailing zeros dropped).
pub fn format_currency(value: f64) -> String {
    let negative = value < 0.0;
    let thousandths = (value.abs() * 1000.0).round() as u128;
    let whole = thousandths / 1000;
    let fraction = thousandths % 1000;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative && thousandths > 0 { "-" } else { "" };
    if fraction == 0 {
        return format!("{sign}${grouped}");
    }
    let decimals = format!("{fraction:03}");
    format!("{sign}${grouped},{}", decimals.trim_end_matches('0'))
}
