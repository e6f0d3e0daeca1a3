// Portal Hardware Wallet firmware and supporting software libraries
//
// Copyright (C) 2024 Alekos Filini
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use embedded_graphics::mono_font::{ascii, MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor::{self, *};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};

pub mod layout;

pub use layout::{paginate, Layout, ReviewEntry, ReviewItem, ReviewScreen};

pub const APP_NAME: &str = "Sei";

pub const SETTINGS_TITLE: &str = "Settings";
pub const BLIND_SIGNING_LABEL: &str = "Blind signing";
pub const ENABLED_LABEL: &str = "Enabled";
pub const DISABLED_LABEL: &str = "Disabled";
pub const VERSION_LABEL: &str = "Version";
pub const QUIT_LABEL: &str = "Quit";
pub const REVIEW_TX_TITLE: &str = "Review transaction";
pub const VERIFY_ADDRESS_TITLE: &str = "Verify address";
pub const APPROVE_TITLE: &str = "APPROVE";
pub const REJECT_TITLE: &str = "REJECT";
pub const SIGN_TX_QUESTION: &str = "Sign transaction?";
pub const CONFIRM_ADDRESS_QUESTION: &str = "Confirm address?";
pub const BLIND_WARNING_TITLE: &str = "Blind signing ahead";
pub const ERROR_TITLE: &str = "Error";
pub const CONFIRM_LABEL: &str = "Confirm";
pub const REJECT_LABEL: &str = "Reject";
pub const TOGGLE_LABEL: &str = "Toggle";
pub const BACK_LABEL: &str = "Back";

const TOUCH_MARGIN: i32 = 20;
const TOUCH_LINE_HEIGHT: i32 = 20;
const TOUCH_BUTTON_HEIGHT: u32 = 60;

pub trait Page {
    fn draw_to<T>(&self, target: &mut T) -> Result<(), <T as DrawTarget>::Error>
    where
        T: DrawTarget<Color = BinaryColor> + Dimensions;

    /// Page title followed by the text drawn on the page, top to bottom
    fn text(&self) -> Vec<String>;

    fn init_display<T>(&self, target: &mut T) -> Result<(), <T as DrawTarget>::Error>
    where
        T: DrawTarget<Color = BinaryColor> + Dimensions,
    {
        self.reset(target)?;
        self.draw_to(target)
    }

    fn reset<T>(&self, target: &mut T) -> Result<(), <T as DrawTarget>::Error>
    where
        T: DrawTarget<Color = BinaryColor> + Dimensions,
    {
        target
            .bounding_box()
            .into_styled(PrimitiveStyle::with_fill(Off))
            .draw(target)?;

        Ok(())
    }
}

/// What kind of page produced a given set of text lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenKind {
    Home,
    Menu,
    Settings,
    Review,
    BlindWarning,
    Approve,
    Reject,
    Decision,
    Error,
    Unknown,
}

impl ScreenKind {
    pub fn classify<S: AsRef<str>>(text: &[S]) -> Self {
        let first = match text.first() {
            Some(s) => s.as_ref(),
            None => return ScreenKind::Unknown,
        };

        // touch review headers carry the page counter
        if first.starts_with(REVIEW_TX_TITLE) || first.starts_with(VERIFY_ADDRESS_TITLE) {
            return ScreenKind::Review;
        }

        match first {
            APP_NAME => ScreenKind::Home,
            BLIND_SIGNING_LABEL | VERSION_LABEL | QUIT_LABEL => ScreenKind::Menu,
            SETTINGS_TITLE => ScreenKind::Settings,
            BLIND_WARNING_TITLE => ScreenKind::BlindWarning,
            APPROVE_TITLE => ScreenKind::Approve,
            REJECT_TITLE => ScreenKind::Reject,
            SIGN_TX_QUESTION | CONFIRM_ADDRESS_QUESTION => ScreenKind::Decision,
            ERROR_TITLE => ScreenKind::Error,
            _ => ScreenKind::Unknown,
        }
    }
}

fn draw_text<T>(
    target: &mut T,
    text: &str,
    position: Point,
    font: &'static MonoFont<'static>,
    alignment: Alignment,
    baseline: Baseline,
) -> Result<(), <T as DrawTarget>::Error>
where
    T: DrawTarget<Color = BinaryColor>,
{
    Text::with_text_style(
        text,
        position,
        MonoTextStyle::new(font, On),
        TextStyleBuilder::new()
            .alignment(alignment)
            .baseline(baseline)
            .build(),
    )
    .draw(target)?;

    Ok(())
}

fn draw_button<T>(
    target: &mut T,
    label: &str,
    top_left: Point,
    size: Size,
) -> Result<(), <T as DrawTarget>::Error>
where
    T: DrawTarget<Color = BinaryColor>,
{
    let rect = Rectangle::new(top_left, size);
    rect.into_styled(PrimitiveStyle::with_stroke(On, 2))
        .draw(target)?;
    draw_text(
        target,
        label,
        rect.center(),
        &ascii::FONT_9X15_BOLD,
        Alignment::Center,
        Baseline::Middle,
    )
}

/// Reject on the left half, confirm on the right half
fn draw_decision_buttons<T>(target: &mut T, layout: &Layout) -> Result<(), <T as DrawTarget>::Error>
where
    T: DrawTarget<Color = BinaryColor>,
{
    let y = layout.height as i32 - TOUCH_BUTTON_HEIGHT as i32 - TOUCH_MARGIN;
    let half = layout.width / 2;
    let size = Size::new(half - TOUCH_MARGIN as u32 * 2, TOUCH_BUTTON_HEIGHT);
    draw_button(target, REJECT_LABEL, Point::new(TOUCH_MARGIN, y), size)?;
    draw_button(
        target,
        CONFIRM_LABEL,
        Point::new(half as i32 + TOUCH_MARGIN, y),
        size,
    )
}

/// Navigation arrows on the sides of a button device screen
fn draw_arrows<T>(target: &mut T, left: bool, right: bool) -> Result<(), <T as DrawTarget>::Error>
where
    T: DrawTarget<Color = BinaryColor> + Dimensions,
{
    let screen_size = target.bounding_box();
    let y = screen_size.center().y;
    if left {
        draw_text(
            target,
            "<",
            Point::new(0, y),
            &ascii::FONT_6X10,
            Alignment::Left,
            Baseline::Middle,
        )?;
    }
    if right {
        draw_text(
            target,
            ">",
            Point::new(screen_size.size.width as i32 - 1, y),
            &ascii::FONT_6X10,
            Alignment::Right,
            Baseline::Middle,
        )?;
    }

    Ok(())
}

/// Small title with up to two large lines below it, the classic button device screen
pub struct TwoLinesText<'s> {
    small: &'s str,
    large: &'s [String],
}

impl<'s> TwoLinesText<'s> {
    pub fn new(small: &'s str, large: &'s [String]) -> Self {
        TwoLinesText { small, large }
    }

    fn draw_to<T>(&self, target: &mut T) -> Result<(), <T as DrawTarget>::Error>
    where
        T: DrawTarget<Color = BinaryColor> + Dimensions,
    {
        let center = target.bounding_box().center().x;
        let offset = if self.large.len() > 1 { 6 } else { 0 };

        draw_text(
            target,
            self.small,
            Point::new(center, 10 - offset),
            &ascii::FONT_6X10,
            Alignment::Center,
            Baseline::Top,
        )?;
        for (i, line) in self.large.iter().enumerate() {
            draw_text(
                target,
                line,
                Point::new(center, 34 - offset + 14 * i as i32),
                &ascii::FONT_8X13_BOLD,
                Alignment::Center,
                Baseline::Bottom,
            )?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct HomePage {
    layout: Layout,
    status: String,
}

impl HomePage {
    pub fn new(layout: Layout, status: &str) -> Self {
        HomePage {
            layout,
            status: status.to_string(),
        }
    }
}

impl Page for HomePage {
    fn draw_to<T>(&self, target: &mut T) -> Result<(), <T as DrawTarget>::Error>
    where
        T: DrawTarget<Color = BinaryColor> + Dimensions,
    {
        let center = target.bounding_box().center();

        if self.layout.touch {
            draw_text(
                target,
                APP_NAME,
                center - Point::new(0, 40),
                &ascii::FONT_10X20,
                Alignment::Center,
                Baseline::Bottom,
            )?;
            draw_text(
                target,
                &self.status,
                center,
                &ascii::FONT_9X15,
                Alignment::Center,
                Baseline::Top,
            )?;
            draw_button(
                target,
                SETTINGS_TITLE,
                Point::new(self.layout.width as i32 - 110, 10),
                Size::new(100, 40),
            )?;
        } else {
            draw_text(
                target,
                APP_NAME,
                center,
                &ascii::FONT_9X15_BOLD,
                Alignment::Center,
                Baseline::Bottom,
            )?;
            draw_text(
                target,
                &self.status,
                center + Point::new(0, 4),
                &ascii::FONT_6X10,
                Alignment::Center,
                Baseline::Top,
            )?;
            draw_arrows(target, true, true)?;
        }

        Ok(())
    }

    fn text(&self) -> Vec<String> {
        let mut text = vec![APP_NAME.to_string(), self.status.clone()];
        if self.layout.touch {
            text.push(SETTINGS_TITLE.to_string());
        }
        text
    }
}

/// An entry of the button device main menu
#[derive(Debug, Clone)]
pub struct MenuItemPage {
    title: &'static str,
    value: Vec<String>,
}

impl MenuItemPage {
    pub fn new(title: &'static str, value: Option<&str>) -> Self {
        MenuItemPage {
            title,
            value: value.map(|v| vec![v.to_string()]).unwrap_or_default(),
        }
    }

    pub fn blind_signing(enabled: bool) -> Self {
        Self::new(BLIND_SIGNING_LABEL, Some(enabled_label(enabled)))
    }
}

impl Page for MenuItemPage {
    fn draw_to<T>(&self, target: &mut T) -> Result<(), <T as DrawTarget>::Error>
    where
        T: DrawTarget<Color = BinaryColor> + Dimensions,
    {
        TwoLinesText::new(self.title, &self.value).draw_to(target)?;
        draw_arrows(target, true, true)
    }

    fn text(&self) -> Vec<String> {
        core::iter::once(self.title.to_string())
            .chain(self.value.iter().cloned())
            .collect()
    }
}

pub fn enabled_label(enabled: bool) -> &'static str {
    if enabled {
        ENABLED_LABEL
    } else {
        DISABLED_LABEL
    }
}

/// Settings screen of the touch devices
#[derive(Debug, Clone)]
pub struct SettingsPage {
    layout: Layout,
    blind_signing: bool,
    version: &'static str,
}

impl SettingsPage {
    pub fn new(layout: Layout, blind_signing: bool, version: &'static str) -> Self {
        SettingsPage {
            layout,
            blind_signing,
            version,
        }
    }
}

impl Page for SettingsPage {
    fn draw_to<T>(&self, target: &mut T) -> Result<(), <T as DrawTarget>::Error>
    where
        T: DrawTarget<Color = BinaryColor> + Dimensions,
    {
        let center_x = self.layout.center_x();
        draw_text(
            target,
            SETTINGS_TITLE,
            Point::new(center_x, 40),
            &ascii::FONT_10X20,
            Alignment::Center,
            Baseline::Bottom,
        )?;
        draw_text(
            target,
            BLIND_SIGNING_LABEL,
            Point::new(TOUCH_MARGIN, 100),
            &ascii::FONT_9X15_BOLD,
            Alignment::Left,
            Baseline::Bottom,
        )?;
        draw_text(
            target,
            enabled_label(self.blind_signing),
            Point::new(TOUCH_MARGIN, 100 + TOUCH_LINE_HEIGHT),
            &ascii::FONT_9X15,
            Alignment::Left,
            Baseline::Bottom,
        )?;
        draw_text(
            target,
            &format!("{} {}", VERSION_LABEL, self.version),
            Point::new(TOUCH_MARGIN, 100 + TOUCH_LINE_HEIGHT * 3),
            &ascii::FONT_9X15,
            Alignment::Left,
            Baseline::Bottom,
        )?;

        let y = self.layout.height as i32 - TOUCH_BUTTON_HEIGHT as i32 - TOUCH_MARGIN;
        let half = self.layout.width / 2;
        let size = Size::new(half - TOUCH_MARGIN as u32 * 2, TOUCH_BUTTON_HEIGHT);
        draw_button(target, BACK_LABEL, Point::new(TOUCH_MARGIN, y), size)?;
        draw_button(
            target,
            TOGGLE_LABEL,
            Point::new(half as i32 + TOUCH_MARGIN, y),
            size,
        )
    }

    fn text(&self) -> Vec<String> {
        vec![
            SETTINGS_TITLE.to_string(),
            BLIND_SIGNING_LABEL.to_string(),
            enabled_label(self.blind_signing).to_string(),
            format!("{} {}", VERSION_LABEL, self.version),
            BACK_LABEL.to_string(),
            TOGGLE_LABEL.to_string(),
        ]
    }
}

/// Which flow a review belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewKind {
    Transaction,
    Address,
}

impl ReviewKind {
    fn title(&self) -> &'static str {
        match self {
            ReviewKind::Transaction => REVIEW_TX_TITLE,
            ReviewKind::Address => VERIFY_ADDRESS_TITLE,
        }
    }

    fn question(&self) -> &'static str {
        match self {
            ReviewKind::Transaction => SIGN_TX_QUESTION,
            ReviewKind::Address => CONFIRM_ADDRESS_QUESTION,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReviewPage<'s> {
    layout: Layout,
    kind: ReviewKind,
    screen: &'s ReviewScreen,
    index: usize,
    total: usize,
}

impl<'s> ReviewPage<'s> {
    pub fn new(
        layout: Layout,
        kind: ReviewKind,
        screen: &'s ReviewScreen,
        index: usize,
        total: usize,
    ) -> Self {
        ReviewPage {
            layout,
            kind,
            screen,
            index,
            total,
        }
    }

    fn header(&self) -> String {
        format!("{} ({}/{})", self.kind.title(), self.index + 1, self.total)
    }
}

impl<'s> Page for ReviewPage<'s> {
    fn draw_to<T>(&self, target: &mut T) -> Result<(), <T as DrawTarget>::Error>
    where
        T: DrawTarget<Color = BinaryColor> + Dimensions,
    {
        if !self.layout.touch {
            // single entry per screen, the header is implied by the arrows
            if let Some(entry) = self.screen.entries.first() {
                TwoLinesText::new(&entry.title, &entry.lines).draw_to(target)?;
            }
            return draw_arrows(target, self.index > 0, true);
        }

        draw_text(
            target,
            &self.header(),
            Point::new(self.layout.center_x(), 40),
            &ascii::FONT_10X20,
            Alignment::Center,
            Baseline::Bottom,
        )?;

        let mut y = 80;
        for entry in &self.screen.entries {
            draw_text(
                target,
                &entry.title,
                Point::new(TOUCH_MARGIN, y),
                &ascii::FONT_8X13_BOLD,
                Alignment::Left,
                Baseline::Bottom,
            )?;
            y += TOUCH_LINE_HEIGHT;
            for line in &entry.lines {
                draw_text(
                    target,
                    line,
                    Point::new(TOUCH_MARGIN, y),
                    &ascii::FONT_9X15,
                    Alignment::Left,
                    Baseline::Bottom,
                )?;
                y += TOUCH_LINE_HEIGHT;
            }
        }

        draw_text(
            target,
            "Swipe to continue",
            Point::new(self.layout.center_x(), self.layout.height as i32 - TOUCH_MARGIN),
            &ascii::FONT_6X10,
            Alignment::Center,
            Baseline::Bottom,
        )
    }

    fn text(&self) -> Vec<String> {
        let mut text = vec![self.kind.title().to_string()];
        if self.layout.touch {
            text[0] = self.header();
        }
        for entry in &self.screen.entries {
            text.push(entry.title.clone());
            text.extend(entry.lines.iter().cloned());
        }
        text
    }
}

/// Last screens of a review: approve/reject on button devices, a two button page on touch devices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
    Both,
}

#[derive(Debug, Clone)]
pub struct DecisionPage {
    kind: ReviewKind,
    decision: Decision,
    layout: Layout,
}

impl DecisionPage {
    pub fn new(layout: Layout, kind: ReviewKind, decision: Decision) -> Self {
        DecisionPage {
            kind,
            decision,
            layout,
        }
    }

    fn subtitle(&self) -> &'static str {
        match (self.kind, self.decision) {
            (ReviewKind::Transaction, Decision::Approve) => "Sign transaction",
            (ReviewKind::Transaction, _) => "Reject transaction",
            (ReviewKind::Address, Decision::Approve) => "Confirm address",
            (ReviewKind::Address, _) => "Reject address",
        }
    }
}

impl Page for DecisionPage {
    fn draw_to<T>(&self, target: &mut T) -> Result<(), <T as DrawTarget>::Error>
    where
        T: DrawTarget<Color = BinaryColor> + Dimensions,
    {
        let center = target.bounding_box().center();

        match self.decision {
            Decision::Both => {
                draw_text(
                    target,
                    self.kind.question(),
                    center - Point::new(0, 40),
                    &ascii::FONT_10X20,
                    Alignment::Center,
                    Baseline::Middle,
                )?;
                draw_decision_buttons(target, &self.layout)
            }
            Decision::Approve | Decision::Reject => {
                let title = if self.decision == Decision::Approve {
                    APPROVE_TITLE
                } else {
                    REJECT_TITLE
                };
                draw_text(
                    target,
                    title,
                    center,
                    &ascii::FONT_9X15_BOLD,
                    Alignment::Center,
                    Baseline::Bottom,
                )?;
                draw_text(
                    target,
                    self.subtitle(),
                    center + Point::new(0, 4),
                    &ascii::FONT_6X10,
                    Alignment::Center,
                    Baseline::Top,
                )?;
                draw_arrows(target, true, self.decision == Decision::Approve)
            }
        }
    }

    fn text(&self) -> Vec<String> {
        match self.decision {
            Decision::Both => vec![
                self.kind.question().to_string(),
                REJECT_LABEL.to_string(),
                CONFIRM_LABEL.to_string(),
            ],
            Decision::Approve => vec![APPROVE_TITLE.to_string(), self.subtitle().to_string()],
            Decision::Reject => vec![REJECT_TITLE.to_string(), self.subtitle().to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlindWarningPage {
    layout: Layout,
}

impl BlindWarningPage {
    const LINES: [&'static str; 2] = ["Transaction details", "cannot be verified"];

    pub fn new(layout: Layout) -> Self {
        BlindWarningPage { layout }
    }
}

impl Page for BlindWarningPage {
    fn draw_to<T>(&self, target: &mut T) -> Result<(), <T as DrawTarget>::Error>
    where
        T: DrawTarget<Color = BinaryColor> + Dimensions,
    {
        let center = target.bounding_box().center();

        if self.layout.touch {
            draw_text(
                target,
                BLIND_WARNING_TITLE,
                center - Point::new(0, 80),
                &ascii::FONT_10X20,
                Alignment::Center,
                Baseline::Bottom,
            )?;
            for (i, line) in Self::LINES.iter().enumerate() {
                draw_text(
                    target,
                    line,
                    center - Point::new(0, 40 - TOUCH_LINE_HEIGHT * i as i32),
                    &ascii::FONT_9X15,
                    Alignment::Center,
                    Baseline::Bottom,
                )?;
            }
            draw_decision_buttons(target, &self.layout)
        } else {
            draw_text(
                target,
                BLIND_WARNING_TITLE,
                Point::new(center.x, 4),
                &ascii::FONT_6X10,
                Alignment::Center,
                Baseline::Top,
            )?;
            for (i, line) in Self::LINES.iter().enumerate() {
                draw_text(
                    target,
                    line,
                    Point::new(center.x, 24 + 12 * i as i32),
                    &ascii::FONT_6X10,
                    Alignment::Center,
                    Baseline::Top,
                )?;
            }
            draw_text(
                target,
                "BOTH: ACCEPT RISK",
                Point::new(center.x, 63),
                &ascii::FONT_5X8,
                Alignment::Center,
                Baseline::Bottom,
            )
        }
    }

    fn text(&self) -> Vec<String> {
        let mut text = vec![BLIND_WARNING_TITLE.to_string()];
        text.extend(Self::LINES.iter().map(|s| s.to_string()));
        if self.layout.touch {
            text.push(REJECT_LABEL.to_string());
            text.push(CONFIRM_LABEL.to_string());
        }
        text
    }
}

#[derive(Debug, Clone)]
pub struct ErrorPage {
    layout: Layout,
    lines: Vec<String>,
}

impl ErrorPage {
    pub fn new(layout: Layout, message: &str) -> Self {
        ErrorPage {
            layout,
            lines: crate::layout::wrap(message, layout.chars_per_line + 4),
        }
    }
}

impl Page for ErrorPage {
    fn draw_to<T>(&self, target: &mut T) -> Result<(), <T as DrawTarget>::Error>
    where
        T: DrawTarget<Color = BinaryColor> + Dimensions,
    {
        let screen_size = target.bounding_box();
        let (title_font, line_font, line_height) = if self.layout.touch {
            (&ascii::FONT_10X20, &ascii::FONT_9X15, TOUCH_LINE_HEIGHT)
        } else {
            (&ascii::FONT_6X10, &ascii::FONT_5X8, 9)
        };

        draw_text(
            target,
            ERROR_TITLE,
            screen_size.center() - Point::new(0, line_height * 2),
            title_font,
            Alignment::Center,
            Baseline::Middle,
        )?;
        for (i, line) in self.lines.iter().enumerate() {
            draw_text(
                target,
                line,
                screen_size.center() + Point::new(0, line_height * i as i32),
                line_font,
                Alignment::Center,
                Baseline::Middle,
            )?;
        }

        Ok(())
    }

    fn text(&self) -> Vec<String> {
        core::iter::once(ERROR_TITLE.to_string())
            .chain(self.lines.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use embedded_graphics_simulator::SimulatorDisplay;
    use model::Target;

    #[test]
    fn test_classify() {
        let nano = Layout::for_target(Target::NanoX);
        let stax = Layout::for_target(Target::Stax);

        assert_eq!(
            ScreenKind::classify(&HomePage::new(nano, "Ready").text()),
            ScreenKind::Home
        );
        assert_eq!(
            ScreenKind::classify(&MenuItemPage::blind_signing(false).text()),
            ScreenKind::Menu
        );
        assert_eq!(
            ScreenKind::classify(&SettingsPage::new(stax, true, "1.0.0").text()),
            ScreenKind::Settings
        );
        assert_eq!(
            ScreenKind::classify(
                &DecisionPage::new(nano, ReviewKind::Transaction, Decision::Reject).text()
            ),
            ScreenKind::Reject
        );
        assert_eq!(
            ScreenKind::classify(
                &DecisionPage::new(stax, ReviewKind::Address, Decision::Both).text()
            ),
            ScreenKind::Decision
        );
        assert_eq!(
            ScreenKind::classify(&BlindWarningPage::new(stax).text()),
            ScreenKind::BlindWarning
        );
        assert_eq!(
            ScreenKind::classify(&ErrorPage::new(nano, "Blind signing disabled").text()),
            ScreenKind::Error
        );
        assert_eq!(ScreenKind::classify::<&str>(&[]), ScreenKind::Unknown);
    }

    #[test]
    fn test_review_text() {
        let nano = Layout::for_target(Target::NanoSP);
        let screens = paginate(&[ReviewItem::new("Nonce", "7")], &nano);
        let page = ReviewPage::new(nano, ReviewKind::Transaction, &screens[0], 0, 3);
        assert_eq!(page.text(), vec![REVIEW_TX_TITLE, "Nonce", "7"]);

        let flex = Layout::for_target(Target::Flex);
        let screens = paginate(&[ReviewItem::new("Nonce", "7")], &flex);
        let page = ReviewPage::new(flex, ReviewKind::Transaction, &screens[0], 1, 3);
        assert_eq!(page.text()[0], "Review transaction (2/3)");
        assert_eq!(ScreenKind::classify(&page.text()), ScreenKind::Review);
    }

    #[test]
    fn test_nano_pages_draw() {
        let nano = Layout::for_target(Target::NanoX);
        let mut display: SimulatorDisplay<BinaryColor> = SimulatorDisplay::new(Size::new(128, 64));

        let page = DecisionPage::new(nano, ReviewKind::Transaction, Decision::Approve);
        page.init_display(&mut display).unwrap();
        let lit = display
            .bounding_box()
            .points()
            .filter(|p| display.get_pixel(*p) == On)
            .count();
        assert!(lit > 0);

        page.reset(&mut display).unwrap();
        assert!(display
            .bounding_box()
            .points()
            .all(|p| display.get_pixel(p) == Off));
    }
}
