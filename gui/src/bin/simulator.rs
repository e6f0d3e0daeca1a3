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

use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};
use embedded_graphics_simulator::{
    BinaryColorTheme, OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
};

use gui::*;
use model::Target;

fn main() -> Result<(), std::convert::Infallible> {
    let page = std::env::args()
        .nth(1)
        .expect("Please select a page to display");
    let target = std::env::args()
        .nth(2)
        .and_then(|t| Target::from_name(&t))
        .unwrap_or(Target::NanoX);

    let layout = Layout::for_target(target);
    let mut display: SimulatorDisplay<BinaryColor> =
        SimulatorDisplay::new(Size::new(layout.width, layout.height));

    let output_settings = OutputSettingsBuilder::new()
        .theme(BinaryColorTheme::OledWhite)
        .build();
    let mut window = Window::new("Sei GUI Simulator", &output_settings);

    let review = paginate(
        &[
            ReviewItem::new("Chain ID", "1329"),
            ReviewItem::new("Receiver", "0x5a0b54d5dc17e0aadc383d2db43b0a0d3e029c4c"),
            ReviewItem::new("Amount", "0.01 SEI"),
        ],
        &layout,
    );

    match page.as_str() {
        "home" => show(&mut window, &mut display, HomePage::new(layout, "Ready"))?,
        "menu" => show(&mut window, &mut display, MenuItemPage::blind_signing(false))?,
        "settings" => show(
            &mut window,
            &mut display,
            SettingsPage::new(layout, false, "1.0.0"),
        )?,
        "review" => {
            for (i, screen) in review.iter().enumerate() {
                show(
                    &mut window,
                    &mut display,
                    ReviewPage::new(layout, ReviewKind::Transaction, screen, i, review.len()),
                )?;
            }
        }
        "approve" => {
            let decision = if layout.touch {
                Decision::Both
            } else {
                Decision::Approve
            };
            show(
                &mut window,
                &mut display,
                DecisionPage::new(layout, ReviewKind::Transaction, decision),
            )?
        }
        "warning" => show(&mut window, &mut display, BlindWarningPage::new(layout))?,
        "error" => show(
            &mut window,
            &mut display,
            ErrorPage::new(layout, "Blind signing must be enabled in Settings"),
        )?,
        p => panic!("Invalid page selected: {}", p),
    }

    Ok(())
}

fn show<P: Page>(
    window: &mut Window,
    display: &mut SimulatorDisplay<BinaryColor>,
    p: P,
) -> Result<(), std::convert::Infallible> {
    p.init_display(display)?;
    println!("{:?}", p.text());

    loop {
        window.update(display);

        for event in window.events() {
            match event {
                SimulatorEvent::Quit => std::process::exit(0),
                SimulatorEvent::MouseButtonDown { .. } => return Ok(()),
                _ => {}
            }
        }
    }
}
