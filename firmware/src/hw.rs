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

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::SimulatorDisplay;

use futures::channel::mpsc;
use tokio::sync::watch;

use model::emulator::{CardMessage, Frame, Screen};
use model::Target;

use crate::Error;

/// Frame buffer of the simulated screen
///
/// Every `flush()` publishes the current content as a new [`Frame`].
pub struct Display {
    surface: SimulatorDisplay<BinaryColor>,
    frames: watch::Sender<Frame>,
    seq: u64,
}

impl Display {
    pub fn new(target: Target, frames: watch::Sender<Frame>) -> Self {
        let (width, height) = target.display_size();
        Display {
            surface: SimulatorDisplay::new(Size::new(width, height)),
            frames,
            seq: 0,
        }
    }

    pub fn flush(&mut self, text: Vec<String>) -> Result<(), Error> {
        if self.frames.is_closed() {
            return Err(Error::Disconnected);
        }

        let size = self.surface.size();
        let surface = &self.surface;
        let pixels = (0..size.height as i32)
            .flat_map(|y| (0..size.width as i32).map(move |x| Point::new(x, y)))
            .map(|p| match surface.get_pixel(p) {
                BinaryColor::On => 0xFF,
                BinaryColor::Off => 0x00,
            })
            .collect();

        self.seq += 1;
        log::trace!("Flush #{}: {:?}", self.seq, text);

        let screen = Screen {
            width: size.width,
            height: size.height,
            pixels,
            text,
        };
        self.frames.send_replace(Frame::new(self.seq, screen));

        Ok(())
    }
}

impl OriginDimensions for Display {
    fn size(&self) -> Size {
        self.surface.size()
    }
}

impl DrawTarget for Display {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.surface.draw_iter(pixels)
    }
}

/// Channel towards the host, carrying APDU replies and log lines
#[derive(Clone)]
pub struct HostLink {
    sender: mpsc::UnboundedSender<CardMessage>,
    forward_logs: bool,
}

impl HostLink {
    pub fn new(sender: mpsc::UnboundedSender<CardMessage>, forward_logs: bool) -> Self {
        HostLink {
            sender,
            forward_logs,
        }
    }

    pub fn send_apdu(&self, data: Vec<u8>) -> Result<(), Error> {
        log::trace!("< {:02X?}", data);
        self.sender
            .unbounded_send(CardMessage::Apdu(data))
            .map_err(|_| Error::Disconnected)
    }

    pub fn log(&self, line: String) {
        log::debug!("{}", line);
        if self.forward_logs {
            let _ = self.sender.unbounded_send(CardMessage::Log(line));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    #[test]
    fn test_flush_publishes_frames() {
        let (sender, receiver) = watch::channel(Frame::new(0, Screen::blank(0, 0)));
        let mut display = Display::new(Target::NanoSP, sender);

        Rectangle::new(Point::new(0, 0), Size::new(2, 1))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut display)
            .unwrap();
        display.flush(vec!["Sei".to_string()]).unwrap();

        let frame = receiver.borrow().clone();
        assert_eq!(frame.seq, 1);
        assert_eq!((frame.screen.width, frame.screen.height), (128, 64));
        assert_eq!(&frame.screen.pixels[..3], &[0xFF, 0xFF, 0x00]);
        assert_eq!(frame.screen.text, vec!["Sei".to_string()]);

        drop(receiver);
        assert!(matches!(display.flush(vec![]), Err(Error::Disconnected)));
    }
}
