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

use model::Target;

/// Text geometry of a device screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    pub touch: bool,
    pub chars_per_line: usize,
    pub lines_per_page: usize,
}

impl Layout {
    pub fn for_target(target: Target) -> Self {
        let (width, height) = target.display_size();
        let (chars_per_line, lines_per_page) = match target {
            // FONT_8X13_BOLD on 128px, two value lines below the title
            Target::NanoX | Target::NanoSP => (16, 2),
            // FONT_9X15 with a 20px margin on each side
            Target::Stax => (40, 12),
            Target::Flex => (48, 10),
        };

        Layout {
            width,
            height,
            touch: target.is_touch(),
            chars_per_line,
            lines_per_page,
        }
    }

    pub fn center_x(&self) -> i32 {
        (self.width / 2) as i32
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub title: String,
    pub value: String,
}

impl ReviewItem {
    pub fn new<T: Into<String>, V: Into<String>>(title: T, value: V) -> Self {
        ReviewItem {
            title: title.into(),
            value: value.into(),
        }
    }
}

/// One review entry as it fits on a screen: the title and the wrapped value lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEntry {
    pub title: String,
    pub lines: Vec<String>,
}

impl ReviewEntry {
    fn height(&self) -> usize {
        1 + self.lines.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReviewScreen {
    pub entries: Vec<ReviewEntry>,
}

pub fn wrap(value: &str, chars_per_line: usize) -> Vec<String> {
    if value.is_empty() {
        return vec![String::new()];
    }

    value
        .chars()
        .collect::<Vec<_>>()
        .chunks(chars_per_line.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

/// Split the review items into screens
///
/// Button devices show one item per screen, touch devices pack as many items as fit. Values that
/// don't fit on a single screen are split and their title gets a `(i/n)` suffix.
pub fn paginate(items: &[ReviewItem], layout: &Layout) -> Vec<ReviewScreen> {
    let value_lines = if layout.touch {
        layout.lines_per_page.saturating_sub(1).max(1)
    } else {
        layout.lines_per_page
    };

    let mut entries = vec![];
    for item in items {
        let lines = wrap(&item.value, layout.chars_per_line);
        let chunks = lines.chunks(value_lines).collect::<Vec<_>>();
        let total = chunks.len();
        for (i, chunk) in chunks.into_iter().enumerate() {
            let title = match total {
                1 => item.title.clone(),
                _ => format!("{} ({}/{})", item.title, i + 1, total),
            };
            entries.push(ReviewEntry {
                title,
                lines: chunk.to_vec(),
            });
        }
    }

    if !layout.touch {
        return entries
            .into_iter()
            .map(|e| ReviewScreen { entries: vec![e] })
            .collect();
    }

    let mut screens = vec![];
    let mut current = ReviewScreen::default();
    let mut used = 0;
    for entry in entries {
        if used + entry.height() > layout.lines_per_page && !current.entries.is_empty() {
            screens.push(core::mem::take(&mut current));
            used = 0;
        }
        used += entry.height();
        current.entries.push(entry);
    }
    if !current.entries.is_empty() {
        screens.push(current);
    }

    screens
}
