use log::{debug, info};

use crate::image::ImageAccessor;
use crate::model::{OffsetToTopMap, Segment, VtableHeader, WORD_SIZE};

use super::abi::{for_abi, VtableAbi};
use super::ScanContext;

/// The last three words read by the scanner. `None` marks a word that could
/// not be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub current: Option<u64>,
    pub previous: Option<u64>,
    pub previous_previous: Option<u64>,
}

impl Window {
    /// Slide the window forward by one word.
    pub fn shift(&mut self, next: Option<u64>) {
        self.previous_previous = self.previous;
        self.previous = self.current;
        self.current = next;
    }
}

/// Sliding-window state machine that finds vtable starts in the
/// vtable-hosting sections of an image.
pub struct VtableScanner<'a> {
    image: &'a dyn ImageAccessor,
    ctx: &'a ScanContext<'a>,
    abi: &'static dyn VtableAbi,
}

impl<'a> VtableScanner<'a> {
    pub fn new(image: &'a dyn ImageAccessor, ctx: &'a ScanContext<'a>) -> Self {
        Self { image, ctx, abi: for_abi(ctx.abi) }
    }

    /// Scan every vtable-hosting section in order.
    pub fn scan(&self) -> OffsetToTopMap {
        let mut found = OffsetToTopMap::new();
        for section in &self.ctx.vtable_sections {
            let before = found.len();
            self.scan_section(section, &mut found);
            info!(
                "Scanned section {} [0x{:x}, 0x{:x}): {} candidates",
                section.name,
                section.start,
                section.end,
                found.len() - before
            );
        }
        found
    }

    /// Scan one section, adding candidates to `found`.
    pub fn scan_section(&self, section: &Segment, found: &mut OffsetToTopMap) {
        let Some(last) = section.end.checked_sub(WORD_SIZE) else { return };
        if last < section.start {
            return;
        }

        let mut window = Window::default();
        let mut position = section.start;

        while position <= last {
            window.shift(self.image.read_u64(position).ok());

            match window.current {
                Some(value) if self.is_entry(position, value) => {
                    if let Some(header) = self.header_at(section, position, &window) {
                        self.emit(found, position, header);
                    }

                    // Skip the rest of this run so interior slots never
                    // re-trigger the header check.
                    while position < last && self.window_is_entry(position, &window) {
                        position += WORD_SIZE;
                        window.shift(self.image.read_u64(position).ok());
                    }
                }
                Some(0) if self.ctx.zero_tolerance => {
                    if let Some(header) = self.header_at(section, position, &window) {
                        if self.zero_lookahead(position, last) {
                            self.emit(found, position, header);
                        }
                    }
                }
                _ => {}
            }

            position += WORD_SIZE;
        }
    }

    /// Probe the words after a zero slot: further zeros are skipped, a valid
    /// slot confirms the table, anything else (or the section end) rejects it.
    fn zero_lookahead(&self, position: u64, last: u64) -> bool {
        for step in 1..=self.ctx.allowed_zero_entries as u64 {
            let probe = position + step * WORD_SIZE;
            if probe > last {
                return false;
            }
            match self.image.read_u64(probe) {
                Ok(0) => continue,
                Ok(value) => return self.is_entry(probe, value),
                Err(_) => return false,
            }
        }
        false
    }

    fn header_at(&self, section: &Segment, position: u64, window: &Window) -> Option<VtableHeader> {
        // The header words have to lie inside the same section.
        let header_len = self.abi.header_words() * WORD_SIZE;
        if position.checked_sub(header_len)? < section.start {
            return None;
        }
        self.abi.check_header(self.ctx, self.image, position, window)
    }

    fn is_entry(&self, address: u64, value: u64) -> bool {
        self.abi.classify(self.ctx, address, value).is_valid()
    }

    fn window_is_entry(&self, position: u64, window: &Window) -> bool {
        window.current.is_some_and(|value| self.is_entry(position, value))
    }

    fn emit(&self, found: &mut OffsetToTopMap, position: u64, header: VtableHeader) {
        debug!("vtable candidate at 0x{position:x} (offset-to-top {})", header.offset_to_top);
        found.insert(position, header);
    }
}
