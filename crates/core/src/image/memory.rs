use std::collections::HashMap;

use crate::error::MemoryError;
use crate::image::ImageAccessor;
use crate::model::{Segment, SegmentPermissions};

/// In-memory binary image: segments plus whatever file bytes back them.
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    segments: Vec<Segment>,
    // Parallel to `segments`; `None` for uninitialized (NOBITS-style) segments.
    contents: Vec<Option<Vec<u8>>>,
    xrefs: HashMap<u64, usize>,
    image_base: u64,
}

impl MemoryImage {
    pub fn builder() -> MemoryImageBuilder {
        MemoryImageBuilder::default()
    }

    /// Raw bytes backing `segment`, if any.
    pub fn segment_bytes(&self, name: &str) -> Option<(&Segment, &[u8])> {
        let idx = self.segments.iter().position(|s| s.name == name)?;
        let bytes = self.contents[idx].as_deref()?;
        Some((&self.segments[idx], bytes))
    }

    /// Iterate every segment together with its backing bytes.
    pub fn segments_with_bytes(&self) -> impl Iterator<Item = (&Segment, Option<&[u8]>)> + '_ {
        self.segments.iter().zip(self.contents.iter().map(|c| c.as_deref()))
    }

    pub fn set_xref_counts(&mut self, counts: HashMap<u64, usize>) {
        self.xrefs = counts;
    }

    fn read_bytes<const N: usize>(&self, address: u64) -> Result<[u8; N], MemoryError> {
        let idx = self
            .segments
            .iter()
            .position(|s| s.contains(address))
            .ok_or(MemoryError::Unmapped { address })?;
        let segment = &self.segments[idx];
        let uninitialized = MemoryError::Uninitialized { address, width: N };

        let last = address.checked_add(N as u64).ok_or(uninitialized)?;
        if last > segment.end {
            return Err(uninitialized);
        }
        let bytes = self.contents[idx].as_deref().ok_or(uninitialized)?;
        let offset = (address - segment.start) as usize;

        // Bytes past the backing data but inside the segment read as zero.
        let mut out = [0u8; N];
        if let Some(available) = bytes.get(offset..) {
            let n = available.len().min(N);
            out[..n].copy_from_slice(&available[..n]);
        }
        Ok(out)
    }
}

impl ImageAccessor for MemoryImage {
    fn read_u64(&self, address: u64) -> Result<u64, MemoryError> {
        self.read_bytes::<8>(address).map(u64::from_le_bytes)
    }

    fn read_u32(&self, address: u64) -> Result<u32, MemoryError> {
        self.read_bytes::<4>(address).map(u32::from_le_bytes)
    }

    fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn xref_count(&self, address: u64) -> usize {
        self.xrefs.get(&address).copied().unwrap_or(0)
    }

    fn image_base(&self) -> u64 {
        self.image_base
    }
}

/// Incremental construction of a [`MemoryImage`].
#[derive(Debug, Default)]
pub struct MemoryImageBuilder {
    image: MemoryImage,
}

impl MemoryImageBuilder {
    /// Add a segment backed by `bytes`. The segment spans
    /// `[start, start + max(size, bytes.len()))`; the part past `bytes`
    /// reads as zero.
    pub fn segment(
        mut self,
        name: impl Into<String>,
        start: u64,
        size: u64,
        permissions: SegmentPermissions,
        bytes: Vec<u8>,
    ) -> Self {
        let end = start.saturating_add(size.max(bytes.len() as u64));
        self.image.segments.push(Segment::new(name, start, end, permissions));
        self.image.contents.push(Some(bytes));
        self
    }

    /// Add a segment with no backing bytes; reads inside it fail.
    pub fn uninitialized_segment(
        mut self,
        name: impl Into<String>,
        start: u64,
        size: u64,
        permissions: SegmentPermissions,
    ) -> Self {
        self.image.segments.push(Segment::new(name, start, start.saturating_add(size), permissions));
        self.image.contents.push(None);
        self
    }

    /// Add a segment whose contents are the given little-endian words.
    pub fn words(
        self,
        name: impl Into<String>,
        start: u64,
        permissions: SegmentPermissions,
        words: &[u64],
    ) -> Self {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        let size = bytes.len() as u64;
        self.segment(name, start, size, permissions, bytes)
    }

    /// Record `count` incoming references to `address`.
    pub fn xrefs(mut self, address: u64, count: usize) -> Self {
        self.image.xrefs.insert(address, count);
        self
    }

    pub fn image_base(mut self, base: u64) -> Self {
        self.image.image_base = base;
        self
    }

    pub fn build(self) -> MemoryImage {
        self.image
    }
}
