use serde::Serialize;

use fr_rs::Content;

/// A contiguous address span. `end` is exclusive.
///
/// Only memory-map ranges use `content`; only file-map ranges use `file_offset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Range {
    pub start: u32,
    pub end: u32,
    pub file_offset: u32,
    pub content: Content,
}

impl Range {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        Self { start, end, file_offset: 0, content: Content::Code }
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.content = content;
        self
    }

    pub fn with_file_offset(mut self, file_offset: u32) -> Self {
        self.file_offset = file_offset;
        self
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.start && addr < self.end
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &Range) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The part of `self` that `other` also covers, keeping `self`'s content and offset.
    pub fn intersect(&self, other: &Range) -> Option<Range> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then(|| Range { start, end, ..self.clone() })
    }
}

/// Ranges kept in ascending `start` order. Overlaps are kept as declared; lookups take
/// the first covering range.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryMap {
    pub option: char,
    pub name: &'static str,
    ranges: Vec<Range>,
}

impl MemoryMap {
    pub fn new(option: char, name: &'static str) -> Self {
        Self { option, name, ranges: Vec::new() }
    }

    /// Stable insert: a range starting where earlier ones start goes after them.
    pub fn insert(&mut self, range: Range) {
        let at = self.ranges.partition_point(|r| r.start <= range.start);
        self.ranges.insert(at, range);
    }

    pub fn find_covering(&self, addr: u32) -> Option<&Range> {
        self.ranges.iter().find(|r| r.contains(addr))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Range> {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Every pair of ranges sharing at least one address, in map order.
    pub fn overlaps(&self) -> Vec<(&Range, &Range)> {
        let mut out = Vec::new();
        for (n, a) in self.ranges.iter().enumerate() {
            for b in &self.ranges[n + 1..] {
                if b.start >= a.end {
                    break;
                }
                if a.overlaps(b) {
                    out.push((a, b));
                }
            }
        }
        out
    }
}

impl<'a> IntoIterator for &'a MemoryMap {
    type Item = &'a Range;
    type IntoIter = std::slice::Iter<'a, Range>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The three maps built from the configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    /// Memory addresses backed by the input file (`-i`).
    pub file_map: MemoryMap,
    /// Content type of the address space (`-m`, `-t`).
    pub mem_map: MemoryMap,
    /// Restriction of what actually gets decoded (`-d`).
    pub range_map: MemoryMap,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            file_map: MemoryMap::new('i', "File map"),
            mem_map: MemoryMap::new('m', "Memory map"),
            range_map: MemoryMap::new('d', "Selected ranges"),
        }
    }
}

impl Layout {
    /// `(start, end, file offset)` triples for loading the image.
    pub fn mappings(&self) -> Vec<fr_rs::memory::Mapping> {
        self.file_map.iter().map(|r| (r.start, r.end, r.file_offset)).collect()
    }

    /// Memory ranges to decode, in ascending order: every memory range, cut down to the
    /// selected ranges when any were given. Without a memory map, the file map is
    /// decoded as code.
    pub fn targets(&self) -> Vec<Range> {
        let base: Vec<Range> = if self.mem_map.is_empty() {
            tracing::warn!("no memory ranges declared, disassembling every file range as CODE");
            self.file_map.iter().map(|r| Range::new(r.start, r.end)).collect()
        } else {
            self.mem_map.iter().cloned().collect()
        };
        if self.range_map.is_empty() {
            return base;
        }
        base.iter()
            .flat_map(|m| self.range_map.iter().filter_map(move |s| m.intersect(s)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fr_rs::DataTag;

    #[test]
    fn insert_keeps_ascending_start_and_declaration_order() {
        let mut map = MemoryMap::new('m', "t");
        map.insert(Range::new(0x300, 0x400));
        map.insert(Range::new(0x100, 0x200));
        map.insert(Range::new(0x100, 0x180).with_content(Content::Data(vec![DataTag::Word])));
        let starts: Vec<(u32, u32)> = map.iter().map(|r| (r.start, r.end)).collect();
        assert_eq!(starts, vec![(0x100, 0x200), (0x100, 0x180), (0x300, 0x400)]);
    }

    #[test]
    fn first_covering_range_wins() {
        let mut map = MemoryMap::new('m', "t");
        map.insert(Range::new(0x100, 0x200));
        map.insert(Range::new(0x150, 0x300).with_content(Content::Data(vec![DataTag::Long])));
        assert_eq!(map.find_covering(0x180).unwrap().start, 0x100);
        assert_eq!(map.find_covering(0x200).unwrap().start, 0x150);
        assert!(map.find_covering(0x300).is_none());
        assert!(map.find_covering(0x0FF).is_none());
        assert_eq!(map.overlaps().len(), 1);
    }

    #[test]
    fn iteration_is_restartable() {
        let mut map = MemoryMap::new('m', "t");
        map.insert(Range::new(0x10, 0x20));
        map.insert(Range::new(0x0, 0x10));
        let a: Vec<u32> = map.iter().map(|r| r.start).collect();
        let b: Vec<u32> = (&map).into_iter().map(|r| r.start).collect();
        assert_eq!(a, vec![0, 0x10]);
        assert_eq!(a, b);
    }

    #[test]
    fn targets_intersect_selection() {
        let mut layout = Layout::default();
        layout.mem_map.insert(Range::new(0x1000, 0x2000));
        layout.mem_map.insert(Range::new(0x3000, 0x4000).with_content(Content::Data(vec![DataTag::Long])));
        assert_eq!(layout.targets().len(), 2);
        layout.range_map.insert(Range::new(0x1800, 0x3800));
        let t = layout.targets();
        assert_eq!(t.len(), 2);
        assert_eq!((t[0].start, t[0].end), (0x1800, 0x2000));
        assert_eq!((t[1].start, t[1].end), (0x3000, 0x3800));
        assert!(!t[1].content.is_code());
    }

    #[test]
    fn targets_fall_back_to_file_map() {
        let mut layout = Layout::default();
        layout.file_map.insert(Range::new(0x0, 0x100).with_file_offset(0));
        let t = layout.targets();
        assert_eq!(t, vec![Range::new(0, 0x100)]);
    }
}
