//! Memory address to file offset correlation, for the dual-address listing column.

use crate::model::{MemoryMap, Range};

/// The file range backing `mem`: the first one, in ascending order, covering its start.
pub fn backing_range<'a>(file_map: &'a MemoryMap, mem: &Range) -> Option<&'a Range> {
    file_map.find_covering(mem.start)
}

/// Constant to subtract from a memory address to get its file offset.
pub fn memory_file_offset(file_range: &Range) -> u32 {
    file_range.start.wrapping_sub(file_range.file_offset)
}

/// Address column of a listing line: `ADDRESS ` or `ADDRESS (FILE_OFFSET) `, the
/// latter only when memory and file addresses differ.
pub fn annotate(addr: u32, correction: u32) -> String {
    if correction == 0 {
        format!("{addr:08X} ")
    } else {
        format!("{addr:08X} ({:08X}) ", addr.wrapping_sub(correction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_of_instruction_inside_mapped_range() {
        let mut files = MemoryMap::new('i', "File map");
        files.insert(Range::new(0x1000, 0x2000).with_file_offset(0));
        let mem = Range::new(0x1000, 0x1800);
        let backing = backing_range(&files, &mem).unwrap();
        let correction = memory_file_offset(backing);
        assert_eq!(0x1010u32.wrapping_sub(correction), 0x10);
        assert_eq!(annotate(0x1010, correction), "00001010 (00000010) ");
    }

    #[test]
    fn identity_mapping_has_no_offset_column() {
        let r = Range::new(0x0, 0x100).with_file_offset(0);
        assert_eq!(memory_file_offset(&r), 0);
        assert_eq!(annotate(0x20, 0), "00000020 ");
    }

    #[test]
    fn unbacked_range_has_no_file_range() {
        let mut files = MemoryMap::new('i', "File map");
        files.insert(Range::new(0x40000, 0x80000).with_file_offset(0));
        assert!(backing_range(&files, &Range::new(0x0, 0x100)).is_none());
        // the first covering file range wins
        files.insert(Range::new(0x40000, 0x50000).with_file_offset(0x100));
        let r = backing_range(&files, &Range::new(0x40010, 0x40020)).unwrap();
        assert_eq!(r.file_offset, 0);
    }
}
