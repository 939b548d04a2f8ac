//! Compressed line table.
//!
//! Pairs of `(byte delta: u8, line delta: i8)`, accumulated from offset 0 and
//! the unit's first line. Only offsets where the line changes get an entry.

use stackcode_core::{ByteReader, ByteWriter};

/// Largest byte delta of one pair.
const MAX_BYTE_DELTA: i64 = 255;
/// Line-delta range of one pair.
const MIN_LINE_DELTA: i64 = -127;
const MAX_LINE_DELTA: i64 = 126;

/// Encodes `(offset, line)` breakpoints, one per instruction, in offset order.
///
/// Breakpoints that keep the running line are skipped. Gaps wider than one
/// pair are split with `(255, 0)` fillers first, then `(0, -127)` or
/// `(0, 126)` fillers, before the final pair. A breakpoint placed before the
/// previous one gets a zero byte delta.
pub fn encode(first_lineno: u32, linenos: &[(u32, u32)]) -> Vec<u8> {
    let mut w = ByteWriter::new();
    let mut old_offset = 0i64;
    let mut old_lineno = i64::from(first_lineno);

    for &(offset, lineno) in linenos {
        let mut dline = i64::from(lineno) - old_lineno;
        if dline == 0 {
            continue;
        }
        old_lineno = i64::from(lineno);

        let mut doff = i64::from(offset) - old_offset;
        old_offset = i64::from(offset);

        while doff > MAX_BYTE_DELTA {
            w.write_u8(255);
            w.write_i8(0);
            doff -= MAX_BYTE_DELTA;
        }
        while dline < MIN_LINE_DELTA {
            w.write_u8(0);
            w.write_i8(-127);
            dline -= MIN_LINE_DELTA;
        }
        while dline > MAX_LINE_DELTA {
            w.write_u8(0);
            w.write_i8(126);
            dline -= MAX_LINE_DELTA;
        }

        w.write_u8(u8::try_from(doff.clamp(0, MAX_BYTE_DELTA)).unwrap_or(u8::MAX));
        w.write_i8(i8::try_from(dline).unwrap_or(0));
    }
    w.into_vec()
}

/// Decodes a line table into `(offset, line)` line starts.
///
/// An entry is produced at each offset where code begins under a new line;
/// the last accumulated line is produced at the final offset if it differs
/// from the previous start. A trailing odd byte is ignored.
pub fn line_starts(lnotab: &[u8], first_lineno: u32) -> Vec<(u32, u32)> {
    let mut starts = Vec::new();
    let mut r = ByteReader::new(lnotab);
    let mut addr = 0u32;
    let mut lineno = i64::from(first_lineno);
    let mut last: Option<i64> = None;

    while r.remaining() >= 2 {
        let (Ok(doff), Ok(dline)) = (r.read_u8(), r.read_i8()) else {
            break;
        };
        if doff != 0 {
            if last != Some(lineno) {
                starts.push((addr, clamp_line(lineno)));
                last = Some(lineno);
            }
            addr = addr.saturating_add(u32::from(doff));
        }
        lineno += i64::from(dline);
    }
    if last != Some(lineno) {
        starts.push((addr, clamp_line(lineno)));
    }
    starts
}

fn clamp_line(line: i64) -> u32 {
    u32::try_from(line.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unchanged_lines_are_skipped() {
        let table = encode(10, &[(0, 10), (4, 10), (10, 12), (14, 12)]);
        assert_eq!(table, vec![10, 2]);
    }

    #[test]
    fn no_entry_when_a_wide_gap_keeps_the_line() {
        let table = encode(10, &[(0, 10), (4, 10), (10, 12), (300, 12)]);
        assert_eq!(table, vec![10, 2]);
    }

    #[test]
    fn out_of_order_breakpoint_saturates() {
        let table = encode(1, &[(10, 2), (4, 3)]);
        assert_eq!(table, vec![10, 1, 0, 1]);
    }

    #[test]
    fn wide_byte_gap_gets_fillers() {
        let table = encode(10, &[(0, 10), (4, 10), (10, 12), (300, 13)]);
        assert_eq!(table, vec![10, 2, 255, 0, 35, 1]);
    }

    #[test]
    fn wide_line_gap_gets_fillers() {
        let table = encode(1, &[(0, 1), (6, 301)]);
        assert_eq!(table, vec![0, 126, 0, 126, 6, 48]);

        let back = encode(300, &[(0, 300), (2, 1)]);
        assert_eq!(back, vec![0, (-127i8) as u8, 0, (-127i8) as u8, 2, (-45i8) as u8]);
    }

    #[test]
    fn first_instruction_on_a_new_line() {
        assert_eq!(encode(1, &[(0, 3), (3, 3)]), vec![0, 2]);
    }

    #[test]
    fn empty_table() {
        assert!(encode(7, &[]).is_empty());
        assert_eq!(line_starts(&[], 7), vec![(0, 7)]);
    }

    #[test]
    fn decoding_matches_breakpoints() {
        let points = [(0, 10), (3, 10), (10, 12), (300, 13), (303, 9)];
        let table = encode(10, &points);
        assert_eq!(line_starts(&table, 10), vec![(0, 10), (10, 12), (300, 13), (303, 9)]);
    }

    #[test]
    fn line_fillers_land_on_the_previous_offset() {
        // (0, 126) pairs are read before the byte advance, so offset 0
        // already sees most of the jump.
        let table = encode(1, &[(0, 1), (6, 301), (9, 302)]);
        assert_eq!(line_starts(&table, 1), vec![(0, 253), (6, 301), (9, 302)]);
    }
}
