use std::path::PathBuf;

/// What the mirror writer did with one body entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryAction {
    /// Segment lines were appended, referencing `path`. `keys` are the
    /// key files downloaded for key lines inside the segment's group.
    SegmentMirrored { path: PathBuf, keys: Vec<PathBuf> },
    /// Segment file already existed from an earlier cycle; nothing appended.
    SegmentSkipped { url: String },
    KeyMirrored { path: PathBuf },
    /// A directive or literal line was copied verbatim.
    LineCopied,
    BlankLine,
}

/// Summary of one fetch/parse/mirror cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub header_written: bool,
    pub body_entries: usize,
    pub segments_mirrored: usize,
    pub segments_skipped: usize,
    pub keys_mirrored: usize,
    pub lines_copied: usize,
    pub segment_counter: u64,
}

impl CycleReport {
    pub fn record(&mut self, action: &EntryAction) {
        self.body_entries += 1;
        match action {
            EntryAction::SegmentMirrored { keys, .. } => {
                self.segments_mirrored += 1;
                self.keys_mirrored += keys.len();
            }
            EntryAction::SegmentSkipped { .. } => self.segments_skipped += 1,
            EntryAction::KeyMirrored { .. } => self.keys_mirrored += 1,
            EntryAction::LineCopied | EntryAction::BlankLine => self.lines_copied += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouped_keys_are_counted() {
        let mut report = CycleReport::default();
        report.record(&EntryAction::SegmentMirrored {
            path: PathBuf::from("seg1.ts"),
            keys: vec![PathBuf::from("k.key")],
        });
        report.record(&EntryAction::KeyMirrored {
            path: PathBuf::from("k.key"),
        });
        report.record(&EntryAction::SegmentSkipped {
            url: "http://example.com/seg0.ts".to_string(),
        });
        report.record(&EntryAction::BlankLine);

        assert_eq!(report.body_entries, 4);
        assert_eq!(report.segments_mirrored, 1);
        assert_eq!(report.segments_skipped, 1);
        assert_eq!(report.keys_mirrored, 2);
        assert_eq!(report.lines_copied, 1);
    }
}
