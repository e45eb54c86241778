// Change Summary
//
// Turns `git status --porcelain` output into a commit message. The classifier
// is deliberately small: a fixed priority over three flags plus a file count.

use serde::Serialize;

/// Status code of a single porcelain line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    /// ` M` - modified in the working tree
    Modified,
    /// `A` - added to the index
    Added,
    /// ` D` - deleted from the working tree
    Deleted,
    /// `??` - not tracked yet
    Untracked,
    /// `R` - renamed in the index
    Renamed,
    /// Anything else (conflicts, type changes, staged modifications)
    Unknown,
}

impl ChangeStatus {
    /// Classify a porcelain line by its leading status characters
    pub fn from_line(line: &str) -> Self {
        if line.starts_with(" M") {
            ChangeStatus::Modified
        } else if line.starts_with('A') {
            ChangeStatus::Added
        } else if line.starts_with(" D") {
            ChangeStatus::Deleted
        } else if line.starts_with("??") {
            ChangeStatus::Untracked
        } else if line.starts_with('R') {
            ChangeStatus::Renamed
        } else {
            ChangeStatus::Unknown
        }
    }
}

/// One line of a status listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    /// Parsed status code
    pub status: ChangeStatus,
    /// Path as printed by git (renames keep the `old -> new` form)
    pub path: String,
}

/// Ordered records parsed from a short status listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeStatusListing {
    /// Records in the order git printed them
    pub records: Vec<ChangeRecord>,
}

impl ChangeStatusListing {
    /// Parse raw porcelain output, skipping blank lines
    pub fn parse(raw: &str) -> Self {
        let records = raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| ChangeRecord {
                status: ChangeStatus::from_line(line),
                path: line.get(3..).unwrap_or("").trim().to_string(),
            })
            .collect();

        Self { records }
    }

    /// Number of non-blank lines in the listing
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when git reported no changes
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Category flags used to pick a message
    pub fn flags(&self) -> ChangeFlags {
        let mut flags = ChangeFlags::default();
        for record in &self.records {
            match record.status {
                ChangeStatus::Added | ChangeStatus::Untracked => flags.has_new = true,
                ChangeStatus::Modified => flags.has_modified = true,
                ChangeStatus::Deleted => flags.has_deleted = true,
                ChangeStatus::Renamed | ChangeStatus::Unknown => {}
            }
        }
        flags
    }
}

/// Which kinds of change a listing contains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeFlags {
    /// Added or untracked files present
    pub has_new: bool,
    /// Modified files present
    pub has_modified: bool,
    /// Deleted files present
    pub has_deleted: bool,
}

/// Generate a commit message from raw `git status --porcelain` output
pub fn generate_commit_message(raw_status: &str) -> String {
    let listing = ChangeStatusListing::parse(raw_status);
    let flags = listing.flags();

    let base = if flags.has_new && flags.has_modified {
        "feat: add new features and update existing functionality"
    } else if flags.has_new {
        "feat: add new files and functionality"
    } else if flags.has_modified {
        "update: modify existing functionality"
    } else {
        "chore: update project files"
    };

    let count = listing.len();
    if count > 1 {
        format!("{} ({} files)", base, count)
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_modified_wins() {
        let message = generate_commit_message("A  src/new.rs\n M src/lib.rs\n");
        assert!(message.starts_with("feat: add new features and update existing functionality"));
        assert!(message.ends_with("(2 files)"));
    }

    #[test]
    fn test_single_untracked_has_no_suffix() {
        assert_eq!(
            generate_commit_message("?? newfile.txt"),
            "feat: add new files and functionality"
        );
    }

    #[test]
    fn test_modified_only_counts_files() {
        assert_eq!(
            generate_commit_message(" M a.txt\n M b.txt\n M c.txt"),
            "update: modify existing functionality (3 files)"
        );
    }

    #[test]
    fn test_deleted_falls_through_to_chore() {
        assert_eq!(generate_commit_message(" D gone.txt"), "chore: update project files");
    }

    #[test]
    fn test_blank_lines_do_not_count() {
        assert_eq!(
            generate_commit_message("\n M a.txt\n\n   \n"),
            "update: modify existing functionality"
        );
    }

    #[test]
    fn test_deterministic() {
        let raw = "R  old.rs -> new.rs\n?? notes.md\n D tmp.txt";
        assert_eq!(generate_commit_message(raw), generate_commit_message(raw));
    }

    #[test]
    fn test_parse_records() {
        let listing = ChangeStatusListing::parse(" M src/lib.rs\nR  a.rs -> b.rs\nUU conflict.rs");
        assert_eq!(listing.len(), 3);
        assert_eq!(listing.records[0].status, ChangeStatus::Modified);
        assert_eq!(listing.records[0].path, "src/lib.rs");
        assert_eq!(listing.records[1].status, ChangeStatus::Renamed);
        assert_eq!(listing.records[1].path, "a.rs -> b.rs");
        assert_eq!(listing.records[2].status, ChangeStatus::Unknown);
    }

    #[test]
    fn test_flags() {
        let flags = ChangeStatusListing::parse("?? x\n D y").flags();
        assert!(flags.has_new);
        assert!(!flags.has_modified);
        assert!(flags.has_deleted);
    }
}
