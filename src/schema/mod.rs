//! Table-structure extraction from dump files.
//!
//! A mysqldump per-table file opens with a `CREATE TABLE` block terminated
//! by a line containing `ENGINE=InnoDB`. The extractor captures that block
//! from the leading lines of the file; the insert pass re-opens the file
//! separately.

use memchr::memmem;
use std::io::Read;
use std::path::Path;

use crate::error::ImportError;
use crate::parser::LineReader;

/// Hard bound on lines scanned for the structure block. A safety stop for
/// malformed files, not a real schema-size limit.
pub const STRUCTURE_LINE_LIMIT: usize = 100;

const CREATE_TABLE_MARKER: &[u8] = b"CREATE TABLE";
const STRUCTURE_TERMINATOR: &[u8] = b"ENGINE=InnoDB";

/// Scan the leading lines of a dump file for the `CREATE TABLE` block.
///
/// Returns the block from the `CREATE TABLE` line through the
/// `ENGINE=InnoDB` line, inclusive, or `None` when no `CREATE TABLE` line
/// appears within the scan bound. Exceeding the bound mid-capture is the
/// fatal `StructureTooLong` condition. Reaching end of input mid-capture
/// returns the partial block; executing it surfaces the problem as a
/// database error on the caller's side.
pub fn extract_structure<R: Read>(
    reader: R,
    file: &Path,
) -> Result<Option<String>, ImportError> {
    let mut lines = LineReader::new(reader);
    let mut structure: Vec<u8> = Vec::new();
    let mut capturing = false;
    let mut lines_scanned = 0usize;

    while let Some(line) = lines.next_line()? {
        lines_scanned += 1;
        if lines_scanned > STRUCTURE_LINE_LIMIT {
            if capturing {
                return Err(ImportError::StructureTooLong {
                    file: file.to_path_buf(),
                    limit: STRUCTURE_LINE_LIMIT,
                });
            }
            return Ok(None);
        }

        if !capturing && memmem::find(line, CREATE_TABLE_MARKER).is_some() {
            capturing = true;
        }

        if capturing {
            structure.extend_from_slice(line);
            structure.push(b'\n');
            if memmem::find(line, STRUCTURE_TERMINATOR).is_some() {
                return into_utf8(structure, file).map(Some);
            }
        }
    }

    if capturing {
        return into_utf8(structure, file).map(Some);
    }
    Ok(None)
}

/// Rewrite a DDL block so repeated runs are idempotent.
///
/// `CREATE TABLE \`` becomes `CREATE TABLE IF NOT EXISTS \``. Applying the
/// rewrite to already-rewritten DDL changes nothing.
pub fn make_idempotent(structure: &str) -> String {
    structure.replace("CREATE TABLE `", "CREATE TABLE IF NOT EXISTS `")
}

fn into_utf8(structure: Vec<u8>, file: &Path) -> Result<String, ImportError> {
    String::from_utf8(structure).map_err(|_| ImportError::StructureNotUtf8(file.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn extract(input: &str) -> Result<Option<String>, ImportError> {
        extract_structure(input.as_bytes(), &PathBuf::from("test.sql"))
    }

    #[test]
    fn test_extracts_block_inclusive() {
        let input = "-- dump header\n\
                     CREATE TABLE `widgets` (\n\
                       `id` int NOT NULL,\n\
                       `name` varchar(10)\n\
                     ) ENGINE=InnoDB;\n\
                     INSERT INTO `widgets` (`id`) VALUES (1);\n";
        let structure = extract(input).unwrap().unwrap();
        assert!(structure.starts_with("CREATE TABLE `widgets`"));
        assert!(structure.ends_with(") ENGINE=InnoDB;\n"));
        assert!(!structure.contains("dump header"));
        assert!(!structure.contains("INSERT INTO"));
    }

    #[test]
    fn test_no_create_table_returns_none() {
        let input = "-- nothing but comments\n-- and more comments\n";
        assert!(extract(input).unwrap().is_none());
    }

    #[test]
    fn test_no_create_table_within_bound_returns_none() {
        // 200 data-ish lines and no DDL anywhere. The scan gives up at the
        // bound instead of raising the line-bound condition.
        let input = "SELECT 1;\n".repeat(200);
        assert!(extract(&input).unwrap().is_none());
    }

    #[test]
    fn test_unterminated_block_past_bound_is_fatal() {
        let mut input = String::from("CREATE TABLE `t` (\n");
        for i in 0..150 {
            input.push_str(&format!("  `col{i}` int,\n"));
        }
        match extract(&input) {
            Err(ImportError::StructureTooLong { limit, .. }) => {
                assert_eq!(limit, STRUCTURE_LINE_LIMIT)
            }
            other => panic!("expected StructureTooLong, got {other:?}"),
        }
    }

    #[test]
    fn test_terminator_on_boundary_line_is_accepted() {
        // CREATE on line 1, terminator exactly on line 100.
        let mut input = String::from("CREATE TABLE `t` (\n");
        for i in 0..98 {
            input.push_str(&format!("  `col{i}` int,\n"));
        }
        input.push_str(") ENGINE=InnoDB;\n");
        let structure = extract(&input).unwrap().unwrap();
        assert!(structure.ends_with(") ENGINE=InnoDB;\n"));
    }

    #[test]
    fn test_eof_mid_capture_returns_partial() {
        let input = "CREATE TABLE `t` (\n  `id` int\n";
        let structure = extract(input).unwrap().unwrap();
        assert_eq!(structure, "CREATE TABLE `t` (\n  `id` int\n");
    }

    #[test]
    fn test_make_idempotent() {
        let ddl = "CREATE TABLE `widgets` (`id` int) ENGINE=InnoDB;";
        assert_eq!(
            make_idempotent(ddl),
            "CREATE TABLE IF NOT EXISTS `widgets` (`id` int) ENGINE=InnoDB;"
        );
    }

    #[test]
    fn test_make_idempotent_is_idempotent() {
        let ddl = "CREATE TABLE IF NOT EXISTS `widgets` (`id` int) ENGINE=InnoDB;";
        assert_eq!(make_idempotent(ddl), ddl);
    }
}
