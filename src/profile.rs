/// Parser for Go's `-coverprofile` format.
///
/// Reference: https://go.dev/blog/cover
///
/// Format:
///   mode: set|count|atomic
///   <file>:<startLine>.<startCol>,<endLine>.<endCol> <numStatements> <count>
///
/// Each line describes a basic block with the number of statements in the
/// block and how many times it was executed. The identifier is kept opaque;
/// attribution only needs it as a key.
use std::io::BufRead;

use crate::error::{DeltaError, Result};
use crate::model::{BranchRecord, Mode, Profile};

const MODE_PREFIX: &str = "mode:";

/// Parse a whole profile held in memory.
pub fn parse_str(input: &str) -> Result<(Mode, Vec<BranchRecord>)> {
    let mut records = Vec::new();
    let mode = parse_streaming(&mut input.as_bytes(), &mut |record| {
        records.push(record);
        Ok(())
    })?;
    Ok((mode, records))
}

/// Parse a profile and tag it with the test that produced it.
pub fn parse_profile(test_name: &str, input: &str) -> Result<Profile> {
    let (mode, records) = parse_str(input)?;
    Ok(Profile {
        test_name: test_name.to_string(),
        mode,
        records,
    })
}

/// Streaming parser: calls `emit` once per block line, in file order, and
/// returns the declared mode. An input with no lines at all yields no records
/// and the default mode.
pub fn parse_streaming(
    reader: &mut dyn BufRead,
    emit: &mut dyn FnMut(BranchRecord) -> Result<()>,
) -> Result<Mode> {
    let mut mode: Option<Mode> = None;
    let mut line_number = 0;

    let mut raw_line = Vec::new();
    loop {
        raw_line.clear();
        let n = reader.read_until(b'\n', &mut raw_line)?;
        if n == 0 {
            break;
        }
        line_number += 1;

        let Ok(text) = std::str::from_utf8(&raw_line) else {
            return Err(DeltaError::MalformedProfileLine {
                path: None,
                line_number,
                line: String::from_utf8_lossy(&raw_line).trim().to_string(),
            });
        };
        let line = text.trim();
        if line.is_empty() {
            continue;
        }

        if mode.is_none() {
            mode = Some(parse_mode_line(line, line_number)?);
            continue;
        }

        emit(parse_block_line(line, line_number)?)?;
    }

    Ok(mode.unwrap_or_default())
}

fn parse_mode_line(line: &str, line_number: usize) -> Result<Mode> {
    let malformed = || DeltaError::MalformedProfileLine {
        path: None,
        line_number,
        line: line.to_string(),
    };
    let value = line.strip_prefix(MODE_PREFIX).ok_or_else(malformed)?;
    value.trim().parse::<Mode>().map_err(|_| malformed())
}

/// Parse `<id> <numStmt> <count>`, separated by any run of whitespace.
fn parse_block_line(line: &str, line_number: usize) -> Result<BranchRecord> {
    let malformed = || DeltaError::MalformedProfileLine {
        path: None,
        line_number,
        line: line.to_string(),
    };

    let fields: Vec<&str> = line.split_whitespace().collect();
    let [id, statements, visits] = fields.as_slice() else {
        return Err(malformed());
    };

    Ok(BranchRecord {
        id: (*id).to_string(),
        statements: statements.parse().map_err(|_| malformed())?,
        visits: visits.parse().map_err(|_| malformed())?,
    })
}
