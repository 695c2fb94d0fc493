//! Shared row reader for the three-column input files.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::{AtlasError, Result};

pub(crate) const FIELDS: usize = 3;

pub(crate) fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| AtlasError::open(path, e))
}

/// Calls `f` with the 1-based line number and the fields of every data row.
///
/// Blank lines are skipped, and so is a first row matching `header`. Any row
/// that does not have exactly three fields is rejected.
pub(crate) fn for_each_row<R, F>(reader: R, path: &Path, header: [&str; FIELDS], mut f: F) -> Result<()>
where
    R: Read,
    F: FnMut(u64, [&str; FIELDS]) -> Result<()>,
{
    let mut csv = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut first = true;
    let mut record = StringRecord::new();
    loop {
        match csv.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => return Err(AtlasError::csv(path, e)),
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        if record.len() != FIELDS {
            return Err(AtlasError::malformed(
                path,
                line,
                format!("expected {FIELDS} fields, found {}", record.len()),
            ));
        }

        let fields = [&record[0], &record[1], &record[2]];
        if std::mem::take(&mut first) && is_header(&fields, &header) {
            continue;
        }
        f(line, fields)?;
    }
    Ok(())
}

fn is_header(fields: &[&str; FIELDS], header: &[&str; FIELDS]) -> bool {
    fields
        .iter()
        .zip(header)
        .all(|(field, name)| field.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &str) -> Result<Vec<(u64, String)>> {
        let mut out = Vec::new();
        for_each_row(input.as_bytes(), Path::new("t.csv"), ["a", "b", "c"], |line, f| {
            out.push((line, f.join("|")));
            Ok(())
        })?;
        Ok(out)
    }

    #[test]
    fn skips_header_and_blank_lines() {
        let rows = collect("A,B,C\nx,y,1\n\n  z , w ,2\n").unwrap();
        assert_eq!(rows, vec![(2, "x|y|1".to_string()), (4, "z|w|2".to_string())]);
    }

    #[test]
    fn header_only_skipped_on_first_row() {
        let rows = collect("x,y,1\na,b,c\n").unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let rows = collect("x,\"Hello, World\",1\n").unwrap();
        assert_eq!(rows[0].1, "x|Hello, World|1");
    }

    #[test]
    fn wrong_field_count_reports_line() {
        let err = collect("x,y,1\nx,y\n").unwrap_err();
        match err {
            AtlasError::MalformedInput { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
