//! CSV vertical-grid file collaborator (§6).
//!
//! Grammar: a header line `name [unit]` (whitespace-separated, unit
//! bracketed; only `altitude` and `pressure` names are accepted), followed
//! by one decimal number per line. At least one value is required.

use crate::error::{CoreError, ErrorKind};

#[derive(Debug, Clone, PartialEq)]
pub struct VerticalGridFile {
    pub name: String,
    pub unit: String,
    pub values: Vec<f64>,
}

/// Parses a vertical-grid document. Uses `csv::ReaderBuilder` in
/// line-oriented, headerless mode the way the teacher's CSV engine reads
/// tabular fixtures, even though each line here carries a single field.
pub fn parse_csv_grid(text: &str) -> Result<VerticalGridFile, CoreError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(text.as_bytes());
    let mut records = reader.records();

    let header_record = records
        .next()
        .ok_or_else(|| CoreError::with_message(ErrorKind::CsvParse, "empty vertical-grid file"))?
        .map_err(|e| CoreError::with_message(ErrorKind::CsvParse, e.to_string()))?;
    let header_line: Vec<&str> = header_record.iter().collect();
    let (name, unit) = parse_header(&header_line.join(","))?;
    if name != "altitude" && name != "pressure" {
        return Err(CoreError::with_message(
            ErrorKind::CsvParse,
            format!("unsupported vertical-grid name '{name}'; only 'altitude' and 'pressure' are accepted"),
        ));
    }

    let mut values = Vec::new();
    for record in records {
        let record = record.map_err(|e| CoreError::with_message(ErrorKind::CsvParse, e.to_string()))?;
        let field = record.get(0).unwrap_or("").trim();
        if field.is_empty() {
            continue;
        }
        let value: f64 = field
            .parse()
            .map_err(|_| CoreError::with_message(ErrorKind::CsvParse, format!("invalid decimal number '{field}'")))?;
        values.push(value);
    }
    if values.is_empty() {
        return Err(CoreError::with_message(ErrorKind::CsvParse, "vertical-grid file requires at least one data value"));
    }
    Ok(VerticalGridFile { name, unit, values })
}

fn parse_header(header: &str) -> Result<(String, String), CoreError> {
    let header = header.trim();
    let open = header
        .find('[')
        .ok_or_else(|| CoreError::with_message(ErrorKind::CsvParse, "header missing '[unit]'"))?;
    let close = header
        .rfind(']')
        .ok_or_else(|| CoreError::with_message(ErrorKind::CsvParse, "header missing closing ']'"))?;
    if close < open {
        return Err(CoreError::with_message(ErrorKind::CsvParse, "malformed header bracket order"));
    }
    let name = header[..open].trim().to_string();
    let unit = header[open + 1..close].trim().to_string();
    if name.is_empty() {
        return Err(CoreError::with_message(ErrorKind::CsvParse, "header is missing a variable name"));
    }
    Ok((name, unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_altitude_grid() {
        let doc = "altitude [m]\n1000\n2000\n3000\n";
        let grid = parse_csv_grid(doc).unwrap();
        assert_eq!(grid.name, "altitude");
        assert_eq!(grid.unit, "m");
        assert_eq!(grid.values, vec![1000.0, 2000.0, 3000.0]);
    }

    #[test]
    fn rejects_unsupported_name() {
        let doc = "temperature [K]\n300\n";
        let err = parse_csv_grid(doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CsvParse);
    }

    #[test]
    fn rejects_empty_value_list() {
        let doc = "pressure [hPa]\n";
        let err = parse_csv_grid(doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CsvParse);
    }
}
