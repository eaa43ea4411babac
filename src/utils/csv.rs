use std::collections::HashMap;

/// Splits a single CSV line into fields, honouring double-quoted fields and `""` escapes.
pub fn parse_record(line: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                buf.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => out.push(std::mem::take(&mut buf)),
            _ => buf.push(ch),
        }
    }
    out.push(buf);
    out
}

pub fn quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Renders one CSV line, terminated with `\n`.
pub fn write_record<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = fields
        .iter()
        .map(|f| quote(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

/// A data row together with its 1-based line number in the uploaded file.
#[derive(Debug, Clone)]
pub struct CsvRow {
    pub line: usize,
    fields: Vec<String>,
}

/// A parsed upload: header lookup plus data rows, blank lines dropped.
#[derive(Debug)]
pub struct CsvTable {
    columns: HashMap<String, usize>,
    pub rows: Vec<CsvRow>,
}

impl CsvTable {
    /// Returns `None` when the text has no header line.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

        let (_, header) = lines.next()?;
        let columns = parse_record(header)
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_ascii_lowercase(), i))
            .collect();

        let rows = lines
            .map(|(idx, line)| CsvRow {
                line: idx + 1,
                fields: parse_record(line),
            })
            .collect();

        Some(Self { columns, rows })
    }

    /// Required columns absent from the header, in the order asked for.
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|c| !self.columns.contains_key(*c))
            .collect()
    }

    /// Trimmed value of `column` in `row`; empty cells and unknown columns read as `None`.
    pub fn get(&self, row: &CsvRow, column: &str) -> Option<String> {
        let idx = *self.columns.get(column)?;
        let value = row.fields.get(idx)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_fields_keep_commas_and_quotes() {
        let fields = parse_record(r#"A10,"Smith, ""Jo""",x"#);
        assert_eq!(fields, vec!["A10", r#"Smith, "Jo""#, "x"]);
    }

    #[test]
    fn trailing_comma_yields_empty_field() {
        assert_eq!(parse_record("a,"), vec!["a", ""]);
    }

    #[test]
    fn quote_only_when_needed() {
        assert_eq!(quote("plain"), "plain");
        assert_eq!(quote("a,b"), "\"a,b\"");
        assert_eq!(quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn write_record_joins_and_terminates() {
        assert_eq!(write_record(&["code", "Maths, Adv"]), "code,\"Maths, Adv\"\n");
    }

    #[test]
    fn header_is_case_insensitive_and_order_free() {
        let table = CsvTable::parse("Name, CODE\nMathematics,MATH\n\n Physics ,PHY\n").unwrap();
        assert!(table.missing_columns(&["code", "name"]).is_empty());
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.get(&table.rows[0], "code").as_deref(), Some("MATH"));
        assert_eq!(table.get(&table.rows[1], "name").as_deref(), Some("Physics"));
        assert_eq!(table.rows[1].line, 4);
    }

    #[test]
    fn missing_columns_are_reported() {
        let table = CsvTable::parse("code\nX\n").unwrap();
        assert_eq!(table.missing_columns(&["code", "name"]), vec!["name"]);
    }

    #[test]
    fn empty_upload_has_no_table() {
        assert!(CsvTable::parse("").is_none());
        assert!(CsvTable::parse("\n \n").is_none());
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let table = CsvTable::parse("\u{feff}code,name\nA,B\n").unwrap();
        assert!(table.missing_columns(&["code"]).is_empty());
    }

    #[test]
    fn short_rows_read_as_missing() {
        let table = CsvTable::parse("code,name\nONLY\n").unwrap();
        assert_eq!(table.get(&table.rows[0], "name"), None);
    }
}
