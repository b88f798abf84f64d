//! Record rendering for the terminal

use colored::*;
use serde_json::Value;

use crate::api::Record;

/// Plain text for one cell; nested values are shown as compact JSON
pub fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Column headers, the given fields first, skipping the `attributes` envelope
pub fn columns(records: &[Record], fields: &[String]) -> Vec<String> {
    let mut columns: Vec<String> = fields.to_vec();
    for record in records {
        for name in record.values.keys() {
            if name != "attributes" && !columns.contains(name) {
                columns.push(name.clone());
            }
        }
    }
    columns
}

pub fn print_table(records: &[Record], fields: &[String]) {
    if records.is_empty() {
        println!("{}", "No records.".dimmed());
        return;
    }

    let columns = columns(records, fields);
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| columns.iter().map(|c| cell(record.get(c))).collect())
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:<w$}", c, w = *w))
        .collect();
    println!("{}", header.join("  ").bold());

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<w$}", v, w = *w))
            .collect();
        println!("{}", line.join("  "));
    }
}

pub fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell() {
        assert_eq!(cell(Some(&json!("Ann"))), "Ann");
        assert_eq!(cell(Some(&json!(3))), "3");
        assert_eq!(cell(Some(&Value::Null)), "");
        assert_eq!(cell(None), "");
    }

    #[test]
    fn test_columns_skip_attributes() {
        let records = vec![Record::from_value(json!({
            "attributes": {"type": "Contact"},
            "Id": "003A",
            "Title": "CTO"
        }))];
        let columns = columns(&records, &["Id".to_string(), "Name".to_string()]);
        assert_eq!(columns, vec!["Id", "Name", "Title"]);
    }
}
