use crate::core::cleaning::unique_column_name;
use crate::core::{Dataset, Record, Storage};
use crate::domain::model::cell_to_string;
use crate::utils::error::{EtlError, Result};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Reads the sheet through `storage`. Every failure is reported as a load error.
pub async fn load_data<S: Storage>(storage: &S, path: &str, delimiter: u8) -> Result<Dataset> {
    tracing::debug!("Reading input file: {}", path);
    let bytes = storage
        .read_file(path)
        .await
        .map_err(|e| EtlError::DataLoadError {
            message: e.to_string(),
        })?;

    let dataset = parse_csv(&bytes, delimiter).map_err(|e| EtlError::DataLoadError {
        message: e.to_string(),
    })?;

    tracing::debug!(
        "Loaded {} rows with {} columns from {}",
        dataset.len(),
        dataset.columns.len(),
        path
    );
    Ok(dataset)
}

pub fn parse_csv(bytes: &[u8], delimiter: u8) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let mut used = HashSet::new();
    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| unique_column_name(header, &mut used))
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut data = HashMap::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            let cell = record.get(index).map(parse_cell).unwrap_or(Value::Null);
            data.insert(column.clone(), cell);
        }
        rows.push(Record { data });
    }

    Ok(Dataset::new(columns, rows))
}

/// Blank cells are missing; numeric text becomes a number.
pub fn parse_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        _ => Value::String(raw.to_string()),
    }
}

pub fn write_csv(dataset: &Dataset, delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(&dataset.columns)?;
    for row in &dataset.rows {
        let fields: Vec<String> = dataset
            .columns
            .iter()
            .map(|column| cell_to_string(row.get(column)).unwrap_or_default())
            .collect();
        writer.write_record(&fields)?;
    }

    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    #[test]
    fn test_parse_csv_types_and_missing_cells() {
        let input = "Product ID,Product Name,Units Sold\n101,Gloves,12\n102, ,3.5\n103,Masks,\n";
        let dataset = parse_csv(input.as_bytes(), b',').unwrap();

        assert_eq!(
            dataset.columns,
            vec!["Product ID", "Product Name", "Units Sold"]
        );
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.rows[0].get("Product ID"), &json!(101));
        assert_eq!(dataset.rows[0].get("Product Name"), &json!("Gloves"));
        assert!(dataset.rows[1].get("Product Name").is_null());
        assert_eq!(dataset.rows[1].get("Units Sold"), &json!(3.5));
        assert!(dataset.rows[2].get("Units Sold").is_null());
    }

    #[test]
    fn test_parse_csv_short_rows_are_padded_with_null() {
        let input = "a,b,c\n1,2\n";
        let dataset = parse_csv(input.as_bytes(), b',').unwrap();
        assert!(dataset.rows[0].get("c").is_null());
    }

    #[test]
    fn test_parse_csv_repeated_header_keeps_both_columns() {
        let dataset = parse_csv(b"region,region\nPune,Mumbai\n", b',').unwrap();
        assert_eq!(dataset.columns, vec!["region", "region_1"]);
        assert_eq!(dataset.rows[0].get("region"), &json!("Pune"));
        assert_eq!(dataset.rows[0].get("region_1"), &json!("Mumbai"));
    }

    #[test]
    fn test_write_csv_renders_missing_as_empty() {
        let input = "id;name;qty\n1;Gloves;\n2;;4\n";
        let dataset = parse_csv(input.as_bytes(), b';').unwrap();
        let output = String::from_utf8(write_csv(&dataset, b';').unwrap()).unwrap();
        assert_eq!(output, "id;name;qty\n1;Gloves;\n2;;4\n");
    }

    #[tokio::test]
    async fn test_load_data_missing_file() {
        let storage = MockStorage::default();
        let err = load_data(&storage, "Hospital_Management_Data.csv", b',')
            .await
            .unwrap_err();
        assert!(matches!(err, EtlError::DataLoadError { .. }));
        assert!(err.to_string().starts_with("Error loading data: "));
    }

    #[tokio::test]
    async fn test_load_data_from_storage() {
        let storage = MockStorage::default();
        storage
            .write_file("data.csv", b"date,units_sold\n2024-01-05,3\n")
            .await
            .unwrap();

        let dataset = load_data(&storage, "data.csv", b',').await.unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.rows[0].number("units_sold"), Some(3.0));
    }
}
