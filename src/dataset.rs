use crate::config::FeaturesConfiguration;
use std::collections::HashMap;
use std::path::Path;

/// A held-out evaluation dataset, parsed from CSV exactly once and shared by
/// every combination evaluated against it. Columns declared as `float`/`int`
/// in the features configuration are parsed as numbers; `ids` columns stay as
/// strings for grouped evaluation.
pub struct Dataset {
    pub name: String,
    length: usize,
    float_columns: HashMap<String, Vec<f64>>,
    id_columns: HashMap<String, Vec<String>>,
}

impl Dataset {
    pub fn load(path: impl AsRef<Path>, typing: &FeaturesConfiguration) -> Self {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_else(|| panic!("Dataset path {:?} has no file stem", path))
            .to_owned();
        let mut reader = csv::Reader::from_path(path)
            .unwrap_or_else(|err| panic!("Failed to open dataset {:?}: {}", path, err));
        let headers: Vec<String> = reader
            .headers()
            .expect("Failed to read dataset header row")
            .iter()
            .map(str::to_owned)
            .collect();

        let column_index = |column: &String| -> usize {
            headers
                .iter()
                .position(|header| header == column)
                .unwrap_or_else(|| panic!("Dataset {:?} is missing column {}", path, column))
        };
        let numeric: Vec<(String, usize)> = typing
            .float
            .iter()
            .chain(typing.int.iter())
            .map(|column| (column.clone(), column_index(column)))
            .collect();
        let textual: Vec<(String, usize)> = typing
            .ids
            .iter()
            .map(|column| (column.clone(), column_index(column)))
            .collect();

        let mut float_columns: HashMap<String, Vec<f64>> = numeric
            .iter()
            .map(|(column, _)| (column.clone(), vec![]))
            .collect();
        let mut id_columns: HashMap<String, Vec<String>> = textual
            .iter()
            .map(|(column, _)| (column.clone(), vec![]))
            .collect();

        let mut length = 0;
        for record in reader.records() {
            let record = record.expect("Failed to read dataset row");
            for (column, index) in &numeric {
                let cell = record.get(*index).unwrap_or("");
                // Blank cells are kept as NaN rather than dropping the row
                let value = if cell.is_empty() {
                    f64::NAN
                } else {
                    cell.parse().unwrap_or_else(|_| {
                        panic!("Row {} of column {} is not numeric: {}", length, column, cell)
                    })
                };
                float_columns.get_mut(column).unwrap().push(value);
            }
            for (column, index) in &textual {
                let cell = record.get(*index).unwrap_or("").to_owned();
                id_columns.get_mut(column).unwrap().push(cell);
            }
            length += 1;
        }
        tracing::info!("Loaded {} rows from {:?}", length, path);

        Self {
            name,
            length,
            float_columns,
            id_columns,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Row-major matrix restricted to the given feature columns, in order.
    pub fn feature_matrix(&self, features: &[String]) -> Vec<Vec<f64>> {
        let columns: Vec<&[f64]> = features.iter().map(|name| self.column(name)).collect();
        (0..self.length)
            .map(|row| columns.iter().map(|column| column[row]).collect())
            .collect()
    }

    pub fn column(&self, name: &str) -> &[f64] {
        self.float_columns
            .get(name)
            .unwrap_or_else(|| panic!("Dataset {} has no numeric column {}", self.name, name))
    }

    pub fn ids(&self, name: &str) -> &[String] {
        self.id_columns
            .get(name)
            .unwrap_or_else(|| panic!("Dataset {} has no identifier column {}", self.name, name))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn typing() -> FeaturesConfiguration {
        FeaturesConfiguration {
            float: vec!["f1".into(), "f2".into(), "response".into()],
            int: vec![],
            ids: vec!["patient_id".into()],
        }
    }

    fn write_sample(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("holdout.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "patient_id,f1,f2,response,ignored").unwrap();
        writeln!(file, "p1,0.5,1.0,1,x").unwrap();
        writeln!(file, "p1,0.25,,0,y").unwrap();
        writeln!(file, "p2,0.75,3.0,0,z").unwrap();
        path
    }

    #[test]
    fn test_load_and_access() {
        let dir = tempfile::tempdir().unwrap();
        let data = Dataset::load(write_sample(dir.path()), &typing());

        assert_eq!(data.name, "holdout");
        assert_eq!(data.len(), 3);
        assert_eq!(data.column("response"), [1., 0., 0.]);
        assert_eq!(data.ids("patient_id"), ["p1", "p1", "p2"]);
        assert!(data.column("f2")[1].is_nan());

        let matrix = data.feature_matrix(&["f2".into(), "f1".into()]);
        assert_eq!(matrix[0], [1.0, 0.5]);
        assert_eq!(matrix[2], [3.0, 0.75]);
    }

    #[test]
    #[should_panic(expected = "missing column")]
    fn test_missing_declared_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(dir.path());
        let mut typing = typing();
        typing.float.push("absent".into());
        Dataset::load(path, &typing);
    }
}
