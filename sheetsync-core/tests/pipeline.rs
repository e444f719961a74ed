use sheetsync_core::{
    convert_document, CellValue, ConversionError, CsvWriter, DocumentParser, ParseError, Row,
    RowSink, Sheet, SourceDocument, TabularWriter, WriteError,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// Hands back a fixed document, or fails like a corrupt file would.
struct FakeParser {
    document: Option<SourceDocument>,
}

impl FakeParser {
    fn with(sheets: Vec<Sheet>) -> Self {
        Self {
            document: Some(SourceDocument::new(sheets)),
        }
    }

    fn corrupt() -> Self {
        Self { document: None }
    }

    fn from_json(json: &str) -> Self {
        Self {
            document: Some(serde_json::from_str(json).unwrap()),
        }
    }
}

impl DocumentParser for FakeParser {
    fn parse(&self, path: &Path) -> Result<SourceDocument, ParseError> {
        self.document.clone().ok_or_else(|| ParseError::Open {
            path: path.to_path_buf(),
            message: "corrupt container".into(),
        })
    }
}

/// Records every finished output in memory instead of touching disk.
#[derive(Default, Clone)]
struct MemoryWriter {
    outputs: Arc<Mutex<Vec<(PathBuf, Vec<Vec<String>>)>>>,
}

struct MemorySink {
    path: PathBuf,
    rows: Vec<Vec<String>>,
    outputs: Arc<Mutex<Vec<(PathBuf, Vec<Vec<String>>)>>>,
}

impl TabularWriter for MemoryWriter {
    fn create(&self, path: &Path) -> Result<Box<dyn RowSink>, WriteError> {
        Ok(Box::new(MemorySink {
            path: path.to_path_buf(),
            rows: Vec::new(),
            outputs: self.outputs.clone(),
        }))
    }
}

impl RowSink for MemorySink {
    fn write_row(&mut self, fields: &[String]) -> Result<(), WriteError> {
        self.rows.push(fields.to_vec());
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<(), WriteError> {
        self.outputs.lock().unwrap().push((self.path, self.rows));
        Ok(())
    }
}

fn text_rows(rows: &[&[&str]]) -> Vec<Row> {
    rows.iter().map(|r| r.iter().copied().collect()).collect()
}

fn book1() -> Vec<Sheet> {
    vec![
        Sheet::new("Sales", text_rows(&[&["Jan", "100"], &["Feb", "150"]])),
        Sheet::new("Q1", text_rows(&[&["Total", "250"]])),
    ]
}

#[test]
fn test_book1_scenario() {
    let dir = tempdir().unwrap();
    let summary = convert_document(
        &FakeParser::with(book1()),
        &CsvWriter::new(),
        Path::new("Book1.xlsx"),
        dir.path(),
    )
    .unwrap();

    assert_eq!(summary.sheets.len(), 2);
    assert_eq!(
        fs::read_to_string(dir.path().join("Sales.csv")).unwrap(),
        "Jan,100\nFeb,150\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("Q1.csv")).unwrap(),
        "Total,250\n"
    );
}

#[test]
fn test_one_artifact_per_sheet_in_order() {
    let writer = MemoryWriter::default();
    let sheets = vec![
        Sheet::new("A", text_rows(&[&["1"], &["2"], &["3"]])),
        Sheet::new("B", vec![]),
        Sheet::new("C", text_rows(&[&["x", "y"]])),
    ];

    convert_document(
        &FakeParser::with(sheets.clone()),
        &writer,
        Path::new("in.xlsx"),
        Path::new("out"),
    )
    .unwrap();

    let outputs = writer.outputs.lock().unwrap();
    let names: Vec<_> = outputs.iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(
        names,
        vec![
            PathBuf::from("out/A.csv"),
            PathBuf::from("out/B.csv"),
            PathBuf::from("out/C.csv"),
        ]
    );
    for ((_, rows), sheet) in outputs.iter().zip(&sheets) {
        assert_eq!(rows.len(), sheet.rows.len());
    }
    assert_eq!(outputs[0].1, vec![vec!["1"], vec!["2"], vec!["3"]]);
}

#[test]
fn test_uniform_sheet_round_trips_to_k_lines_of_m_fields() {
    let dir = tempdir().unwrap();
    let rows: Vec<Row> = (0..4)
        .map(|r| (0..3).map(|c| format!("r{r}c{c}")).collect())
        .collect();

    convert_document(
        &FakeParser::with(vec![Sheet::new("Grid", rows)]),
        &CsvWriter::new(),
        Path::new("grid.xlsx"),
        dir.path(),
    )
    .unwrap();

    let content = fs::read_to_string(dir.path().join("Grid.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    for (r, line) in lines.iter().enumerate() {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields, vec![format!("r{r}c0"), format!("r{r}c1"), format!("r{r}c2")]);
    }
}

#[test]
fn test_sparse_rows_are_not_padded() {
    let dir = tempdir().unwrap();
    let sheet = Sheet::new(
        "Sparse",
        text_rows(&[&["h1", "h2", "h3"], &["a", "b", "c"], &["only"]]),
    );

    convert_document(
        &FakeParser::with(vec![sheet]),
        &CsvWriter::new(),
        Path::new("sparse.xlsx"),
        dir.path(),
    )
    .unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("Sparse.csv")).unwrap(),
        "h1,h2,h3\na,b,c\nonly\n"
    );
}

#[test]
fn test_converting_twice_is_byte_identical() {
    let dir = tempdir().unwrap();
    let parser = FakeParser::with(book1());

    convert_document(&parser, &CsvWriter::new(), Path::new("b.xlsx"), dir.path()).unwrap();
    let first = fs::read(dir.path().join("Sales.csv")).unwrap();

    convert_document(&parser, &CsvWriter::new(), Path::new("b.xlsx"), dir.path()).unwrap();
    let second = fs::read(dir.path().join("Sales.csv")).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_corrupt_source_writes_nothing() {
    let dir = tempdir().unwrap();
    let err = convert_document(
        &FakeParser::corrupt(),
        &CsvWriter::new(),
        Path::new("broken.xlsx"),
        dir.path(),
    )
    .unwrap_err();

    assert!(matches!(err, ConversionError::Parse(ParseError::Open { .. })));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_failing_sheet_stops_the_pass() {
    let writer = MemoryWriter::default();
    let sheets = vec![
        Sheet::new("First", text_rows(&[&["fine"]])),
        Sheet::new("Broken", vec![Row::new(vec![CellValue::DateTime(-5.0).into()])]),
        Sheet::new("Never", text_rows(&[&["unreached"]])),
    ];

    let err = convert_document(
        &FakeParser::with(sheets),
        &writer,
        Path::new("in.xlsx"),
        Path::new("."),
    )
    .unwrap_err();

    assert!(matches!(err, ConversionError::CellFormat { row: 1, column: 1, .. }));
    let outputs = writer.outputs.lock().unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].0, PathBuf::from("./First.csv"));
}

#[test]
fn test_empty_sheet_produces_empty_file() {
    let dir = tempdir().unwrap();
    convert_document(
        &FakeParser::with(vec![Sheet::new("Blank", vec![])]),
        &CsvWriter::new(),
        Path::new("blank.xlsx"),
        dir.path(),
    )
    .unwrap();

    let path = dir.path().join("Blank.csv");
    assert!(path.exists());
    assert_eq!(fs::read_to_string(path).unwrap(), "");
}

#[test]
fn test_duplicate_sheet_names_last_one_wins() {
    let dir = tempdir().unwrap();
    let sheets = vec![
        Sheet::new("Dup", text_rows(&[&["first"]])),
        Sheet::new("Dup", text_rows(&[&["second"]])),
    ];

    let summary = convert_document(
        &FakeParser::with(sheets),
        &CsvWriter::new(),
        Path::new("dup.xlsx"),
        dir.path(),
    )
    .unwrap();

    assert_eq!(summary.sheets.len(), 2);
    assert_eq!(
        fs::read_to_string(dir.path().join("Dup.csv")).unwrap(),
        "second\n"
    );
}

#[test]
fn test_typed_cells_use_display_formatting() {
    let dir = tempdir().unwrap();
    let parser = FakeParser::from_json(
        r##"{
            "sheets": [{
                "name": "Typed",
                "rows": [
                    [
                        {"value": {"type": "text", "value": "when"}},
                        {"value": {"type": "date_time", "value": 45306.0}},
                        {"value": {"type": "date_time", "value": 45306.0}, "format": "d-mmm-yy"}
                    ],
                    [
                        {"value": {"type": "text", "value": "qty, net"}},
                        {"value": {"type": "number", "value": 12.0}},
                        {"value": {"type": "number", "value": 1234.5}, "format": "#,##0.00"}
                    ],
                    [
                        {"value": {"type": "bool", "value": true}},
                        {"value": {"type": "empty"}},
                        {"value": {"type": "number", "value": 0.5}, "format": "0%"}
                    ]
                ]
            }]
        }"##,
    );

    convert_document(&parser, &CsvWriter::new(), Path::new("t.xlsx"), dir.path()).unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("Typed.csv")).unwrap(),
        "when,2024-01-15,15-Jan-24\n\"qty, net\",12,\"1,234.50\"\nTRUE,,50%\n"
    );
}
