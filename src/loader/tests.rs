use super::*;
use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};
use tempfile::TempDir;

fn write_pdf(path: &Path, text: &str) {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![100.into(), 600.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("should encode content"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("should save pdf");
}

#[test]
fn loads_text_file_with_metadata() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("notes.txt");
    fs::write(&path, "Plain notes.\n").expect("should write file");

    let document = load_document(&path).expect("should load text file");

    assert_eq!(document.text(), "Plain notes.\n");
    assert_eq!(document.metadata()[FILE_NAME_KEY], "notes.txt");
    let directory = temp_dir
        .path()
        .canonicalize()
        .expect("should canonicalize temp dir");
    assert_eq!(
        document.metadata()[DIRECTORY_KEY],
        directory.to_string_lossy()
    );
    assert_eq!(document.source(), "notes.txt");
}

#[test]
fn loads_pdf_text() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("Report.PDF");
    write_pdf(&path, "Quarterly revenue grew");

    let document = load_document(&path).expect("should load pdf");

    assert!(document.text().contains("Quarterly revenue grew"));
    assert_eq!(document.metadata()[FILE_NAME_KEY], "Report.PDF");
}

#[test]
fn corrupt_pdf_is_a_document_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("broken.pdf");
    fs::write(&path, "definitely not a pdf").expect("should write file");

    assert!(matches!(load_document(&path), Err(RagError::Document(_))));
}

#[test]
fn unsupported_extension_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("image.png");
    fs::write(&path, [0_u8, 1, 2]).expect("should write file");

    assert!(matches!(load_document(&path), Err(RagError::Document(_))));
}

#[test]
fn missing_file_is_an_io_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let result = load_document(&temp_dir.path().join("absent.md"));
    assert!(matches!(result, Err(RagError::Io(_))));
}

#[test]
fn directories_are_walked_recursively() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let nested = temp_dir.path().join("nested");
    fs::create_dir_all(&nested).expect("should create nested dir");
    fs::write(temp_dir.path().join("b.md"), "# B").expect("should write file");
    fs::write(temp_dir.path().join("skip.png"), "x").expect("should write file");
    fs::write(nested.join("a.txt"), "A").expect("should write file");

    let files = collect_files(&[temp_dir.path().to_path_buf()]).expect("should list files");

    let names: Vec<String> = files
        .iter()
        .filter_map(|f| f.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["b.md".to_string(), "a.txt".to_string()]);
}

#[cfg(unix)]
#[test]
fn symlinked_directory_cycles_are_not_followed() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(temp_dir.path().join("a.txt"), "A").expect("should write file");
    std::os::unix::fs::symlink(temp_dir.path(), temp_dir.path().join("loop"))
        .expect("should create symlink");

    let files = collect_files(&[temp_dir.path().to_path_buf()]).expect("should list files");

    assert_eq!(files, vec![temp_dir.path().join("a.txt")]);
}

#[test]
fn load_paths_reports_failures_without_stopping() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(temp_dir.path().join("good.txt"), "fine").expect("should write file");
    fs::write(temp_dir.path().join("bad.pdf"), "garbage").expect("should write file");

    let report = load_paths(&[temp_dir.path().to_path_buf()]).expect("should walk directory");

    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.documents[0].text(), "fine");
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].0.ends_with("bad.pdf"));
}

#[test]
fn kind_detection_ignores_case() {
    assert_eq!(
        DocumentKind::from_path(Path::new("a.Pdf")),
        Some(DocumentKind::Pdf)
    );
    assert_eq!(
        DocumentKind::from_path(Path::new("README.MD")),
        Some(DocumentKind::Text)
    );
    assert_eq!(DocumentKind::from_path(Path::new("archive.zip")), None);
    assert_eq!(DocumentKind::from_path(Path::new("no_extension")), None);
}
