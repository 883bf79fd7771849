use crate::constants::{CSV_MIME_TYPE, FALLBACK_MIME_TYPE, MAX_UPLOAD_BYTES};
use crate::error::{Result, UploadError};
use crate::types::RawRow;
use csv::{Position, ReaderBuilder, Trim};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An uploaded file as handed over by whatever picked it
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn sha256_hex(&self) -> String {
        let mut h = Sha256::new();
        h.update(&self.bytes);
        hex::encode(h.finalize())
    }
}

/// Capability that yields the bytes of the file to upload, if any.
pub trait UploadSource: Send + Sync {
    fn open(&self) -> Result<Option<UploadFile>>;

    /// Size in bytes, when it can be known without reading the contents
    fn size_hint(&self) -> Result<Option<u64>> {
        Ok(None)
    }
}

/// Reads the upload from disk. The MIME type is inferred from the extension
/// unless given explicitly.
pub struct FsUploadSource {
    path: PathBuf,
    content_type: Option<String>,
}

impl FsUploadSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl UploadSource for FsUploadSource {
    fn open(&self) -> Result<Option<UploadFile>> {
        let bytes = fs::read(&self.path)?;
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string());
        let content_type = self
            .content_type
            .clone()
            .unwrap_or_else(|| mime_from_extension(&self.path).to_string());
        Ok(Some(UploadFile::new(name, content_type, bytes)))
    }

    fn size_hint(&self) -> Result<Option<u64>> {
        Ok(Some(fs::metadata(&self.path)?.len()))
    }
}

/// In-memory source, `None` meaning no file was picked
#[derive(Debug, Clone, Default)]
pub struct MemoryUploadSource {
    file: Option<UploadFile>,
}

impl MemoryUploadSource {
    pub fn new(file: UploadFile) -> Self {
        Self { file: Some(file) }
    }

    pub fn empty() -> Self {
        Self { file: None }
    }

    pub fn csv(name: &str, contents: &str) -> Self {
        Self::new(UploadFile::new(name, CSV_MIME_TYPE, contents.as_bytes().to_vec()))
    }
}

impl UploadSource for MemoryUploadSource {
    fn open(&self) -> Result<Option<UploadFile>> {
        Ok(self.file.clone())
    }
}

pub fn mime_from_extension(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => CSV_MIME_TYPE,
        _ => FALLBACK_MIME_TYPE,
    }
}

/// Size and type constraints checked before any parsing
#[derive(Debug, Clone, PartialEq)]
pub struct UploadLimits {
    pub max_bytes: u64,
    pub allowed_mime: Vec<String>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
            allowed_mime: vec![CSV_MIME_TYPE.to_string()],
        }
    }
}

pub fn preflight(file: &UploadFile, limits: &UploadLimits) -> Result<()> {
    if file.size() > limits.max_bytes {
        return Err(UploadError::FileTooLarge {
            size: file.size(),
            limit: limits.max_bytes,
        });
    }
    let base = file
        .content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if !limits.allowed_mime.iter().any(|m| m.eq_ignore_ascii_case(&base)) {
        return Err(UploadError::UnsupportedMimeType(file.content_type.clone()));
    }
    Ok(())
}

/// Parse CSV bytes into rows keyed by the header line. Cells are trimmed,
/// cells beyond the header are dropped and rows with only empty cells are
/// skipped. Each row remembers the file line it started on.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<RawRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();
    debug!("CSV headers: {:?}", headers);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        match record.position() {
            Some(pos) => rows.push(row.with_line(record_line(bytes, pos))),
            None => rows.push(row),
        }
    }
    Ok(rows)
}

/// Line a record starts on. The reader stamps the position where it began
/// looking, which is before any blank lines it skipped.
fn record_line(bytes: &[u8], pos: &Position) -> usize {
    let start = usize::try_from(pos.byte()).unwrap_or(usize::MAX);
    let skipped = bytes
        .get(start..)
        .unwrap_or_default()
        .iter()
        .take_while(|b| matches!(b, b'\n' | b'\r'))
        .filter(|b| **b == b'\n')
        .count();
    pos.line() as usize + skipped
}

/// Lowercase every row's column names so header casing does not matter
pub fn normalize_keys(rows: Vec<RawRow>) -> Vec<RawRow> {
    rows.into_iter().map(RawRow::with_lowercase_keys).collect()
}

/// Open, check and parse an upload. `Ok(None)` when no file was provided.
pub fn read_upload(
    source: &dyn UploadSource,
    limits: &UploadLimits,
) -> Result<Option<(UploadFile, Vec<RawRow>)>> {
    // refuse before buffering when the source already knows it is too big
    if let Some(size) = source.size_hint()? {
        if size > limits.max_bytes {
            return Err(UploadError::FileTooLarge {
                size,
                limit: limits.max_bytes,
            });
        }
    }
    let Some(file) = source.open()? else {
        return Ok(None);
    };
    preflight(&file, limits)?;
    let rows = parse_csv(&file.bytes)?;
    if rows.is_empty() {
        return Err(UploadError::EmptyBatch);
    }
    info!("Parsed {} rows from {} ({} bytes)", rows.len(), file.name, file.size());
    Ok(Some((file, rows)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_file(contents: &str) -> UploadFile {
        UploadFile::new("marks.csv", CSV_MIME_TYPE, contents.as_bytes().to_vec())
    }

    #[test]
    fn parses_rows_keyed_by_verbatim_headers() {
        let rows = parse_csv(b"Reg_No,Mark\nB001, 70 \nB002,55\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Reg_No"), Some("B001"));
        assert_eq!(rows[0].get("Mark"), Some("70"));
        assert_eq!(rows[1].get("Mark"), Some("55"));
    }

    #[test]
    fn short_rows_keep_fewer_fields_and_extra_cells_are_dropped() {
        let rows = parse_csv(b"a,b,c\n1,2\n1,2,3,4\n").unwrap();
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[1].len(), 3);
        assert_eq!(rows[1].get("c"), Some("3"));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let rows = parse_csv(b"a,b\n1,2\n\n,\n3,4\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("a"), Some("3"));
    }

    #[test]
    fn rows_keep_their_file_line() {
        let rows = parse_csv(b"a,b\n1,2\n,\n\n3,4\r\n\r\n5,6\n").unwrap();
        assert_eq!(rows[0].line(), Some(2));
        assert_eq!(rows[1].line(), Some(5));
        assert_eq!(rows[2].line(), Some(7));
    }

    #[test]
    fn byte_order_mark_is_stripped_from_first_header() {
        let rows = parse_csv("\u{feff}reg_no,mark\nB1,40\n".as_bytes()).unwrap();
        assert_eq!(rows[0].get("reg_no"), Some("B1"));
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let err = parse_csv(b"a,b\n\xff\xfe,1\n").unwrap_err();
        assert!(matches!(err, UploadError::Csv(_)));
    }

    #[test]
    fn normalize_keys_lowercases_and_keeps_order() {
        let rows = normalize_keys(parse_csv(b"REG_NO,Class_Code\nB1,CS408\n").unwrap());
        assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["reg_no", "class_code"]);
        assert_eq!(rows[0].get("class_code"), Some("CS408"));
    }

    #[test]
    fn preflight_accepts_exactly_the_size_limit() {
        let limits = UploadLimits {
            max_bytes: 10,
            ..UploadLimits::default()
        };
        let file = UploadFile::new("a.csv", CSV_MIME_TYPE, vec![b'a'; 10]);
        assert!(preflight(&file, &limits).is_ok());

        let file = UploadFile::new("a.csv", CSV_MIME_TYPE, vec![b'a'; 11]);
        assert!(matches!(
            preflight(&file, &limits),
            Err(UploadError::FileTooLarge { size: 11, limit: 10 })
        ));
    }

    #[test]
    fn preflight_checks_mime_base_type() {
        let limits = UploadLimits::default();
        let mut file = csv_file("a\n1\n");
        file.content_type = "text/csv; charset=utf-8".into();
        assert!(preflight(&file, &limits).is_ok());

        file.content_type = "application/vnd.ms-excel".into();
        assert!(matches!(
            preflight(&file, &limits),
            Err(UploadError::UnsupportedMimeType(_))
        ));
    }

    #[test]
    fn read_upload_returns_none_without_file() {
        let out = read_upload(&MemoryUploadSource::empty(), &UploadLimits::default()).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn read_upload_rejects_header_only_file() {
        let source = MemoryUploadSource::csv("marks.csv", "reg_no,mark\n");
        assert!(matches!(
            read_upload(&source, &UploadLimits::default()),
            Err(UploadError::EmptyBatch)
        ));
    }

    struct HugeSource;

    impl UploadSource for HugeSource {
        fn open(&self) -> Result<Option<UploadFile>> {
            panic!("an oversized file must not be read");
        }

        fn size_hint(&self) -> Result<Option<u64>> {
            Ok(Some(8 * 1024 * 1024 * 1024))
        }
    }

    #[test]
    fn oversized_source_is_rejected_before_reading() {
        let err = read_upload(&HugeSource, &UploadLimits::default()).unwrap_err();
        assert!(matches!(
            err,
            UploadError::FileTooLarge { limit: MAX_UPLOAD_BYTES, .. }
        ));
    }

    #[test]
    fn file_size_is_read_from_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marks.csv");
        fs::write(&path, vec![b'a'; 64]).unwrap();
        let source = FsUploadSource::new(&path);
        assert_eq!(source.size_hint().unwrap(), Some(64));

        let limits = UploadLimits {
            max_bytes: 32,
            ..UploadLimits::default()
        };
        assert!(matches!(
            read_upload(&source, &limits),
            Err(UploadError::FileTooLarge { size: 64, limit: 32 })
        ));
    }

    #[test]
    fn extension_decides_inferred_mime() {
        assert_eq!(mime_from_extension(Path::new("marks.CSV")), CSV_MIME_TYPE);
        assert_eq!(mime_from_extension(Path::new("marks.xlsx")), FALLBACK_MIME_TYPE);
    }
}
