//! A file adapter that keeps the document's line endings stable across a
//! read/modify/write cycle.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::document::TOMLDocument;

const OS_LINE_ENDING: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// Represents a TOML file on disk.
///
/// `read` detects the dominant line terminator and normalizes the text to
/// `\n` in memory; `write` re-expands to the detected terminator, so a file
/// written on one platform keeps its endings when edited on another.
#[derive(Debug, Clone)]
pub struct TOMLFile {
    path: PathBuf,
    line_ending: String,
}

impl TOMLFile {
    pub fn new<P>(path: P) -> TOMLFile
        where P: Into<PathBuf>
    {
        TOMLFile { path: path.into(), line_ending: OS_LINE_ENDING.to_string() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The terminator the last `read` detected (the OS default before any
    /// read, or when the file has no newlines at all).
    pub fn line_ending(&self) -> &str {
        &self.line_ending
    }

    /// Reads and parses the file. Parse failures surface as
    /// `io::ErrorKind::InvalidData`.
    pub fn read(&mut self) -> io::Result<TOMLDocument> {
        let raw = fs::read_to_string(&self.path)?;
        let crlf = raw.matches("\r\n").count();
        let lf = raw.matches('\n').count() - crlf;
        if crlf > lf {
            self.line_ending = "\r\n".to_string();
        } else if lf > 0 {
            self.line_ending = "\n".to_string();
        } else {
            self.line_ending = OS_LINE_ENDING.to_string();
        }
        let normalized = raw.replace("\r\n", "\n");
        crate::parse(&normalized)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
    }

    /// Writes the document back using the detected terminator.
    pub fn write(&self, doc: &TOMLDocument) -> io::Result<()> {
        let text = doc.as_string().replace("\r\n", "\n");
        let text = if self.line_ending == "\n" {
            text
        } else {
            text.replace('\n', &self.line_ending)
        };
        fs::write(&self.path, text)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = env::temp_dir();
        path.push(format!("tomldoc-test-{}-{}", std::process::id(), name));
        path
    }

    #[test]
    fn test_crlf_detection_and_round_trip() {
        let path = temp_path("crlf.toml");
        fs::write(&path, "a = 1\r\nb = 2\r\n").unwrap();
        let mut file = TOMLFile::new(&path);
        let mut doc = file.read().unwrap();
        assert_eq!(file.line_ending(), "\r\n");
        doc.set("c", 3).unwrap();
        file.write(&doc).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "a = 1\r\nb = 2\r\nc = 3\r\n");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_lf_preserved() {
        let path = temp_path("lf.toml");
        fs::write(&path, "a = 1\nb = 2\n").unwrap();
        let mut file = TOMLFile::new(&path);
        let doc = file.read().unwrap();
        assert_eq!(file.line_ending(), "\n");
        file.write(&doc).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a = 1\nb = 2\n");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_invalid_content_is_invalid_data() {
        let path = temp_path("bad.toml");
        fs::write(&path, "not toml at all !!!\n").unwrap();
        let mut file = TOMLFile::new(&path);
        let err = file.read().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        fs::remove_file(&path).unwrap();
    }
}
