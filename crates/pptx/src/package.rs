//! ZIP container for the OOXML parts.

use forge_core::{Error, Result};
use std::io::{Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Writes named parts into a `.pptx` archive.
pub struct PackageWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    parts: Vec<String>,
}

impl<W: Write + Seek> PackageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            parts: Vec::new(),
        }
    }

    /// Add an XML part.
    pub fn add_xml(&mut self, path: &str, xml: &str) -> Result<()> {
        self.add_bytes(path, xml.as_bytes())
    }

    /// Add a part with arbitrary content.
    pub fn add_bytes(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        self.zip
            .start_file(path, options)
            .map_err(|e| Error::ZipError(e.to_string()))?;
        self.zip.write_all(bytes)?;
        self.parts.push(path.to_string());
        Ok(())
    }

    /// Part names written so far, in order.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Write the central directory and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.zip
            .finish()
            .map_err(|e| Error::ZipError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn test_written_parts_can_be_read_back() {
        let mut package = PackageWriter::new(Cursor::new(Vec::new()));
        package.add_xml("ppt/presentation.xml", "<p:presentation/>").unwrap();
        package.add_bytes("ppt/media/image1.png", b"\x89PNG").unwrap();
        assert_eq!(package.parts().len(), 2);

        let cursor = package.finish().unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(cursor.into_inner())).unwrap();
        let mut content = String::new();
        archive
            .by_name("ppt/presentation.xml")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "<p:presentation/>");
        assert!(archive.by_name("ppt/media/image1.png").is_ok());
    }
}
