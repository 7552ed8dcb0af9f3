use std::fs::File;
use std::io::Read;
use std::path::Path;

use zip::ZipArchive;

use crate::error::LoadError;

/// The XML parts of an `.xlsx` workbook, read into memory.
pub struct XlsxPackage {
    pub entries: Vec<XlsxEntry>,
}

pub struct XlsxEntry {
    pub name: String,
    pub data: Vec<u8>,
}

impl XlsxPackage {
    pub fn read(path: &Path) -> Result<Self, LoadError> {
        let f = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(f)
    }

    pub fn from_reader<R: Read + std::io::Seek>(reader: R) -> Result<Self, LoadError> {
        let mut zip = ZipArchive::new(reader)?;
        let mut entries = Vec::new();
        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            let name = file.name().to_string();
            if file.is_dir() || !is_xml_part(&name) {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| LoadError::Malformed(format!("read {name}: {e}")))?;
            entries.push(XlsxEntry { name, data });
        }
        Ok(Self { entries })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        let name = name.trim_start_matches('/');
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.data.as_slice())
    }
}

fn is_xml_part(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".xml") || lower.ends_with(".rels")
}
