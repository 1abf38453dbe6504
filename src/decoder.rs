use crate::error::AppError;
use crate::metadata::PhotoRecord;
use exif::{Context, Exif, Field, In, Reader, Value};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// EXIF field storage types, as far as trust is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Byte,
    Ascii,
    Short,
    Long,
    Rational,
    SByte,
    Undefined,
    SShort,
    SLong,
    SRational,
    Float,
    Double,
    Unknown,
}

impl From<&Value> for FieldType {
    fn from(value: &Value) -> Self {
        match value {
            Value::Byte(_) => FieldType::Byte,
            Value::Ascii(_) => FieldType::Ascii,
            Value::Short(_) => FieldType::Short,
            Value::Long(_) => FieldType::Long,
            Value::Rational(_) => FieldType::Rational,
            Value::SByte(_) => FieldType::SByte,
            Value::Undefined(..) => FieldType::Undefined,
            Value::SShort(_) => FieldType::SShort,
            Value::SLong(_) => FieldType::SLong,
            Value::SRational(_) => FieldType::SRational,
            Value::Float(_) => FieldType::Float,
            Value::Double(_) => FieldType::Double,
            Value::Unknown(..) => FieldType::Unknown,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecoderOptions {
    /// Keep the fields that parsed when others in the same file are corrupt.
    pub continue_on_error: bool,
    /// Log per-field corruption at trace level instead of warn.
    pub suppress_corrupt_field_warnings: bool,
    /// Fields stored as one of these types are never surfaced as text.
    pub untrusted_field_types: Vec<FieldType>,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            suppress_corrupt_field_warnings: true,
            untrusted_field_types: vec![FieldType::Undefined, FieldType::Unknown],
        }
    }
}

/// Turns a file on disk into a `PhotoRecord`.
pub trait MetadataDecoder {
    fn decode(&self, path: &Path) -> Result<PhotoRecord, AppError>;
}

/// Source of IPTC keywords, which the EXIF reader does not cover.
pub trait KeywordReader {
    fn read_keywords(&self, path: &Path) -> Result<Vec<String>, AppError>;
}

pub struct ExifDecoder {
    options: DecoderOptions,
    keywords: Option<Box<dyn KeywordReader>>,
}

impl ExifDecoder {
    pub fn new(options: DecoderOptions) -> Self {
        Self { options, keywords: None }
    }

    pub fn with_keywords(mut self, reader: Box<dyn KeywordReader>) -> Self {
        self.keywords = Some(reader);
        self
    }

    fn read_exif(&self, path: &Path) -> Result<Option<Exif>, AppError> {
        let file = File::open(path)?;
        let mut buf_reader = BufReader::new(file);
        let mut reader = Reader::new();
        reader.continue_on_error(self.options.continue_on_error);

        match reader.read_from_container(&mut buf_reader) {
            Ok(exif) => Ok(Some(exif)),
            Err(exif::Error::PartialResult(partial)) => {
                let (exif, errors) = partial.into_inner();
                for e in errors {
                    if self.options.suppress_corrupt_field_warnings {
                        log::trace!("Possibly corrupted field in {:?}: {}", path, e);
                    } else {
                        log::warn!("Possibly corrupted field in {:?}: {}", path, e);
                    }
                }
                Ok(Some(exif))
            }
            Err(exif::Error::Io(e)) => Err(AppError::Io(e)),
            Err(e) => {
                log::debug!("No EXIF data found for {:?}: {}", path, e);
                Ok(None)
            }
        }
    }

    fn tag_table(&self, exif: &Exif) -> HashMap<String, Option<String>> {
        let mut tags = HashMap::new();
        for field in exif.fields() {
            let name = tag_name(field);
            let field_type = FieldType::from(&field.value);
            let value = if self.options.untrusted_field_types.contains(&field_type) {
                log::trace!("Ignoring {} field {}", format!("{:?}", field_type).to_lowercase(), name);
                None
            } else {
                Some(printable(field)).filter(|v| !v.is_empty())
            };
            tags.entry(name).or_insert(value);
        }
        tags
    }
}

impl MetadataDecoder for ExifDecoder {
    fn decode(&self, path: &Path) -> Result<PhotoRecord, AppError> {
        log::trace!("Extracting EXIF data for image: {:?}", path);
        // The file handle is dropped before the keyword reader runs.
        let tags = match self.read_exif(path)? {
            Some(exif) => self.tag_table(&exif),
            None => HashMap::new(),
        };
        log::trace!("Decoded {} tags from {:?}", tags.len(), path);

        let keywords = match &self.keywords {
            Some(reader) => reader.read_keywords(path)?,
            None => Vec::new(),
        };

        Ok(PhotoRecord::new(path.to_path_buf(), tags, keywords))
    }
}

/// TIFF tags the exif crate has no name for.
const EXTRA_TIFF_TAGS: &[(u16, &str)] = &[(0x010D, "DocumentName"), (0x011D, "PageName")];

/// `"<IFD> <TagName>"`, e.g. `Image Make` or `EXIF DateTimeOriginal`.
fn tag_name(field: &Field) -> String {
    let context = field.tag.context();
    let group = match context {
        Context::Tiff if field.ifd_num == In::PRIMARY => "Image",
        Context::Tiff => "Thumbnail",
        Context::Exif => "EXIF",
        Context::Gps => "GPS",
        _ => "Interoperability",
    };
    let extra = match context {
        Context::Tiff => EXTRA_TIFF_TAGS
            .iter()
            .find(|(number, _)| *number == field.tag.number())
            .map(|(_, name)| *name),
        _ => None,
    };
    match extra {
        Some(name) => format!("{} {}", group, name),
        None => format!("{} {}", group, field.tag),
    }
}

fn printable(field: &Field) -> String {
    match &field.value {
        Value::Ascii(strings) => strings
            .iter()
            .map(|raw| String::from_utf8_lossy(raw).trim_end_matches('\0').to_string())
            .collect::<Vec<_>>()
            .join(", ")
            .trim()
            .to_string(),
        _ => field.display_value().to_string().trim().to_string(),
    }
}
