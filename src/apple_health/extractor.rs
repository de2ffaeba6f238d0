use crate::xml_utils::{self, Converter};

use crate::apple_health::types::HealthRecord;
use crate::core::{Extraction, Extractor, Processable};
use crate::error::Result;
use crossbeam_channel as channel;
use std::{path::Path, sync::Arc, thread};

/// Streams the records of an export through a per-report conversion.
pub struct AppleHealthExtractor<T> {
    convert: Converter<T>,
}

impl<T: Send + 'static> AppleHealthExtractor<T> {
    pub fn new<F>(convert: F) -> Self
    where
        F: Fn(HealthRecord) -> Option<T> + Send + Sync + 'static,
    {
        Self {
            convert: Arc::new(convert),
        }
    }

    /// `true` for `.zip` inputs, which are read into memory instead of mapped.
    pub fn is_zip(input_path: &Path) -> bool {
        input_path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    }
}

impl<T: Processable> Extractor<T> for AppleHealthExtractor<T> {
    fn extract(&self, input_path: &Path) -> Result<Extraction<T>> {
        let (sender, receiver) = channel::unbounded();
        let input_path = input_path.to_owned();
        let convert = Arc::clone(&self.convert);

        let handle = thread::Builder::new()
            .name("health-extract".to_string())
            .spawn(move || -> Result<usize> {
                if Self::is_zip(&input_path) {
                    let content = xml_utils::extract_xml_from_zip(&input_path)?;
                    xml_utils::process_memory_chunks(&content, &sender, convert)
                } else {
                    xml_utils::process_xml_file_mmap(&input_path, &sender, convert)
                }
            })?;

        Ok(Extraction { receiver, handle })
    }
}
