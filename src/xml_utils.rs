use crossbeam_channel as channel;
use log::debug;
use memmap2::Mmap;
use quick_xml::{Reader, events::Event, name::QName};
use rayon::prelude::*;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::apple_health::types::HealthRecord;
use crate::error::{AppError, Result};

/// Target chunk size in bytes
pub const CHUNK_SIZE: usize = 2 * 1024 * 1024;

const RECORD_TAG: &[u8] = b"<Record";

/// Turns a parsed record into the item a report consumes, or drops it.
pub type Converter<T> = Arc<dyn Fn(HealthRecord) -> Option<T> + Send + Sync + 'static>;

/// Find chunk boundaries using the default chunk size.
pub fn find_chunk_boundaries(content: &[u8]) -> Vec<usize> {
    find_chunk_boundaries_with(content, CHUNK_SIZE)
}

/// Split `content` into chunks of roughly `chunk_size` bytes.
///
/// A boundary only ever sits right before a `<Record` start tag, so a record
/// and its nested `MetadataEntry` elements stay in one chunk.
pub fn find_chunk_boundaries_with(content: &[u8], chunk_size: usize) -> Vec<usize> {
    let mut boundaries = vec![0];
    let mut pos = 0;
    let content_len = content.len();

    while pos + chunk_size.max(1) < content_len {
        match find_record_start(content, pos + chunk_size.max(1)) {
            Some(next) => {
                boundaries.push(next);
                pos = next;
            }
            None => break,
        }
    }
    if boundaries.last() != Some(&content_len) {
        boundaries.push(content_len);
    }
    boundaries
}

fn find_record_start(content: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    while pos < content.len() {
        let offset = content[pos..].iter().position(|&b| b == b'<')?;
        pos += offset;
        let rest = &content[pos..];
        if rest.starts_with(RECORD_TAG)
            && rest
                .get(RECORD_TAG.len())
                .is_some_and(|b| b.is_ascii_whitespace() || *b == b'/' || *b == b'>')
        {
            return Some(pos);
        }
        pos += 1;
    }
    None
}

/// Parse the `<Record>` elements of one chunk.
///
/// End-tag checking is relaxed because a chunk may close elements that were
/// opened in the previous one (a `Correlation` around nested records).
pub fn process_chunk_slice<T>(
    chunk: &[u8],
    convert: &dyn Fn(HealthRecord) -> Option<T>,
) -> Result<Vec<T>> {
    let mut results = Vec::new();
    let mut reader = Reader::from_reader(chunk);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut buf = Vec::new();
    let mut current: Option<HealthRecord> = None;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if e.name() == QName(b"Record") {
                    current = Some(HealthRecord::from_xml(e)?);
                }
            }
            Ok(Event::Empty(ref e)) => match e.name() {
                QName(b"Record") => {
                    if let Some(item) = convert(HealthRecord::from_xml(e)?) {
                        results.push(item);
                    }
                }
                QName(b"MetadataEntry") => {
                    if let Some(record) = current.as_mut() {
                        record.push_metadata(e)?;
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => {
                if e.name() == QName(b"Record") {
                    if let Some(item) = current.take().and_then(convert) {
                        results.push(item);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(AppError::XmlParseError(format!(
                    "error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(results)
}

/// Parse pre-split chunks in parallel and send converted items.
/// Returns the number of items sent.
pub fn process_chunks<T>(
    data: &[u8],
    sender: &channel::Sender<T>,
    convert: Converter<T>,
) -> Result<usize>
where
    T: Send + 'static,
{
    let boundaries = find_chunk_boundaries(data);
    let sent = Arc::new(AtomicUsize::new(0));
    debug!("Parsing {} chunks", boundaries.len().saturating_sub(1));
    boundaries
        .windows(2)
        .collect::<Vec<_>>()
        .par_iter()
        .try_for_each_with(
            (sender.clone(), Arc::clone(&sent), Arc::clone(&convert)),
            |(s, count, convert), window| -> Result<()> {
                let chunk = &data[window[0]..window[1]];
                let items = process_chunk_slice(chunk, &**convert)?;
                count.fetch_add(items.len(), Ordering::Relaxed);
                for item in items {
                    s.send(item)
                        .map_err(|_| AppError::ThreadError("record channel closed".to_string()))?;
                }
                Ok(())
            },
        )?;
    Ok(sent.load(Ordering::Relaxed))
}

/// Process XML file using memory-mapped I/O
pub fn process_xml_file_mmap<T>(
    input_path: &Path,
    sender: &channel::Sender<T>,
    convert: Converter<T>,
) -> Result<usize>
where
    T: Send + 'static,
{
    let file = File::open(input_path)
        .map_err(|e| AppError::InputFileError(format!("{}: {}", input_path.display(), e)))?;
    if file.metadata()?.len() == 0 {
        return Err(AppError::InputFileError(format!(
            "{} is empty",
            input_path.display()
        )));
    }
    // The export is only read, and nothing else writes it while we run.
    let mmap = unsafe { Mmap::map(&file)? };
    let sent = process_chunks(&mmap[..], sender, convert)?;
    log::info!("Mmap records extracted: {}", sent);
    Ok(sent)
}

/// Process chunks from memory (for ZIP files)
pub fn process_memory_chunks<T>(
    content: &[u8],
    sender: &channel::Sender<T>,
    convert: Converter<T>,
) -> Result<usize>
where
    T: Send + 'static,
{
    let sent = process_chunks(content, sender, convert)?;
    log::info!("Memory records extracted: {}", sent);
    Ok(sent)
}

/// Extract `export.xml` from an Apple Health ZIP archive.
pub fn extract_xml_from_zip(input_path: &Path) -> Result<Vec<u8>> {
    let file = File::open(input_path)
        .map_err(|e| AppError::InputFileError(format!("{}: {}", input_path.display(), e)))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let export_file_name = archive
        .file_names()
        .find(|name| Path::new(name).file_name().and_then(|n| n.to_str()) == Some("export.xml"))
        .map(|s| s.to_string());
    if let Some(name) = export_file_name {
        debug!("Reading '{}' from {}", name, input_path.display());
        let mut export_file = archive.by_name(&name)?;
        let mut content = Vec::with_capacity(export_file.size() as usize);
        export_file.read_to_end(&mut content)?;
        Ok(content)
    } else {
        Err(AppError::ParseError(
            "Could not find export.xml in the zip archive".to_string(),
        ))
    }
}
