use crate::record::{FindingRecord, ScanField};
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use std::fs;
use std::path::{Path, PathBuf};

const MAX_VALUE_LEN: usize = 32_000;
const TRIM_MARKER: &str = " [Trimmed due to length]";

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("could not read file \"{path}\": {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("XML parsing error in \"{path}\": {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },
}

impl ExtractError {
    /// True when the file vanished between discovery and read. Such files are
    /// skipped with a warning instead of aborting the run.
    pub fn is_missing_file(&self) -> bool {
        matches!(
            self,
            ExtractError::Read { source, .. }
                if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

/// Normalizes one raw field value from a report. An absent value maps to the
/// literal string `empty`; oversized values are truncated with a marker.
pub fn clean(raw: Option<&str>) -> String {
    match raw {
        None => "empty".to_string(),
        Some(raw) => {
            let cleaned = raw.replace('\n', " ");
            let cleaned = cleaned.trim_matches(' ');
            // The limit counts characters, not bytes; a byte cut could land
            // inside a multi-byte character.
            match cleaned.char_indices().nth(MAX_VALUE_LEN) {
                Some((cut, _)) => {
                    let mut truncated = cleaned[..cut].to_string();
                    truncated.push_str(TRIM_MARKER);
                    truncated
                }
                None => cleaned.to_string(),
            }
        }
    }
}

/// Reads one `.nessus` file and flattens it into finding records.
pub fn extract_file(path: &Path) -> Result<Vec<FindingRecord>, ExtractError> {
    let content = fs::read(path).map_err(|source| ExtractError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    extract_report(&content).map_err(|source| ExtractError::Xml {
        path: path.to_path_buf(),
        source,
    })
}

/// Walks one parsed report document and produces its finding records.
///
/// Per `ReportHost` a fresh context is built from the `HostProperties` tags
/// whose `name` attribute is a mapped field. Every `ReportItem` starts from a
/// copy of that context, takes `port` and `pluginName` from its attributes and
/// overlays any child element whose tag is a mapped field (repeated tags keep
/// the last value). Items without a CVSS score are dropped.
pub fn extract_report(xml: &[u8]) -> Result<Vec<FindingRecord>, quick_xml::Error> {
    let mut reader = Reader::from_reader(xml);

    let mut buf = Vec::new();
    let mut findings = Vec::new();

    let mut host_context: Option<FindingRecord> = None;
    let mut current_item: Option<FindingRecord> = None;
    let mut in_host_properties = false;
    let mut pending_field: Option<ScanField> = None;
    let mut pending_text: Option<String> = None;
    // Element nesting below the current ReportItem; only depth-1 children are
    // mapped fields.
    let mut item_depth = 0usize;
    let mut pending_sealed = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) => match element.name() {
                QName(b"ReportHost") => {
                    host_context = Some(FindingRecord::default());
                }
                QName(b"HostProperties") => {
                    in_host_properties = host_context.is_some();
                }
                QName(b"tag") if in_host_properties => {
                    pending_field = tag_name_field(&element);
                    pending_text = None;
                }
                QName(b"ReportItem") => {
                    if let Some(context) = host_context.as_ref() {
                        let mut item = context.clone();
                        for attr in element.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"port" => {
                                    if let Ok(value) = attr.unescape_value() {
                                        item.set(ScanField::Port, value.into_owned());
                                    }
                                }
                                b"pluginName" => {
                                    if let Ok(value) = attr.unescape_value() {
                                        item.set(ScanField::PluginName, value.into_owned());
                                    }
                                }
                                _ => {}
                            }
                        }
                        current_item = Some(item);
                        item_depth = 0;
                    }
                }
                name if current_item.is_some() => {
                    item_depth += 1;
                    if item_depth == 1 {
                        pending_field =
                            ScanField::from_nessus_id(&String::from_utf8_lossy(name.as_ref()));
                        pending_text = None;
                        pending_sealed = false;
                    } else {
                        // Text after a nested child belongs to that child's
                        // tail, not to the field.
                        pending_sealed = true;
                    }
                }
                _ => {}
            },
            Event::Empty(element) => {
                // A self-closed element carries no text at all.
                if in_host_properties && element.name() == QName(b"tag") {
                    if let (Some(field), Some(context)) =
                        (tag_name_field(&element), host_context.as_mut())
                    {
                        context.set(field, clean(None));
                    }
                } else if let Some(item) = current_item.as_mut() {
                    if item_depth == 0 {
                        let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                        if let Some(field) = ScanField::from_nessus_id(&name) {
                            item.set(field, clean(None));
                        }
                    }
                }
            }
            Event::Text(text) => {
                if pending_field.is_some()
                    && (current_item.is_none() || (item_depth == 1 && !pending_sealed))
                {
                    let value = text.unescape()?;
                    pending_text.get_or_insert_with(String::new).push_str(&value);
                }
            }
            Event::CData(data) => {
                if pending_field.is_some()
                    && (current_item.is_none() || (item_depth == 1 && !pending_sealed))
                {
                    let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    pending_text.get_or_insert_with(String::new).push_str(&value);
                }
            }
            Event::End(element) => match element.name() {
                QName(b"tag") if in_host_properties => {
                    if let (Some(field), Some(context)) =
                        (pending_field.take(), host_context.as_mut())
                    {
                        context.set(field, clean(pending_text.take().as_deref()));
                    }
                    pending_text = None;
                }
                QName(b"HostProperties") => {
                    in_host_properties = false;
                }
                QName(b"ReportItem") => {
                    if let Some(item) = current_item.take() {
                        if !item.cvss_score.is_empty() {
                            findings.push(item);
                        }
                    }
                    pending_field = None;
                    pending_text = None;
                    item_depth = 0;
                }
                QName(b"ReportHost") => {
                    host_context = None;
                }
                name => {
                    if let Some(item) = current_item.as_mut() {
                        if item_depth == 1 {
                            if let Some(field) = pending_field {
                                if field.nessus_id().as_bytes() == name.as_ref() {
                                    item.set(field, clean(pending_text.take().as_deref()));
                                }
                            }
                            pending_field = None;
                            pending_text = None;
                        }
                        item_depth = item_depth.saturating_sub(1);
                    }
                }
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(findings)
}

fn tag_name_field(element: &quick_xml::events::BytesStart<'_>) -> Option<ScanField> {
    for attr in element.attributes().flatten() {
        if attr.key.as_ref() == b"name" {
            return ScanField::from_nessus_id(&String::from_utf8_lossy(&attr.value));
        }
    }
    None
}
