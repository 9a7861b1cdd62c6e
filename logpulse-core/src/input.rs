use crate::error::AnalysisError;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

/// How much decoded text the binary check looks at.
const BINARY_SAMPLE_CHARS: usize = 8 * 1024;

/// Share of suspicious control characters above which input is rejected.
const BINARY_CONTROL_RATIO: f64 = 0.10;

pub fn read_log_file(file_path: impl AsRef<Path>) -> Result<String, AnalysisError> {
    let file_path = file_path.as_ref();
    info!("Reading log file: {}", file_path.display());

    let data = match fs::read(file_path) {
        Ok(data) => {
            debug!("Read {} bytes from file {}", data.len(), file_path.display());
            data
        }
        Err(e) => {
            error!("Failed to read file {}: {}", file_path.display(), e);
            return Err(e.into());
        }
    };

    decode_log_bytes(&data)
}

/// Decode raw file bytes into text, rejecting data that is clearly not a log.
pub fn decode_log_bytes(data: &[u8]) -> Result<String, AnalysisError> {
    let encoding = detect_encoding(data);
    debug!("Detected encoding {}", encoding.name());

    if encoding == UTF_8 || encoding == WINDOWS_1252 {
        let sample = &data[..data.len().min(BINARY_SAMPLE_CHARS)];
        let nul_bytes = sample.iter().filter(|&&b| b == 0).count();
        if nul_bytes > 0 {
            error!("Input contains {} NUL bytes, refusing to parse", nul_bytes);
            return Err(AnalysisError::BinaryInput {
                offending: nul_bytes,
                sampled: sample.len(),
            });
        }
    }

    let (text, _, had_errors) = encoding.decode(data);
    if had_errors {
        debug!("Replaced undecodable sequences while decoding as {}", encoding.name());
    }

    let text = text.into_owned();
    ensure_text(&text)?;
    Ok(text)
}

/// Reject decoded text dominated by control characters.
pub fn ensure_text(text: &str) -> Result<(), AnalysisError> {
    let mut sampled = 0;
    let mut offending = 0;

    for c in text.chars().take(BINARY_SAMPLE_CHARS) {
        sampled += 1;
        if is_suspicious_control(c) {
            offending += 1;
        }
    }

    if sampled == 0 {
        return Ok(());
    }

    let has_nul = text.chars().take(BINARY_SAMPLE_CHARS).any(|c| c == '\0');
    if has_nul || offending as f64 / sampled as f64 > BINARY_CONTROL_RATIO {
        return Err(AnalysisError::BinaryInput { offending, sampled });
    }

    Ok(())
}

fn is_suspicious_control(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r' | '\x0c' | '\x1b')
}

fn detect_encoding(data: &[u8]) -> &'static Encoding {
    if let Some((encoding, _bom_len)) = Encoding::for_bom(data) {
        return encoding;
    }

    if let Some(encoding) = detect_utf16_pattern(data) {
        return encoding;
    }

    if std::str::from_utf8(data).is_ok() {
        UTF_8
    } else {
        // Windows-1252 is a superset of ISO-8859-1 and never fails to decode
        WINDOWS_1252
    }
}

/// BOM-less UTF-16: ASCII text leaves every other byte zero.
fn detect_utf16_pattern(data: &[u8]) -> Option<&'static Encoding> {
    let sample = &data[..data.len().min(1024)];
    let pairs = sample.len() / 2;
    if pairs < 4 {
        return None;
    }

    let even_zeros = sample.iter().step_by(2).filter(|&&b| b == 0).count();
    let odd_zeros = sample.iter().skip(1).step_by(2).filter(|&&b| b == 0).count();

    let threshold = pairs * 9 / 10;
    if odd_zeros >= threshold && even_zeros == 0 {
        Some(UTF_16LE)
    } else if even_zeros >= threshold && odd_zeros == 0 {
        Some(UTF_16BE)
    } else {
        None
    }
}
