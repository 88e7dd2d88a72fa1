//! `data:` URI encoding of optimized output.

use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use thiserror::Error;

const PREFIX: &str = "data:image/svg+xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataUriMode {
    /// `data:image/svg+xml;base64,...`
    Base64,
    /// `data:image/svg+xml,` followed by percent-encoded markup
    Enc,
    /// `data:image/svg+xml,` followed by the raw markup
    Unenc,
}

impl FromStr for DataUriMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base64" => Ok(Self::Base64),
            "enc" => Ok(Self::Enc),
            "unenc" => Ok(Self::Unenc),
            other => Err(format!("unknown data URI mode `{other}` (expected base64, enc or unenc)")),
        }
    }
}

#[derive(Debug, Error)]
pub enum DataUriError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub fn encode_data_uri(svg: &str, mode: DataUriMode) -> String {
    match mode {
        DataUriMode::Base64 => format!("{PREFIX};base64,{}", STANDARD.encode(svg)),
        DataUriMode::Enc => format!("{PREFIX},{}", urlencoding::encode(svg)),
        DataUriMode::Unenc => format!("{PREFIX},{svg}"),
    }
}

/// Extract the markup from an SVG data URI. Input that is not one is
/// returned unchanged.
pub fn decode_data_uri(input: &str) -> Result<String, DataUriError> {
    let Some(rest) = input.trim().strip_prefix(PREFIX) else {
        return Ok(input.to_string());
    };
    let Some((meta, data)) = rest.split_once(',') else {
        return Ok(input.to_string());
    };

    // meta is `[;charset=...][;base64]`
    let mut base64 = false;
    for part in meta.split(';').filter(|p| !p.is_empty()) {
        match part {
            "base64" => base64 = true,
            p if p.starts_with("charset=") && !base64 => {}
            _ => return Ok(input.to_string()),
        }
    }

    if base64 {
        let bytes = STANDARD.decode(data.trim())?;
        return Ok(String::from_utf8(bytes)?);
    }
    if data.starts_with('%') {
        return Ok(urlencoding::decode(data)?.into_owned());
    }
    Ok(data.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><path d="M0 0h1"/></svg>"#;

    #[test]
    fn test_encode_modes() {
        assert!(encode_data_uri(SVG, DataUriMode::Base64).starts_with("data:image/svg+xml;base64,PHN2Zy"));
        assert!(encode_data_uri(SVG, DataUriMode::Enc).starts_with("data:image/svg+xml,%3Csvg%20xmlns%3D"));
        assert_eq!(
            encode_data_uri("<svg/>", DataUriMode::Unenc),
            "data:image/svg+xml,<svg/>"
        );
    }

    #[test]
    fn test_decode_inverts_encode() {
        for mode in [DataUriMode::Base64, DataUriMode::Enc, DataUriMode::Unenc] {
            let uri = encode_data_uri(SVG, mode);
            assert_eq!(decode_data_uri(&uri).unwrap(), SVG, "{mode:?}");
        }
    }

    #[test]
    fn test_decode_with_charset() {
        let uri = "data:image/svg+xml;charset=utf-8;base64,PHN2Zy8+";
        assert_eq!(decode_data_uri(uri).unwrap(), "<svg/>");
    }

    #[test]
    fn test_decode_passthrough_and_errors() {
        assert_eq!(decode_data_uri("<svg/>").unwrap(), "<svg/>");
        // markup embedding a data URI is not itself one
        let embedded = r#"<svg><image href="data:image/svg+xml,<svg/>"/></svg>"#;
        assert_eq!(decode_data_uri(embedded).unwrap(), embedded);
        assert!(decode_data_uri("data:image/svg+xml;base64,!!!").is_err());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("enc".parse::<DataUriMode>(), Ok(DataUriMode::Enc));
        assert!("gzip".parse::<DataUriMode>().is_err());
    }
}
