//! Upload rejection reasons and their transport status codes

use core::fmt;

use strata_jpeg::PreflightError;

/// Request parameter problems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParamError {
    /// `strip_index` outside `[0, strip_count)`
    StripIndex { index: u16, count: u16 },
    /// Zero image size, or larger than the panel
    Dimensions { width: u16, height: u16 },
    /// Declared length of zero
    EmptyUpload,
}

/// Why an upload was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UploadError {
    /// Another upload is in progress or the previous one is not yet rendered
    Busy,
    /// Declared (or received) length exceeds the configured maximum
    TooLarge { declared: usize, max: usize },
    /// Not enough heap for the buffer plus decode headroom
    OutOfMemory { required: usize, available: usize },
    /// Buffer does not carry the JPEG signature
    InvalidFormat,
    /// JPEG header rejected before queueing
    Preflight(PreflightError),
    /// Upload finished with fewer bytes than declared
    Incomplete { expected: usize, received: usize },
    InvalidParameters(ParamError),
    /// Chunk for an upload that is no longer active
    NotInProgress,
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::Busy => StatusCode::Busy,
            UploadError::TooLarge { .. } => StatusCode::TooLarge,
            UploadError::OutOfMemory { .. } => StatusCode::OutOfMemory,
            UploadError::InvalidFormat => StatusCode::InvalidFormat,
            UploadError::Preflight(_) => StatusCode::PreflightRejected,
            UploadError::Incomplete { .. } => StatusCode::IncompleteUpload,
            UploadError::InvalidParameters(_) => StatusCode::InvalidParameters,
            UploadError::NotInProgress => StatusCode::NotInProgress,
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Busy => f.write_str("Another upload in progress"),
            UploadError::TooLarge { declared, max } => {
                write!(f, "Image too large ({} bytes, max {})", declared, max)
            }
            UploadError::OutOfMemory { required, available } => write!(
                f,
                "Insufficient memory ({} bytes needed, {} free)",
                required, available
            ),
            UploadError::InvalidFormat => f.write_str("Invalid JPEG format"),
            UploadError::Preflight(e) => write!(f, "{}", e),
            UploadError::Incomplete { expected, received } => write!(
                f,
                "Incomplete upload ({} of {} bytes)",
                received, expected
            ),
            UploadError::InvalidParameters(ParamError::StripIndex { index, count }) => {
                write!(f, "Invalid strip index {} of {}", index, count)
            }
            UploadError::InvalidParameters(ParamError::Dimensions { width, height }) => {
                write!(f, "Invalid image dimensions {}x{}", width, height)
            }
            UploadError::InvalidParameters(ParamError::EmptyUpload) => {
                f.write_str("No data received")
            }
            UploadError::NotInProgress => f.write_str("No upload in progress"),
        }
    }
}

/// Outcome code reported back to the uploading client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StatusCode {
    Accepted = 0,
    Busy = 1,
    TooLarge = 2,
    OutOfMemory = 3,
    InvalidFormat = 4,
    PreflightRejected = 5,
    IncompleteUpload = 6,
    InvalidParameters = 7,
    NotInProgress = 8,
}

impl StatusCode {
    /// Equivalent HTTP status for an HTTP transport
    pub fn http_status(self) -> u16 {
        match self {
            StatusCode::Accepted => 200,
            StatusCode::Busy | StatusCode::NotInProgress => 409,
            StatusCode::TooLarge
            | StatusCode::InvalidFormat
            | StatusCode::PreflightRejected
            | StatusCode::InvalidParameters => 400,
            StatusCode::OutOfMemory => 507,
            StatusCode::IncompleteUpload => 500,
        }
    }

    /// One-byte wire code
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(code: u8) -> Option<Self> {
        Some(match code {
            0 => StatusCode::Accepted,
            1 => StatusCode::Busy,
            2 => StatusCode::TooLarge,
            3 => StatusCode::OutOfMemory,
            4 => StatusCode::InvalidFormat,
            5 => StatusCode::PreflightRejected,
            6 => StatusCode::IncompleteUpload,
            7 => StatusCode::InvalidParameters,
            8 => StatusCode::NotInProgress,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_mapping() {
        assert_eq!(UploadError::Busy.status().http_status(), 409);
        assert_eq!(
            UploadError::OutOfMemory { required: 1, available: 0 }.status().http_status(),
            507
        );
        assert_eq!(
            UploadError::Incomplete { expected: 1000, received: 900 }.status().http_status(),
            500
        );
        assert_eq!(UploadError::InvalidFormat.status().http_status(), 400);
        assert_eq!(StatusCode::Accepted.http_status(), 200);
    }

    #[test]
    fn test_wire_codes_round_trip() {
        for code in 0..=8u8 {
            assert_eq!(StatusCode::from_u8(code).map(StatusCode::as_u8), Some(code));
        }
        assert_eq!(StatusCode::from_u8(9), None);
    }

    #[test]
    fn test_messages() {
        let e = UploadError::InvalidParameters(ParamError::StripIndex { index: 5, count: 3 });
        assert_eq!(std::format!("{}", e), "Invalid strip index 5 of 3");
        let e = UploadError::Incomplete { expected: 1000, received: 900 };
        assert_eq!(std::format!("{}", e), "Incomplete upload (900 of 1000 bytes)");
    }
}
