use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;

use crate::sites::Site;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("could not open page: {0}")]
    OpenPage(String),
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("timed out after {timeout:?} waiting for network idle on {url}")]
    Timeout { url: String, timeout: Duration },
    #[error("screenshot could not be captured: {0}")]
    Screenshot(String),
    #[error("could not save screenshot to {path:?}: {reason}")]
    Write { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("invalid slug {0:?}")]
    InvalidSlug(String),
    #[error("url {url} for {slug} is invalid: {reason}")]
    InvalidUrl {
        slug: String,
        url: String,
        reason: String,
    },
    #[error("url for {slug} must be http or https, got {scheme}")]
    UnsupportedScheme { slug: String, scheme: String },
    #[error("unknown slug {0}")]
    UnknownSlug(String),
    #[error("could not read sites file {path:?}: {reason}")]
    Read { path: PathBuf, reason: String },
    #[error("could not parse sites file {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

#[derive(Debug)]
pub struct CaptureOutcome {
    pub site: Site,
    pub result: Result<PathBuf, CaptureError>,
}

impl CaptureOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<CaptureOutcome>,
}

impl BatchReport {
    pub fn captured(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed(&self) -> impl Iterator<Item = &CaptureOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            width: 1280,
            height: 800,
        }
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Viewport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(|c: char| c == 'x' || c == 'X')
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {}", s))?;
        let width: u32 = w.trim().parse().map_err(|e| format!("bad width {}: {}", w, e))?;
        let height: u32 = h.trim().parse().map_err(|e| format!("bad height {}: {}", h, e))?;
        if width == 0 || height == 0 {
            return Err(format!("viewport must be non-zero, got {}", s));
        }
        Ok(Viewport { width, height })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_viewport() {
        assert_eq!(
            "1920x1080".parse::<Viewport>().unwrap(),
            Viewport {
                width: 1920,
                height: 1080
            }
        );
        assert_eq!("1280X800".parse::<Viewport>().unwrap(), Viewport::default());
        assert!("1280".parse::<Viewport>().is_err());
        assert!("0x800".parse::<Viewport>().is_err());
        assert!("axb".parse::<Viewport>().is_err());
    }

    #[test]
    fn report_counts() {
        let site = Site::new("a", "https://a.example");
        let report = BatchReport {
            outcomes: vec![
                CaptureOutcome {
                    site: site.clone(),
                    result: Ok(PathBuf::from("a.png")),
                },
                CaptureOutcome {
                    site,
                    result: Err(CaptureError::Screenshot("boom".into())),
                },
            ],
        };
        assert_eq!(report.captured(), 1);
        assert_eq!(report.total(), 2);
        assert_eq!(report.failed().count(), 1);
    }

    #[test]
    fn timeout_message_names_url() {
        let e = CaptureError::Timeout {
            url: "https://slow.example".into(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(
            e.to_string(),
            "timed out after 30s waiting for network idle on https://slow.example"
        );
    }
}
