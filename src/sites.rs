use std::{collections::HashSet, fs, path::Path};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::SiteError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub slug: String,
    pub url: String,
}

impl Site {
    pub fn new(slug: &str, url: &str) -> Self {
        Site {
            slug: slug.into(),
            url: url.into(),
        }
    }

    /// Slugs become file names, so anything that could escape the output
    /// directory is refused.
    pub fn validate(&self) -> Result<(), SiteError> {
        let slug = self.slug.as_str();
        if slug.is_empty()
            || slug.contains('/')
            || slug.contains('\\')
            || slug.contains("..")
            || slug.chars().any(|c| c.is_control())
        {
            return Err(SiteError::InvalidSlug(self.slug.clone()));
        }

        let url = Url::parse(&self.url).map_err(|e| SiteError::InvalidUrl {
            slug: self.slug.clone(),
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(SiteError::UnsupportedScheme {
                slug: self.slug.clone(),
                scheme: other.into(),
            }),
        }
    }
}

lazy_static! {
    pub static ref SITES: Vec<Site> = vec![
        Site::new("cali-lights", "https://cali-lights.vercel.app"),
        Site::new("milkmen-delivery", "https://milkmendelivery.vercel.app"),
        Site::new("meaning-full-power", "https://meaningfullpower.com"),
        Site::new("serenity-store", "https://serenity-store.vercel.app"),
        Site::new("learnnko", "https://learnnko.vercel.app"),
        Site::new("stabent", "https://www.stabent.com"),
        Site::new("cc-dashboard", "https://compass-dashboard.vercel.app"),
        Site::new("diomande-automation", "https://diomande-automation.vercel.app"),
        Site::new("qr-dynamic", "https://qr-dynamic.vercel.app"),
        Site::new("timeline-app", "https://timeline-app.vercel.app"),
        Site::new("session-threads-ui", "https://session-threads-ui.vercel.app"),
        Site::new("audio-engine", "https://audio-engine.vercel.app"),
        Site::new("pulse", "https://pulse-landing.vercel.app"),
        Site::new("linkit", "https://linkit.vercel.app"),
        Site::new("buffbarista-dance", "https://buffbarista-dance.vercel.app"),
        Site::new("nexus-portal", "https://nexus-portal.vercel.app"),
        Site::new("mfp-landing", "https://mfp-landing.vercel.app"),
        Site::new("mfp-storefront", "https://storefront-rosy-kappa.vercel.app"),
        Site::new("bwb", "https://pos-wine-theta.vercel.app"),
        Site::new("plaisir", "https://pplaisir.vercel.app"),
    ];
}

/// Reads a JSON array of `{"slug", "url"}` objects.
pub fn load_sites(path: &Path) -> Result<Vec<Site>, SiteError> {
    let raw = fs::read_to_string(path).map_err(|e| SiteError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let sites: Vec<Site> = serde_json::from_str(&raw).map_err(|e| SiteError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    check_sites(&sites)?;
    debug!("loaded {} sites from {:?}", sites.len(), path);
    Ok(sites)
}

/// Validates every entry. Duplicate slugs are allowed but the later capture
/// overwrites the earlier one, so they are logged.
pub fn check_sites(sites: &[Site]) -> Result<(), SiteError> {
    let mut seen = HashSet::new();
    for site in sites {
        site.validate()?;
        if !seen.insert(site.slug.as_str()) {
            warn!("duplicate slug {}, later capture will overwrite", site.slug);
        }
    }
    Ok(())
}

/// Narrows `sites` to the given slugs, keeping list order. An empty filter
/// keeps everything.
pub fn select_sites(sites: &[Site], only: &[String]) -> Result<Vec<Site>, SiteError> {
    if only.is_empty() {
        return Ok(sites.to_vec());
    }
    for slug in only {
        if !sites.iter().any(|s| &s.slug == slug) {
            return Err(SiteError::UnknownSlug(slug.clone()));
        }
    }
    Ok(sites
        .iter()
        .filter(|s| only.contains(&s.slug))
        .cloned()
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn embedded_sites_are_valid() {
        assert_eq!(SITES.len(), 20);
        check_sites(&SITES).unwrap();
        assert_eq!(SITES[0].slug, "cali-lights");
        assert_eq!(SITES[19].slug, "plaisir");
    }

    #[test]
    fn rejects_path_like_slugs() {
        for slug in ["", "../etc", "a/b", "a\\b"] {
            let s = Site::new(slug, "https://example.com");
            assert!(matches!(s.validate(), Err(SiteError::InvalidSlug(_))), "{}", slug);
        }
    }

    #[test]
    fn rejects_non_http_urls() {
        let s = Site::new("ftp", "ftp://example.com");
        assert!(matches!(
            s.validate(),
            Err(SiteError::UnsupportedScheme { .. })
        ));
        let s = Site::new("bad", "not a url");
        assert!(matches!(s.validate(), Err(SiteError::InvalidUrl { .. })));
    }

    #[test]
    fn loads_sites_from_json() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"[{{"slug": "a", "url": "https://a.example"}}, {{"slug": "b", "url": "http://b.example"}}]"#
        )
        .unwrap();
        let sites = load_sites(f.path()).unwrap();
        assert_eq!(
            sites,
            vec![
                Site::new("a", "https://a.example"),
                Site::new("b", "http://b.example")
            ]
        );
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{{not json").unwrap();
        assert!(matches!(load_sites(f.path()), Err(SiteError::Parse { .. })));
        assert!(matches!(
            load_sites(Path::new("/nonexistent/sites.json")),
            Err(SiteError::Read { .. })
        ));
    }

    #[test]
    fn select_keeps_list_order() {
        let only = vec!["pulse".to_string(), "cali-lights".to_string()];
        let picked = select_sites(&SITES, &only).unwrap();
        let slugs: Vec<&str> = picked.iter().map(|s| s.slug.as_str()).collect();
        assert_eq!(slugs, vec!["cali-lights", "pulse"]);

        assert_eq!(select_sites(&SITES, &[]).unwrap().len(), SITES.len());
        assert!(matches!(
            select_sites(&SITES, &["nope".to_string()]),
            Err(SiteError::UnknownSlug(_))
        ));
    }
}
