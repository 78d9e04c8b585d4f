use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub const SCREENSHOT_EXTENSION: &str = "png";
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);
// no new resource entries for this long counts as network idle
pub const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);
pub const NETWORK_IDLE_POLL: Duration = Duration::from_millis(100);
// chrome refuses to rasterize surfaces taller than this
pub const MAX_FULL_PAGE_HEIGHT: u32 = 16_384;

lazy_static! {
    pub static ref SCREENSHOTS_DIR: PathBuf = screenshots_dir_under(dirs::home_dir());
}

/// Default output directory below `home`, or below the working directory
/// when no home directory can be determined.
pub fn screenshots_dir_under(home: Option<PathBuf>) -> PathBuf {
    let home = match home {
        Some(h) => h,
        None => {
            warn!("no home directory found, writing screenshots relative to the working directory");
            PathBuf::from(".")
        }
    };
    home.join("diomande-automation")
        .join("public")
        .join("projects")
        .join("screenshots")
}

pub fn screenshot_path(dir: &Path, slug: &str) -> PathBuf {
    dir.join(format!("{}.{}", slug, SCREENSHOT_EXTENSION))
}

pub fn file_name(path: &Path) -> String {
    match path.file_name() {
        Some(n) => n.to_string_lossy().into_owned(),
        None => path.display().to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn screenshot_path_uses_slug() {
        let p = screenshot_path(Path::new("/tmp/shots"), "cali-lights");
        assert_eq!(p, PathBuf::from("/tmp/shots/cali-lights.png"));
        assert_eq!(file_name(&p), "cali-lights.png");
    }

    #[test]
    fn missing_home_falls_back_to_working_directory() {
        assert_eq!(
            screenshots_dir_under(None),
            PathBuf::from("./diomande-automation/public/projects/screenshots")
        );
        assert_eq!(
            screenshots_dir_under(Some(PathBuf::from("/home/ci"))),
            PathBuf::from("/home/ci/diomande-automation/public/projects/screenshots")
        );
    }

    #[test]
    fn default_dir_is_nested_under_projects() {
        assert!(SCREENSHOTS_DIR.ends_with("diomande-automation/public/projects/screenshots"));
    }
}
