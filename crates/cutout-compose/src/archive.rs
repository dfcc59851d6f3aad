//! Optional on-disk record of finished compositions.

use std::path::{Path, PathBuf};

use chrono::Utc;

/// Write `png` to `dir` as `post_<user>_<timestamp>.png` and return the path.
pub fn save_output(dir: &Path, user_id: &str, png: &[u8]) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let stamp = Utc::now().format("%Y%m%d%H%M%S%6f");
    let path = dir.join(format!("post_{}_{stamp}.png", sanitize(user_id)));
    std::fs::write(&path, png)?;
    Ok(path)
}

fn sanitize(user_id: &str) -> String {
    user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_file_under_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("output");

        let path = save_output(&out, "42", b"png-bytes").expect("save");

        assert!(path.starts_with(&out));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("post_42_"));
        assert!(name.ends_with(".png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");
    }

    #[test]
    fn user_id_cannot_escape_dir() {
        assert_eq!(sanitize("../../etc"), "______etc");
        assert_eq!(sanitize("-100123"), "-100123");
    }
}
