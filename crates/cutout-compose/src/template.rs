//! Template store: the background canvases products are pasted onto.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use tracing::debug;

use crate::error::{ComposeError, Result};

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// A decoded template. Each load yields an independent copy, so pasting onto
/// one never affects another request.
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub image: RgbaImage,
}

impl Template {
    pub fn new(name: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            name: name.into(),
            image,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

pub trait TemplateStore: Send + Sync {
    /// Template names in a stable order; the 1-based position is what users
    /// reply with.
    fn list(&self) -> Result<Vec<String>>;

    fn load(&self, name: &str) -> Result<Template>;
}

/// Templates read from image files in a single directory.
pub struct DirTemplateStore {
    dir: PathBuf,
}

impl DirTemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TemplateStore for DirTemplateStore {
    fn list(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            ComposeError::Template(format!("cannot read {}: {e}", self.dir.display()))
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| has_template_extension(name))
            .collect();
        names.sort();
        Ok(names)
    }

    fn load(&self, name: &str) -> Result<Template> {
        if !is_plain_name(name) || !has_template_extension(name) {
            return Err(ComposeError::TemplateNotFound {
                name: name.to_string(),
            });
        }

        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(ComposeError::TemplateNotFound {
                name: name.to_string(),
            });
        }

        let image = image::open(&path)
            .map_err(|e| ComposeError::Template(format!("{name}: {e}")))?
            .into_rgba8();
        debug!(template = name, width = image.width(), height = image.height(), "template loaded");

        Ok(Template::new(name, image))
    }
}

fn has_template_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// A bare file name; nothing that could escape the template directory.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn write_png(dir: &Path, name: &str, w: u32, h: u32) {
        RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255]))
            .save_with_format(dir.join(name), image::ImageFormat::Png)
            .expect("save png");
    }

    #[test]
    fn lists_images_sorted_and_filtered() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_png(dir.path(), "b_sale.png", 4, 4);
        write_png(dir.path(), "a_promo.PNG", 4, 4);
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let store = DirTemplateStore::new(dir.path());
        assert_eq!(store.list().unwrap(), vec!["a_promo.PNG", "b_sale.png"]);
        // the order is stable across calls
        assert_eq!(store.list().unwrap(), store.list().unwrap());
    }

    #[test]
    fn missing_directory_is_template_error() {
        let store = DirTemplateStore::new("/nonexistent/templates");
        assert!(matches!(store.list(), Err(ComposeError::Template(_))));
    }

    #[test]
    fn load_reads_dimensions() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_png(dir.path(), "wide.png", 64, 32);

        let store = DirTemplateStore::new(dir.path());
        let t = store.load("wide.png").expect("load");
        assert_eq!(t.name, "wide.png");
        assert_eq!((t.width(), t.height()), (64, 32));
    }

    #[test]
    fn load_twice_gives_independent_copies() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_png(dir.path(), "t.png", 8, 8);

        let store = DirTemplateStore::new(dir.path());
        let mut first = store.load("t.png").unwrap();
        first.image.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        let second = store.load("t.png").unwrap();
        assert_eq!(*second.image.get_pixel(0, 0), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn unknown_or_escaping_names_are_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DirTemplateStore::new(dir.path());

        for name in ["gone.png", "../secret.png", "", "t.gif"] {
            assert!(
                matches!(store.load(name), Err(ComposeError::TemplateNotFound { .. })),
                "{name:?} should be not found"
            );
        }
    }

    #[test]
    fn corrupt_template_is_template_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("broken.png"), b"not a png").unwrap();
        let store = DirTemplateStore::new(dir.path());
        assert!(matches!(store.load("broken.png"), Err(ComposeError::Template(_))));
    }
}
