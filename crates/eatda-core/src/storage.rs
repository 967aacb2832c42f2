//! Local files: `.part` temp paths, the prefetch cache layout, and the album
//! directory that stands in for the device gallery.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::fetch::MediaStore;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Image extensions recognised in asset URLs.
const KNOWN_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Path for the temp file: appends `.part` to the final path (e.g. `a.png` → `a.png.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Image extension of the URL's path, lowercased; `png` when absent or unrecognised.
/// The query string (signed URL parameters) is ignored.
pub fn extension_from_url(raw: &str) -> &'static str {
    let path = match url::Url::parse(raw) {
        Ok(u) => u.path().to_string(),
        Err(_) => raw.split(['?', '#']).next().unwrap_or("").to_string(),
    };
    Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(known_extension)
        .unwrap_or("png")
}

fn known_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.to_ascii_lowercase();
    KNOWN_EXTENSIONS.iter().copied().find(|k| *k == ext)
}

/// Image extension named by a `Content-Disposition` value
/// (`attachment; filename="event_5.webp"`), if it is one we recognise.
pub fn extension_from_disposition(header_value: &str) -> Option<&'static str> {
    header_value.split(';').find_map(|param| {
        let (name, value) = param.trim().split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let filename = value.trim().trim_matches('"');
        let ext = Path::new(filename).extension()?.to_str()?;
        known_extension(ext)
    })
}

/// Cache file for a prefetched event poster: `<dir>/event-poster-<id>.<ext>`.
pub fn cache_path(cache_dir: &Path, resource_id: i64, url: &str) -> PathBuf {
    cache_dir.join(format!(
        "event-poster-{}.{}",
        resource_id,
        extension_from_url(url)
    ))
}

/// Existing cache file for `resource_id` under any recognised extension.
pub fn find_cached(cache_dir: &Path, resource_id: i64) -> Option<PathBuf> {
    KNOWN_EXTENSIONS
        .iter()
        .map(|ext| cache_dir.join(format!("event-poster-{resource_id}.{ext}")))
        .find(|p| p.is_file())
}

/// Album directory importer. Every import adds a new file; importing the
/// same bytes twice yields two entries.
#[derive(Debug, Clone)]
pub struct AlbumStore {
    dir: PathBuf,
}

impl AlbumStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Album names for `source`: `name.ext`, `name-1.ext`, `name-2.ext`, ...
    fn candidate_names(source: &Path) -> impl Iterator<Item = String> {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("asset")
            .to_string();
        let ext = source.extension().and_then(|e| e.to_str()).map(str::to_string);
        (0u32..).map(move |n| {
            let base = if n == 0 {
                stem.clone()
            } else {
                format!("{stem}-{n}")
            };
            match &ext {
                Some(e) => format!("{base}.{e}"),
                None => base,
            }
        })
    }
}

/// Copy `source` into a temp file inside `dir`, then link it under the first
/// free candidate name. `persist_noclobber` never replaces an existing entry.
fn import_blocking(dir: &Path, source: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let mut reader = std::fs::File::open(source)?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".import-")
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)?;
    std::io::copy(&mut reader, tmp.as_file_mut())?;
    #[cfg(unix)]
    {
        // Temp files are created 0600.
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }
    tmp.as_file().sync_all()?;

    for name in AlbumStore::candidate_names(source) {
        let candidate = dir.join(name);
        match tmp.persist_noclobber(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => tmp = e.file,
            Err(e) => return Err(e.error),
        }
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        "no free album name",
    ))
}

#[async_trait]
impl MediaStore for AlbumStore {
    async fn import(&self, local: &Path) -> std::io::Result<PathBuf> {
        let dir = self.dir.clone();
        let source = local.to_path_buf();
        let final_path = tokio::task::spawn_blocking(move || import_blocking(&dir, &source))
            .await
            .map_err(std::io::Error::other)??;
        tracing::info!(
            "imported {} into album as {}",
            local.display(),
            final_path.display()
        );
        Ok(final_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("poster.webp"));
        assert_eq!(p.to_string_lossy(), "poster.webp.part");
    }

    #[test]
    fn extension_ignores_query_and_case() {
        assert_eq!(
            extension_from_url("https://cdn.example.com/a/b/poster.JPG?X-Amz-Signature=abc"),
            "jpg"
        );
        assert_eq!(extension_from_url("https://cdn.example.com/p.webp"), "webp");
        assert_eq!(extension_from_url("https://cdn.example.com/p.gif"), "png");
        assert_eq!(extension_from_url("https://cdn.example.com/download"), "png");
        assert_eq!(extension_from_url("relative/p.jpeg?x=1"), "jpeg");
    }

    #[test]
    fn disposition_extension() {
        assert_eq!(
            extension_from_disposition("attachment; filename=\"event_5.webp\""),
            Some("webp")
        );
        assert_eq!(extension_from_disposition("inline; filename=a.PNG"), Some("png"));
        assert_eq!(extension_from_disposition("attachment; filename=\"a.exe\""), None);
        assert_eq!(extension_from_disposition("attachment"), None);
    }

    #[test]
    fn cache_path_layout() {
        let p = cache_path(Path::new("/tmp/c"), 42, "https://x/y/z.webp?sig=1");
        assert_eq!(p, Path::new("/tmp/c/event-poster-42.webp"));
    }

    #[test]
    fn find_cached_checks_every_extension() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_cached(dir.path(), 3).is_none());
        std::fs::write(dir.path().join("event-poster-3.jpeg"), b"x").unwrap();
        assert_eq!(
            find_cached(dir.path(), 3),
            Some(dir.path().join("event-poster-3.jpeg"))
        );
        assert!(find_cached(dir.path(), 30).is_none());
    }

    #[tokio::test]
    async fn import_twice_creates_two_entries() {
        let src_dir = tempfile::tempdir().unwrap();
        let album_dir = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("event-poster-7.png");
        std::fs::write(&src, b"png-bytes").unwrap();

        let store = AlbumStore::new(album_dir.path().join("album"));
        let first = store.import(&src).await.unwrap();
        let second = store.import(&src).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(first.file_name().unwrap(), "event-poster-7.png");
        assert_eq!(second.file_name().unwrap(), "event-poster-7-1.png");
        assert_eq!(std::fs::read(&second).unwrap(), b"png-bytes");
        assert_eq!(std::fs::read_dir(store.dir()).unwrap().count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_imports_each_get_an_entry() {
        let src_dir = tempfile::tempdir().unwrap();
        let album_dir = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("event-poster-9.webp");
        std::fs::write(&src, b"webp-bytes").unwrap();
        let store = std::sync::Arc::new(AlbumStore::new(album_dir.path().join("album")));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let store = std::sync::Arc::clone(&store);
            let src = src.clone();
            tasks.push(tokio::spawn(async move { store.import(&src).await }));
        }
        let mut paths = std::collections::HashSet::new();
        for t in tasks {
            let path = t.await.unwrap().unwrap();
            assert_eq!(std::fs::read(&path).unwrap(), b"webp-bytes");
            paths.insert(path);
        }

        assert_eq!(paths.len(), 8);
        assert_eq!(std::fs::read_dir(store.dir()).unwrap().count(), 8);
    }

    #[tokio::test]
    async fn import_missing_source_fails_without_leftovers() {
        let album_dir = tempfile::tempdir().unwrap();
        let store = AlbumStore::new(album_dir.path());
        let err = store
            .import(Path::new("/nonexistent/definitely-missing.png"))
            .await;
        assert!(err.is_err());
        let leftovers: Vec<_> = std::fs::read_dir(album_dir.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }
}
