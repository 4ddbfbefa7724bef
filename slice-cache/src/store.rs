use crate::address::SliceAddress;
use log::debug;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncWriteExt};

const UNCONFIRMED_SUFFIX: &str = "unconfirmed";

/// On-disk slice store rooted at a cache directory.
///
/// Entries are committed atomically: the payload streams into a
/// random-suffixed `.unconfirmed` sibling which is renamed into place only
/// after a complete write. Readers therefore never observe a partial entry,
/// and racing publishes of the same (byte-identical) slice are benign since
/// either rename wins.
#[derive(Debug, Clone)]
pub struct SliceCache {
    root: PathBuf,
}

impl SliceCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the committed entry for `address`.
    pub fn entry_path(&self, address: &SliceAddress) -> PathBuf {
        self.root.join(address.relative_path())
    }

    /// Non-blocking probe for a committed entry.
    pub fn has(&self, address: &SliceAddress) -> bool {
        self.entry_path(address).is_file()
    }

    /// Open a committed entry for sequential reading.
    pub async fn open_for_read(&self, address: &SliceAddress) -> io::Result<File> {
        File::open(self.entry_path(address)).await
    }

    /// Stream `payload` into the entry for `address`, committing by rename.
    ///
    /// On a write error, or if the calling task is cancelled mid-stream,
    /// the temp file is removed and no entry appears.
    pub async fn publish<R>(&self, address: &SliceAddress, payload: &mut R) -> io::Result<PathBuf>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let final_path = self.entry_path(address);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let guard = TempFileGuard::new(PathBuf::from(format!(
            "{}.{:016x}.{}",
            final_path.display(),
            rand::random::<u64>(),
            UNCONFIRMED_SUFFIX
        )));
        let mut file = File::create(guard.path()).await?;
        tokio::io::copy(payload, &mut file).await?;
        file.flush().await?;
        drop(file);
        fs::rename(guard.path(), &final_path).await?;
        guard.disarm();
        debug!("committed slice {} -> {}", address, final_path.display());
        Ok(final_path)
    }

    /// Drop a committed entry, e.g. after a corrupt read. Missing entries
    /// are fine.
    pub async fn remove(&self, address: &SliceAddress) -> io::Result<()> {
        match fs::remove_file(self.entry_path(address)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Remove the cache root and everything below it.
    pub async fn clear(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// Removes the unconfirmed temp file unless the rename committed it.
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::time::parse_utc_instant;
    use tokio::io::AsyncReadExt;

    fn address() -> SliceAddress {
        SliceAddress::new(
            "bitmex",
            parse_utc_instant("2019-06-01T00:00:00Z").unwrap(),
            &[],
        )
    }

    #[tokio::test]
    async fn publish_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SliceCache::new(dir.path());
        let address = address();
        assert!(!cache.has(&address));

        let payload = b"2019-06-01T00:00:01.000000Z {\"a\":1}\n";
        cache.publish(&address, &mut &payload[..]).await.unwrap();
        assert!(cache.has(&address));

        let mut contents = Vec::new();
        cache
            .open_for_read(&address)
            .await
            .unwrap()
            .read_to_end(&mut contents)
            .await
            .unwrap();
        assert_eq!(contents, payload);
    }

    #[tokio::test]
    async fn publish_leaves_no_unconfirmed_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SliceCache::new(dir.path());
        let address = address();
        cache.publish(&address, &mut &b"x y\n"[..]).await.unwrap();

        let entry_dir = cache.entry_path(&address);
        let mut entries = std::fs::read_dir(entry_dir.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        entries.sort();
        assert_eq!(entries.len(), 1, "unexpected files: {entries:?}");
        assert!(!entries[0].ends_with(UNCONFIRMED_SUFFIX));
    }

    struct FailingReader {
        remaining: usize,
    }

    impl tokio::io::AsyncRead for FailingReader {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            if self.remaining == 0 {
                return std::task::Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "body interrupted",
                )));
            }
            buf.put_slice(b"x");
            self.remaining -= 1;
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn failed_publish_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SliceCache::new(dir.path());
        let address = address();

        let mut payload = FailingReader { remaining: 16 };
        let err = cache.publish(&address, &mut payload).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert!(!cache.has(&address));

        let entry_dir = cache.entry_path(&address);
        let leftovers = std::fs::read_dir(entry_dir.parent().unwrap())
            .unwrap()
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn racing_publishes_of_identical_payload_both_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SliceCache::new(dir.path());
        let address = address();
        let payload = b"2019-06-01T00:00:01.000000Z {\"a\":1}\n";

        let mut reader_a = &payload[..];
        let mut reader_b = &payload[..];
        let (a, b) = tokio::join!(
            cache.publish(&address, &mut reader_a),
            cache.publish(&address, &mut reader_b),
        );
        a.unwrap();
        b.unwrap();
        assert!(cache.has(&address));
    }

    #[tokio::test]
    async fn open_for_read_misses_with_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SliceCache::new(dir.path());
        let err = cache.open_for_read(&address()).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SliceCache::new(dir.path());
        let address = address();
        cache.remove(&address).await.unwrap();
        cache.publish(&address, &mut &b"x y\n"[..]).await.unwrap();
        cache.remove(&address).await.unwrap();
        assert!(!cache.has(&address));
        cache.remove(&address).await.unwrap();
    }

    #[tokio::test]
    async fn clear_removes_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");
        let cache = SliceCache::new(&root);
        cache.publish(&address(), &mut &b"x y\n"[..]).await.unwrap();
        assert!(root.exists());
        cache.clear().await.unwrap();
        assert!(!root.exists());
        // clearing an absent root is fine too
        cache.clear().await.unwrap();
    }
}
