use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use escudos_types::{EventId, Grant, GrantId, UserId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::index::GrantIndex;
use crate::traits::GrantStore;

/// Flush/sync strategy for the grant log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every append (safest, highest latency).
    #[default]
    EveryWrite,
    /// Flush to the OS page cache only.
    OsDefault,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

struct FileState {
    index: GrantIndex,
    /// Unbuffered so a failed append leaves nothing queued for the next one.
    file: File,
    /// Byte length of the valid log prefix.
    offset: u64,
    /// Bytes of the next record to write before failing it.
    #[cfg(test)]
    fail_next_write_after: Option<usize>,
}

impl FileState {
    fn write_record(&mut self, record: &[u8], sync_mode: SyncMode) -> io::Result<()> {
        #[cfg(test)]
        if let Some(written) = self.fail_next_write_after.take() {
            self.file.write_all(&record[..written.min(record.len())])?;
            return Err(io::Error::new(io::ErrorKind::Other, "simulated write failure"));
        }

        self.file.write_all(record)?;
        if sync_mode == SyncMode::EveryWrite {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Cut the file back to the last fully appended record.
    fn rollback(&mut self) {
        let offset = self.offset;
        if let Err(e) = self.file.set_len(offset).and_then(|()| self.file.sync_data()) {
            warn!(offset, error = %e, "failed to roll back partial grant record");
        }
    }
}

/// Durable, append-only grant store backed by a single log file.
///
/// On-disk format, one record per grant:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized Grant)]
/// ```
///
/// The log is replayed into a [`GrantIndex`] on open. A torn trailing record
/// (left by a crash mid-append) is cut off; a record that fails its CRC check
/// is skipped. Appends write and sync the record before the grant is added
/// to the index, all under one exclusive lock, so the uniqueness constraint
/// on `source_event_id` holds across concurrent writers and across restarts.
///
/// The file is locked exclusively for the lifetime of the store; a second
/// open of the same log, from this process or another, fails with
/// [`StoreError::Locked`].
pub struct FileGrantStore {
    path: PathBuf,
    sync_mode: SyncMode,
    state: RwLock<FileState>,
}

impl FileGrantStore {
    /// Open (or create) the grant log at the given path and recover its contents.
    pub fn open(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        fs2::FileExt::try_lock_exclusive(&file).map_err(|e| StoreError::Locked {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let (index, valid_len) = recover(path)?;
        let file_len = file.metadata()?.len();
        if valid_len < file_len {
            warn!(
                path = %path.display(),
                valid_len,
                file_len,
                "truncating torn record at end of grant log"
            );
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        info!(path = %path.display(), grants = index.len(), "grant log opened");

        Ok(Self {
            path: path.to_path_buf(),
            sync_mode,
            state: RwLock::new(FileState {
                index,
                file,
                offset: valid_len,
                #[cfg(test)]
                fail_next_write_after: None,
            }),
        })
    }

    /// Path to the grant log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte length of the log.
    pub fn offset(&self) -> StoreResult<u64> {
        Ok(self.read_state()?.offset)
    }

    fn read_state(&self) -> StoreResult<RwLockReadGuard<'_, FileState>> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write_state(&self) -> StoreResult<RwLockWriteGuard<'_, FileState>> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl GrantStore for FileGrantStore {
    fn append(&self, grant: &Grant) -> StoreResult<Grant> {
        let payload =
            bincode::serialize(grant).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len())
            .map_err(|_| StoreError::Serialization("grant record too large".into()))?;
        let crc = crc32fast::hash(&payload);

        let mut record = Vec::with_capacity(HEADER_SIZE + payload.len());
        record.extend_from_slice(&length.to_le_bytes());
        record.extend_from_slice(&crc.to_le_bytes());
        record.extend_from_slice(&payload);

        let mut state = self.write_state()?;
        state.index.check(grant)?;

        let record_offset = state.offset;
        if let Err(e) = state.write_record(&record, self.sync_mode) {
            state.rollback();
            return Err(e.into());
        }

        state.offset += record.len() as u64;
        state.index.insert(grant.clone());

        debug!(
            grant = %grant.id,
            user = %grant.user_id,
            offset = record_offset,
            len = payload.len(),
            "grant appended to log"
        );
        Ok(grant.clone())
    }

    fn list_by_user(&self, user: &UserId) -> StoreResult<Vec<Grant>> {
        Ok(self.read_state()?.index.list_by_user(user))
    }

    fn find_by_event_id(&self, event_id: &EventId) -> StoreResult<Option<Grant>> {
        Ok(self.read_state()?.index.find_by_event_id(event_id))
    }

    fn get(&self, id: &GrantId) -> StoreResult<Option<Grant>> {
        Ok(self.read_state()?.index.get(id))
    }

    fn grant_count(&self) -> StoreResult<u64> {
        Ok(self.read_state()?.index.len() as u64)
    }
}

impl std::fmt::Debug for FileGrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileGrantStore")
            .field("path", &self.path)
            .field("sync_mode", &self.sync_mode)
            .finish()
    }
}

/// Replay the log front-to-back. Returns the rebuilt index and the byte
/// length of the readable prefix.
fn recover(path: &Path) -> StoreResult<(GrantIndex, u64)> {
    let mut reader = BufReader::new(File::open(path)?);
    let file_len = reader.get_ref().metadata()?.len();
    let mut index = GrantIndex::new();
    let mut offset: u64 = 0;

    while offset + HEADER_SIZE as u64 <= file_len {
        let mut header = [0u8; HEADER_SIZE];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }

        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if length == 0 || offset + HEADER_SIZE as u64 + length as u64 > file_len {
            warn!(offset, length, file_len, "invalid grant record length; stopping recovery");
            break;
        }

        let mut payload = vec![0u8; length as usize];
        match reader.read_exact(&mut payload) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!(offset, "truncated grant record; stopping recovery");
                break;
            }
            Err(e) => return Err(e.into()),
        }

        let record_end = offset + HEADER_SIZE as u64 + length as u64;
        let actual_crc = crc32fast::hash(&payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping grant record"
            );
            offset = record_end;
            continue;
        }

        match bincode::deserialize::<Grant>(&payload) {
            Ok(grant) => {
                if let Err(e) = index.try_insert(grant) {
                    warn!(offset, error = %e, "conflicting grant record; skipping");
                }
            }
            Err(e) => {
                warn!(offset, error = %e, "failed to decode grant record; skipping");
            }
        }

        offset = record_end;
    }

    debug!(recovered = index.len(), valid_len = offset, "grant log recovery complete");
    Ok((index, offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom};

    use chrono::{TimeZone, Utc};
    use escudos_types::GrantSource;

    fn grant(user: &str, event: Option<&str>, amount: u64) -> Grant {
        Grant {
            id: GrantId::new(),
            user_id: UserId::new(user).unwrap(),
            amount,
            source: GrantSource::Subscription,
            issued_at: Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap(),
            expires_at: Some(Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap()),
            source_event_id: event.map(|e| EventId::new(e).unwrap()),
        }
    }

    #[test]
    fn grants_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grants.log");

        let a = grant("alice", Some("evt_1"), 50);
        let b = grant("alice", None, 7);
        {
            let store = FileGrantStore::open(&path, SyncMode::EveryWrite).unwrap();
            store.append(&a).unwrap();
            store.append(&b).unwrap();
        }

        let store = FileGrantStore::open(&path, SyncMode::EveryWrite).unwrap();
        let alice = UserId::new("alice").unwrap();
        assert_eq!(store.list_by_user(&alice).unwrap(), vec![a.clone(), b]);
        assert_eq!(store.get(&a.id).unwrap(), Some(a));
        assert_eq!(store.grant_count().unwrap(), 2);
    }

    #[test]
    fn uniqueness_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grants.log");
        {
            let store = FileGrantStore::open(&path, SyncMode::OsDefault).unwrap();
            store.append(&grant("alice", Some("evt_9"), 10)).unwrap();
        }

        let store = FileGrantStore::open(&path, SyncMode::OsDefault).unwrap();
        let err = store.append(&grant("alice", Some("evt_9"), 10)).unwrap_err();
        assert!(err.is_duplicate_event());
        assert_eq!(store.grant_count().unwrap(), 1);
    }

    #[test]
    fn rejected_append_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grants.log");
        let store = FileGrantStore::open(&path, SyncMode::EveryWrite).unwrap();
        store.append(&grant("alice", Some("evt_1"), 10)).unwrap();
        let before = store.offset().unwrap();

        assert!(store.append(&grant("bob", Some("evt_1"), 10)).is_err());
        assert_eq!(store.offset().unwrap(), before);
        assert_eq!(fs::metadata(&path).unwrap().len(), before);
    }

    #[test]
    fn crc_mismatch_skips_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grants.log");
        let second = grant("bob", None, 3);
        {
            let store = FileGrantStore::open(&path, SyncMode::EveryWrite).unwrap();
            store.append(&grant("alice", None, 1)).unwrap();
            store.append(&second).unwrap();
        }

        {
            let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            let mut buf = [0u8; 1];
            file.read_exact(&mut buf).unwrap();
            buf[0] ^= 0xFF;
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            file.write_all(&buf).unwrap();
            file.sync_all().unwrap();
        }

        let store = FileGrantStore::open(&path, SyncMode::EveryWrite).unwrap();
        assert_eq!(store.grant_count().unwrap(), 1);
        assert_eq!(store.get(&second.id).unwrap(), Some(second));
    }

    #[test]
    fn torn_tail_is_truncated_and_log_stays_appendable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grants.log");
        let first = grant("alice", Some("evt_1"), 50);
        {
            let store = FileGrantStore::open(&path, SyncMode::EveryWrite).unwrap();
            store.append(&first).unwrap();
        }
        let valid_len = fs::metadata(&path).unwrap().len();

        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&200u32.to_le_bytes()).unwrap();
            file.write_all(&[0xAB; 6]).unwrap();
        }

        let store = FileGrantStore::open(&path, SyncMode::EveryWrite).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), valid_len);
        assert_eq!(store.grant_count().unwrap(), 1);

        let next = grant("alice", Some("evt_2"), 5);
        store.append(&next).unwrap();
        drop(store);

        let store = FileGrantStore::open(&path, SyncMode::EveryWrite).unwrap();
        assert_eq!(
            store.list_by_user(&UserId::new("alice").unwrap()).unwrap(),
            vec![first, next]
        );
    }

    #[test]
    fn failed_append_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grants.log");
        let lost = grant("alice", None, 1_000);
        let kept = grant("alice", None, 1_000);
        {
            let store = FileGrantStore::open(&path, SyncMode::EveryWrite).unwrap();
            store.write_state().unwrap().fail_next_write_after = Some(20);

            let err = store.append(&lost).unwrap_err();
            assert!(matches!(err, StoreError::Io(_)));
            assert_eq!(store.offset().unwrap(), 0);
            assert_eq!(fs::metadata(&path).unwrap().len(), 0);
            assert_eq!(store.grant_count().unwrap(), 0);

            store.append(&kept).unwrap();
            assert_eq!(store.offset().unwrap(), fs::metadata(&path).unwrap().len());
        }

        let store = FileGrantStore::open(&path, SyncMode::EveryWrite).unwrap();
        assert_eq!(
            store.list_by_user(&UserId::new("alice").unwrap()).unwrap(),
            vec![kept]
        );
        assert_eq!(store.get(&lost.id).unwrap(), None);
    }

    #[test]
    fn second_open_of_same_log_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grants.log");
        let store = FileGrantStore::open(&path, SyncMode::EveryWrite).unwrap();
        store.append(&grant("alice", Some("evt_x"), 10)).unwrap();

        let err = FileGrantStore::open(&path, SyncMode::EveryWrite).unwrap_err();
        assert!(matches!(err, StoreError::Locked { .. }));

        drop(store);
        let reopened = FileGrantStore::open(&path, SyncMode::EveryWrite).unwrap();
        let dup = reopened.append(&grant("bob", Some("evt_x"), 10)).unwrap_err();
        assert!(dup.is_duplicate_event());
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/grants.log");
        let store = FileGrantStore::open(&path, SyncMode::default()).unwrap();
        assert_eq!(store.path(), path.as_path());
        assert!(path.exists());
    }
}
