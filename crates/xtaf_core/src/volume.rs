//! XTAF volume: directory tree, path resolution and file reads.

use crate::device::{BlockDevice, SectorSource};
use crate::drive::DriveInfo;
use crate::entry::{DirectoryEntry, ENTRY_SIZE, FREE_NAME_LENGTH};
use crate::error::{Result, XtafError};
use crate::superblock::{SUPERBLOCK_SIZE, Superblock};
use crate::table::{AllocationTable, EntryWidth, TABLE_OFFSET};
use std::collections::BTreeMap;

/// Known partition offsets on a stock drive.
pub const SYSEXT1_OFFSET: u64 = 0x1_0C08_0000;
pub const SYSEXT2_OFFSET: u64 = 0x1_18EB_0000;
pub const COMPAT_OFFSET: u64 = 0x1_20EB_0000;
pub const DATA_OFFSET: u64 = 0x1_30EB_0000;

/// Data partitions label themselves through this root file.
const LABEL_FILE: &str = "name.txt";
const LABEL_MAX_SIZE: u32 = 24;

/// A materialised directory: name to entry, unique names, stable order.
pub type Directory = BTreeMap<String, DirectoryEntry>;

/// A read-only XTAF partition.
///
/// All state is fixed at `open`; every accessor takes `&self` and the
/// volume can be shared between readers as long as its `SectorSource`
/// serialises concurrent reads.
#[derive(Debug)]
pub struct Volume<S> {
    device: BlockDevice<S>,
    superblock: Superblock,
    table: AllocationTable,
    table_size: u64,
    cluster_size: u64,
    size: u64,
    root: Directory,
    label: Option<String>,
}

impl<S: SectorSource> Volume<S> {
    /// Opens the partition at byte `offset` of `source`; a `size` of 0
    /// extends the volume to the end of the device.
    pub fn open(source: S, offset: u64, size: u64) -> Result<Self> {
        let mut device = BlockDevice::new(source)?;
        device.set_base_offset(offset);

        let header = device.read(0, SUPERBLOCK_SIZE as u64)?;
        let superblock = Superblock::parse(&header)?;
        let cluster_size = superblock.cluster_size();
        device.set_default_length(cluster_size);

        let size = if size == 0 {
            device.size().saturating_sub(offset)
        } else {
            size
        };

        let width = EntryWidth::select(size, cluster_size);
        let table_size = AllocationTable::raw_size(size, cluster_size, width);
        let raw = device.read(TABLE_OFFSET, table_size)?;
        let table = AllocationTable::parse(&raw, width)?;

        log::info!(
            "volume {:#010x}: {} bytes, {}-byte clusters, {} table entries",
            superblock.volume_id,
            size,
            cluster_size,
            table.len()
        );

        let mut volume = Self {
            device,
            superblock,
            table,
            table_size,
            cluster_size,
            size,
            root: Directory::new(),
            label: None,
        };
        // the root chain starts at cluster 1 on every drive seen, not at
        // the superblock's root-cluster field
        volume.root = volume.read_chain_directory(1)?;
        volume.label = volume.read_label()?;
        Ok(volume)
    }

    pub fn volume_id(&self) -> u32 {
        self.superblock.volume_id
    }

    pub fn root_cluster(&self) -> u32 {
        self.superblock.root_cluster
    }

    /// Volume size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Allocation unit in bytes.
    pub fn cluster_size(&self) -> u64 {
        self.cluster_size
    }

    pub fn table(&self) -> &AllocationTable {
        &self.table
    }

    /// The root directory, read once at `open`.
    pub fn root(&self) -> &Directory {
        &self.root
    }

    /// Volume label from the root `name.txt`, when present.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Drive metadata from the security sector, absent on image dumps.
    pub fn drive(&self) -> Option<&DriveInfo> {
        self.device.drive()
    }

    /// Reads `length` bytes from the start of `cluster` (0 = whole cluster).
    ///
    /// Cluster N lives at partition offset
    /// `0x1000 + table_size - cluster_size + N * cluster_size`: the data
    /// region starts one cluster before the nominal end of the table, so
    /// that cluster 1 is the first data cluster.
    fn read_cluster(&self, cluster: u32, length: u64) -> Result<Vec<u8>> {
        if !self.table.contains(cluster) {
            return Err(XtafError::BadCluster(cluster));
        }
        log::debug!("reading cluster {}", cluster);
        let offset = TABLE_OFFSET + self.table_size + u64::from(cluster - 1) * self.cluster_size;
        self.device.read(offset, length)
    }

    /// Materialises the directory behind `entry`.
    ///
    /// Records are merged in chain order; a later record wins a name
    /// collision. Deleted entries keep their `<DELETED:…>` rendering as
    /// the mapping key.
    pub fn read_directory(&self, entry: &DirectoryEntry) -> Result<Directory> {
        if entry.is_deleted() {
            return Err(XtafError::Deleted(entry.name.to_string()));
        }
        if !entry.is_directory() {
            return Err(XtafError::NotDirectory(entry.name.to_string()));
        }
        log::debug!("reading directory {}", entry.name);
        self.read_chain_directory(entry.first_cluster)
    }

    fn read_chain_directory(&self, first_cluster: u32) -> Result<Directory> {
        let mut directory = Directory::new();
        if !self.table.contains(first_cluster) {
            return Ok(directory);
        }
        for cluster in self.table.chain(first_cluster)? {
            let data = self.read_cluster(cluster, 0)?;

            // the live region ends where the 0xFF fill begins
            let mut live = data.len();
            while live > 0 && data[live - 1] == 0xFF {
                live -= 1;
            }
            if live % ENTRY_SIZE != 0 {
                return Err(XtafError::BadDirectory(live));
            }

            for record in data[..live].chunks_exact(ENTRY_SIZE) {
                if record[0] == FREE_NAME_LENGTH {
                    break;
                }
                let entry = DirectoryEntry::parse(record)?;
                directory.insert(entry.name.to_string(), entry);
            }
        }
        Ok(directory)
    }

    /// Resolves an absolute path to its entry; "/" resolves to a synthetic
    /// root directory entry. Empty segments collapse, so "//a///b" and
    /// "/a/b" name the same entry.
    pub fn resolve(&self, path: &str) -> Result<DirectoryEntry> {
        if !path.starts_with('/') {
            return Err(XtafError::InvalidPath(path.to_string()));
        }
        log::debug!("resolving \"{}\"", path);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((name, parents)) = segments.split_last() else {
            return Ok(DirectoryEntry::root());
        };

        let mut directory = self.root.clone();
        for segment in parents {
            let entry = directory
                .get(*segment)
                .ok_or_else(|| XtafError::NotFound((*segment).to_string()))?;
            directory = self.read_directory(entry)?;
        }
        directory
            .get(*name)
            .cloned()
            .ok_or_else(|| XtafError::NotFound((*name).to_string()))
    }

    /// The ordered cluster chain backing `entry`. Empty for entries with
    /// no first cluster.
    pub fn clusters(&self, entry: &DirectoryEntry) -> Result<Vec<u32>> {
        if entry.first_cluster == 0 {
            return Ok(Vec::new());
        }
        self.table.chain(entry.first_cluster)
    }

    /// Streams a file as ordered byte chunks: a full cluster each except
    /// the last, which carries the remainder. Empty and deleted files
    /// yield a single empty chunk.
    pub fn read_file(&self, entry: &DirectoryEntry) -> Result<FileChunks<'_, S>> {
        if entry.is_directory() {
            return Err(XtafError::IsDirectory(entry.name.to_string()));
        }
        let size = entry.read_size();
        let clusters = if size == 0 {
            Vec::new()
        } else {
            self.clusters(entry)?
        };
        Ok(FileChunks {
            volume: self,
            clusters,
            size,
            index: 0,
        })
    }

    /// Random-access read: the `length`-byte window of the file at
    /// `offset`, clamped to the file size.
    pub fn read_range(&self, entry: &DirectoryEntry, offset: u64, length: u64) -> Result<Vec<u8>> {
        if entry.is_directory() {
            return Err(XtafError::IsDirectory(entry.name.to_string()));
        }
        let clusters = self.clusters(entry)?;
        self.window(&clusters, entry.read_size(), offset, length)
    }

    /// Shared tail of `read_range`, taking a precomputed chain so callers
    /// may memoise it.
    pub(crate) fn window(
        &self,
        clusters: &[u32],
        size: u64,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>> {
        if length == 0 || offset >= size {
            return Ok(Vec::new());
        }
        let length = length.min(size - offset);

        let start = (offset / self.cluster_size) as usize;
        let lead = (offset % self.cluster_size) as usize;
        // the window may straddle one more cluster than length alone needs
        let stop = start + (lead as u64 + length).div_ceil(self.cluster_size) as usize;

        let mut data = Vec::with_capacity((stop - start) * self.cluster_size as usize);
        for &cluster in clusters.get(start..stop.min(clusters.len())).unwrap_or(&[]) {
            data.extend(self.read_cluster(cluster, 0)?);
        }

        let begin = lead.min(data.len());
        let end = (lead + length as usize).min(data.len());
        Ok(data[begin..end].to_vec())
    }

    fn read_label(&self) -> Result<Option<String>> {
        let Some(entry) = self.root.get(LABEL_FILE) else {
            return Ok(None);
        };
        if entry.is_directory()
            || entry.is_deleted()
            || entry.size == 0
            || entry.size > LABEL_MAX_SIZE
        {
            return Ok(None);
        }
        let data = self.read_range(entry, 0, u64::from(entry.size))?;
        let units: Vec<u16> = data
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(Some(String::from_utf16_lossy(&units)))
    }
}

/// Lazy chunk iterator over a file's clusters.
pub struct FileChunks<'v, S> {
    volume: &'v Volume<S>,
    clusters: Vec<u32>,
    size: u64,
    index: usize,
}

impl<S: SectorSource> Iterator for FileChunks<'_, S> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.size == 0 {
            if self.index > 0 {
                return None;
            }
            self.index = 1;
            return Some(Ok(Vec::new()));
        }

        let cluster_size = self.volume.cluster_size;
        let total = self.size.div_ceil(cluster_size) as usize;
        if self.index >= total {
            return None;
        }
        let cluster = *self.clusters.get(self.index)?;
        let remaining = self.size - self.index as u64 * cluster_size;
        self.index += 1;
        Some(self.volume.read_cluster(cluster, remaining.min(cluster_size)))
    }
}
