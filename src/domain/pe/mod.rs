//! PE container: the mutable view of an executable during signing.
//!
//! The container buffers the whole image, performs all edits in memory and
//! writes the result back in a single staged rename on `close()`, so an
//! interrupted signing run leaves the original file untouched. It knows just
//! enough header layout to pad the image, strip and rewrite the Certificate
//! Table, compute the Authenticode digest and refresh the PE checksum.

pub mod layout;

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::domain::crypto::{Digester, HashAlgorithm};
use crate::infra::error::{SigningError, SigningResult};
pub use layout::PeLayout;

/// Entries of the Optional Header data directory array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDirectory {
    ExportTable = 0,
    ImportTable = 1,
    ResourceTable = 2,
    ExceptionTable = 3,
    CertificateTable = 4,
    BaseRelocationTable = 5,
    Debug = 6,
    Architecture = 7,
    GlobalPtr = 8,
    TlsTable = 9,
    LoadConfigTable = 10,
    BoundImport = 11,
    ImportAddressTable = 12,
    DelayImportDescriptor = 13,
    ClrRuntimeHeader = 14,
    Reserved = 15,
}

/// A PE image opened for signing.
pub struct PeFile {
    path: Option<PathBuf>,
    bytes: Vec<u8>,
    layout: PeLayout,
}

impl PeFile {
    /// Open a PE file read-write. The image is buffered; nothing is written
    /// back until [`PeFile::close`].
    pub fn open<P: AsRef<Path>>(path: P) -> SigningResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| SigningError::IoError(format!("failed to read {}: {e}", path.display())))?;
        let layout = PeLayout::parse(&bytes)?;
        Ok(PeFile {
            path: Some(path.to_path_buf()),
            bytes,
            layout,
        })
    }

    /// Wrap an in-memory image. Used for inspection and tests; `close()` on
    /// such a container only drops the buffer.
    pub fn parse(bytes: Vec<u8>) -> SigningResult<Self> {
        let layout = PeLayout::parse(&bytes)?;
        Ok(PeFile {
            path: None,
            bytes,
            layout,
        })
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn layout(&self) -> &PeLayout {
        &self.layout
    }

    /// The current Certificate Table region as `(offset, size)`, if any.
    #[must_use]
    pub fn certificate_table(&self) -> Option<(usize, usize)> {
        self.layout.security_entry(&self.bytes)
    }

    /// Extend the image with zero bytes up to the next multiple of
    /// `alignment`. No-op when already aligned.
    pub fn pad(&mut self, alignment: usize) {
        let remainder = self.bytes.len() % alignment;
        if remainder != 0 {
            let fill = alignment - remainder;
            self.bytes.extend(std::iter::repeat(0u8).take(fill));
            log::debug!("padded image with {fill} zero bytes");
        }
    }

    /// Drop an existing Certificate Table and clear the SECURITY directory
    /// entry. Re-signing therefore replaces the previous signature instead of
    /// stacking a second table behind it.
    pub fn remove_certificate_table(&mut self) {
        if let Some((offset, size)) = self.certificate_table() {
            if offset + size == self.bytes.len() {
                self.bytes.truncate(offset);
                log::debug!("removed previous certificate table ({size} bytes)");
            } else {
                // The table is required to be the trailing region; a stale
                // interior region is left in place and becomes part of the
                // digest once the entry is cleared.
                log::warn!(
                    "certificate table [{offset}, +{size}) is not the trailing region; \
                     clearing the directory entry only"
                );
            }
            let at = self.layout.security_dir_offset;
            self.bytes[at..at + 8].fill(0);
        }
    }

    /// Compute the Authenticode digest: every byte of the image in file
    /// order except the CheckSum field, the SECURITY directory entry and the
    /// Certificate Table region. The signature must not cover itself, and
    /// the checksum is rewritten after signing.
    #[must_use]
    pub fn compute_digest(&self, algorithm: HashAlgorithm) -> Vec<u8> {
        let mut skips: Vec<(usize, usize)> = vec![
            (self.layout.checksum_offset, 4),
            (self.layout.security_dir_offset, 8),
        ];
        if let Some((offset, size)) = self.certificate_table() {
            skips.push((offset, size));
        }
        skips.sort_unstable();

        let mut digester = Digester::new(algorithm);
        let mut cursor = 0usize;
        for (start, len) in skips {
            if start > cursor {
                digester.update(&self.bytes[cursor..start]);
            }
            cursor = cursor.max(start + len);
        }
        if cursor < self.bytes.len() {
            digester.update(&self.bytes[cursor..]);
        }
        digester.finish()
    }

    /// Append `blob` as the new content of a data directory and point the
    /// directory entry at it. Only the Certificate Table is rewritable; its
    /// entry records a file offset rather than an RVA. Any previous table is
    /// removed first and the remaining image is re-aligned.
    pub fn write_data_directory(
        &mut self,
        which: DataDirectory,
        blob: &[u8],
    ) -> SigningResult<()> {
        if which != DataDirectory::CertificateTable {
            return Err(SigningError::ConfigurationError(format!(
                "data directory {which:?} cannot be rewritten"
            )));
        }
        self.remove_certificate_table();
        self.pad(crate::domain::constants::CERTIFICATE_TABLE_ALIGNMENT);

        let offset = self.bytes.len();
        let offset_u32 = u32::try_from(offset).map_err(|_| {
            SigningError::PeParsingError("image too large for a certificate table offset".into())
        })?;
        let size_u32 = u32::try_from(blob.len()).map_err(|_| {
            SigningError::PeParsingError("certificate table exceeds 4 GiB".into())
        })?;

        self.bytes.extend_from_slice(blob);
        let at = self.layout.security_dir_offset;
        self.bytes[at..at + 4].copy_from_slice(&offset_u32.to_le_bytes());
        self.bytes[at + 4..at + 8].copy_from_slice(&size_u32.to_le_bytes());
        log::debug!("certificate table written at offset {offset} ({} bytes)", blob.len());
        Ok(())
    }

    /// Recompute the Optional Header checksum over the current image.
    pub fn update_checksum(&mut self) {
        let checksum = pe_checksum(&self.bytes, self.layout.checksum_offset);
        let at = self.layout.checksum_offset;
        self.bytes[at..at + 4].copy_from_slice(&checksum.to_le_bytes());
    }

    /// Refresh the checksum and persist the image: staged to a temporary
    /// file in the same directory and atomically renamed over the original,
    /// so the file on disk is either the old image or the fully signed one.
    pub fn close(mut self) -> SigningResult<()> {
        self.update_checksum();
        let Some(path) = self.path.take() else {
            return Ok(());
        };
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut staged = NamedTempFile::new_in(dir.unwrap_or_else(|| Path::new(".")))
            .map_err(|e| SigningError::IoError(format!("failed to stage output: {e}")))?;
        staged.write_all(&self.bytes)?;
        staged.flush()?;
        staged.persist(&path).map_err(|e| {
            SigningError::IoError(format!("failed to replace {}: {}", path.display(), e.error))
        })?;
        Ok(())
    }
}

/// PE checksum over the image, treating the 4-byte checksum field as absent.
fn pe_checksum(data: &[u8], checksum_offset: usize) -> u32 {
    let mut checksum: u64 = 0;
    let mut i = 0;
    while i < data.len() {
        if i == checksum_offset {
            i += 4;
            continue;
        }
        let mut value = 0u32;
        for j in 0..4 {
            if i + j < data.len() {
                value |= u32::from(data[i + j]) << (j * 8);
            }
        }
        checksum = (checksum & 0xffff_ffff) + u64::from(value) + (checksum >> 32);
        i += 4;
    }
    checksum = (checksum & 0xffff) + (checksum >> 16);
    checksum += checksum >> 16;
    checksum &= 0xffff;
    (checksum + data.len() as u64) as u32
}
