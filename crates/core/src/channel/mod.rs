//! Named, fixed-size byte regions shared between processes through a memory
//! mapped file.
//!
//! A producer creates the channel with an explicit size; consumers attach to
//! whatever size the producer established. The region is plain bytes with no
//! header, so both sides agree on the layout out of band (for the FFT producer
//! that is `window / 2 + 1` little-endian `f32` magnitudes).

use std::{
    fmt,
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use memmap2::MmapMut;

use crate::{Result, ShmVizError};

/// Base directory used when the caller does not provide one.
#[cfg(target_os = "linux")]
pub const DEFAULT_BASE: &str = "/dev/shm/render";

/// Returns the default base directory for channel files.
pub fn default_base_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from(DEFAULT_BASE)
    }
    #[cfg(not(target_os = "linux"))]
    {
        std::env::temp_dir().join("render")
    }
}

/// A mapped frame channel.
///
/// No locking is performed on the shared region. A reader running at the same
/// time as the writer can observe a torn frame, part old and part new. The
/// magnitudes carried here vary smoothly between frames, so an occasional
/// torn frame is accepted in exchange for never blocking either side.
pub struct Channel {
    path: PathBuf,
    map: MmapMut,
}

impl Channel {
    /// Opens the channel `name` under `base`.
    ///
    /// With `Some(size)` the backing file is created (or truncated) to `size`
    /// zero bytes. With `None` the file must already exist and is mapped at
    /// its current length.
    pub fn get(name: &str, base: impl AsRef<Path>, size: Option<usize>) -> Result<Self> {
        let base = base.as_ref();
        fs::create_dir_all(base)?;
        let path = base.join(name);

        match size {
            Some(0) => return Err(ShmVizError::InvalidInput("channel size must be non-zero")),
            Some(size) => {
                let file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(&path)?;
                file.set_len(size as u64)?;
            }
            None if !path.exists() => return Err(ShmVizError::ChannelNotFound { path }),
            None => {}
        }

        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let actual = file.metadata()?.len() as usize;
        if actual == 0 {
            return Err(ShmVizError::SizeMismatch {
                path,
                expected: size.unwrap_or(0),
                actual,
            });
        }

        // SAFETY: the mapping is only ever accessed as plain bytes. Another
        // process writing concurrently can change the contents under us, which
        // is the documented tearing behaviour, but cannot invalidate the
        // mapping while the file keeps its length.
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { path, map })
    }

    /// Creates (or resets) a channel of `size` bytes. Producer side.
    pub fn create(name: &str, base: impl AsRef<Path>, size: usize) -> Result<Self> {
        Self::get(name, base, Some(size))
    }

    /// Attaches to an existing channel. Consumer side.
    pub fn open(name: &str, base: impl AsRef<Path>) -> Result<Self> {
        Self::get(name, base, None)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of one frame in bytes.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Copies out the current frame.
    pub fn read_all(&self) -> Vec<u8> {
        self.map.to_vec()
    }

    /// Copies the current frame into `out`, which must be exactly
    /// [`len`](Self::len) bytes.
    pub fn read_into(&self, out: &mut [u8]) -> Result<()> {
        self.check_len(out.len())?;
        out.copy_from_slice(&self.map);
        Ok(())
    }

    /// Overwrites the whole frame. `frame` must be exactly
    /// [`len`](Self::len) bytes; it is never truncated or padded.
    pub fn write_all(&mut self, frame: &[u8]) -> Result<()> {
        self.check_len(frame.len())?;
        self.map.copy_from_slice(frame);
        Ok(())
    }

    /// Reads the frame as little-endian `f32` values.
    pub fn read_f32(&self) -> Vec<f32> {
        self.map
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    /// Decodes the frame into `out`, which must hold exactly `len() / 4`
    /// values.
    pub fn read_f32_into(&self, out: &mut [f32]) -> Result<()> {
        self.check_len(out.len() * 4)?;
        for (value, chunk) in out.iter_mut().zip(self.map.chunks_exact(4)) {
            *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(())
    }

    /// Writes a frame of little-endian `f32` values covering the whole region.
    pub fn write_f32(&mut self, values: &[f32]) -> Result<()> {
        self.check_len(values.len() * 4)?;
        for (chunk, value) in self.map.chunks_exact_mut(4).zip(values) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        Ok(())
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len == self.map.len() {
            Ok(())
        } else {
            Err(ShmVizError::SizeMismatch {
                path: self.path.clone(),
                expected: self.map.len(),
                actual: len,
            })
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("path", &self.path)
            .field("len", &self.map.len())
            .finish()
    }
}
