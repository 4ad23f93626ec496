//! SD card behind the flight core's [`Filesystem`] seam.
//!
//! The card sits on SPI0 and holds a single FAT volume. Mounting
//! re-initialises the card, so a card pulled and reinserted in flight comes
//! back on the next remount.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use embedded_sdmmc::{
    Mode, RawDirectory, RawFile, RawVolume, SdCard, TimeSource, Timestamp, VolumeIdx,
    VolumeManager,
};
use grib_flight::{Filesystem, StoreError};

// One volume, its root directory and the log file.
const MAX_DIRS: usize = 1;
const MAX_FILES: usize = 1;

/// Timestamp stamped on directory entries; the board has no RTC.
#[derive(Default)]
pub struct FixedTimeSource;

impl TimeSource for FixedTimeSource {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 55, // 2025
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

pub struct SdFilesystem<SPI, DELAY, T = FixedTimeSource>
where
    SPI: SpiDevice<u8>,
    DELAY: DelayNs,
    T: TimeSource,
{
    mgr: VolumeManager<SdCard<SPI, DELAY>, T, MAX_DIRS, MAX_FILES, 1>,
    mounted: Option<(RawVolume, RawDirectory)>,
}

impl<SPI, DELAY, T> SdFilesystem<SPI, DELAY, T>
where
    SPI: SpiDevice<u8>,
    DELAY: DelayNs,
    T: TimeSource,
{
    pub fn new(card: SdCard<SPI, DELAY>, time_source: T) -> Self {
        Self {
            mgr: VolumeManager::new_with_limits(card, time_source, 0),
            mounted: None,
        }
    }

    fn root(&self) -> Result<RawDirectory, StoreError> {
        self.mounted.map(|(_, root)| root).ok_or(StoreError::Open)
    }
}

impl<SPI, DELAY, T> Filesystem for SdFilesystem<SPI, DELAY, T>
where
    SPI: SpiDevice<u8>,
    DELAY: DelayNs,
    T: TimeSource,
{
    type File = RawFile;

    fn mount(&mut self) -> Result<(), StoreError> {
        self.unmount();

        self.mgr.device().mark_card_uninit();
        let bytes = self.mgr.device().num_bytes().map_err(|e| {
            defmt::warn!("sd: card not ready: {:?}", defmt::Debug2Format(&e));
            StoreError::Mount
        })?;
        defmt::info!("sd: card ready, {} MiB", (bytes / 1_048_576) as u32);

        let volume = self.mgr.open_raw_volume(VolumeIdx(0)).map_err(|e| {
            defmt::warn!("sd: no volume: {:?}", defmt::Debug2Format(&e));
            StoreError::Mount
        })?;
        let root = match self.mgr.open_root_dir(volume) {
            Ok(root) => root,
            Err(e) => {
                defmt::warn!("sd: no root dir: {:?}", defmt::Debug2Format(&e));
                let _ = self.mgr.close_volume(volume);
                return Err(StoreError::Mount);
            }
        };
        self.mounted = Some((volume, root));
        Ok(())
    }

    fn unmount(&mut self) {
        if let Some((volume, root)) = self.mounted.take() {
            let _ = self.mgr.close_dir(root);
            let _ = self.mgr.close_volume(volume);
        }
    }

    fn open_append(&mut self, name: &str) -> Result<RawFile, StoreError> {
        let root = self.root()?;
        self.mgr
            .open_file_in_dir(root, name, Mode::ReadWriteCreateOrAppend)
            .map_err(|e| {
                defmt::warn!("sd: open {} failed: {:?}", name, defmt::Debug2Format(&e));
                StoreError::Open
            })
    }

    fn write(&mut self, file: &mut RawFile, bytes: &[u8]) -> Result<(), StoreError> {
        self.mgr
            .write(*file, bytes)
            .map_err(|_| StoreError::Write)
    }

    fn flush(&mut self, file: &mut RawFile) -> Result<(), StoreError> {
        self.mgr.flush_file(*file).map_err(|_| StoreError::Flush)
    }

    fn close(&mut self, file: RawFile) {
        let _ = self.mgr.close_file(file);
    }
}
