use std::{collections::HashMap, sync::Arc};

use crate::error::Error;

/// Identifies a character device the way `rdev` does in a stat record:
/// major in the high bits, minor in the low bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawDev(pub u32, pub u32);

impl RawDev {
    #[must_use]
    pub const fn encode(self) -> u64 {
        ((self.0 as u64) << 32) | self.1 as u64
    }

    #[must_use]
    pub const fn decode(rdev: u64) -> Self {
        Self((rdev >> 32) as u32, rdev as u32)
    }
}

/// A character device backing a [`Kind::CharacterDev`](efs_inode::Kind)
/// inode. Reads and writes go straight through; there is no buffering and
/// no block storage behind a device inode.
pub trait CharDevice: Send + Sync {
    fn read(&self, len: usize) -> Result<Vec<u8>, Error>;
    fn write(&self, data: &[u8]) -> Result<usize, Error>;
}

/// Always returns EOF on read and accepts (and discards) every write.
#[derive(Debug, Default)]
pub struct NullDevice;

impl CharDevice for NullDevice {
    fn read(&self, _len: usize) -> Result<Vec<u8>, Error> {
        Ok(Vec::new())
    }

    fn write(&self, data: &[u8]) -> Result<usize, Error> {
        Ok(data.len())
    }
}

/// Reads as an endless stream of zero bytes; writes are discarded.
#[derive(Debug, Default)]
pub struct ZeroDevice;

impl CharDevice for ZeroDevice {
    fn read(&self, len: usize) -> Result<Vec<u8>, Error> {
        Ok(vec![0u8; len])
    }

    fn write(&self, data: &[u8]) -> Result<usize, Error> {
        Ok(data.len())
    }
}

/// Maps `rdev` values to the device implementations a filesystem instance
/// knows about. Devices are registered by the embedder; this crate ships
/// only the conventional null/zero pair, used by its own tests.
#[derive(Default, Clone)]
pub struct DeviceTable {
    devices: HashMap<RawDev, Arc<dyn CharDevice>>,
}

impl DeviceTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The conventional `/dev/null` (1, 3) and `/dev/zero` (1, 5) pair.
    #[must_use]
    pub fn with_standard_devices() -> Self {
        let mut table = Self::new();
        table.register(RawDev(1, 3), Arc::new(NullDevice));
        table.register(RawDev(1, 5), Arc::new(ZeroDevice));
        table
    }

    pub fn register(&mut self, dev: RawDev, device: Arc<dyn CharDevice>) {
        self.devices.insert(dev, device);
    }

    pub fn get(&self, dev: RawDev) -> Result<Arc<dyn CharDevice>, Error> {
        self.devices.get(&dev).cloned().ok_or(Error::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rdev_encoding_round_trips() {
        let dev = RawDev(1, 5);
        assert_eq!(RawDev::decode(dev.encode()), dev);
    }

    #[test]
    fn null_device_discards_writes_and_reads_empty() {
        let dev = NullDevice;
        assert_eq!(dev.write(b"anything").unwrap(), 8);
        assert_eq!(dev.read(16).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn zero_device_reads_zero_filled() {
        let dev = ZeroDevice;
        assert_eq!(dev.read(4).unwrap(), vec![0u8; 4]);
    }

    #[test]
    fn standard_devices_are_registered() {
        let table = DeviceTable::with_standard_devices();
        assert!(table.get(RawDev(1, 3)).is_ok());
        assert!(table.get(RawDev(1, 5)).is_ok());
        assert!(table.get(RawDev(9, 9)).is_err());
    }
}
