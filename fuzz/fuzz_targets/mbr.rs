#![no_main]

use bootscout_core::{
    scan::legacy::mbr::activate_mbr_partition,
    system::block::{BlockError, SECTOR_SIZE, Sector, SectorDevice},
    volume::bootcode,
};
use libfuzzer_sys::fuzz_target;

/// A disk made of whatever sectors the input holds. Reads past the end fail.
struct FuzzDisk(Vec<Sector>);

impl SectorDevice for FuzzDisk {
    fn read_sector(&mut self, lba: u64) -> Result<Sector, BlockError> {
        usize::try_from(lba)
            .ok()
            .and_then(|x| self.0.get(x))
            .copied()
            .ok_or(BlockError::NoMedia)
    }

    fn write_sector(&mut self, lba: u64, sector: &Sector) -> Result<(), BlockError> {
        let slot = usize::try_from(lba)
            .ok()
            .and_then(|x| self.0.get_mut(x))
            .ok_or(BlockError::NoMedia)?;
        *slot = *sector;
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&index, data)) = data.split_first() else {
        return;
    };
    let sectors: Vec<Sector> = data
        .chunks_exact(SECTOR_SIZE)
        .take(64)
        .filter_map(|x| x.try_into().ok())
        .collect();
    if let Some(first) = sectors.first() {
        let _ = bootcode::detect(first);
    }
    let mut disk = FuzzDisk(sectors);
    let _ = activate_mbr_partition(&mut disk, usize::from(index));
});
